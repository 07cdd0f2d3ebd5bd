//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod metric_repository;
pub mod project_repository;
pub mod repository_provider;
pub mod user_repository;

pub use metric_repository::SeaOrmMetricRepository;
pub use project_repository::SeaOrmProjectRepository;
pub use repository_provider::SeaOrmRepositoryProvider;
pub use user_repository::SeaOrmUserRepository;
