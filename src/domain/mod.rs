pub mod metric;
pub mod project;
pub mod repositories;
pub mod user;

// Re-export commonly used types
pub use metric::{Metric, MetricFilter, NewMetric, RawFilter, TagValue, Tags};
pub use project::{NewProject, Project};
pub use repositories::RepositoryProvider;
pub use user::User;

pub use crate::shared::errors::{DomainError, DomainResult};
