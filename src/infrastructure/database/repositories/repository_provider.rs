//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::metric::MetricRepository;
use crate::domain::project::ProjectRepository;
use crate::domain::repositories::RepositoryProvider;
use crate::domain::user::UserRepository;

use super::metric_repository::SeaOrmMetricRepository;
use super::project_repository::SeaOrmProjectRepository;
use super::user_repository::SeaOrmUserRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
pub struct SeaOrmRepositoryProvider {
    db: DatabaseConnection,
    users: SeaOrmUserRepository,
    projects: SeaOrmProjectRepository,
    metrics: SeaOrmMetricRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            users: SeaOrmUserRepository::new(db.clone()),
            projects: SeaOrmProjectRepository::new(db.clone()),
            metrics: SeaOrmMetricRepository::new(db.clone()),
            db,
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn projects(&self) -> &dyn ProjectRepository {
        &self.projects
    }

    fn metrics(&self) -> &dyn MetricRepository {
        &self.metrics
    }
}
