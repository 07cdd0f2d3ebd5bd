//! Repository access for the domain layer

use super::metric::MetricRepository;
use super::project::ProjectRepository;
use super::user::UserRepository;

/// Provides access to all domain repositories.
///
/// Consumers request only the repository they need:
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let project = repos.projects().find_by_api_key(key).await?;
///     let metrics = repos.metrics().find(&filter).await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn users(&self) -> &dyn UserRepository;
    fn projects(&self) -> &dyn ProjectRepository;
    fn metrics(&self) -> &dyn MetricRepository;
}
