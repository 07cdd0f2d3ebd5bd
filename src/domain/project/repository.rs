use async_trait::async_trait;

use super::{NewProject, Project};
use crate::domain::DomainResult;

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create(&self, project: NewProject) -> DomainResult<Project>;
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Project>>;
    async fn find_by_name(&self, name: &str) -> DomainResult<Option<Project>>;
    async fn find_by_api_key(&self, api_key: &str) -> DomainResult<Option<Project>>;
    /// Projects owned by `owner_id`, or every project when `None`.
    async fn list(&self, owner_id: Option<&str>) -> DomainResult<Vec<Project>>;
    async fn update_api_key(&self, id: &str, api_key: &str) -> DomainResult<Project>;
}
