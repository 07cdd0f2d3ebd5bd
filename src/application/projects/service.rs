//! Project management service

use std::sync::Arc;

use tracing::info;

use crate::application::identity::Identity;
use crate::domain::{DomainError, DomainResult, NewProject, Project, RepositoryProvider};
use crate::infrastructure::crypto::api_key::generate_api_key;

pub const MAX_PROJECT_NAME_LEN: usize = 100;

pub struct ProjectService {
    repos: Arc<dyn RepositoryProvider>,
}

impl ProjectService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Create a project owned by the caller (unowned for unchecked callers).
    pub async fn create(&self, identity: &Identity, name: &str) -> DomainResult<Project> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_PROJECT_NAME_LEN {
            return Err(DomainError::validation(
                "name",
                format!("must be 1-{} characters", MAX_PROJECT_NAME_LEN),
            ));
        }

        if self.repos.projects().find_by_name(name).await?.is_some() {
            return Err(DomainError::Conflict("Project name already taken".into()));
        }

        let project = self
            .repos
            .projects()
            .create(NewProject {
                name: name.to_string(),
                api_key: generate_api_key(name),
                owner_id: identity.user_id().map(String::from),
            })
            .await?;

        info!(project_id = %project.id, name = %project.name, "Project created");
        Ok(project)
    }

    /// Projects visible to the caller: their own, or all when unchecked.
    pub async fn list(&self, identity: &Identity) -> DomainResult<Vec<Project>> {
        self.repos.projects().list(identity.user_id()).await
    }

    pub async fn regenerate_key(
        &self,
        identity: &Identity,
        project_id: &str,
    ) -> DomainResult<Project> {
        let project = self
            .repos
            .projects()
            .find_by_id(project_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Project", "id", project_id))?;

        if !project.is_manageable_by(identity.user_id()) {
            return Err(DomainError::Forbidden(
                "Only the project owner can regenerate its API key".into(),
            ));
        }

        let project = self
            .repos
            .projects()
            .update_api_key(&project.id, &generate_api_key(&project.name))
            .await?;

        info!(project_id = %project.id, "Project API key regenerated");
        Ok(project)
    }

    /// Resolve an ingest API key to its project.
    pub async fn authenticate_key(&self, api_key: &str) -> DomainResult<Project> {
        self.repos
            .projects()
            .find_by_api_key(api_key)
            .await?
            .ok_or_else(|| DomainError::Unauthorized("Invalid API key".into()))
    }
}
