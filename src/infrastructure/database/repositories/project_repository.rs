//! SeaORM implementation of ProjectRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};

use crate::domain::project::{NewProject, Project, ProjectRepository};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::project;

pub struct SeaOrmProjectRepository {
    db: DatabaseConnection,
}

impl SeaOrmProjectRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn project_from_model(model: project::Model) -> Project {
    Project {
        id: model.id,
        name: model.name,
        api_key: model.api_key,
        owner_id: model.owner_id,
        created_at: model.created_at,
    }
}

/// Unique violations name the offending column in the driver message.
fn write_err(e: DbErr) -> DomainError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) if detail.contains("api_key") => {
            DomainError::Conflict("API key already in use".to_string())
        }
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            DomainError::Conflict("Project name already taken".to_string())
        }
        _ => e.into(),
    }
}

#[async_trait]
impl ProjectRepository for SeaOrmProjectRepository {
    async fn create(&self, project: NewProject) -> DomainResult<Project> {
        let model = project::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(project.name),
            api_key: Set(project.api_key),
            owner_id: Set(project.owner_id),
            created_at: Set(Utc::now()),
        };

        let model = model.insert(&self.db).await.map_err(write_err)?;
        Ok(project_from_model(model))
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Project>> {
        let model = project::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?;
        Ok(model.map(project_from_model))
    }

    async fn find_by_name(&self, name: &str) -> DomainResult<Option<Project>> {
        let model = project::Entity::find()
            .filter(project::Column::Name.eq(name))
            .one(&self.db)
            .await?;
        Ok(model.map(project_from_model))
    }

    async fn find_by_api_key(&self, api_key: &str) -> DomainResult<Option<Project>> {
        let model = project::Entity::find()
            .filter(project::Column::ApiKey.eq(api_key))
            .one(&self.db)
            .await?;
        Ok(model.map(project_from_model))
    }

    async fn list(&self, owner_id: Option<&str>) -> DomainResult<Vec<Project>> {
        let mut query = project::Entity::find();
        if let Some(owner) = owner_id {
            query = query.filter(project::Column::OwnerId.eq(owner));
        }
        let models = query
            .order_by_asc(project::Column::CreatedAt)
            .order_by_asc(project::Column::Name)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(project_from_model).collect())
    }

    async fn update_api_key(&self, id: &str, api_key: &str) -> DomainResult<Project> {
        let model = project::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Project", "id", id))?;

        let mut active: project::ActiveModel = model.into();
        active.api_key = Set(api_key.to_string());
        let model = active.update(&self.db).await.map_err(write_err)?;
        Ok(project_from_model(model))
    }
}
