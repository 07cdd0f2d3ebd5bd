//! SeaORM implementation of UserRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};

use crate::domain::user::{CreateUserDto, User, UserRepository};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::user;

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn user_from_model(model: user::Model) -> User {
    User {
        id: model.id,
        email: model.email,
        password_hash: model.password_hash,
        created_at: model.created_at,
    }
}

fn insert_err(e: DbErr) -> DomainError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            DomainError::Conflict("Email already registered".to_string())
        }
        _ => e.into(),
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn create(&self, dto: CreateUserDto) -> DomainResult<User> {
        let model = user::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            email: Set(dto.email),
            password_hash: Set(dto.password_hash),
            created_at: Set(Utc::now()),
        };

        let model = model.insert(&self.db).await.map_err(insert_err)?;
        Ok(user_from_model(model))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        Ok(model.map(user_from_model))
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find_by_id(id.to_string()).one(&self.db).await?;
        Ok(model.map(user_from_model))
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> DomainResult<()> {
        let model = user::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", id))?;

        let mut active: user::ActiveModel = model.into();
        active.password_hash = Set(password_hash.to_string());
        active.update(&self.db).await?;
        Ok(())
    }
}
