use async_trait::async_trait;

use super::{CreateUserDto, User};
use crate::domain::DomainResult;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, dto: CreateUserDto) -> DomainResult<User>;
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>>;
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>>;
    async fn update_password(&self, id: &str, password_hash: &str) -> DomainResult<()>;
}
