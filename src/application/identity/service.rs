//! Identity service: registration, login and password changes.
//!
//! HTTP handlers are thin wrappers that delegate here.

use std::sync::Arc;

use tracing::info;

use super::policy::{AuthPolicy, Identity, IssuedToken};
use crate::domain::user::CreateUserDto;
use crate::domain::{DomainError, DomainResult, RepositoryProvider, User};
use crate::infrastructure::crypto::password::{hash_password, verify_password};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 128;

pub struct IdentityService {
    repos: Arc<dyn RepositoryProvider>,
    policy: Arc<AuthPolicy>,
    bcrypt_cost: u32,
}

impl IdentityService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        policy: Arc<AuthPolicy>,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            repos,
            policy,
            bcrypt_cost,
        }
    }

    pub fn policy(&self) -> &AuthPolicy {
        &self.policy
    }

    fn check_password(password: &str, field: &str) -> DomainResult<()> {
        let len = password.chars().count();
        if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
            return Err(DomainError::validation(
                field,
                format!(
                    "must be {}-{} characters",
                    MIN_PASSWORD_LEN, MAX_PASSWORD_LEN
                ),
            ));
        }
        Ok(())
    }

    fn hash(&self, password: &str) -> DomainResult<String> {
        hash_password(password, self.bcrypt_cost)
            .map_err(|e| DomainError::Internal(format!("Failed to hash password: {}", e)))
    }

    /// Register a new user. Emails are compared case-insensitively.
    pub async fn register(&self, email: &str, password: &str) -> DomainResult<User> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(DomainError::validation("email", "invalid email address"));
        }
        Self::check_password(password, "password")?;

        if self.repos.users().find_by_email(&email).await?.is_some() {
            return Err(DomainError::Conflict("Email already registered".into()));
        }

        let user = self
            .repos
            .users()
            .create(CreateUserDto {
                email,
                password_hash: self.hash(password)?,
            })
            .await?;

        info!(user_id = %user.id, email = %user.email, "New user registered");
        Ok(user)
    }

    /// Verify credentials and issue a session token. While identity
    /// checking is disabled this always succeeds with the placeholder.
    pub async fn login(&self, email: &str, password: &str) -> DomainResult<IssuedToken> {
        if let Some(token) = self.policy.placeholder_token() {
            return Ok(token);
        }

        let email = email.trim().to_lowercase();
        let Some(user) = self.repos.users().find_by_email(&email).await? else {
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        };

        let valid = verify_password(password, &user.password_hash).unwrap_or(false);
        if !valid {
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        }

        info!(user_id = %user.id, "User logged in");
        self.policy.issue(&user)
    }

    /// The stored user behind an identity, if any.
    pub async fn current_user(&self, identity: &Identity) -> DomainResult<Option<User>> {
        match identity.user_id() {
            Some(id) => self.repos.users().find_by_id(id).await,
            None => Ok(None),
        }
    }

    /// Change the caller's password. Verifies the current password first.
    pub async fn change_password(
        &self,
        identity: &Identity,
        current_password: &str,
        new_password: &str,
    ) -> DomainResult<()> {
        let Some(user_id) = identity.user_id() else {
            return Err(DomainError::Forbidden(
                "Password changes need an authenticated user".into(),
            ));
        };
        Self::check_password(new_password, "newPassword")?;

        let user = self
            .repos
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", user_id))?;

        let valid = verify_password(current_password, &user.password_hash).unwrap_or(false);
        if !valid {
            return Err(DomainError::Unauthorized("Invalid current password".into()));
        }

        let new_hash = self.hash(new_password)?;
        self.repos.users().update_password(user_id, &new_hash).await?;

        info!(user_id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::identity::PLACEHOLDER_TOKEN;
    use crate::infrastructure::crypto::jwt::JwtConfig;
    use crate::infrastructure::database::repositories::SeaOrmRepositoryProvider;
    use crate::infrastructure::database::test_connection;

    async fn service(auth_enabled: bool) -> IdentityService {
        let repos = Arc::new(SeaOrmRepositoryProvider::new(test_connection().await));
        let policy = Arc::new(AuthPolicy::new(auth_enabled, JwtConfig::new("secret", 1)));
        IdentityService::new(repos, policy, 4)
    }

    #[tokio::test]
    async fn register_then_login() {
        let svc = service(true).await;
        let user = svc.register("Ada@Example.com", "hunter22").await.unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_ne!(user.password_hash, "hunter22");

        let token = svc.login("ada@example.com", "hunter22").await.unwrap();
        let identity = svc.policy().authenticate(Some(&token.token)).unwrap();
        assert_eq!(identity.user_id(), Some(user.id.as_str()));
    }

    #[tokio::test]
    async fn duplicate_registration_is_a_conflict() {
        let svc = service(true).await;
        svc.register("ada@example.com", "hunter22").await.unwrap();
        let err = svc.register("ADA@example.com", "other-pass").await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(ref m) if m == "Email already registered"));
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let svc = service(true).await;
        let err = svc.register("ada@example.com", "123").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let svc = service(true).await;
        svc.register("ada@example.com", "hunter22").await.unwrap();
        assert!(matches!(
            svc.login("ada@example.com", "nope-nope").await,
            Err(DomainError::Unauthorized(_))
        ));
        assert!(matches!(
            svc.login("ghost@example.com", "hunter22").await,
            Err(DomainError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn disabled_policy_login_returns_placeholder() {
        let svc = service(false).await;
        let token = svc.login("nobody@example.com", "whatever").await.unwrap();
        assert_eq!(token.token, PLACEHOLDER_TOKEN);
    }

    #[tokio::test]
    async fn change_password_requires_current_password() {
        let svc = service(true).await;
        let user = svc.register("ada@example.com", "hunter22").await.unwrap();
        let identity = Identity::User {
            id: user.id.clone(),
            email: user.email.clone(),
        };

        assert!(matches!(
            svc.change_password(&identity, "wrong-one", "brand-new").await,
            Err(DomainError::Unauthorized(_))
        ));

        svc.change_password(&identity, "hunter22", "brand-new")
            .await
            .unwrap();
        assert!(svc.login("ada@example.com", "brand-new").await.is_ok());
        assert!(svc.login("ada@example.com", "hunter22").await.is_err());

        assert!(matches!(
            svc.change_password(&Identity::Unchecked, "a", "brand-new").await,
            Err(DomainError::Forbidden(_))
        ));
    }
}
