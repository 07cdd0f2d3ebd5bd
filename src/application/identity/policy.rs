//! Authentication policy
//!
//! Built once at startup from configuration and shared by the bearer
//! middleware and the login flow. With identity checking disabled every
//! user-scoped request is admitted as [`Identity::Unchecked`] and login
//! hands out [`PLACEHOLDER_TOKEN`].

use crate::domain::{DomainError, DomainResult, User};
use crate::infrastructure::crypto::jwt::{create_token, verify_token, JwtConfig};

/// Token returned by login while identity checking is disabled
pub const PLACEHOLDER_TOKEN: &str = "auth-disabled";

#[derive(Clone)]
pub enum AuthPolicy {
    Enforced(JwtConfig),
    Disabled,
}

/// Caller of a user-scoped endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    User { id: String, email: String },
    /// Admitted without a check because the policy is disabled
    Unchecked,
}

impl Identity {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Identity::User { id, .. } => Some(id),
            Identity::Unchecked => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub token_type: String,
    /// Seconds until expiry; 0 for the placeholder
    pub expires_in: i64,
}

impl IssuedToken {
    fn placeholder() -> Self {
        Self {
            token: PLACEHOLDER_TOKEN.to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 0,
        }
    }
}

impl AuthPolicy {
    pub fn new(auth_enabled: bool, jwt: JwtConfig) -> Self {
        if auth_enabled {
            AuthPolicy::Enforced(jwt)
        } else {
            AuthPolicy::Disabled
        }
    }

    pub fn is_enforced(&self) -> bool {
        matches!(self, AuthPolicy::Enforced(_))
    }

    /// Resolve the caller from an optional bearer token.
    pub fn authenticate(&self, bearer: Option<&str>) -> DomainResult<Identity> {
        let jwt = match self {
            AuthPolicy::Disabled => return Ok(Identity::Unchecked),
            AuthPolicy::Enforced(jwt) => jwt,
        };

        let token = bearer
            .ok_or_else(|| DomainError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = verify_token(token, jwt)
            .map_err(|e| DomainError::Unauthorized(format!("Invalid token: {}", e)))?;

        Ok(Identity::User {
            id: claims.sub,
            email: claims.email,
        })
    }

    /// Issue a session token for a verified user.
    pub fn issue(&self, user: &User) -> DomainResult<IssuedToken> {
        match self {
            AuthPolicy::Disabled => Ok(IssuedToken::placeholder()),
            AuthPolicy::Enforced(jwt) => {
                let token = create_token(&user.id, &user.email, jwt)
                    .map_err(|e| DomainError::Internal(format!("Failed to create token: {}", e)))?;
                Ok(IssuedToken {
                    token,
                    token_type: "Bearer".to_string(),
                    expires_in: jwt.expires_in_secs(),
                })
            }
        }
    }

    /// Token for a login attempt while checks are disabled.
    pub fn placeholder_token(&self) -> Option<IssuedToken> {
        match self {
            AuthPolicy::Disabled => Some(IssuedToken::placeholder()),
            AuthPolicy::Enforced(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user() -> User {
        User {
            id: "u-1".into(),
            email: "ada@example.com".into(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    fn enforced() -> AuthPolicy {
        AuthPolicy::new(true, JwtConfig::new("test-secret", 1))
    }

    #[test]
    fn enforced_policy_round_trips_identity() {
        let policy = enforced();
        let issued = policy.issue(&user()).unwrap();
        assert_eq!(issued.expires_in, 3600);

        let identity = policy.authenticate(Some(&issued.token)).unwrap();
        assert_eq!(
            identity,
            Identity::User {
                id: "u-1".into(),
                email: "ada@example.com".into()
            }
        );
    }

    #[test]
    fn enforced_policy_rejects_missing_and_bad_tokens() {
        let policy = enforced();
        assert!(matches!(
            policy.authenticate(None),
            Err(DomainError::Unauthorized(_))
        ));
        assert!(matches!(
            policy.authenticate(Some(PLACEHOLDER_TOKEN)),
            Err(DomainError::Unauthorized(_))
        ));
    }

    #[test]
    fn disabled_policy_admits_anyone() {
        let policy = AuthPolicy::new(false, JwtConfig::new("unused", 1));
        assert!(!policy.is_enforced());
        assert_eq!(policy.authenticate(None).unwrap(), Identity::Unchecked);
        assert_eq!(
            policy.authenticate(Some("garbage")).unwrap(),
            Identity::Unchecked
        );
        assert_eq!(policy.placeholder_token().unwrap().token, PLACEHOLDER_TOKEN);
        assert_eq!(policy.issue(&user()).unwrap().token, PLACEHOLDER_TOKEN);
    }
}
