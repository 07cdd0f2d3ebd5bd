//! User domain entity

use chrono::{DateTime, Utc};

/// Dashboard user. Identified by email; only the password can change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
