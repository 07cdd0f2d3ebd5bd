//! Project domain entity

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    /// Globally unique display name, also used to select a project in filters
    pub name: String,
    /// Globally unique ingest credential
    pub api_key: String,
    /// `None` when created while identity checking was disabled
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Whether `user_id` may manage this project. Unowned projects are
    /// manageable by anyone.
    pub fn is_manageable_by(&self, user_id: Option<&str>) -> bool {
        match (&self.owner_id, user_id) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(owner), Some(user)) => owner == user,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub api_key: String,
    pub owner_id: Option<String>,
}
