pub mod auth;
pub mod docs;
pub mod health;
pub mod metrics;
pub mod observability;
pub mod projects;
pub mod request_id;
