//! Identity module: user management & authentication
//!
//! `IdentityService` orchestrates registration, login and password
//! changes; `AuthPolicy` decides how callers are authenticated.

pub mod policy;
pub mod service;

pub use policy::{AuthPolicy, Identity, IssuedToken, PLACEHOLDER_TOKEN};
pub use service::IdentityService;
