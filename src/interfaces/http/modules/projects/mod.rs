//! Project management: create, list, API key regeneration

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
