//! HTTP REST API
//!
//! - `common`: response envelope, error mapping, validated JSON
//! - `middleware`: bearer, API key and basic authentication
//! - `modules`: handlers and DTOs per resource
//! - `router`: route table, OpenAPI document and layers

pub mod common;
pub mod middleware;
pub mod modules;
pub mod router;


pub use router::{create_api_router, ApiContext, ApiDoc};
