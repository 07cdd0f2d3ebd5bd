//! Metric ingest, query, export, analytics and query suggestions

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
