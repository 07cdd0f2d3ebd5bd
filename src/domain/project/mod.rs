//! Project aggregate
//!
//! A project is the tenant boundary for metrics; its API key is the
//! credential ingest clients present.

pub mod model;
pub mod repository;

pub use model::{NewProject, Project};
pub use repository::ProjectRepository;
