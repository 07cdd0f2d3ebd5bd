//! Application layer - use-case orchestration over the domain

pub mod analytics;
pub mod identity;
pub mod metrics;
pub mod projects;

pub use identity::{AuthPolicy, Identity, IdentityService, IssuedToken, PLACEHOLDER_TOKEN};
pub use metrics::{IngestService, MetricQueryService, QuerySuggestionService};
pub use projects::ProjectService;
