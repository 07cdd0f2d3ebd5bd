//! Metric use-cases: ingest, query, export and query suggestions.

pub mod export;
pub mod ingest;
pub mod query;
pub mod suggestion;

pub use export::{to_tsv, TSV_HEADER};
pub use ingest::{IngestService, MetricInput};
pub use query::MetricQueryService;
pub use suggestion::QuerySuggestionService;
