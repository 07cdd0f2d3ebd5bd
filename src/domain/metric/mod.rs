//! Metric aggregate
//!
//! Recorded operation executions, their schemaless tags and the filter
//! compiler used to query them.

pub mod filter;
pub mod model;
pub mod repository;

pub use filter::{
    compile, Comparison, ComparisonDirective, Condition, MetricFilter, NumberPredicate,
    ProjectSelector, RawFilter, TagPredicate, TextPredicate, TimePredicate,
};
pub use model::{validate_tag_key, Metric, NewMetric, TagValue, Tags};
pub use repository::MetricRepository;
