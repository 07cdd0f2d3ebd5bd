//! Aggregation and charting over fetched metrics
//!
//! Both stages are pure functions of their inputs: `aggregate` turns
//! records into rows, `render` maps rows onto a chart. A chart point keeps
//! its row index and a row keeps the indices of its source records, so a
//! clicked point resolves back to the data behind it.

pub mod aggregation;
pub mod charting;

pub use aggregation::{aggregate, AggregationSettings, FieldValue, Row, Statistic};
pub use charting::{render, resolve_point, ChartData, ChartPoint, ChartType, GraphSettings, Series};
