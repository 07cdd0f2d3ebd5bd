//! Prometheus scrape endpoint and per-request HTTP metrics

pub mod http_metrics;
pub mod prometheus;

pub use http_metrics::http_metrics_middleware;
pub use prometheus::{prometheus_metrics, PrometheusState};
