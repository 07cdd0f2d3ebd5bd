use async_trait::async_trait;

use super::{Metric, MetricFilter, NewMetric};
use crate::domain::DomainResult;

#[async_trait]
pub trait MetricRepository: Send + Sync {
    async fn insert(&self, metric: NewMetric) -> DomainResult<Metric>;
    /// Metrics matching every condition of `filter`, ordered by start time.
    /// Project conditions must already carry ids.
    async fn find(&self, filter: &MetricFilter) -> DomainResult<Vec<Metric>>;
}
