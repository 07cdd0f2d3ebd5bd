//! Metric ingestion

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::metric::validate_tag_key;
use crate::domain::{
    DomainError, DomainResult, Metric, NewMetric, Project, RepositoryProvider, Tags,
};
use crate::infrastructure::telemetry::{TelemetryEvent, TelemetryHandle};

pub const MAX_OPERATION_LEN: usize = 255;

/// A metric as submitted by a client, already parsed.
#[derive(Debug, Clone)]
pub struct MetricInput {
    pub operation: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Stored as given; not derived from the timestamps.
    pub duration: f64,
    pub tags: Tags,
}

pub struct IngestService {
    repos: Arc<dyn RepositoryProvider>,
    telemetry: TelemetryHandle,
}

impl IngestService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, telemetry: TelemetryHandle) -> Self {
        Self { repos, telemetry }
    }

    fn validate(input: &MetricInput) -> DomainResult<()> {
        if input.operation.trim().is_empty() {
            return Err(DomainError::validation("operation", "must not be empty"));
        }
        if input.operation.chars().count() > MAX_OPERATION_LEN {
            return Err(DomainError::validation(
                "operation",
                format!("must be at most {} characters", MAX_OPERATION_LEN),
            ));
        }
        if !input.duration.is_finite() {
            return Err(DomainError::validation("duration", "must be a finite number"));
        }
        for key in input.tags.keys() {
            validate_tag_key(key).map_err(|e| DomainError::validation("tags", e))?;
        }
        Ok(())
    }

    /// Persist a metric for `project`, then queue a telemetry event.
    pub async fn ingest(&self, project: &Project, input: MetricInput) -> DomainResult<Metric> {
        Self::validate(&input)?;

        let metric = self
            .repos
            .metrics()
            .insert(NewMetric {
                project_id: project.id.clone(),
                operation: input.operation,
                start_time: input.start_time,
                end_time: input.end_time,
                duration: input.duration,
                tags: input.tags,
            })
            .await?;

        metrics::counter!("opmetrics_ingested_total", "project" => project.name.clone())
            .increment(1);
        self.telemetry.emit(TelemetryEvent::metric_ingested(
            &project.id,
            &metric.operation,
            metric.duration,
        ));

        debug!(metric_id = %metric.id, project = %project.name, "Metric ingested");
        Ok(metric)
    }
}
