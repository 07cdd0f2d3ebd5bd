//! Metric DTOs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::application::analytics::{AggregationSettings, ChartData, GraphSettings, Row};
use crate::application::metrics::MetricInput;
use crate::domain::metric::ComparisonDirective;
use crate::domain::{DomainError, DomainResult, Metric, RawFilter, Tags};
use crate::shared::time::parse_timestamp;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMetricRequest {
    #[validate(length(min = 1, max = 255, message = "operation must be 1-255 characters"))]
    pub operation: String,
    /// RFC 3339 timestamp
    pub start_time: String,
    /// RFC 3339 timestamp
    pub end_time: String,
    /// Stored as given
    pub duration: f64,
    /// Scalar values only: string, number or boolean
    #[serde(default)]
    #[schema(value_type = Object)]
    pub tags: Tags,
    /// Project API key, used when the `X-Api-Key` header is absent
    #[serde(default)]
    pub token: Option<String>,
}

fn timestamp(field: &str, value: &str) -> DomainResult<DateTime<Utc>> {
    parse_timestamp(value)
        .ok_or_else(|| DomainError::validation(field, format!("invalid timestamp '{}'", value)))
}

impl TryFrom<CreateMetricRequest> for MetricInput {
    type Error = DomainError;

    fn try_from(req: CreateMetricRequest) -> DomainResult<Self> {
        Ok(Self {
            start_time: timestamp("startTime", &req.start_time)?,
            end_time: timestamp("endTime", &req.end_time)?,
            operation: req.operation,
            duration: req.duration,
            tags: req.tags,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricResponse {
    pub id: String,
    pub project_id: String,
    pub operation: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Same instant as `endTime`
    pub datetime: DateTime<Utc>,
    pub duration: f64,
    #[schema(value_type = Object)]
    pub tags: Tags,
    pub created_at: DateTime<Utc>,
}

impl From<Metric> for MetricResponse {
    fn from(m: Metric) -> Self {
        Self {
            datetime: m.datetime(),
            id: m.id,
            project_id: m.project_id,
            operation: m.operation,
            start_time: m.start_time,
            end_time: m.end_time,
            duration: m.duration,
            tags: m.tags,
            created_at: m.created_at,
        }
    }
}

/// Filter state sent in a JSON body: each key maps to a value or a list
/// of values, exactly like repeated query-string keys.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterBody {
    #[schema(value_type = Object)]
    pub filters: BTreeMap<String, Value>,
    #[schema(value_type = Vec<Object>)]
    pub comparisons: Vec<ComparisonDirective>,
}

fn scalar_text(key: &str, value: &Value) -> DomainResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(DomainError::validation(
            key,
            "filter values must be scalars or lists of scalars",
        )),
    }
}

impl FilterBody {
    pub fn to_raw(&self) -> DomainResult<RawFilter> {
        let mut raw = RawFilter::new();
        for (key, value) in &self.filters {
            let values = match value {
                Value::Array(items) => items.iter().collect::<Vec<_>>(),
                other => vec![other],
            };
            for value in values {
                if let Some(text) = scalar_text(key, value)? {
                    raw.push(key.clone(), text);
                }
            }
        }
        for directive in &self.comparisons {
            raw.add_comparison(directive.clone());
        }
        Ok(raw)
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRequest {
    #[serde(flatten)]
    pub filter: FilterBody,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub aggregation: AggregationSettings,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChartRequest {
    #[serde(flatten)]
    pub filter: FilterBody,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub aggregation: AggregationSettings,
    #[schema(value_type = Object)]
    pub graph: GraphSettings,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AggregateResponse {
    pub records: Vec<MetricResponse>,
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChartResponse {
    pub records: Vec<MetricResponse>,
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<Row>,
    #[schema(value_type = Object)]
    pub chart: ChartData,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct QuerySuggestionRequest {
    #[validate(length(min = 1, message = "prompt is required"))]
    pub prompt: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuerySuggestionResponse {
    pub query: String,
}
