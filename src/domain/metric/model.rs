//! Metric domain entity

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scalar tag value supplied by the submitting client.
///
/// Numbers keep their JSON form so an integer tag stays an integer on the
/// way back out (`1`, not `1.0`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl TagValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TagValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

/// Canonical text form, used for equality filtering and grouping.
impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Bool(b) => write!(f, "{}", b),
            TagValue::Number(n) => write!(f, "{}", n),
            TagValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Text(value.to_string())
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::Number(value.into())
    }
}

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        TagValue::Bool(value)
    }
}

/// Open key/value annotations on a metric.
pub type Tags = BTreeMap<String, TagValue>;

/// Tag keys end up inside a quoted JSON path, so they cannot carry quotes.
pub fn validate_tag_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        return Err("tag key must not be empty".to_string());
    }
    if key.contains('"') {
        return Err(format!("tag key '{}' must not contain '\"'", key));
    }
    Ok(())
}

/// One recorded operation execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub id: String,
    pub project_id: String,
    pub operation: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Caller-supplied; not reconciled with `end_time - start_time`.
    pub duration: f64,
    pub tags: Tags,
    pub created_at: DateTime<Utc>,
}

impl Metric {
    /// Read-only alias of `end_time`.
    pub fn datetime(&self) -> DateTime<Utc> {
        self.end_time
    }
}

#[derive(Debug, Clone)]
pub struct NewMetric {
    pub project_id: String,
    pub operation: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: f64,
    pub tags: Tags,
}
