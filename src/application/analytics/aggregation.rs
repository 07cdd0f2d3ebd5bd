//! Record grouping and summary statistics

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Metric, TagValue};
use crate::shared::time::format_timestamp;

const TAG_PREFIX: &str = "tags.";
const KEY_SEPARATOR: &str = "-";

/// Top-level metric fields addressable by name.
const METRIC_FIELDS: [&str; 8] = [
    "id",
    "projectId",
    "operation",
    "startTime",
    "endTime",
    "datetime",
    "duration",
    "createdAt",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(serde_json::Number),
    Time(DateTime<Utc>),
    Text(String),
}

impl FieldValue {
    fn float(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(FieldValue::Number)
            .unwrap_or_else(|| FieldValue::Text(value.to_string()))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

impl From<&TagValue> for FieldValue {
    fn from(value: &TagValue) -> Self {
        match value {
            TagValue::Bool(b) => FieldValue::Bool(*b),
            TagValue::Number(n) => FieldValue::Number(n.clone()),
            TagValue::Text(s) => FieldValue::Text(s.clone()),
        }
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        FieldValue::Number((value as u64).into())
    }
}

/// Canonical text, used for group keys and chart labels.
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Time(t) => f.write_str(&format_timestamp(t)),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// Resolve `name` on a metric: top-level field first, then tag.
pub fn resolve_field(metric: &Metric, name: &str) -> Option<FieldValue> {
    let value = match name {
        "id" => FieldValue::Text(metric.id.clone()),
        "projectId" => FieldValue::Text(metric.project_id.clone()),
        "operation" => FieldValue::Text(metric.operation.clone()),
        "startTime" => FieldValue::Time(metric.start_time),
        "endTime" => FieldValue::Time(metric.end_time),
        "datetime" => FieldValue::Time(metric.datetime()),
        "duration" => FieldValue::float(metric.duration),
        "createdAt" => FieldValue::Time(metric.created_at),
        _ => {
            let key = name.strip_prefix(TAG_PREFIX).unwrap_or(name);
            return metric.tags.get(key).map(FieldValue::from);
        }
    };
    Some(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl Statistic {
    fn suffix(self) -> &'static str {
        match self {
            Statistic::Count => "Count",
            Statistic::Sum => "Sum",
            Statistic::Min => "Min",
            Statistic::Max => "Max",
            Statistic::Avg => "Avg",
        }
    }

    fn compute(self, values: &[f64]) -> Option<FieldValue> {
        let value = match self {
            Statistic::Count => return Some(values.len().into()),
            _ if values.is_empty() => return None,
            Statistic::Sum => values.iter().sum::<f64>(),
            Statistic::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Statistic::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Statistic::Avg => values.iter().sum::<f64>() / values.len() as f64,
        };
        Some(FieldValue::float(value))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregationSettings {
    /// Entries may be dash-joined compounds such as `"operation-region"`
    pub group_by: Vec<String>,
    pub aggregated_fields: BTreeMap<String, Vec<Statistic>>,
}

/// A record view: one record (passthrough) or one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub values: BTreeMap<String, FieldValue>,
    /// Indices into the records the row was built from
    pub sources: Vec<usize>,
}

impl Row {
    /// Look up a field, accepting the `tags.` prefix for tag columns.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name).or_else(|| {
            name.strip_prefix(TAG_PREFIX)
                .and_then(|key| self.values.get(key))
        })
    }
}

fn passthrough_row(index: usize, metric: &Metric) -> Row {
    let mut values = BTreeMap::new();
    for field in METRIC_FIELDS {
        if let Some(value) = resolve_field(metric, field) {
            values.insert(field.to_string(), value);
        }
    }
    for (key, tag) in &metric.tags {
        let column = if METRIC_FIELDS.contains(&key.as_str()) {
            format!("{}{}", TAG_PREFIX, key)
        } else {
            key.clone()
        };
        values.insert(column, FieldValue::from(tag));
    }
    Row {
        values,
        sources: vec![index],
    }
}

/// How one group-by entry is resolved on a record.
enum GroupKey<'a> {
    Single(&'a str),
    Compound(Vec<&'a str>),
}

impl<'a> GroupKey<'a> {
    /// An entry naming an existing field is taken whole, even if it
    /// contains a dash; otherwise it is split into components.
    fn parse(entry: &'a str, records: &[Metric]) -> Self {
        let known = METRIC_FIELDS.contains(&entry)
            || records
                .iter()
                .any(|m| m.tags.contains_key(entry.strip_prefix(TAG_PREFIX).unwrap_or(entry)));
        if known || !entry.contains(KEY_SEPARATOR) {
            GroupKey::Single(entry)
        } else {
            GroupKey::Compound(entry.split(KEY_SEPARATOR).collect())
        }
    }

    /// Text used in the group key, plus the typed value for single fields.
    fn resolve(&self, metric: &Metric) -> (String, Option<FieldValue>) {
        match self {
            GroupKey::Single(name) => {
                let value = resolve_field(metric, name);
                let text = value.as_ref().map(ToString::to_string).unwrap_or_default();
                (text, value)
            }
            GroupKey::Compound(parts) => {
                let text = parts
                    .iter()
                    .map(|part| {
                        resolve_field(metric, part)
                            .map(|v| v.to_string())
                            .unwrap_or_default()
                    })
                    .collect::<Vec<_>>()
                    .join(KEY_SEPARATOR);
                (text, None)
            }
        }
    }
}

fn stat_column(field: &str, stat: Statistic) -> String {
    let base = field.strip_prefix(TAG_PREFIX).unwrap_or(field);
    format!("{}{}", base, stat.suffix())
}

/// Group `records` per `settings`. Empty `groupBy` passes every record
/// through as its own row.
pub fn aggregate(records: &[Metric], settings: &AggregationSettings) -> Vec<Row> {
    if settings.group_by.is_empty() {
        return records
            .iter()
            .enumerate()
            .map(|(i, m)| passthrough_row(i, m))
            .collect();
    }

    let keys: Vec<(&str, GroupKey)> = settings
        .group_by
        .iter()
        .map(|entry| (entry.as_str(), GroupKey::parse(entry, records)))
        .collect();

    // Groups in first-appearance order
    let mut groups: Vec<(BTreeMap<String, FieldValue>, Vec<usize>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (i, metric) in records.iter().enumerate() {
        let resolved: Vec<(String, Option<FieldValue>)> =
            keys.iter().map(|(_, key)| key.resolve(metric)).collect();
        let group_key = resolved
            .iter()
            .map(|(text, _)| text.as_str())
            .collect::<Vec<_>>()
            .join(KEY_SEPARATOR);

        match index.get(&group_key) {
            Some(&g) => groups[g].1.push(i),
            None => {
                let values = keys
                    .iter()
                    .zip(resolved)
                    .map(|((entry, _), (text, typed))| {
                        (entry.to_string(), typed.unwrap_or(FieldValue::Text(text)))
                    })
                    .collect();
                index.insert(group_key, groups.len());
                groups.push((values, vec![i]));
            }
        }
    }

    groups
        .into_iter()
        .map(|(mut values, sources)| {
            values.insert("count".to_string(), sources.len().into());

            for (field, stats) in &settings.aggregated_fields {
                let numbers: Vec<f64> = sources
                    .iter()
                    .filter_map(|&i| resolve_field(&records[i], field))
                    .filter_map(|v| v.as_f64())
                    .collect();
                for &stat in stats {
                    if let Some(value) = stat.compute(&numbers) {
                        values.insert(stat_column(field, stat), value);
                    }
                }
            }

            Row { values, sources }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Tags;
    use chrono::TimeZone;

    fn metric(operation: &str, duration: f64, tags: &[(&str, TagValue)]) -> Metric {
        Metric {
            id: format!("{}-{}", operation, duration),
            project_id: "p".into(),
            operation: operation.into(),
            start_time: Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 1).unwrap(),
            duration,
            tags: tags.iter().map(|(k, v)| (k.to_string(), v.clone())).collect::<Tags>(),
            created_at: Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 2).unwrap(),
        }
    }

    fn settings(group_by: &[&str], fields: &[(&str, &[Statistic])]) -> AggregationSettings {
        AggregationSettings {
            group_by: group_by.iter().map(|s| s.to_string()).collect(),
            aggregated_fields: fields
                .iter()
                .map(|(f, s)| (f.to_string(), s.to_vec()))
                .collect(),
        }
    }

    fn num(row: &Row, name: &str) -> f64 {
        row.get(name).and_then(FieldValue::as_f64).unwrap()
    }

    fn records() -> Vec<Metric> {
        vec![
            metric("pay", 100.0, &[("region", "eu".into())]),
            metric("refund", 40.0, &[("region", "us".into())]),
            metric("pay", 300.0, &[("region", "us".into())]),
            metric("pay", 200.0, &[("region", "eu".into())]),
        ]
    }

    #[test]
    fn empty_group_by_passes_records_through() {
        let records = records();
        let rows = aggregate(&records, &settings(&[], &[("duration", &[Statistic::Avg])]));
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].sources, vec![1]);
        assert_eq!(rows[1].get("operation"), Some(&FieldValue::Text("refund".into())));
        assert_eq!(rows[1].get("tags.region"), Some(&FieldValue::Text("us".into())));
        assert!(rows[1].get("durationAvg").is_none());
        assert_eq!(
            rows[0].get("datetime"),
            Some(&FieldValue::Time(records[0].end_time))
        );
    }

    #[test]
    fn average_and_count_per_group() {
        let records = records();
        let all = [
            Statistic::Count,
            Statistic::Sum,
            Statistic::Min,
            Statistic::Max,
            Statistic::Avg,
        ];
        let rows = aggregate(&records, &settings(&["operation"], &[("duration", &all)]));

        assert_eq!(rows.len(), 2);
        let pay = &rows[0];
        assert_eq!(pay.get("operation"), Some(&FieldValue::Text("pay".into())));
        assert_eq!(num(pay, "count"), 3.0);
        assert_eq!(num(pay, "durationAvg"), 200.0);
        assert_eq!(num(pay, "durationSum"), 600.0);
        assert_eq!(num(pay, "durationMin"), 100.0);
        assert_eq!(num(pay, "durationMax"), 300.0);
        assert_eq!(num(pay, "durationCount"), 3.0);
        assert_eq!(pay.sources, vec![0, 2, 3]);

        let refund = &rows[1];
        assert_eq!(num(refund, "count"), 1.0);
        assert_eq!(num(refund, "durationAvg"), 40.0);
    }

    #[test]
    fn counts_serialize_as_integers() {
        let rows = aggregate(&records(), &settings(&["operation"], &[]));
        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["values"]["count"], serde_json::json!(3));
    }

    #[test]
    fn compound_group_by_joins_components() {
        let rows = aggregate(&records(), &settings(&["operation-region"], &[]));
        let keys: Vec<String> = rows
            .iter()
            .map(|r| r.get("operation-region").unwrap().to_string())
            .collect();
        assert_eq!(keys, vec!["pay-eu", "refund-us", "pay-us"]);
        assert_eq!(rows[0].sources, vec![0, 3]);
    }

    #[test]
    fn multiple_entries_and_tag_fallback() {
        let rows = aggregate(&records(), &settings(&["region", "operation"], &[]));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("region"), Some(&FieldValue::Text("eu".into())));
        assert_eq!(rows[0].get("operation"), Some(&FieldValue::Text("pay".into())));
    }

    #[test]
    fn dashed_tag_names_are_not_split() {
        let records = vec![
            metric("a", 1.0, &[("user-agent", "curl".into())]),
            metric("b", 1.0, &[("user-agent", "curl".into())]),
        ];
        let rows = aggregate(&records, &settings(&["user-agent"], &[]));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("user-agent"), Some(&FieldValue::Text("curl".into())));
    }

    #[test]
    fn missing_values_group_under_empty_text() {
        let records = vec![
            metric("a", 1.0, &[]),
            metric("b", 2.0, &[("region", "eu".into())]),
            metric("c", 3.0, &[]),
        ];
        let rows = aggregate(&records, &settings(&["region"], &[]));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("region"), Some(&FieldValue::Text(String::new())));
        assert_eq!(rows[0].sources, vec![0, 2]);
    }

    #[test]
    fn non_numeric_fields_omit_statistics() {
        let records = vec![
            metric("a", 1.0, &[("latency", "fast".into())]),
            metric("a", 1.0, &[("latency", 12.into())]),
            metric("b", 1.0, &[("latency", "slow".into())]),
        ];
        let stats = [Statistic::Avg, Statistic::Count];
        let rows = aggregate(&records, &settings(&["operation"], &[("latency", &stats)]));

        assert_eq!(num(&rows[0], "latencyAvg"), 12.0);
        assert_eq!(num(&rows[0], "latencyCount"), 1.0);
        assert!(rows[1].get("latencyAvg").is_none());
        assert_eq!(num(&rows[1], "latencyCount"), 0.0);
    }

    #[test]
    fn single_entry_keeps_value_type() {
        let records = vec![
            metric("a", 1.0, &[("status", 200.into())]),
            metric("b", 1.0, &[("status", 500.into())]),
        ];
        let rows = aggregate(&records, &settings(&["status"], &[]));
        assert_eq!(rows[0].get("status"), Some(&FieldValue::Number(200.into())));
    }

    #[test]
    fn settings_deserialize_from_dashboard_shape() {
        let parsed: AggregationSettings = serde_json::from_str(
            r#"{"groupBy":["operation"],"aggregatedFields":{"duration":["avg","max"]}}"#,
        )
        .unwrap();
        assert_eq!(
            parsed,
            settings(&["operation"], &[("duration", &[Statistic::Avg, Statistic::Max])])
        );
        let empty: AggregationSettings = serde_json::from_str("{}").unwrap();
        assert!(empty.group_by.is_empty());
    }
}
