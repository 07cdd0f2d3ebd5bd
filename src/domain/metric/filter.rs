//! Metric filter compiler
//!
//! Turns a flat `key -> [values]` map (query string or JSON body) plus
//! optional per-field comparison directives into a [`MetricFilter`]: a
//! conjunction of typed conditions that a repository renders into its own
//! query language.
//!
//! Key handling:
//!
//! - `operation`, `startTime`, `endTime`, `duration`, `project` address
//!   document fields; every other key (optionally written `tags.<key>`)
//!   addresses a tag.
//! - `startDate` / `endDate` become `startTime >= v` / `endTime <= v`.
//! - Empty values never produce a condition.
//! - Unknown comparison types fall back to equality.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::validate_tag_key;
use crate::shared::time::parse_timestamp;
use crate::shared::{DomainError, DomainResult};

/// Query-string key carrying the JSON-encoded comparison directives.
pub const COMPARISONS_KEY: &str = "comparisons";

const TAG_PREFIX: &str = "tags.";

/// `{field, comparisonType}` pair sent by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonDirective {
    pub field: String,
    pub comparison_type: String,
}

impl ComparisonDirective {
    pub fn new(field: impl Into<String>, comparison_type: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            comparison_type: comparison_type.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    GreaterThan,
    LowerThan,
    StringContains,
    In,
}

impl Comparison {
    /// Never fails: anything unrecognised means equality.
    pub fn parse(value: &str) -> Self {
        match value {
            "greaterThan" => Self::GreaterThan,
            "lowerThan" => Self::LowerThan,
            "stringContains" => Self::StringContains,
            "in" => Self::In,
            _ => Self::Equal,
        }
    }
}

/// Uncompiled filter input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFilter {
    fields: BTreeMap<String, Vec<String>>,
    comparisons: Vec<ComparisonDirective>,
}

impl RawFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from decoded query-string pairs. Repeated keys accumulate into
    /// arrays; the `comparisons` key is decoded as JSON.
    pub fn from_query_pairs<I>(pairs: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut raw = Self::new();
        for (key, value) in pairs {
            if key == COMPARISONS_KEY {
                if value.trim().is_empty() {
                    continue;
                }
                let directives: Vec<ComparisonDirective> = serde_json::from_str(&value)
                    .map_err(|e| DomainError::validation(COMPARISONS_KEY, e))?;
                raw.comparisons.extend(directives);
            } else {
                raw.push(key, value);
            }
        }
        Ok(raw)
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(key.into()).or_default().push(value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn add_comparison(&mut self, directive: ComparisonDirective) {
        self.comparisons.push(directive);
    }

    pub fn with_comparison(mut self, field: &str, comparison_type: &str) -> Self {
        self.add_comparison(ComparisonDirective::new(field, comparison_type));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextPredicate {
    OneOf(Vec<String>),
    Contains(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NumberPredicate {
    OneOf(Vec<f64>),
    GreaterThan(f64),
    LowerThan(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimePredicate {
    OneOf(Vec<DateTime<Utc>>),
    AtLeast(DateTime<Utc>),
    AtMost(DateTime<Utc>),
    After(DateTime<Utc>),
    Before(DateTime<Utc>),
}

/// Projects are addressed by name in requests and by id in storage.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectSelector {
    Names(Vec<String>),
    Ids(Vec<String>),
}

/// Tag conditions. Equality and membership compare the tag's canonical
/// text form; ordering comparisons only match numeric tags.
#[derive(Debug, Clone, PartialEq)]
pub enum TagPredicate {
    OneOf(Vec<String>),
    GreaterThan(f64),
    LowerThan(f64),
    Contains(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Operation(TextPredicate),
    Duration(NumberPredicate),
    StartTime(TimePredicate),
    EndTime(TimePredicate),
    Project(ProjectSelector),
    Tag { key: String, predicate: TagPredicate },
}

/// Conjunction of conditions. An empty filter matches every metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricFilter {
    conditions: Vec<Condition>,
}

impl MetricFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    /// Project names still awaiting resolution, deduplicated.
    pub fn project_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for condition in &self.conditions {
            if let Condition::Project(ProjectSelector::Names(list)) = condition {
                for name in list {
                    if !names.contains(&name.as_str()) {
                        names.push(name);
                    }
                }
            }
        }
        names
    }

    /// Swap project names for ids. Every name must be present in `ids`.
    pub fn with_project_ids(self, ids: &HashMap<String, String>) -> DomainResult<Self> {
        let conditions = self
            .conditions
            .into_iter()
            .map(|condition| match condition {
                Condition::Project(ProjectSelector::Names(names)) => names
                    .into_iter()
                    .map(|name| {
                        ids.get(&name)
                            .cloned()
                            .ok_or_else(|| DomainError::not_found("Project", "name", name))
                    })
                    .collect::<DomainResult<Vec<_>>>()
                    .map(|ids| Condition::Project(ProjectSelector::Ids(ids))),
                other => Ok(other),
            })
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(Self { conditions })
    }
}

/// Compile raw filter input into a [`MetricFilter`].
pub fn compile(raw: &RawFilter) -> DomainResult<MetricFilter> {
    let directives: HashMap<&str, Comparison> = raw
        .comparisons
        .iter()
        .map(|d| (strip_tag_prefix(&d.field), Comparison::parse(&d.comparison_type)))
        .collect();

    let mut filter = MetricFilter::all();

    for (key, values) in &raw.fields {
        let values: Vec<&str> = values
            .iter()
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .collect();
        if values.is_empty() {
            continue;
        }

        let comparison = directives
            .get(strip_tag_prefix(key))
            .copied()
            .unwrap_or(Comparison::Equal);

        match key.as_str() {
            "startDate" => {
                for v in &values {
                    filter.push(Condition::StartTime(TimePredicate::AtLeast(time(key, v)?)));
                }
            }
            "endDate" => {
                for v in &values {
                    filter.push(Condition::EndTime(TimePredicate::AtMost(time(key, v)?)));
                }
            }
            "operation" => compile_operation(&mut filter, comparison, &values),
            "duration" => compile_duration(&mut filter, key, comparison, &values)?,
            "startTime" => {
                for predicate in time_predicates(key, comparison, &values)? {
                    filter.push(Condition::StartTime(predicate));
                }
            }
            "endTime" => {
                for predicate in time_predicates(key, comparison, &values)? {
                    filter.push(Condition::EndTime(predicate));
                }
            }
            "project" => {
                let names = equality_values(comparison, &values);
                if !names.is_empty() {
                    filter.push(Condition::Project(ProjectSelector::Names(names)));
                }
            }
            _ => compile_tag(&mut filter, key, comparison, &values)?,
        }
    }

    Ok(filter)
}

fn strip_tag_prefix(key: &str) -> &str {
    key.strip_prefix(TAG_PREFIX).unwrap_or(key)
}

/// Values for an equality/membership test: `in` splits on commas, multiple
/// raw values are a membership test in their own right.
fn equality_values(comparison: Comparison, values: &[&str]) -> Vec<String> {
    if comparison == Comparison::In {
        values
            .iter()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect()
    } else {
        values.iter().map(|v| v.to_string()).collect()
    }
}

fn number(field: &str, value: &str) -> DomainResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| DomainError::validation(field, format!("'{}' is not a number", value)))
}

fn time(field: &str, value: &str) -> DomainResult<DateTime<Utc>> {
    parse_timestamp(value)
        .ok_or_else(|| DomainError::validation(field, format!("'{}' is not a valid date", value)))
}

fn compile_operation(filter: &mut MetricFilter, comparison: Comparison, values: &[&str]) {
    if comparison == Comparison::StringContains {
        for v in values {
            filter.push(Condition::Operation(TextPredicate::Contains(v.to_string())));
        }
        return;
    }
    let names = equality_values(comparison, values);
    if !names.is_empty() {
        filter.push(Condition::Operation(TextPredicate::OneOf(names)));
    }
}

fn compile_duration(
    filter: &mut MetricFilter,
    key: &str,
    comparison: Comparison,
    values: &[&str],
) -> DomainResult<()> {
    match comparison {
        Comparison::GreaterThan => {
            for v in values {
                filter.push(Condition::Duration(NumberPredicate::GreaterThan(number(key, v)?)));
            }
        }
        Comparison::LowerThan => {
            for v in values {
                filter.push(Condition::Duration(NumberPredicate::LowerThan(number(key, v)?)));
            }
        }
        _ => {
            let numbers = equality_values(comparison, values)
                .iter()
                .map(|v| number(key, v))
                .collect::<DomainResult<Vec<_>>>()?;
            if !numbers.is_empty() {
                filter.push(Condition::Duration(NumberPredicate::OneOf(numbers)));
            }
        }
    }
    Ok(())
}

fn time_predicates(
    key: &str,
    comparison: Comparison,
    values: &[&str],
) -> DomainResult<Vec<TimePredicate>> {
    match comparison {
        Comparison::GreaterThan => values
            .iter()
            .map(|v| time(key, v).map(TimePredicate::After))
            .collect(),
        Comparison::LowerThan => values
            .iter()
            .map(|v| time(key, v).map(TimePredicate::Before))
            .collect(),
        _ => {
            let times = equality_values(comparison, values)
                .iter()
                .map(|v| time(key, v))
                .collect::<DomainResult<Vec<_>>>()?;
            Ok(if times.is_empty() {
                Vec::new()
            } else {
                vec![TimePredicate::OneOf(times)]
            })
        }
    }
}

fn compile_tag(
    filter: &mut MetricFilter,
    raw_key: &str,
    comparison: Comparison,
    values: &[&str],
) -> DomainResult<()> {
    let key = strip_tag_prefix(raw_key);
    validate_tag_key(key).map_err(|e| DomainError::validation(raw_key, e))?;

    let mut push = |predicate: TagPredicate| {
        filter.push(Condition::Tag {
            key: key.to_string(),
            predicate,
        })
    };

    match comparison {
        Comparison::GreaterThan => {
            for v in values {
                push(TagPredicate::GreaterThan(number(raw_key, v)?));
            }
        }
        Comparison::LowerThan => {
            for v in values {
                push(TagPredicate::LowerThan(number(raw_key, v)?));
            }
        }
        Comparison::StringContains => {
            for v in values {
                push(TagPredicate::Contains(v.to_string()));
            }
        }
        Comparison::Equal | Comparison::In => {
            let listed = equality_values(comparison, values);
            if !listed.is_empty() {
                push(TagPredicate::OneOf(listed));
            }
        }
    }
    Ok(())
}
