//! SeaORM implementation of MetricRepository
//!
//! Tags live in a JSON text column; tag conditions are rendered with
//! SQLite's JSON1 functions. Substring conditions are applied to the
//! fetched rows instead: SQLite's `LOWER()` only folds ASCII, so the
//! case-insensitive match has to use Rust's Unicode lowercasing on both
//! sides.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    Value,
};

use crate::domain::metric::{
    Condition, Metric, MetricFilter, MetricRepository, NewMetric, NumberPredicate,
    ProjectSelector, TagPredicate, Tags, TextPredicate, TimePredicate,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::metric;

/// Canonical text of a tag: booleans as `true`/`false`, everything else
/// cast from its JSON value. Binds the tag path twice.
const TAG_TEXT_SQL: &str = concat!(
    r#"CASE json_type("tags", ?) WHEN 'true' THEN 'true' WHEN 'false' THEN 'false' "#,
    r#"ELSE CAST(json_extract("tags", ?) AS TEXT) END"#,
);

pub struct SeaOrmMetricRepository {
    db: DatabaseConnection,
}

impl SeaOrmMetricRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn metric_from_model(model: metric::Model) -> DomainResult<Metric> {
    let tags: Tags = serde_json::from_str(&model.tags)
        .map_err(|e| DomainError::Internal(format!("Corrupt tags on metric {}: {}", model.id, e)))?;

    Ok(Metric {
        id: model.id,
        project_id: model.project_id,
        operation: model.operation,
        start_time: model.start_time,
        end_time: model.end_time,
        duration: model.duration,
        tags,
        created_at: model.created_at,
    })
}

fn tag_path(key: &str) -> String {
    format!("$.\"{}\"", key)
}

fn tag_text(key: &str) -> SimpleExpr {
    let path = tag_path(key);
    Expr::cust_with_values(TAG_TEXT_SQL, [path.clone(), path])
}

fn tag_numeric(key: &str, op: &str, bound: f64) -> SimpleExpr {
    let path = tag_path(key);
    let values: Vec<Value> = vec![path.clone().into(), path.into(), bound.into()];
    Expr::cust_with_values(
        format!(
            r#"(json_type("tags", ?) IN ('integer', 'real') AND json_extract("tags", ?) {} ?)"#,
            op
        ),
        values,
    )
}

fn time_expr(column: metric::Column, predicate: &TimePredicate) -> SimpleExpr {
    match predicate {
        TimePredicate::OneOf(times) => column.is_in(times.iter().copied()),
        TimePredicate::AtLeast(t) => column.gte(*t),
        TimePredicate::AtMost(t) => column.lte(*t),
        TimePredicate::After(t) => column.gt(*t),
        TimePredicate::Before(t) => column.lt(*t),
    }
}

/// Case-insensitive substring match with Unicode folding.
fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Substring conditions, checked against a fetched record.
fn matches_in_process(metric: &Metric, condition: &Condition) -> bool {
    match condition {
        Condition::Operation(TextPredicate::Contains(needle)) => {
            contains_folded(&metric.operation, needle)
        }
        Condition::Tag {
            key,
            predicate: TagPredicate::Contains(needle),
        } => metric
            .tags
            .get(key)
            .is_some_and(|value| contains_folded(&value.to_string(), needle)),
        _ => true,
    }
}

/// Render one filter condition as SQL. `None` for conditions checked by
/// [`matches_in_process`].
fn condition_expr(condition: &Condition) -> DomainResult<Option<SimpleExpr>> {
    let expr = match condition {
        Condition::Operation(TextPredicate::OneOf(names)) => {
            metric::Column::Operation.is_in(names.iter().cloned())
        }
        Condition::Operation(TextPredicate::Contains(_)) => return Ok(None),
        Condition::Duration(NumberPredicate::OneOf(values)) => {
            metric::Column::Duration.is_in(values.iter().copied())
        }
        Condition::Duration(NumberPredicate::GreaterThan(v)) => metric::Column::Duration.gt(*v),
        Condition::Duration(NumberPredicate::LowerThan(v)) => metric::Column::Duration.lt(*v),
        Condition::StartTime(predicate) => time_expr(metric::Column::StartTime, predicate),
        Condition::EndTime(predicate) => time_expr(metric::Column::EndTime, predicate),
        Condition::Project(ProjectSelector::Ids(ids)) => {
            metric::Column::ProjectId.is_in(ids.iter().cloned())
        }
        Condition::Project(ProjectSelector::Names(names)) => {
            return Err(DomainError::Internal(format!(
                "Project names were not resolved before querying: {:?}",
                names
            )))
        }
        Condition::Tag { key, predicate } => match predicate {
            TagPredicate::OneOf(values) => Expr::expr(tag_text(key)).is_in(values.iter().cloned()),
            TagPredicate::GreaterThan(v) => tag_numeric(key, ">", *v),
            TagPredicate::LowerThan(v) => tag_numeric(key, "<", *v),
            TagPredicate::Contains(_) => return Ok(None),
        },
    };
    Ok(Some(expr))
}

#[async_trait]
impl MetricRepository for SeaOrmMetricRepository {
    async fn insert(&self, new: NewMetric) -> DomainResult<Metric> {
        let tags = serde_json::to_string(&new.tags)
            .map_err(|e| DomainError::Internal(format!("Failed to encode tags: {}", e)))?;

        let model = metric::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            project_id: Set(new.project_id),
            operation: Set(new.operation),
            start_time: Set(new.start_time),
            end_time: Set(new.end_time),
            duration: Set(new.duration),
            tags: Set(tags),
            created_at: Set(Utc::now()),
        };

        let model = model.insert(&self.db).await?;
        metric_from_model(model)
    }

    async fn find(&self, filter: &MetricFilter) -> DomainResult<Vec<Metric>> {
        let mut query = metric::Entity::find();
        for condition in filter.conditions() {
            if let Some(expr) = condition_expr(condition)? {
                query = query.filter(expr);
            }
        }

        let models = query
            .order_by_asc(metric::Column::StartTime)
            .order_by_asc(metric::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let mut metrics = Vec::with_capacity(models.len());
        for model in models {
            let metric = metric_from_model(model)?;
            if filter
                .conditions()
                .iter()
                .all(|condition| matches_in_process(&metric, condition))
            {
                metrics.push(metric);
            }
        }
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metric::{compile, RawFilter, TagValue};
    use crate::domain::project::{NewProject, ProjectRepository};
    use crate::infrastructure::database::repositories::SeaOrmProjectRepository;
    use crate::infrastructure::database::test_connection;
    use chrono::{DateTime, TimeZone};

    struct Fixture {
        repo: SeaOrmMetricRepository,
        project_id: String,
        other_project_id: String,
    }

    async fn fixture() -> Fixture {
        let db = test_connection().await;
        let projects = SeaOrmProjectRepository::new(db.clone());
        let project = |name: &str| NewProject {
            name: name.to_string(),
            api_key: format!("key-{}", name),
            owner_id: None,
        };
        let project_id = projects.create(project("checkout")).await.unwrap().id;
        let other_project_id = projects.create(project("billing")).await.unwrap().id;
        Fixture {
            repo: SeaOrmMetricRepository::new(db),
            project_id,
            other_project_id,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, day, hour, 0, 0).unwrap()
    }

    fn new_metric(
        project_id: &str,
        operation: &str,
        day: u32,
        duration: f64,
        tags: &[(&str, TagValue)],
    ) -> NewMetric {
        NewMetric {
            project_id: project_id.to_string(),
            operation: operation.to_string(),
            start_time: at(day, 10),
            end_time: at(day, 11),
            duration,
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    async fn seed(f: &Fixture) {
        let eu: [(&str, TagValue); 2] = [("region", "eu".into()), ("status", 200.into())];
        let us: [(&str, TagValue); 2] = [("region", "us".into()), ("status", 500.into())];
        let eu_west: [(&str, TagValue); 2] =
            [("region", "EU-west".into()), ("cached", true.into())];
        let ap: [(&str, TagValue); 2] = [("region", "ap".into()), ("status", "n/a".into())];
        let rows = [
            new_metric(&f.project_id, "pay", 1, 120.0, &eu),
            new_metric(&f.project_id, "refund", 5, 80.0, &us),
            new_metric(&f.project_id, "Pay-Retry", 20, 300.0, &eu_west),
            new_metric(&f.other_project_id, "pay", 31, 50.0, &ap),
        ];
        for row in rows {
            f.repo.insert(row).await.unwrap();
        }
    }

    async fn operations(f: &Fixture, raw: RawFilter) -> Vec<String> {
        let filter = compile(&raw).unwrap();
        f.repo
            .find(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.operation)
            .collect()
    }

    #[tokio::test]
    async fn insert_round_trips_tags() {
        let f = fixture().await;
        let stored = f
            .repo
            .insert(new_metric(
                &f.project_id,
                "pay",
                1,
                1.5,
                &[("retries", 3.into()), ("ok", true.into())],
            ))
            .await
            .unwrap();
        let found = f.repo.find(&MetricFilter::all()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, stored.id);
        assert_eq!(found[0].start_time, at(1, 10));
        assert_eq!(found[0].duration, 1.5);
        assert_eq!(found[0].tags["retries"], TagValue::from(3));
        assert_eq!(found[0].tags["ok"], TagValue::Bool(true));
    }

    #[tokio::test]
    async fn empty_filter_returns_all_in_start_order() {
        let f = fixture().await;
        seed(&f).await;
        assert_eq!(
            operations(&f, RawFilter::new()).await,
            vec!["pay", "refund", "Pay-Retry", "pay"]
        );
    }

    #[tokio::test]
    async fn date_range_is_inclusive() {
        let f = fixture().await;
        seed(&f).await;
        let raw = RawFilter::new()
            .with("startDate", "2024-08-05T10:00:00Z")
            .with("endDate", "2024-08-20T11:00:00Z");
        assert_eq!(operations(&f, raw).await, vec!["refund", "Pay-Retry"]);
    }

    #[tokio::test]
    async fn tag_equality_and_membership() {
        let f = fixture().await;
        seed(&f).await;
        assert_eq!(
            operations(&f, RawFilter::new().with("region", "eu")).await,
            vec!["pay"]
        );
        let raw = RawFilter::new()
            .with("region", "us,ap")
            .with_comparison("region", "in");
        assert_eq!(operations(&f, raw).await, vec!["refund", "pay"]);
    }

    #[tokio::test]
    async fn numeric_tag_equality_uses_canonical_text() {
        let f = fixture().await;
        seed(&f).await;
        assert_eq!(
            operations(&f, RawFilter::new().with("status", "500")).await,
            vec!["refund"]
        );
        assert_eq!(
            operations(&f, RawFilter::new().with("cached", "true")).await,
            vec!["Pay-Retry"]
        );
    }

    #[tokio::test]
    async fn numeric_tag_comparison_skips_text_values() {
        let f = fixture().await;
        seed(&f).await;
        let raw = RawFilter::new()
            .with("status", "100")
            .with_comparison("status", "greaterThan");
        assert_eq!(operations(&f, raw).await, vec!["pay", "refund"]);

        let raw = RawFilter::new()
            .with("status", "500")
            .with_comparison("status", "lowerThan");
        assert_eq!(operations(&f, raw).await, vec!["pay"]);
    }

    #[tokio::test]
    async fn string_contains_is_case_insensitive() {
        let f = fixture().await;
        seed(&f).await;
        let raw = RawFilter::new()
            .with("region", "EU")
            .with_comparison("region", "stringContains");
        assert_eq!(operations(&f, raw).await, vec!["pay", "Pay-Retry"]);

        let raw = RawFilter::new()
            .with("operation", "pay")
            .with_comparison("operation", "stringContains");
        assert_eq!(operations(&f, raw).await, vec!["pay", "Pay-Retry", "pay"]);
    }

    #[tokio::test]
    async fn string_contains_folds_non_ascii_case() {
        let f = fixture().await;
        seed(&f).await;
        f.repo
            .insert(new_metric(
                &f.project_id,
                "Überweisung",
                25,
                10.0,
                &[("city", "München".into())],
            ))
            .await
            .unwrap();

        for needle in ["Über", "über", "ÜBERWEISUNG"] {
            let raw = RawFilter::new()
                .with("operation", needle)
                .with_comparison("operation", "stringContains");
            assert_eq!(operations(&f, raw).await, vec!["Überweisung"], "{}", needle);
        }
        for needle in ["MÜNCHEN", "ünch", "Mün"] {
            let raw = RawFilter::new()
                .with("city", needle)
                .with_comparison("city", "stringContains");
            assert_eq!(operations(&f, raw).await, vec!["Überweisung"], "{}", needle);
        }
    }

    #[tokio::test]
    async fn string_contains_skips_records_without_the_tag() {
        let f = fixture().await;
        seed(&f).await;
        let raw = RawFilter::new()
            .with("cached", "TRUE")
            .with_comparison("cached", "stringContains");
        assert_eq!(operations(&f, raw).await, vec!["Pay-Retry"]);
    }

    #[tokio::test]
    async fn like_wildcards_are_literal() {
        let f = fixture().await;
        seed(&f).await;
        let raw = RawFilter::new()
            .with("region", "%")
            .with_comparison("region", "stringContains");
        assert!(operations(&f, raw).await.is_empty());
    }

    #[tokio::test]
    async fn duration_and_operation_conditions_combine() {
        let f = fixture().await;
        seed(&f).await;
        let raw = RawFilter::new()
            .with("operation", "pay")
            .with("duration", "100")
            .with_comparison("duration", "greaterThan");
        assert_eq!(operations(&f, raw).await, vec!["pay"]);
    }

    #[tokio::test]
    async fn project_ids_restrict_results() {
        let f = fixture().await;
        seed(&f).await;
        let mut filter = MetricFilter::all();
        filter.push(Condition::Project(ProjectSelector::Ids(vec![
            f.other_project_id.clone(),
        ])));
        let found = f.repo.find(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].project_id, f.other_project_id);
    }

    #[tokio::test]
    async fn unresolved_project_names_are_rejected() {
        let f = fixture().await;
        let filter = compile(&RawFilter::new().with("project", "checkout")).unwrap();
        assert!(matches!(
            f.repo.find(&filter).await,
            Err(DomainError::Internal(_))
        ));
    }

    #[test]
    fn folding_covers_non_ascii_letters() {
        assert!(contains_folded("Überweisung", "üBER"));
        assert!(contains_folded("ΣΟΦΙΑ", "σοφ"));
        assert!(!contains_folded("50% off", "_"));
    }
}
