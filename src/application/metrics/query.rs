//! Metric queries

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::domain::metric::compile;
use crate::domain::{DomainError, DomainResult, Metric, RawFilter, RepositoryProvider};

pub struct MetricQueryService {
    repos: Arc<dyn RepositoryProvider>,
}

impl MetricQueryService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Compile `raw`, resolve project names to ids and run the query.
    ///
    /// An unknown project name fails with `NotFound` rather than yielding
    /// an empty list.
    pub async fn query(&self, raw: &RawFilter) -> DomainResult<Vec<Metric>> {
        let filter = compile(raw)?;

        let mut ids = HashMap::new();
        for name in filter.project_names() {
            let project = self
                .repos
                .projects()
                .find_by_name(name)
                .await?
                .ok_or_else(|| DomainError::not_found("Project", "name", name))?;
            ids.insert(name.to_string(), project.id);
        }
        let filter = filter.with_project_ids(&ids)?;

        let metrics = self.repos.metrics().find(&filter).await?;
        debug!(
            conditions = filter.conditions().len(),
            results = metrics.len(),
            "Metric query executed"
        );
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewMetric, NewProject, Tags};
    use crate::infrastructure::database::repositories::SeaOrmRepositoryProvider;
    use crate::infrastructure::database::test_connection;
    use chrono::{TimeZone, Utc};

    async fn setup() -> MetricQueryService {
        let repos = Arc::new(SeaOrmRepositoryProvider::new(test_connection().await));
        for name in ["checkout", "billing"] {
            let project = repos
                .projects()
                .create(NewProject {
                    name: name.into(),
                    api_key: format!("key-{}", name),
                    owner_id: None,
                })
                .await
                .unwrap();
            for day in [1, 2] {
                repos
                    .metrics()
                    .insert(NewMetric {
                        project_id: project.id.clone(),
                        operation: format!("{}-op", name),
                        start_time: Utc.with_ymd_and_hms(2024, 8, day, 0, 0, 0).unwrap(),
                        end_time: Utc.with_ymd_and_hms(2024, 8, day, 0, 0, 1).unwrap(),
                        duration: 1000.0,
                        tags: Tags::new(),
                    })
                    .await
                    .unwrap();
            }
        }
        MetricQueryService::new(repos)
    }

    #[tokio::test]
    async fn project_name_selects_its_metrics() {
        let svc = setup().await;
        let found = svc
            .query(&RawFilter::new().with("project", "billing"))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|m| m.operation == "billing-op"));
    }

    #[tokio::test]
    async fn unknown_project_is_an_error_not_an_empty_list() {
        let svc = setup().await;
        let result = svc.query(&RawFilter::new().with("project", "ghost")).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn no_filters_returns_everything() {
        let svc = setup().await;
        assert_eq!(svc.query(&RawFilter::new()).await.unwrap().len(), 4);
    }
}
