//! Metric API handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use tracing::debug;

use super::dto::{
    AggregateRequest, AggregateResponse, ChartRequest, ChartResponse, CreateMetricRequest,
    MetricResponse, QuerySuggestionRequest, QuerySuggestionResponse,
};
use crate::application::analytics::{aggregate, render};
use crate::application::metrics::{to_tsv, MetricInput};
use crate::application::{IngestService, MetricQueryService, QuerySuggestionService};
use crate::domain::{Metric, RawFilter};
use crate::interfaces::http::common::{ApiError, ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedProject;

#[derive(Clone)]
pub struct MetricsHandlerState {
    pub ingest: Arc<IngestService>,
    pub query: Arc<MetricQueryService>,
    pub suggestions: Arc<QuerySuggestionService>,
}

impl MetricsHandlerState {
    async fn find(&self, raw: &RawFilter) -> ApiResult<Vec<Metric>> {
        self.query
            .query(raw)
            .await
            .map_err(ApiError::from_filter_error)
    }

    async fn find_by_query(&self, pairs: Vec<(String, String)>) -> ApiResult<Vec<Metric>> {
        let raw = RawFilter::from_query_pairs(pairs)?;
        self.find(&raw).await
    }
}

fn responses(metrics: Vec<Metric>) -> Vec<MetricResponse> {
    metrics.into_iter().map(MetricResponse::from).collect()
}

#[utoipa::path(
    post,
    path = "/api/v1/metrics",
    tag = "Metrics",
    request_body = CreateMetricRequest,
    responses(
        (status = 201, description = "Metric stored", body = ApiResponse<MetricResponse>),
        (status = 400, description = "Invalid metric"),
        (status = 401, description = "Missing or invalid API key")
    ),
    security(("api_key" = []))
)]
pub async fn ingest_metric(
    State(state): State<MetricsHandlerState>,
    Extension(AuthenticatedProject(project)): Extension<AuthenticatedProject>,
    ValidatedJson(request): ValidatedJson<CreateMetricRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<MetricResponse>>)> {
    let input = MetricInput::try_from(request)?;
    let metric = state.ingest.ingest(&project, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(metric.into())),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/metrics",
    tag = "Metrics",
    params(
        ("operation" = Option<String>, Query, description = "Operation name"),
        ("project" = Option<String>, Query, description = "Project name"),
        ("startDate" = Option<String>, Query, description = "Earliest start time"),
        ("endDate" = Option<String>, Query, description = "Latest end time"),
        ("comparisons" = Option<String>, Query, description = "JSON array of {field, comparisonType}")
    ),
    responses(
        (status = 200, description = "Matching metrics ordered by start time", body = ApiResponse<Vec<MetricResponse>>),
        (status = 400, description = "Invalid filter or unknown project")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_metrics(
    State(state): State<MetricsHandlerState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<ApiResponse<Vec<MetricResponse>>>> {
    let metrics = state.find_by_query(pairs).await?;
    debug!(count = metrics.len(), "Metrics query served");
    Ok(Json(ApiResponse::success(responses(metrics))))
}

#[utoipa::path(
    get,
    path = "/api/v1/metrics/export",
    tag = "Metrics",
    responses(
        (status = 200, description = "Tab-separated export", content_type = "text/tab-separated-values", body = String),
        (status = 400, description = "Invalid filter or unknown project")
    ),
    security(("bearer_auth" = []))
)]
pub async fn export_metrics(
    State(state): State<MetricsHandlerState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Response> {
    let metrics = state.find_by_query(pairs).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/tab-separated-values; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"metrics.tsv\"",
            ),
        ],
        to_tsv(&metrics),
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/metrics/aggregate",
    tag = "Metrics",
    request_body = AggregateRequest,
    responses(
        (status = 200, description = "Records and grouped rows", body = ApiResponse<AggregateResponse>),
        (status = 400, description = "Invalid filter or unknown project")
    ),
    security(("bearer_auth" = []))
)]
pub async fn aggregate_metrics(
    State(state): State<MetricsHandlerState>,
    ValidatedJson(request): ValidatedJson<AggregateRequest>,
) -> ApiResult<Json<ApiResponse<AggregateResponse>>> {
    let metrics = state.find(&request.filter.to_raw()?).await?;
    let rows = aggregate(&metrics, &request.aggregation);
    Ok(Json(ApiResponse::success(AggregateResponse {
        records: responses(metrics),
        rows,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/metrics/chart",
    tag = "Metrics",
    request_body = ChartRequest,
    responses(
        (status = 200, description = "Records, rows and chart series", body = ApiResponse<ChartResponse>),
        (status = 400, description = "Invalid filter or unknown project")
    ),
    security(("bearer_auth" = []))
)]
pub async fn chart_metrics(
    State(state): State<MetricsHandlerState>,
    ValidatedJson(request): ValidatedJson<ChartRequest>,
) -> ApiResult<Json<ApiResponse<ChartResponse>>> {
    let metrics = state.find(&request.filter.to_raw()?).await?;
    let rows = aggregate(&metrics, &request.aggregation);
    let chart = render(&rows, &request.graph);
    Ok(Json(ApiResponse::success(ChartResponse {
        records: responses(metrics),
        rows,
        chart,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/metrics/query-suggestion",
    tag = "Metrics",
    request_body = QuerySuggestionRequest,
    responses(
        (status = 200, description = "Suggested query, unvalidated", body = ApiResponse<QuerySuggestionResponse>),
        (status = 500, description = "Provider request failed"),
        (status = 503, description = "Suggestions not configured")
    ),
    security(("bearer_auth" = []))
)]
pub async fn suggest_query(
    State(state): State<MetricsHandlerState>,
    ValidatedJson(request): ValidatedJson<QuerySuggestionRequest>,
) -> ApiResult<Json<ApiResponse<QuerySuggestionResponse>>> {
    let query = state.suggestions.suggest(&request.prompt).await?;
    Ok(Json(ApiResponse::success(QuerySuggestionResponse { query })))
}
