//! Project API handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{CreateProjectRequest, ProjectResponse};
use crate::application::{Identity, ProjectService};
use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};

#[derive(Clone)]
pub struct ProjectHandlerState {
    pub projects: Arc<ProjectService>,
}

#[utoipa::path(
    post,
    path = "/api/v1/projects",
    tag = "Projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ApiResponse<ProjectResponse>),
        (status = 400, description = "Invalid or duplicate name")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_project(
    State(state): State<ProjectHandlerState>,
    Extension(identity): Extension<Identity>,
    ValidatedJson(request): ValidatedJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ProjectResponse>>)> {
    let project = state.projects.create(&identity, &request.name).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(project.into())),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/projects",
    tag = "Projects",
    responses(
        (status = 200, description = "Projects visible to the caller", body = ApiResponse<Vec<ProjectResponse>>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_projects(
    State(state): State<ProjectHandlerState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<ApiResponse<Vec<ProjectResponse>>>> {
    let projects = state.projects.list(&identity).await?;
    Ok(Json(ApiResponse::success(
        projects.into_iter().map(ProjectResponse::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/regenerate-key",
    tag = "Projects",
    params(("id" = String, Path, description = "Project id")),
    responses(
        (status = 200, description = "New API key issued", body = ApiResponse<ProjectResponse>),
        (status = 403, description = "Caller does not own the project"),
        (status = 404, description = "Project not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn regenerate_key(
    State(state): State<ProjectHandlerState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<ProjectResponse>>> {
    let project = state.projects.regenerate_key(&identity, &id).await?;
    Ok(Json(ApiResponse::success(project.into())))
}
