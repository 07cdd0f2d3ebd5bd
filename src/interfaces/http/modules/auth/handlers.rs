//! Authentication API handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};

use super::dto::{
    ChangePasswordRequest, CurrentUserResponse, LoginRequest, LoginResponse, RegisterRequest,
    UserInfo,
};
use crate::application::{Identity, IdentityService};
use crate::interfaces::http::common::{ApiResponse, ApiResult, EmptyData, ValidatedJson};

#[derive(Clone)]
pub struct AuthHandlerState {
    pub identity: Arc<IdentityService>,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserInfo>),
        (status = 400, description = "Validation error or email already registered")
    )
)]
pub async fn register(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UserInfo>>)> {
    let user = state
        .identity
        .register(&request.email, &request.password)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user.into()))))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful login", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<ApiResponse<LoginResponse>>> {
    let token = state
        .identity
        .login(&request.email, &request.password)
        .await?;
    Ok(Json(ApiResponse::success(token.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Authentication",
    responses(
        (status = 200, description = "Current caller", body = ApiResponse<CurrentUserResponse>),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(state): State<AuthHandlerState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<ApiResponse<CurrentUserResponse>>> {
    let user = state.identity.current_user(&identity).await?;
    Ok(Json(ApiResponse::success(CurrentUserResponse {
        auth_enabled: state.identity.policy().is_enforced(),
        user: user.map(UserInfo::from),
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/change-password",
    tag = "Authentication",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<EmptyData>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Current password is wrong"),
        (status = 403, description = "No authenticated user")
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(state): State<AuthHandlerState>,
    Extension(identity): Extension<Identity>,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<Json<ApiResponse<EmptyData>>> {
    state
        .identity
        .change_password(&identity, &request.current_password, &request.new_password)
        .await?;
    Ok(Json(ApiResponse::success(EmptyData {})))
}
