//! Authentication middleware for Axum
//!
//! Three independent gates:
//! - `bearer_auth_middleware` resolves an `Identity` through the
//!   configured [`AuthPolicy`] for user-scoped routes;
//! - `api_key_middleware` resolves the ingesting [`Project`] from the
//!   `X-Api-Key` header or a `token` field in the JSON body;
//! - `basic_auth_middleware` guards the documentation and demo pages.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine;
use tracing::debug;

use super::common::ApiError;
use crate::application::{AuthPolicy, ProjectService};
use crate::domain::Project;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Largest ingest body buffered while looking for a `token` field
const MAX_TOKEN_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct BearerAuthState {
    pub policy: Arc<AuthPolicy>,
}

#[derive(Clone)]
pub struct ApiKeyState {
    pub projects: Arc<ProjectService>,
}

#[derive(Clone)]
pub struct BasicAuthState {
    pub username: String,
    pub password: String,
}

/// Project resolved from an ingest API key
#[derive(Clone, Debug)]
pub struct AuthenticatedProject(pub Project);

fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

fn unauthorized(message: &str) -> Response {
    ApiError::new(StatusCode::UNAUTHORIZED, message).into_response()
}

/// Bearer-token middleware for user-scoped routes
pub async fn bearer_auth_middleware(
    State(state): State<BearerAuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_token);

    match state.policy.authenticate(bearer) {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// API-key middleware for the ingest route
pub async fn api_key_middleware(
    State(state): State<ApiKeyState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let header_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(String::from);

    let (api_key, mut request) = match header_key {
        Some(key) => (Some(key), request),
        None => {
            let (parts, body) = request.into_parts();
            let bytes = match to_bytes(body, MAX_TOKEN_BODY_BYTES).await {
                Ok(bytes) => bytes,
                Err(_) => {
                    return ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
                        .into_response()
                }
            };
            let key = body_token(&bytes);
            (key, Request::from_parts(parts, Body::from(bytes)))
        }
    };

    let Some(api_key) = api_key else {
        return unauthorized("Missing API key");
    };

    match state.projects.authenticate_key(&api_key).await {
        Ok(project) => {
            debug!(project_id = %project.id, "API key accepted");
            request.extensions_mut().insert(AuthenticatedProject(project));
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

fn body_token(bytes: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    value.get("token")?.as_str().map(String::from)
}

/// HTTP basic auth for the docs surface
pub async fn basic_auth_middleware(
    State(state): State<BasicAuthState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Basic "))
        .and_then(|encoded| base64::engine::general_purpose::STANDARD.decode(encoded).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok())
        .is_some_and(|credentials| {
            credentials.split_once(':')
                == Some((state.username.as_str(), state.password.as_str()))
        });

    if authorized {
        return next.run(request).await;
    }

    let mut response = unauthorized("Authentication required");
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"opmetrics docs\""),
    );
    response
}
