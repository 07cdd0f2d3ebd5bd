//! Maps [`DomainError`] onto HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use super::ApiResponse;
use crate::domain::DomainError;

pub type ApiResult<T> = Result<T, ApiError>;

/// A domain error on its way out of a handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Filter endpoints report an unknown project as a bad request.
    pub fn from_filter_error(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { .. } => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            other => other.into(),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::Conflict(msg) => {
                Self::new(StatusCode::BAD_REQUEST, msg)
            }
            DomainError::Unauthorized(msg) => Self::new(StatusCode::UNAUTHORIZED, msg),
            DomainError::Forbidden(msg) => Self::new(StatusCode::FORBIDDEN, msg),
            e @ DomainError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, e.to_string()),
            DomainError::Unavailable(msg) => Self::new(StatusCode::SERVICE_UNAVAILABLE, msg),
            DomainError::Upstream(msg) => {
                error!(error = %msg, "Upstream request failed");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Upstream service request failed",
                )
            }
            DomainError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (DomainError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (DomainError::Conflict("x".into()), StatusCode::BAD_REQUEST),
            (DomainError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (DomainError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (
                DomainError::not_found("Project", "name", "x"),
                StatusCode::NOT_FOUND,
            ),
            (
                DomainError::Unavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                DomainError::Upstream("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                DomainError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn unknown_project_in_filter_is_bad_request() {
        let err = ApiError::from_filter_error(DomainError::not_found("Project", "name", "ghost"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.message.contains("ghost"));
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = ApiError::from(DomainError::Internal("Database error: disk I/O".into()));
        assert_eq!(err.message, "Internal server error");
    }
}
