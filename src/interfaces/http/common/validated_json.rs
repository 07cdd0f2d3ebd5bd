//! `Json<T>` plus `validator` rules.
//!
//! Malformed bodies and rule violations both come back as 400 with the
//! usual `ApiResponse` envelope. Violations are listed as sorted
//! `path: message` pairs joined by `; `, where nested structs and lists
//! contribute dotted and indexed paths (`filter.comparisons[1]: ...`).

use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use super::ApiError;

/// ```ignore
/// #[derive(Deserialize, Validate)]
/// struct CreateProject {
///     #[validate(length(min = 1, max = 100))]
///     name: String,
/// }
///
/// async fn create(ValidatedJson(body): ValidatedJson<CreateProject>) { /* ... */ }
/// ```
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                format!("Invalid JSON: {}", rejection.body_text()),
            )
        })?;

        value
            .validate()
            .map_err(|errors| ApiError::new(StatusCode::BAD_REQUEST, describe(&errors)))?;

        Ok(ValidatedJson(value))
    }
}

fn describe(errors: &ValidationErrors) -> String {
    let mut lines = Vec::new();
    collect("", errors, &mut lines);
    lines.sort();
    if lines.is_empty() {
        "Validation failed".to_string()
    } else {
        lines.join("; ")
    }
}

fn collect(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    format!("{}: {}", path, msg)
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}
