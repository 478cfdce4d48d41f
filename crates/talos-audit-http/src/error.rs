//! Maps [`DomainError`] to HTTP status codes and response bodies. Kept
//! outside `talos-audit-core` so the core stays transport-agnostic.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use talos_audit_core::DomainError;

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ApiErrorBody {
    Structured { detail: ErrorDetail },
    Simple { detail: String },
}

/// Newtype so we can implement `IntoResponse` for a foreign error type.
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            DomainError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody::Structured {
                    detail: ErrorDetail { code: "TALOS_VALIDATION_ERROR".into(), message: message.clone() },
                },
            ),
            DomainError::Conflict(message) => {
                (StatusCode::CONFLICT, ApiErrorBody::Simple { detail: message.clone() })
            }
            DomainError::NotFound(message) => {
                (StatusCode::NOT_FOUND, ApiErrorBody::Simple { detail: message.clone() })
            }
            DomainError::Internal(message) => {
                tracing::error!(error = %message, "internal error serving request");
                (StatusCode::INTERNAL_SERVER_ERROR, ApiErrorBody::Simple { detail: "internal error".into() })
            }
        };
        (status, Json(body)).into_response()
    }
}
