//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps errors from `dmp-core` and `dmp-schema` to HTTP status codes and
//! returns JSON bodies with an error code, message, and optional details.
//! Schema validation failures carry their error map under `details`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dmp_schema::{ErrorMap, SchemaValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Field error map for schema validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// A request value failed a domain rule (400).
    #[error("validation error: {0}")]
    Validation(String),

    /// The request document failed schema validation (400).
    #[error("invalid document: {} error(s)", .0.len())]
    InvalidDocument(ErrorMap),

    /// Request body could not be parsed or has the wrong shape (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Credentials presented but rejected (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) | Self::InvalidDocument(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Fail with the error map unless it is empty.
    pub fn check_document(errors: ErrorMap) -> Result<(), AppError> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self::InvalidDocument(errors))
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let details = match &self {
            Self::InvalidDocument(errors) => serde_json::to_value(errors).ok(),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<dmp_core::ValidationError> for AppError {
    fn from(err: dmp_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Schema failures raised while handling a request. Load and lookup
/// failures mean the server is misconfigured; the rest are client errors.
impl From<SchemaValidationError> for AppError {
    fn from(err: SchemaValidationError) -> Self {
        match &err {
            SchemaValidationError::ValidationFailed { .. }
            | SchemaValidationError::InvalidDecimal { .. } => Self::Validation(err.to_string()),
            _ => Self::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmp_schema::FieldError;

    #[test]
    fn not_found_status_code() {
        let err = AppError::NotFound("framework biscuits".to_string());
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "NOT_FOUND");
    }

    #[test]
    fn validation_is_bad_request() {
        let err = AppError::Validation("bad status".to_string());
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "VALIDATION_ERROR");

        let err = AppError::InvalidDocument(ErrorMap::new());
        assert_eq!(err.status_and_code().0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn auth_status_codes() {
        assert_eq!(
            AppError::Unauthorized("x".into()).status_and_code(),
            (StatusCode::UNAUTHORIZED, "UNAUTHORIZED")
        );
        assert_eq!(
            AppError::Forbidden("x".into()).status_and_code(),
            (StatusCode::FORBIDDEN, "FORBIDDEN")
        );
    }

    #[test]
    fn conflict_status_code() {
        let err = AppError::Conflict("email taken".to_string());
        assert_eq!(err.status_and_code(), (StatusCode::CONFLICT, "CONFLICT"));
    }

    #[test]
    fn check_document_passes_empty_maps() {
        assert!(AppError::check_document(ErrorMap::new()).is_ok());
        let mut errors = ErrorMap::new();
        errors.insert("serviceName", FieldError::AnswerRequired);
        assert!(matches!(
            AppError::check_document(errors),
            Err(AppError::InvalidDocument(_))
        ));
    }

    #[test]
    fn schema_load_errors_are_internal() {
        let err = AppError::from(SchemaValidationError::SchemaNotLoaded("users".into()));
        assert!(matches!(err, AppError::Internal(_)));

        let err = AppError::from(SchemaValidationError::InvalidDecimal {
            field: "priceMin".into(),
            value: "\"ten\"".into(),
        });
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn core_validation_error_converts() {
        let err = AppError::from(dmp_core::ValidationError::InvalidServiceId("bad id".into()));
        match &err {
            AppError::Validation(msg) => assert!(msg.contains("bad id"), "got: {msg}"),
            other => panic!("expected Validation, got: {other:?}"),
        }
    }

    // ── into_response tests ──────────────────────────────────────

    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn into_response_invalid_document_carries_details() {
        let mut errors = ErrorMap::new();
        errors.insert("priceMax", FieldError::MaxLessThanMin);
        errors.push_form_error("priceUnit_required");

        let (status, body) = response_parts(AppError::InvalidDocument(errors)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.code, "VALIDATION_ERROR");
        let details = body.error.details.unwrap();
        assert_eq!(details["priceMax"], "max_less_than_min");
        assert_eq!(details["_form"][0], "priceUnit_required");
    }

    #[tokio::test]
    async fn into_response_bad_request_has_no_details() {
        let (status, body) = response_parts(AppError::BadRequest("malformed".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.code, "BAD_REQUEST");
        assert!(body.error.message.contains("malformed"));
        assert!(body.error.details.is_none());
    }

    #[tokio::test]
    async fn into_response_internal_hides_details() {
        let (status, body) =
            response_parts(AppError::Internal("schema not loaded: users".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(body.error.details.is_none());
    }
}
