//! # Authentication Middleware
//!
//! Bearer token authentication against a static list of accepted tokens.
//!
//! ```text
//! Authorization: Bearer {token}
//! ```
//!
//! A request without a bearer token is rejected with 401; a request whose
//! token is not on the list is rejected with 403. When no tokens are
//! configured authentication is disabled.

use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;

use crate::error::{ErrorBody, ErrorDetail};

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token values to prevent credential leakage in logs.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub tokens: Vec<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("tokens", &self.tokens.iter().map(|_| "[REDACTED]").collect::<Vec<_>>())
            .finish()
    }
}

impl AuthConfig {
    /// Parse a colon-separated token list, ignoring empty entries.
    pub fn from_token_list(list: &str) -> Self {
        Self {
            tokens: list
                .split(':')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Whether requests must present a token.
    pub fn is_enabled(&self) -> bool {
        !self.tokens.is_empty()
    }

    /// Whether `provided` is one of the accepted tokens.
    ///
    /// Every configured token is compared so timing does not reveal which
    /// entry matched.
    pub fn accepts(&self, provided: &str) -> bool {
        self.tokens
            .iter()
            .fold(false, |matched, expected| {
                constant_time_token_eq(provided, expected) | matched
            })
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer tokens.
///
/// When lengths differ, performs a dummy comparison to avoid leaking length
/// information through timing variance.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Check the Bearer token in the Authorization header.
pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or_default();

    if !config.is_enabled() {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let rejection = match auth_header.and_then(|value| value.strip_prefix("Bearer ")) {
        Some(provided) if config.accepts(provided.trim()) => None,
        Some(_) => {
            tracing::warn!("authentication failed: unknown bearer token");
            Some((StatusCode::FORBIDDEN, "FORBIDDEN", "invalid bearer token"))
        }
        None if auth_header.is_some() => {
            tracing::warn!("authentication failed: non-Bearer authorization scheme");
            Some((
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "authorization header must use Bearer scheme",
            ))
        }
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            Some((
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "missing authorization header",
            ))
        }
    };

    match rejection {
        None => next.run(request).await,
        Some((status, code, message)) => error_response(status, code, message),
    }
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (status, Json(body)).into_response()
}
