//! # dmp-api — Axum API Services
//!
//! The HTTP service for the Digital Marketplace catalogue, built on
//! Axum/Tower/Tokio. Every request body that describes a catalogue record
//! is validated against the schema registry from `dmp-schema`, and
//! service and draft validation failures are returned as field error
//! maps. Supplier and user documents fail with the first violation.
//!
//! ## Routers
//!
//! - `/frameworks/*` — frameworks, status updates, application stats
//! - `/suppliers/*` — supplier directory, contacts, framework interest
//! - `/services/*` — published services
//! - `/draft-services/*` — draft services
//! - `/users/*` — accounts and authentication
//! - `/audit-events` — audit log
//! - `/openapi.json` — generated OpenAPI spec
//! - `/health/*` — health probes (unauthenticated)
//!
//! ## Middleware Stack (Tower)
//!
//! TraceLayer → AuthLayer
//!
//! ## Crate Policy
//!
//! - All errors map to structured HTTP responses via `AppError`.
//! - The schema registry is loaded once before the server binds and is
//!   never modified afterwards.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod pagination;
pub mod password;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use state::{AppConfig, AppState};

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;

/// Build the application router with all routes and middleware.
///
/// Health probes (`/health/*`) are mounted outside the auth middleware so
/// they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        tokens: state.config.auth_tokens.clone(),
    };
    if !auth_config.is_enabled() {
        tracing::warn!("no API tokens configured, authentication is disabled");
    }

    let api = Router::new()
        .merge(routes::frameworks::router())
        .merge(routes::suppliers::router())
        .merge(routes::services::router())
        .merge(routes::drafts::router())
        .merge(routes::users::router())
        .merge(routes::audit::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    let unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// Liveness probe — the process is up.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — schemas are loaded and the database, when
/// configured, answers.
///
/// Returns 200 with the loaded schema count, or 503 with a diagnostic.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let schemas = state.registry.schema_count();
    if schemas == 0 {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "no schemas loaded", "schemas": 0})),
        );
    }

    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "database unreachable", "schemas": schemas})),
            );
        }
    }

    (
        StatusCode::OK,
        Json(json!({"status": "ready", "schemas": schemas})),
    )
}
