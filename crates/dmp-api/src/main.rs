//! # dmp-api — Binary Entry Point
//!
//! Loads the schema registry, then starts the Axum HTTP server for the
//! catalogue API. Binds to a configurable port (default 8080).

use std::path::PathBuf;
use std::sync::Arc;

use dmp_api::auth::AuthConfig;
use dmp_api::state::AppConfig;
use dmp_api::AppState;
use dmp_schema::SchemaRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Build configuration from environment.
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let auth_tokens = std::env::var("DM_API_AUTH_TOKENS")
        .map(|list| AuthConfig::from_token_list(&list).tokens)
        .unwrap_or_default();
    let schemas_path = std::env::var("DM_SCHEMAS_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./json_schemas"));
    let base_url = std::env::var("DM_API_BASE_URL")
        .unwrap_or_else(|_| format!("http://localhost:{port}"));
    let page_size: usize = std::env::var("DM_PAGE_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(100);
    let config = AppConfig {
        port,
        auth_tokens,
        schemas_path,
        base_url,
        page_size,
    };
    tracing::debug!(?config, "configuration loaded");

    // Load every schema before binding; a broken schema stops startup.
    let registry = SchemaRegistry::load(&config.schemas_path).map_err(|e| {
        tracing::error!("Schema registry failed to load: {e}");
        e
    })?;
    tracing::info!(
        schemas = registry.schema_count(),
        path = %config.schemas_path.display(),
        "schema registry loaded"
    );

    // Initialize database pool (optional; absent means in-memory only).
    let db_pool = dmp_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let state = AppState::new(Arc::new(registry), config).with_db_pool(db_pool);

    // Hydrate in-memory stores from database (if connected).
    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    let app = dmp_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Digital Marketplace API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
