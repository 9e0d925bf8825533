//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI 3.1 spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the Bearer token security scheme to the OpenAPI spec.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Bearer token authentication. Accepted tokens are set via DM_API_AUTH_TOKENS.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Assembled OpenAPI spec for the catalogue API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Digital Marketplace API",
        version = "0.1.0",
        description = "Catalogue API for the Digital Marketplace: procurement frameworks, suppliers, published and draft services, user accounts, and the audit log.\n\nRequest bodies are validated against the JSON schema for their framework and lot. Service and draft validation failures return HTTP 400 with a field error map under `error.details`; supplier, contact and user documents return HTTP 400 with the first violation in `error.message`.\n\nAuthentication: Bearer token via `Authorization: Bearer <token>` header. Health probes (`/health/*`) are unauthenticated.",
        license(name = "MIT"),
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        // ── Frameworks ──────────────────────────────────────────────────
        crate::routes::frameworks::list_frameworks,
        crate::routes::frameworks::get_framework,
        crate::routes::frameworks::update_framework,
        crate::routes::frameworks::framework_stats,
        crate::routes::frameworks::framework_suppliers,
        crate::routes::frameworks::framework_interest,
        // ── Suppliers ───────────────────────────────────────────────────
        crate::routes::suppliers::list_suppliers,
        crate::routes::suppliers::get_supplier,
        crate::routes::suppliers::create_supplier,
        crate::routes::suppliers::import_supplier,
        crate::routes::suppliers::update_contact_information,
        crate::routes::suppliers::get_supplier_framework,
        crate::routes::suppliers::register_framework_interest,
        crate::routes::suppliers::update_supplier_framework,
        crate::routes::suppliers::set_declaration,
        // ── Services ────────────────────────────────────────────────────
        crate::routes::services::get_service,
        crate::routes::services::import_service,
        crate::routes::services::update_service,
        crate::routes::services::update_service_status,
        // ── Draft services ──────────────────────────────────────────────
        crate::routes::drafts::create_draft,
        crate::routes::drafts::list_drafts,
        crate::routes::drafts::get_draft,
        crate::routes::drafts::update_draft,
        crate::routes::drafts::complete_draft,
        crate::routes::drafts::delete_draft,
        // ── Users ───────────────────────────────────────────────────────
        crate::routes::users::create_user,
        crate::routes::users::get_user,
        crate::routes::users::auth_user,
        // ── Audit ───────────────────────────────────────────────────────
        crate::routes::audit::list_audit_events,
    ),
    components(
        schemas(
            // ── State record types ──────────────────────────────────────
            crate::state::FrameworkRecord,
            crate::state::LotRecord,
            crate::state::SupplierRecord,
            crate::state::ContactInformation,
            crate::state::AuditEventRecord,
            // ── Error types ─────────────────────────────────────────────
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            // ── Framework DTOs ──────────────────────────────────────────
            crate::routes::frameworks::FrameworkListResponse,
            crate::routes::frameworks::FrameworkResponse,
            crate::routes::frameworks::FrameworkStats,
            crate::routes::frameworks::ServiceCount,
            crate::routes::frameworks::InterestedSupplierCount,
            crate::routes::frameworks::SupplierUserCount,
            crate::routes::frameworks::SupplierFrameworksResponse,
            crate::routes::frameworks::InterestedSuppliersResponse,
            // ── Supplier DTOs ───────────────────────────────────────────
            crate::routes::suppliers::SupplierFrameworkView,
            crate::routes::suppliers::SupplierListResponse,
            crate::routes::suppliers::SupplierResponse,
            crate::routes::suppliers::ContactInformationResponse,
            crate::routes::suppliers::FrameworkInterestResponse,
            crate::routes::suppliers::DeclarationResponse,
            // ── Service and draft DTOs ──────────────────────────────────
            crate::routes::services::ServiceResponse,
            crate::routes::drafts::DraftResponse,
            crate::routes::drafts::DraftListResponse,
            crate::routes::drafts::DeletedResponse,
            // ── User DTOs ───────────────────────────────────────────────
            crate::routes::users::UserView,
            crate::routes::users::UserSupplier,
            crate::routes::users::UserResponse,
            // ── Audit DTOs ──────────────────────────────────────────────
            crate::routes::audit::AuditEventListResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "frameworks", description = "Procurement frameworks, lifecycle updates, and application statistics"),
        (name = "suppliers", description = "Supplier directory, contact details, framework interest, and declarations"),
        (name = "services", description = "Published services, imported and edited under strict schema validation"),
        (name = "draft-services", description = "Draft services, edited page by page and completed under strict validation"),
        (name = "users", description = "User accounts and password authentication"),
        (name = "audit", description = "Audit log of catalogue mutations"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
///
/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generates_successfully() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Digital Marketplace API");
    }

    #[test]
    fn test_openapi_spec_has_catalogue_paths() {
        let spec = ApiDoc::openapi();
        for path in [
            "/frameworks",
            "/frameworks/{slug}/stats",
            "/suppliers/{id}/frameworks/{slug}/declaration",
            "/services/{id}",
            "/draft-services/{id}/complete",
            "/users/auth",
            "/audit-events",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing path {path}");
        }
    }

    #[test]
    fn test_openapi_spec_has_security_scheme() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
