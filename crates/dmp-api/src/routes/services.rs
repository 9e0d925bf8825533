//! # Services API
//!
//! Published services. A service is imported under a known id and edited
//! with partial updates; both are validated strictly against the schema
//! for the service's framework and lot, and failures come back as a field
//! error map.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use dmp_core::payload::{
    display_list, drop_foreign_fields, json_has_matching_id, json_has_required_keys,
    purge_nulls_from_data, strip_whitespace_from_data,
};
use dmp_core::{AuditType, ServiceId, ServiceStatus, SupplierId, Timestamp};
use dmp_schema::{Enforcement, SchemaName};
use serde::Serialize;
use serde_json::{json, Map, Value};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{check_against, extract_object, object_field, updated_by};
use crate::state::{AppState, FrameworkRecord, ServiceRecord, SupplierRecord};

/// Keys describing where a service belongs rather than what it offers.
pub(crate) const IDENTITY_KEYS: [&str; 5] = ["id", "supplierId", "frameworkSlug", "lot", "status"];

/// `{"services": {...}}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceResponse {
    #[schema(value_type = Object)]
    pub services: Map<String, Value>,
}

/// Build the services router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/services/{id}",
            get(get_service).put(import_service).post(update_service),
        )
        .route("/services/{id}/status/{status}", post(update_service_status))
}

/// Supplier, framework, lot and schema a service document points at.
#[derive(Debug)]
pub(crate) struct ServiceTarget {
    pub supplier: SupplierRecord,
    pub framework: FrameworkRecord,
    pub lot: String,
    pub schema: SchemaName,
}

/// Resolve the `supplierId`, `frameworkSlug` and `lot` of a service
/// document. Every lookup failure is a client error.
pub(crate) fn service_target(
    state: &AppState,
    data: &Map<String, Value>,
) -> Result<ServiceTarget, AppError> {
    json_has_required_keys(data, &["supplierId", "frameworkSlug", "lot"])?;

    let supplier_id = data
        .get("supplierId")
        .and_then(Value::as_i64)
        .map(SupplierId)
        .ok_or_else(|| AppError::BadRequest("supplierId must be an integer".to_string()))?;
    let supplier = state
        .suppliers
        .get(&supplier_id)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid supplier ID '{supplier_id}'")))?;

    let slug = data.get("frameworkSlug").and_then(Value::as_str).unwrap_or_default();
    let framework = state
        .framework_by_slug(slug)
        .ok_or_else(|| AppError::BadRequest(format!("Framework '{slug}' does not exist")))?;

    let lot = data.get("lot").and_then(Value::as_str).unwrap_or_default();
    if framework.lot(lot).is_none() {
        let lots: Vec<&str> = framework.lots.iter().map(|l| l.slug.as_str()).collect();
        return Err(AppError::BadRequest(format!(
            "Incorrect lot '{lot}' for framework '{slug}'; must be one of {}",
            display_list(&lots)
        )));
    }

    let schema = SchemaName::for_service(slug, lot).ok_or_else(|| {
        AppError::BadRequest(format!("No schema for framework '{slug}' lot '{lot}'"))
    })?;

    Ok(ServiceTarget {
        supplier,
        lot: lot.to_string(),
        framework,
        schema,
    })
}

/// The response body for a service.
fn service_view(state: &AppState, service: &ServiceRecord) -> Map<String, Value> {
    let mut view = service.document();
    view.insert("status".into(), Value::from(service.status.as_str()));
    view.insert("createdAt".into(), Value::String(service.created_at.to_wire()));
    view.insert("updatedAt".into(), Value::String(service.updated_at.to_wire()));
    if let Some(supplier) = state.suppliers.get(&service.supplier_id) {
        view.insert("supplierName".into(), Value::String(supplier.name));
    }
    view
}

fn parse_service_id(raw: &str) -> Result<ServiceId, AppError> {
    ServiceId::new(raw).map_err(|_| AppError::BadRequest(format!("Invalid service ID supplied: {raw}")))
}

fn find_service(state: &AppState, raw: &str) -> Result<ServiceRecord, AppError> {
    let id = parse_service_id(raw)?;
    state
        .services
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("service {id} not found")))
}

/// Strictly validate a service as stored.
fn check_service(state: &AppState, service: &ServiceRecord) -> Result<(), AppError> {
    let schema = SchemaName::for_service(&service.framework_slug, &service.lot).ok_or_else(|| {
        AppError::BadRequest(format!(
            "No schema for framework '{}' lot '{}'",
            service.framework_slug, service.lot
        ))
    })?;
    check_against(&state.registry, schema, &service.document(), Enforcement::Strict)
}

/// GET /services/{id}
#[utoipa::path(
    get,
    path = "/services/{id}",
    params(("id" = String, Path, description = "Service id")),
    responses(
        (status = 200, description = "Service", body = ServiceResponse),
        (status = 400, description = "Malformed service id", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown service", body = crate::error::ErrorBody),
    ),
    tag = "services"
)]
pub async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ServiceResponse>, AppError> {
    let service = find_service(&state, &id)?;
    Ok(Json(ServiceResponse {
        services: service_view(&state, &service),
    }))
}

/// PUT /services/{id} — Import a complete service.
///
/// The schema is chosen from the document's `frameworkSlug` and `lot`.
/// An existing service with the same id is replaced, keeping its
/// creation time.
#[utoipa::path(
    put,
    path = "/services/{id}",
    params(("id" = String, Path, description = "Service id")),
    responses(
        (status = 201, description = "Service imported", body = ServiceResponse),
        (status = 400, description = "Invalid service", body = crate::error::ErrorBody),
    ),
    tag = "services"
)]
pub async fn import_service(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ServiceResponse>), AppError> {
    let service_id = parse_service_id(&raw_id)?;
    let body = extract_object(body)?;
    let updater = updated_by(&state.registry, &body)?;

    let mut data = object_field(&body, "services")?;
    strip_whitespace_from_data(&mut data);
    purge_nulls_from_data(&mut data);
    json_has_matching_id(&data, &Value::String(service_id.to_string()))?;
    let target = service_target(&state, &data)?;

    let status = match data.get("status").and_then(Value::as_str) {
        Some(raw) => raw.parse::<ServiceStatus>()?,
        None => ServiceStatus::Published,
    };
    let now = Timestamp::now();
    let created_at = state
        .services
        .get(&service_id)
        .map_or(now, |existing| existing.created_at);
    let service = ServiceRecord {
        service_id: service_id.clone(),
        supplier_id: target.supplier.id,
        framework_id: target.framework.id,
        framework_slug: target.framework.slug.clone(),
        lot: target.lot,
        status,
        data: drop_foreign_fields(&data, &IDENTITY_KEYS),
        created_at,
        updated_at: now,
    };
    check_against(&state.registry, target.schema, &service.document(), Enforcement::Strict)?;

    state.services.insert(service_id.clone(), service.clone());
    state
        .record_audit(
            AuditType::ImportService,
            &updater,
            json!({"serviceId": service_id, "supplierId": service.supplier_id}),
            Some(("service", service_id.to_string())),
        )
        .await;
    tracing::info!(service_id = %service_id, schema = %target.schema, "service imported");

    Ok((
        StatusCode::CREATED,
        Json(ServiceResponse {
            services: service_view(&state, &service),
        }),
    ))
}

/// POST /services/{id} — Apply a partial update.
///
/// The update is merged over the stored answers and the whole service is
/// validated again. Identity keys in the update are ignored.
#[utoipa::path(
    post,
    path = "/services/{id}",
    params(("id" = String, Path, description = "Service id")),
    responses(
        (status = 200, description = "Updated service", body = ServiceResponse),
        (status = 400, description = "Invalid update", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown service", body = crate::error::ErrorBody),
    ),
    tag = "services"
)]
pub async fn update_service(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ServiceResponse>, AppError> {
    let mut service = find_service(&state, &raw_id)?;
    let body = extract_object(body)?;
    let updater = updated_by(&state.registry, &body)?;

    let mut update = object_field(&body, "services")?;
    strip_whitespace_from_data(&mut update);
    json_has_matching_id(&update, &Value::String(service.service_id.to_string()))?;
    let update = drop_foreign_fields(&update, &IDENTITY_KEYS);

    service.data.extend(update.clone());
    purge_nulls_from_data(&mut service.data);
    check_service(&state, &service)?;
    service.updated_at = Timestamp::now();

    state.services.insert(service.service_id.clone(), service.clone());
    state
        .record_audit(
            AuditType::UpdateService,
            &updater,
            json!({"serviceId": service.service_id, "update": update}),
            Some(("service", service.service_id.to_string())),
        )
        .await;

    Ok(Json(ServiceResponse {
        services: service_view(&state, &service),
    }))
}

/// POST /services/{id}/status/{status} — Publish, enable or disable.
#[utoipa::path(
    post,
    path = "/services/{id}/status/{status}",
    params(
        ("id" = String, Path, description = "Service id"),
        ("status" = String, Path, description = "`published`, `enabled` or `disabled`"),
    ),
    responses(
        (status = 200, description = "Updated service", body = ServiceResponse),
        (status = 400, description = "Invalid status", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown service", body = crate::error::ErrorBody),
    ),
    tag = "services"
)]
pub async fn update_service_status(
    State(state): State<AppState>,
    Path((raw_id, raw_status)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ServiceResponse>, AppError> {
    let service = find_service(&state, &raw_id)?;
    let status: ServiceStatus = raw_status.parse()?;
    let body = extract_object(body)?;
    let updater = updated_by(&state.registry, &body)?;

    let previous = service.status;
    let service = state
        .services
        .update(&service.service_id, |s| {
            s.status = status;
            s.updated_at = Timestamp::now();
        })
        .ok_or_else(|| AppError::NotFound(format!("service {raw_id} not found")))?;

    state
        .record_audit(
            AuditType::UpdateService,
            &updater,
            json!({"serviceId": service.service_id, "oldStatus": previous, "newStatus": status}),
            Some(("service", service.service_id.to_string())),
        )
        .await;

    Ok(Json(ServiceResponse {
        services: service_view(&state, &service),
    }))
}
