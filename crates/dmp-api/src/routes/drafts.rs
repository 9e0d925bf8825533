//! # Draft Services API
//!
//! Services being prepared for a framework application. Suppliers fill a
//! draft in page by page, so edits are validated in relaxed mode: only
//! the questions on the submitted page stay required. Completing a draft
//! validates it strictly and marks it submitted.
//!
//! Drafts may only be created, edited or completed while their framework
//! is open.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use dmp_core::payload::{drop_foreign_fields, purge_nulls_from_data, strip_whitespace_from_data};
use dmp_core::{AuditType, DraftId, DraftStatus, SupplierId, Timestamp};
use dmp_schema::{Enforcement, SchemaName};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{
    check_against, extract_object, object_field, page_questions, updated_by, validated, Validate,
};
use crate::routes::parse_id;
use crate::routes::services::{service_target, IDENTITY_KEYS};
use crate::state::{AppState, DraftServiceRecord, FrameworkRecord};

/// `{"services": {...}}` for one draft.
#[derive(Debug, Serialize, ToSchema)]
pub struct DraftResponse {
    #[schema(value_type = Object)]
    pub services: Map<String, Value>,
}

/// `{"services": [...]}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DraftListResponse {
    #[schema(value_type = Vec<Object>)]
    pub services: Vec<Map<String, Value>>,
}

/// `{"message": "done"}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedResponse {
    pub message: String,
}

/// Query for `GET /draft-services`.
#[derive(Debug, Default, Deserialize)]
pub struct DraftListQuery {
    pub supplier_id: Option<String>,
    pub framework: Option<String>,
}

impl Validate for DraftListQuery {
    fn validate(&self) -> Result<(), String> {
        match self.supplier_id.as_deref() {
            None => Err("Invalid supplier_id: supplier_id is required".to_string()),
            Some(raw) if raw.parse::<i64>().is_err() => {
                Err(format!("Invalid supplier_id: {raw}"))
            }
            Some(_) => Ok(()),
        }
    }
}

/// Build the draft services router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/draft-services", get(list_drafts).post(create_draft))
        .route(
            "/draft-services/{id}",
            get(get_draft).post(update_draft).delete(delete_draft),
        )
        .route("/draft-services/{id}/complete", post(complete_draft))
}

fn draft_view(state: &AppState, draft: &DraftServiceRecord) -> Map<String, Value> {
    let mut view = draft.document();
    view.insert("id".into(), Value::from(draft.id.get()));
    view.insert("status".into(), Value::from(draft.status.as_str()));
    view.insert("createdAt".into(), Value::String(draft.created_at.to_wire()));
    view.insert("updatedAt".into(), Value::String(draft.updated_at.to_wire()));
    if let Some(supplier) = state.suppliers.get(&draft.supplier_id) {
        view.insert("supplierName".into(), Value::String(supplier.name));
    }
    view
}

fn find_draft(state: &AppState, raw: &str) -> Result<DraftServiceRecord, AppError> {
    let id: DraftId = parse_id(raw, "draft service")?;
    state
        .draft_services
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("draft service {id} not found")))
}

fn open_framework(state: &AppState, slug: &str) -> Result<FrameworkRecord, AppError> {
    let framework = state
        .framework_by_slug(slug)
        .ok_or_else(|| AppError::BadRequest(format!("Framework '{slug}' does not exist")))?;
    if !framework.status.is_open() {
        return Err(AppError::BadRequest(format!("'{slug}' is not open for submissions")));
    }
    Ok(framework)
}

fn draft_schema(draft: &DraftServiceRecord) -> Result<SchemaName, AppError> {
    SchemaName::for_service(&draft.framework_slug, &draft.lot).ok_or_else(|| {
        AppError::BadRequest(format!(
            "No schema for framework '{}' lot '{}'",
            draft.framework_slug, draft.lot
        ))
    })
}

/// Validate a draft with only `required_fields` enforced as required.
fn check_page(
    state: &AppState,
    draft: &DraftServiceRecord,
    required_fields: &[String],
) -> Result<(), AppError> {
    check_against(
        &state.registry,
        draft_schema(draft)?,
        &draft.document(),
        Enforcement::Relaxed { required_fields },
    )
}

/// POST /draft-services — Start a draft for a supplier, framework and lot.
#[utoipa::path(
    post,
    path = "/draft-services",
    responses(
        (status = 201, description = "Draft created", body = DraftResponse),
        (status = 400, description = "Invalid draft", body = crate::error::ErrorBody),
    ),
    tag = "draft-services"
)]
pub async fn create_draft(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<DraftResponse>), AppError> {
    let body = extract_object(body)?;
    let updater = updated_by(&state.registry, &body)?;
    let questions = page_questions(&body)?;

    let mut data = object_field(&body, "services")?;
    strip_whitespace_from_data(&mut data);
    purge_nulls_from_data(&mut data);
    let target = service_target(&state, &data)?;
    let framework = open_framework(&state, &target.framework.slug)?;

    let one_service_limit = framework
        .lot(&target.lot)
        .is_some_and(|lot| lot.one_service_limit);
    if one_service_limit {
        let exists = state.draft_services.find(|d| {
            d.supplier_id == target.supplier.id
                && d.framework_id == framework.id
                && d.lot == target.lot
        });
        if exists.is_some() {
            return Err(AppError::BadRequest(format!(
                "'{}' service already exists for supplier '{}'",
                target.lot, target.supplier.id
            )));
        }
    }

    let now = Timestamp::now();
    let draft = DraftServiceRecord {
        id: DraftId(state.draft_ids.next_id()),
        supplier_id: target.supplier.id,
        framework_id: framework.id,
        framework_slug: framework.slug.clone(),
        lot: target.lot,
        status: DraftStatus::NotSubmitted,
        data: drop_foreign_fields(&data, &IDENTITY_KEYS),
        created_at: now,
        updated_at: now,
    };
    check_page(&state, &draft, &questions)?;

    state.draft_services.insert(draft.id, draft.clone());
    state
        .record_audit(
            AuditType::CreateDraftService,
            &updater,
            json!({"draftId": draft.id, "supplierId": draft.supplier_id, "lot": draft.lot}),
            Some((DraftId::LABEL, draft.id.to_string())),
        )
        .await;
    tracing::info!(draft_id = %draft.id, framework = %draft.framework_slug, "draft service created");

    Ok((
        StatusCode::CREATED,
        Json(DraftResponse {
            services: draft_view(&state, &draft),
        }),
    ))
}

/// GET /draft-services — A supplier's drafts, optionally for one framework.
#[utoipa::path(
    get,
    path = "/draft-services",
    params(
        ("supplier_id" = i64, Query, description = "Supplier id"),
        ("framework" = Option<String>, Query, description = "Framework slug"),
    ),
    responses(
        (status = 200, description = "Drafts", body = DraftListResponse),
        (status = 400, description = "Missing or invalid supplier_id", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown supplier or framework", body = crate::error::ErrorBody),
    ),
    tag = "draft-services"
)]
pub async fn list_drafts(
    State(state): State<AppState>,
    Query(query): Query<DraftListQuery>,
) -> Result<Json<DraftListResponse>, AppError> {
    let query = validated(query)?;
    let supplier_id: SupplierId = parse_id(query.supplier_id.as_deref().unwrap_or_default(), "supplier")?;
    if !state.suppliers.contains(&supplier_id) {
        return Err(AppError::NotFound(format!("supplier {supplier_id} not found")));
    }
    let framework_id = match query.framework.as_deref() {
        Some(slug) => Some(
            state
                .framework_by_slug(slug)
                .ok_or_else(|| AppError::NotFound(format!("framework '{slug}' not found")))?
                .id,
        ),
        None => None,
    };

    let services = state
        .draft_services
        .filter(|d| {
            d.supplier_id == supplier_id && framework_id.map_or(true, |id| d.framework_id == id)
        })
        .iter()
        .map(|d| draft_view(&state, d))
        .collect();
    Ok(Json(DraftListResponse { services }))
}

/// GET /draft-services/{id}
#[utoipa::path(
    get,
    path = "/draft-services/{id}",
    params(("id" = i64, Path, description = "Draft id")),
    responses(
        (status = 200, description = "Draft", body = DraftResponse),
        (status = 404, description = "Unknown draft", body = crate::error::ErrorBody),
    ),
    tag = "draft-services"
)]
pub async fn get_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DraftResponse>, AppError> {
    let draft = find_draft(&state, &id)?;
    Ok(Json(DraftResponse {
        services: draft_view(&state, &draft),
    }))
}

/// POST /draft-services/{id} — Save one page of answers.
///
/// Answers are merged over the draft; a `null` answer clears it.
#[utoipa::path(
    post,
    path = "/draft-services/{id}",
    params(("id" = i64, Path, description = "Draft id")),
    responses(
        (status = 200, description = "Updated draft", body = DraftResponse),
        (status = 400, description = "Invalid answers", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown draft", body = crate::error::ErrorBody),
    ),
    tag = "draft-services"
)]
pub async fn update_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<DraftResponse>, AppError> {
    let mut draft = find_draft(&state, &id)?;
    let body = extract_object(body)?;
    let updater = updated_by(&state.registry, &body)?;
    let questions = page_questions(&body)?;
    open_framework(&state, &draft.framework_slug)?;

    let mut update = object_field(&body, "services")?;
    strip_whitespace_from_data(&mut update);
    let update = drop_foreign_fields(&update, &IDENTITY_KEYS);
    draft.data.extend(update.clone());
    purge_nulls_from_data(&mut draft.data);
    check_page(&state, &draft, &questions)?;
    draft.updated_at = Timestamp::now();

    state.draft_services.insert(draft.id, draft.clone());
    state
        .record_audit(
            AuditType::UpdateDraftService,
            &updater,
            json!({"draftId": draft.id, "update": update}),
            Some((DraftId::LABEL, draft.id.to_string())),
        )
        .await;

    Ok(Json(DraftResponse {
        services: draft_view(&state, &draft),
    }))
}

/// POST /draft-services/{id}/complete — Validate strictly and submit.
#[utoipa::path(
    post,
    path = "/draft-services/{id}/complete",
    params(("id" = i64, Path, description = "Draft id")),
    responses(
        (status = 200, description = "Submitted draft", body = DraftResponse),
        (status = 400, description = "Draft incomplete", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown draft", body = crate::error::ErrorBody),
    ),
    tag = "draft-services"
)]
pub async fn complete_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<DraftResponse>, AppError> {
    let draft = find_draft(&state, &id)?;
    let body = extract_object(body)?;
    let updater = updated_by(&state.registry, &body)?;
    open_framework(&state, &draft.framework_slug)?;
    check_against(
        &state.registry,
        draft_schema(&draft)?,
        &draft.document(),
        Enforcement::Strict,
    )?;

    let draft = state
        .draft_services
        .update(&draft.id, |d| {
            d.status = DraftStatus::Submitted;
            d.updated_at = Timestamp::now();
        })
        .ok_or_else(|| AppError::NotFound(format!("draft service {id} not found")))?;

    state
        .record_audit(
            AuditType::CompleteDraftService,
            &updater,
            json!({"draftId": draft.id}),
            Some((DraftId::LABEL, draft.id.to_string())),
        )
        .await;
    tracing::info!(draft_id = %draft.id, "draft service submitted");

    Ok(Json(DraftResponse {
        services: draft_view(&state, &draft),
    }))
}

/// DELETE /draft-services/{id}
#[utoipa::path(
    delete,
    path = "/draft-services/{id}",
    params(("id" = i64, Path, description = "Draft id")),
    responses(
        (status = 200, description = "Draft deleted", body = DeletedResponse),
        (status = 404, description = "Unknown draft", body = crate::error::ErrorBody),
    ),
    tag = "draft-services"
)]
pub async fn delete_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<DeletedResponse>, AppError> {
    let draft = find_draft(&state, &id)?;
    let body = extract_object(body)?;
    let updater = updated_by(&state.registry, &body)?;

    state.draft_services.remove(&draft.id);
    state
        .record_audit(
            AuditType::DeleteDraftService,
            &updater,
            json!({"draftId": draft.id, "serviceName": draft.data.get("serviceName")}),
            Some((DraftId::LABEL, draft.id.to_string())),
        )
        .await;

    Ok(Json(DeletedResponse {
        message: "done".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supplier_id_is_required() {
        let query = DraftListQuery::default();
        assert!(query.validate().unwrap_err().contains("required"));

        let query = DraftListQuery {
            supplier_id: Some("abc".into()),
            framework: None,
        };
        assert!(query.validate().unwrap_err().contains("abc"));

        let query = DraftListQuery {
            supplier_id: Some("12".into()),
            framework: Some("g-cloud-7".into()),
        };
        assert!(query.validate().is_ok());
    }
}
