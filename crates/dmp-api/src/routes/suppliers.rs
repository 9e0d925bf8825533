//! # Suppliers API
//!
//! Supplier directory with name-prefix browsing, supplier creation and
//! import, contact details, and each supplier's relationship with a
//! framework: registered interest, selection question declaration, and
//! the returned framework agreement.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use dmp_core::payload::{json_has_matching_id, json_only_has_required_keys, strip_whitespace_from_data};
use dmp_core::{AuditType, SupplierId, Timestamp};
use dmp_schema::SchemaName;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{check_format, extract_object, object_field, updated_by};
use crate::pagination::{page_number, Page};
use crate::routes::parse_id;
use crate::state::{
    AppState, ContactInformation, FrameworkRecord, SupplierFrameworkRecord, SupplierRecord,
};

/// Prefix value selecting suppliers whose name does not start with a letter.
const OTHER_PREFIX: &str = "other";

/// A supplier's relationship with one framework.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierFrameworkView {
    pub supplier_id: i64,
    pub supplier_name: Option<String>,
    pub framework_slug: String,
    #[schema(value_type = Option<Object>)]
    pub declaration: Option<Map<String, Value>>,
    pub agreement_returned: bool,
    pub agreement_returned_at: Option<String>,
}

/// Render a supplier framework record.
pub fn interest_view(
    state: &AppState,
    record: &SupplierFrameworkRecord,
    framework: &FrameworkRecord,
) -> SupplierFrameworkView {
    SupplierFrameworkView {
        supplier_id: record.supplier_id.get(),
        supplier_name: state.suppliers.get(&record.supplier_id).map(|s| s.name),
        framework_slug: framework.slug.clone(),
        declaration: record.declaration.clone(),
        agreement_returned: record.agreement_returned,
        agreement_returned_at: record.agreement_returned_at.map(|t| t.to_wire()),
    }
}

/// One page of suppliers.
#[derive(Debug, Serialize, ToSchema)]
pub struct SupplierListResponse {
    pub suppliers: Vec<SupplierRecord>,
    pub links: BTreeMap<String, String>,
}

/// `{"suppliers": {...}}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SupplierResponse {
    pub suppliers: SupplierRecord,
}

/// `{"contactInformation": {...}}`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactInformationResponse {
    pub contact_information: ContactInformation,
}

/// `{"frameworkInterest": {...}}`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkInterestResponse {
    pub framework_interest: SupplierFrameworkView,
}

/// `{"declaration": {...}}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeclarationResponse {
    #[schema(value_type = Object)]
    pub declaration: Map<String, Value>,
}

/// Query for `GET /suppliers`.
#[derive(Debug, Default, Deserialize)]
pub struct SupplierListQuery {
    pub prefix: Option<String>,
    pub page: Option<String>,
}

/// Build the suppliers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/suppliers", get(list_suppliers).post(create_supplier))
        .route("/suppliers/{id}", get(get_supplier).put(import_supplier))
        .route(
            "/suppliers/{id}/contact-information/{contact_id}",
            post(update_contact_information),
        )
        .route(
            "/suppliers/{id}/frameworks/{slug}",
            get(get_supplier_framework)
                .put(register_framework_interest)
                .post(update_supplier_framework),
        )
        .route("/suppliers/{id}/frameworks/{slug}/declaration", put(set_declaration))
}

fn find_supplier(state: &AppState, raw_id: &str) -> Result<SupplierRecord, AppError> {
    let id: SupplierId = parse_id(raw_id, "supplier")?;
    state
        .suppliers
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("supplier {id} not found")))
}

fn find_framework(state: &AppState, slug: &str) -> Result<FrameworkRecord, AppError> {
    state
        .framework_by_slug(slug)
        .ok_or_else(|| AppError::NotFound(format!("framework '{slug}' not found")))
}

fn require_open(framework: &FrameworkRecord) -> Result<(), AppError> {
    if framework.status.is_open() {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "'{}' framework is not open",
            framework.slug
        )))
    }
}

/// Whether `name` belongs under `prefix` in the directory.
pub fn matches_prefix(name: &str, prefix: &str) -> bool {
    if prefix == OTHER_PREFIX {
        return !name.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    }
    name.to_lowercase().starts_with(&prefix.to_lowercase())
}

/// Give every contact without an id the next contact id.
fn assign_contact_ids(state: &AppState, supplier: &mut SupplierRecord) {
    for contact in &mut supplier.contact_information {
        match contact.id {
            Some(id) => state.contact_ids.advance_past(id),
            None => contact.id = Some(state.contact_ids.next_id()),
        }
    }
}

fn deserialize_supplier(data: Map<String, Value>) -> Result<SupplierRecord, AppError> {
    serde_json::from_value(Value::Object(data))
        .map_err(|e| AppError::BadRequest(format!("invalid supplier: {e}")))
}

/// GET /suppliers — One page of the supplier directory, ordered by name.
#[utoipa::path(
    get,
    path = "/suppliers",
    params(
        ("prefix" = Option<String>, Query, description = "Name prefix, or `other`"),
        ("page" = Option<String>, Query, description = "1-based page number"),
    ),
    responses(
        (status = 200, description = "Suppliers", body = SupplierListResponse),
        (status = 400, description = "Invalid page", body = crate::error::ErrorBody),
    ),
    tag = "suppliers"
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(query): Query<SupplierListQuery>,
) -> Result<Json<SupplierListResponse>, AppError> {
    let page_no = page_number(query.page.as_deref())?;

    let mut suppliers = match query.prefix.as_deref() {
        Some(prefix) => state.suppliers.filter(|s| matches_prefix(&s.name, prefix)),
        None => state.suppliers.list(),
    };
    suppliers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

    let page = Page::of(suppliers, page_no, state.config.page_size)?;
    let args: Vec<(&str, String)> = query
        .prefix
        .iter()
        .map(|p| ("prefix", p.clone()))
        .collect();
    let base = format!("{}/suppliers", state.config.base_url);
    let links = page
        .links(&base, &args)
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

    Ok(Json(SupplierListResponse {
        suppliers: page.items,
        links,
    }))
}

/// GET /suppliers/{id}
#[utoipa::path(
    get,
    path = "/suppliers/{id}",
    params(("id" = i64, Path, description = "Supplier id")),
    responses(
        (status = 200, description = "Supplier", body = SupplierResponse),
        (status = 404, description = "Unknown supplier", body = crate::error::ErrorBody),
    ),
    tag = "suppliers"
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SupplierResponse>, AppError> {
    Ok(Json(SupplierResponse {
        suppliers: find_supplier(&state, &id)?,
    }))
}

/// POST /suppliers — Create a supplier with a new id.
#[utoipa::path(
    post,
    path = "/suppliers",
    responses(
        (status = 201, description = "Supplier created", body = SupplierResponse),
        (status = 400, description = "Invalid supplier", body = crate::error::ErrorBody),
    ),
    tag = "suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<SupplierResponse>), AppError> {
    let body = extract_object(body)?;
    let mut data = object_field(&body, "suppliers")?;
    strip_whitespace_from_data(&mut data);
    check_format(&state.registry, SchemaName::NewSupplier, &data)?;

    let id = SupplierId(state.supplier_ids.next_id());
    data.insert("id".into(), Value::from(id.get()));
    let mut supplier = deserialize_supplier(data)?;
    assign_contact_ids(&state, &mut supplier);
    state.suppliers.insert(id, supplier.clone());
    tracing::info!(supplier_id = %id, "supplier created");

    Ok((StatusCode::CREATED, Json(SupplierResponse { suppliers: supplier })))
}

/// PUT /suppliers/{id} — Import a supplier under a known id, replacing
/// any existing record.
#[utoipa::path(
    put,
    path = "/suppliers/{id}",
    params(("id" = i64, Path, description = "Supplier id")),
    responses(
        (status = 201, description = "Supplier imported", body = SupplierResponse),
        (status = 400, description = "Invalid supplier", body = crate::error::ErrorBody),
    ),
    tag = "suppliers"
)]
pub async fn import_supplier(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<SupplierResponse>), AppError> {
    let id: SupplierId = parse_id(&raw_id, "supplier")?;
    let body = extract_object(body)?;
    let mut data = object_field(&body, "suppliers")?;
    strip_whitespace_from_data(&mut data);
    json_has_matching_id(&data, &Value::from(id.get()))?;
    check_format(&state.registry, SchemaName::Suppliers, &data)?;

    let mut supplier = deserialize_supplier(data)?;
    assign_contact_ids(&state, &mut supplier);
    state.supplier_ids.advance_past(id.get());
    state.suppliers.insert(id, supplier.clone());
    tracing::info!(supplier_id = %id, "supplier imported");

    Ok((StatusCode::CREATED, Json(SupplierResponse { suppliers: supplier })))
}

/// POST /suppliers/{id}/contact-information/{contact_id} — Edit a contact.
///
/// The update is merged over the stored contact and the result validated
/// as a whole.
#[utoipa::path(
    post,
    path = "/suppliers/{id}/contact-information/{contact_id}",
    params(
        ("id" = i64, Path, description = "Supplier id"),
        ("contact_id" = i64, Path, description = "Contact id"),
    ),
    responses(
        (status = 200, description = "Updated contact", body = ContactInformationResponse),
        (status = 400, description = "Invalid contact", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown supplier or contact", body = crate::error::ErrorBody),
    ),
    tag = "suppliers"
)]
pub async fn update_contact_information(
    State(state): State<AppState>,
    Path((raw_id, raw_contact_id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ContactInformationResponse>, AppError> {
    let supplier = find_supplier(&state, &raw_id)?;
    let contact_id: i64 = parse_id(&raw_contact_id, "contact")?;
    let position = supplier
        .contact_information
        .iter()
        .position(|c| c.id == Some(contact_id))
        .ok_or_else(|| AppError::NotFound(format!("contact {contact_id} not found")))?;

    let body = extract_object(body)?;
    let updater = updated_by(&state.registry, &body)?;
    let mut update = object_field(&body, "contactInformation")?;
    strip_whitespace_from_data(&mut update);
    json_has_matching_id(&update, &Value::from(contact_id))?;

    let mut merged = match serde_json::to_value(&supplier.contact_information[position]) {
        Ok(Value::Object(map)) => map,
        _ => return Err(AppError::Internal("contact did not serialize to an object".into())),
    };
    merged.extend(update.clone());
    check_format(&state.registry, SchemaName::ContactInformation, &merged)?;
    let contact: ContactInformation = serde_json::from_value(Value::Object(merged))
        .map_err(|e| AppError::BadRequest(format!("invalid contact information: {e}")))?;

    let stored = contact.clone();
    state
        .suppliers
        .update(&supplier.id, |s| {
            if let Some(slot) = s.contact_information.get_mut(position) {
                *slot = stored;
            }
        })
        .ok_or_else(|| AppError::NotFound(format!("supplier {} not found", supplier.id)))?;

    state
        .record_audit(
            AuditType::ContactUpdate,
            &updater,
            json!({"update": update}),
            Some((SupplierId::LABEL, supplier.id.to_string())),
        )
        .await;

    Ok(Json(ContactInformationResponse {
        contact_information: contact,
    }))
}

/// GET /suppliers/{id}/frameworks/{slug} — The supplier's interest record.
#[utoipa::path(
    get,
    path = "/suppliers/{id}/frameworks/{slug}",
    params(
        ("id" = i64, Path, description = "Supplier id"),
        ("slug" = String, Path, description = "Framework slug"),
    ),
    responses(
        (status = 200, description = "Framework interest", body = FrameworkInterestResponse),
        (status = 404, description = "No interest registered", body = crate::error::ErrorBody),
    ),
    tag = "suppliers"
)]
pub async fn get_supplier_framework(
    State(state): State<AppState>,
    Path((raw_id, slug)): Path<(String, String)>,
) -> Result<Json<FrameworkInterestResponse>, AppError> {
    let supplier = find_supplier(&state, &raw_id)?;
    let framework = find_framework(&state, &slug)?;
    let record = state
        .supplier_frameworks
        .get(&(supplier.id, framework.id))
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "supplier {} has not registered interest in '{slug}'",
                supplier.id
            ))
        })?;
    Ok(Json(FrameworkInterestResponse {
        framework_interest: interest_view(&state, &record, &framework),
    }))
}

/// PUT /suppliers/{id}/frameworks/{slug} — Register interest in an open
/// framework. Registering twice is not an error.
#[utoipa::path(
    put,
    path = "/suppliers/{id}/frameworks/{slug}",
    params(
        ("id" = i64, Path, description = "Supplier id"),
        ("slug" = String, Path, description = "Framework slug"),
    ),
    responses(
        (status = 201, description = "Interest registered", body = FrameworkInterestResponse),
        (status = 200, description = "Interest already registered", body = FrameworkInterestResponse),
        (status = 400, description = "Framework not open", body = crate::error::ErrorBody),
    ),
    tag = "suppliers"
)]
pub async fn register_framework_interest(
    State(state): State<AppState>,
    Path((raw_id, slug)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<FrameworkInterestResponse>), AppError> {
    let supplier = find_supplier(&state, &raw_id)?;
    let framework = find_framework(&state, &slug)?;
    let body = extract_object(body)?;
    let updater = updated_by(&state.registry, &body)?;
    require_open(&framework)?;

    let key = (supplier.id, framework.id);
    if let Some(existing) = state.supplier_frameworks.get(&key) {
        return Ok((
            StatusCode::OK,
            Json(FrameworkInterestResponse {
                framework_interest: interest_view(&state, &existing, &framework),
            }),
        ));
    }

    let record = SupplierFrameworkRecord {
        supplier_id: supplier.id,
        framework_id: framework.id,
        declaration: None,
        agreement_returned: false,
        agreement_returned_at: None,
    };
    state.supplier_frameworks.insert(key, record.clone());
    state
        .record_audit(
            AuditType::RegisterFrameworkInterest,
            &updater,
            json!({"supplierId": supplier.id, "frameworkSlug": framework.slug}),
            Some((SupplierId::LABEL, supplier.id.to_string())),
        )
        .await;

    Ok((
        StatusCode::CREATED,
        Json(FrameworkInterestResponse {
            framework_interest: interest_view(&state, &record, &framework),
        }),
    ))
}

/// POST /suppliers/{id}/frameworks/{slug} — Record whether the framework
/// agreement has been returned.
#[utoipa::path(
    post,
    path = "/suppliers/{id}/frameworks/{slug}",
    params(
        ("id" = i64, Path, description = "Supplier id"),
        ("slug" = String, Path, description = "Framework slug"),
    ),
    responses(
        (status = 200, description = "Updated interest", body = FrameworkInterestResponse),
        (status = 400, description = "Invalid update", body = crate::error::ErrorBody),
        (status = 404, description = "No interest registered", body = crate::error::ErrorBody),
    ),
    tag = "suppliers"
)]
pub async fn update_supplier_framework(
    State(state): State<AppState>,
    Path((raw_id, slug)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<FrameworkInterestResponse>, AppError> {
    let supplier = find_supplier(&state, &raw_id)?;
    let framework = find_framework(&state, &slug)?;
    let body = extract_object(body)?;
    let updater = updated_by(&state.registry, &body)?;

    let update = object_field(&body, "frameworkInterest")?;
    json_only_has_required_keys(&update, &["agreementReturned"])?;
    let returned = update
        .get("agreementReturned")
        .and_then(Value::as_bool)
        .ok_or_else(|| AppError::Validation("agreementReturned must be a boolean".into()))?;

    let record = state
        .supplier_frameworks
        .update(&(supplier.id, framework.id), |sf| {
            sf.agreement_returned = returned;
            sf.agreement_returned_at = returned.then(Timestamp::now);
        })
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "supplier {} has not registered interest in '{slug}'",
                supplier.id
            ))
        })?;

    state
        .record_audit(
            AuditType::SupplierUpdate,
            &updater,
            json!({"frameworkSlug": framework.slug, "update": update}),
            Some((SupplierId::LABEL, supplier.id.to_string())),
        )
        .await;

    Ok(Json(FrameworkInterestResponse {
        framework_interest: interest_view(&state, &record, &framework),
    }))
}

/// PUT /suppliers/{id}/frameworks/{slug}/declaration — Save selection
/// question answers, registering interest first when needed.
#[utoipa::path(
    put,
    path = "/suppliers/{id}/frameworks/{slug}/declaration",
    params(
        ("id" = i64, Path, description = "Supplier id"),
        ("slug" = String, Path, description = "Framework slug"),
    ),
    responses(
        (status = 201, description = "Declaration created", body = DeclarationResponse),
        (status = 200, description = "Declaration replaced", body = DeclarationResponse),
        (status = 400, description = "Framework not open", body = crate::error::ErrorBody),
    ),
    tag = "suppliers"
)]
pub async fn set_declaration(
    State(state): State<AppState>,
    Path((raw_id, slug)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<DeclarationResponse>), AppError> {
    let supplier = find_supplier(&state, &raw_id)?;
    let framework = find_framework(&state, &slug)?;
    let body = extract_object(body)?;
    let updater = updated_by(&state.registry, &body)?;
    require_open(&framework)?;
    let declaration = object_field(&body, "declaration")?;

    let key = (supplier.id, framework.id);
    let existing = state.supplier_frameworks.get(&key);
    let created = existing.as_ref().map_or(true, |sf| sf.declaration.is_none());
    let mut record = existing.unwrap_or(SupplierFrameworkRecord {
        supplier_id: supplier.id,
        framework_id: framework.id,
        declaration: None,
        agreement_returned: false,
        agreement_returned_at: None,
    });
    record.declaration = Some(declaration.clone());
    state.supplier_frameworks.insert(key, record);

    state
        .record_audit(
            AuditType::AnswerSelectionQuestions,
            &updater,
            json!({"frameworkSlug": framework.slug, "update": declaration}),
            Some((SupplierId::LABEL, supplier.id.to_string())),
        )
        .await;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(DeclarationResponse { declaration })))
}
