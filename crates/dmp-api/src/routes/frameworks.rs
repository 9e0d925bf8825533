//! # Frameworks API
//!
//! Lists the procurement frameworks and their lots, lets administrators
//! move a framework through its lifecycle, and reports application
//! progress for a framework: draft services by status and lot, interested
//! suppliers by declaration state, and how recently supplier users have
//! logged in.

use std::collections::{BTreeMap, HashSet};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use dmp_core::payload::{json_has_required_keys, json_only_has_required_keys};
use dmp_core::{AuditType, DraftStatus, FrameworkId, FrameworkStatus, SupplierId, Timestamp, UserRole};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_object, object_field, validated, validated_updater, Validate};
use crate::routes::suppliers::{interest_view, SupplierFrameworkView};
use crate::state::{AppState, FrameworkRecord};

/// Users who logged in within this many days count as recent.
const RECENT_LOGIN_DAYS: i64 = 7;

/// `{"frameworks": [...]}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct FrameworkListResponse {
    pub frameworks: Vec<FrameworkRecord>,
}

/// `{"frameworks": {...}}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct FrameworkResponse {
    pub frameworks: FrameworkRecord,
}

/// Draft services sharing a status, lot, and declaration state.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct ServiceCount {
    pub count: usize,
    pub status: String,
    pub lot: String,
    pub declaration_made: bool,
}

/// Interested suppliers sharing a declaration status and completion state.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct InterestedSupplierCount {
    pub count: usize,
    pub declaration_status: Option<String>,
    pub has_completed_services: bool,
}

/// Supplier users grouped by login recency; `None` means never logged in.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct SupplierUserCount {
    pub count: usize,
    pub recent_login: Option<bool>,
}

/// Application progress for one framework.
#[derive(Debug, Serialize, ToSchema)]
pub struct FrameworkStats {
    pub services: Vec<ServiceCount>,
    pub interested_suppliers: Vec<InterestedSupplierCount>,
    pub supplier_users: Vec<SupplierUserCount>,
}

/// `{"supplierFrameworks": [...]}`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierFrameworksResponse {
    pub supplier_frameworks: Vec<SupplierFrameworkView>,
}

/// `{"interestedSuppliers": [...]}`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterestedSuppliersResponse {
    pub interested_suppliers: Vec<i64>,
}

/// Query for `GET /frameworks/{slug}/suppliers`.
#[derive(Debug, Default, Deserialize)]
pub struct FrameworkSuppliersQuery {
    pub agreement_returned: Option<String>,
}

impl Validate for FrameworkSuppliersQuery {
    fn validate(&self) -> Result<(), String> {
        match self.agreement_returned.as_deref() {
            None | Some("true") | Some("false") => Ok(()),
            Some(other) => Err(format!("invalid agreement_returned value: {other}")),
        }
    }
}

/// Build the frameworks router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/frameworks", get(list_frameworks))
        .route("/frameworks/{slug}", get(get_framework).post(update_framework))
        .route("/frameworks/{slug}/stats", get(framework_stats))
        .route("/frameworks/{slug}/suppliers", get(framework_suppliers))
        .route("/frameworks/{slug}/interest", get(framework_interest))
}

fn find_framework(state: &AppState, slug: &str) -> Result<FrameworkRecord, AppError> {
    state
        .framework_by_slug(slug)
        .ok_or_else(|| AppError::NotFound(format!("framework '{slug}' not found")))
}

/// GET /frameworks — All frameworks with their lots.
#[utoipa::path(
    get,
    path = "/frameworks",
    responses((status = 200, description = "Framework list", body = FrameworkListResponse)),
    tag = "frameworks"
)]
pub async fn list_frameworks(State(state): State<AppState>) -> Json<FrameworkListResponse> {
    Json(FrameworkListResponse {
        frameworks: state.frameworks.list(),
    })
}

/// GET /frameworks/{slug} — One framework.
#[utoipa::path(
    get,
    path = "/frameworks/{slug}",
    params(("slug" = String, Path, description = "Framework slug")),
    responses(
        (status = 200, description = "Framework", body = FrameworkResponse),
        (status = 404, description = "Unknown framework", body = crate::error::ErrorBody),
    ),
    tag = "frameworks"
)]
pub async fn get_framework(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<FrameworkResponse>, AppError> {
    Ok(Json(FrameworkResponse {
        frameworks: find_framework(&state, &slug)?,
    }))
}

/// POST /frameworks/{slug} — Change a framework's status.
///
/// The body is `{"frameworks": {"status": ...}, "updated_by": ...}`; no
/// other framework field may be changed.
#[utoipa::path(
    post,
    path = "/frameworks/{slug}",
    params(("slug" = String, Path, description = "Framework slug")),
    responses(
        (status = 200, description = "Updated framework", body = FrameworkResponse),
        (status = 400, description = "Invalid update", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown framework", body = crate::error::ErrorBody),
    ),
    tag = "frameworks"
)]
pub async fn update_framework(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<FrameworkResponse>, AppError> {
    let framework = find_framework(&state, &slug)?;
    let body = extract_object(body)?;
    json_has_required_keys(&body, &["frameworks", "updated_by"])?;
    let updater = validated_updater(
        &state.registry,
        json!({"updated_by": body.get("updated_by").cloned().unwrap_or(Value::Null)}),
    )?;

    let update = object_field(&body, "frameworks")?;
    json_only_has_required_keys(&update, &["status"])?;
    let status: FrameworkStatus = update
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Validation("framework status must be a string".into()))?
        .parse()?;

    let updated = state
        .frameworks
        .update(&framework.id, |f| f.status = status)
        .ok_or_else(|| AppError::NotFound(format!("framework '{slug}' not found")))?;

    state
        .record_audit(
            AuditType::FrameworkUpdate,
            &updater,
            json!({"update": update}),
            Some((FrameworkId::LABEL, updated.id.to_string())),
        )
        .await;
    tracing::info!(framework = %slug, status = %status, "framework status updated");

    Ok(Json(FrameworkResponse { frameworks: updated }))
}

/// GET /frameworks/{slug}/stats — Application progress.
#[utoipa::path(
    get,
    path = "/frameworks/{slug}/stats",
    params(("slug" = String, Path, description = "Framework slug")),
    responses(
        (status = 200, description = "Framework stats", body = FrameworkStats),
        (status = 404, description = "Unknown framework", body = crate::error::ErrorBody),
    ),
    tag = "frameworks"
)]
pub async fn framework_stats(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<FrameworkStats>, AppError> {
    let framework = find_framework(&state, &slug)?;
    Ok(Json(compute_stats(&state, &framework, Timestamp::now())))
}

/// Group drafts, interest, and supplier users for `framework` as of `now`.
pub fn compute_stats(state: &AppState, framework: &FrameworkRecord, now: Timestamp) -> FrameworkStats {
    let interests = state
        .supplier_frameworks
        .filter(|sf| sf.framework_id == framework.id);
    let declared: HashSet<SupplierId> = interests
        .iter()
        .filter(|sf| sf.declaration_status().as_deref() == Some("complete"))
        .map(|sf| sf.supplier_id)
        .collect();

    let drafts = state
        .draft_services
        .filter(|d| d.framework_id == framework.id);
    let completed: HashSet<SupplierId> = drafts
        .iter()
        .filter(|d| d.status == DraftStatus::Submitted)
        .map(|d| d.supplier_id)
        .collect();

    let mut services: BTreeMap<(String, String, bool), usize> = BTreeMap::new();
    for draft in &drafts {
        let key = (
            draft.status.as_str().to_string(),
            draft.lot.clone(),
            declared.contains(&draft.supplier_id),
        );
        *services.entry(key).or_default() += 1;
    }

    let mut interested: BTreeMap<(Option<String>, bool), usize> = BTreeMap::new();
    for interest in &interests {
        let key = (
            interest.declaration_status(),
            completed.contains(&interest.supplier_id),
        );
        *interested.entry(key).or_default() += 1;
    }

    let cutoff = *now.as_datetime() - chrono::Duration::days(RECENT_LOGIN_DAYS);
    let mut logins: BTreeMap<u8, (Option<bool>, usize)> = BTreeMap::new();
    for user in state.users.filter(|u| u.role == UserRole::Supplier) {
        let recent = user.logged_in_at.map(|at| *at.as_datetime() > cutoff);
        // Reported as never-recent, never-logged-in, then recent.
        let rank = match recent {
            Some(false) => 0,
            None => 1,
            Some(true) => 2,
        };
        logins.entry(rank).or_insert((recent, 0)).1 += 1;
    }

    FrameworkStats {
        services: services
            .into_iter()
            .map(|((status, lot, declaration_made), count)| ServiceCount {
                count,
                status,
                lot,
                declaration_made,
            })
            .collect(),
        interested_suppliers: interested
            .into_iter()
            .map(
                |((declaration_status, has_completed_services), count)| InterestedSupplierCount {
                    count,
                    declaration_status,
                    has_completed_services,
                },
            )
            .collect(),
        supplier_users: logins
            .into_values()
            .map(|(recent_login, count)| SupplierUserCount {
                count,
                recent_login,
            })
            .collect(),
    }
}

/// GET /frameworks/{slug}/suppliers — Supplier interest records.
///
/// With `agreement_returned=true`, only suppliers that returned their
/// agreement, most recent first.
#[utoipa::path(
    get,
    path = "/frameworks/{slug}/suppliers",
    params(
        ("slug" = String, Path, description = "Framework slug"),
        ("agreement_returned" = Option<String>, Query, description = "`true` or `false`"),
    ),
    responses(
        (status = 200, description = "Supplier frameworks", body = SupplierFrameworksResponse),
        (status = 404, description = "Unknown framework", body = crate::error::ErrorBody),
    ),
    tag = "frameworks"
)]
pub async fn framework_suppliers(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<FrameworkSuppliersQuery>,
) -> Result<Json<SupplierFrameworksResponse>, AppError> {
    let framework = find_framework(&state, &slug)?;
    let query = validated(query)?;
    let returned = query.agreement_returned.as_deref().map(|v| v == "true");

    let mut records = state.supplier_frameworks.filter(|sf| {
        sf.framework_id == framework.id && returned.map_or(true, |r| sf.agreement_returned == r)
    });
    if returned.is_some() {
        records.sort_by(|a, b| b.agreement_returned_at.cmp(&a.agreement_returned_at));
    }

    Ok(Json(SupplierFrameworksResponse {
        supplier_frameworks: records
            .iter()
            .map(|sf| interest_view(&state, sf, &framework))
            .collect(),
    }))
}

/// GET /frameworks/{slug}/interest — Ids of interested suppliers.
#[utoipa::path(
    get,
    path = "/frameworks/{slug}/interest",
    params(("slug" = String, Path, description = "Framework slug")),
    responses(
        (status = 200, description = "Interested supplier ids", body = InterestedSuppliersResponse),
        (status = 404, description = "Unknown framework", body = crate::error::ErrorBody),
    ),
    tag = "frameworks"
)]
pub async fn framework_interest(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<InterestedSuppliersResponse>, AppError> {
    let framework = find_framework(&state, &slug)?;
    let interested_suppliers = state
        .supplier_frameworks
        .filter(|sf| sf.framework_id == framework.id)
        .into_iter()
        .map(|sf| sf.supplier_id.get())
        .collect();
    Ok(Json(InterestedSuppliersResponse {
        interested_suppliers,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::PasswordHash;
    use crate::state::{AppConfig, DraftServiceRecord, SupplierFrameworkRecord, UserRecord};
    use dmp_core::{DraftId, UserId};
    use dmp_schema::{SchemaName, SchemaRegistry};
    use std::sync::Arc;

    fn state() -> AppState {
        let registry = SchemaRegistry::from_schemas(Vec::<(SchemaName, Value)>::new()).unwrap();
        AppState::new(Arc::new(registry), AppConfig::default())
    }

    fn user(id: i64, role: UserRole, logged_in_at: Option<Timestamp>) -> UserRecord {
        let now = Timestamp::now();
        UserRecord {
            id: UserId(id),
            email_address: format!("user{id}@example.com"),
            name: "User".into(),
            role,
            supplier_id: None,
            password: PasswordHash::new("password1234"),
            active: true,
            created_at: now,
            updated_at: now,
            password_changed_at: now,
            logged_in_at,
        }
    }

    fn draft(id: i64, supplier: i64, lot: &str, status: DraftStatus) -> DraftServiceRecord {
        let now = Timestamp::now();
        DraftServiceRecord {
            id: DraftId(id),
            supplier_id: SupplierId(supplier),
            framework_id: FrameworkId(4),
            framework_slug: "g-cloud-7".into(),
            lot: lot.into(),
            status,
            data: serde_json::Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn interest(supplier: i64, declaration: Option<Value>) -> SupplierFrameworkRecord {
        SupplierFrameworkRecord {
            supplier_id: SupplierId(supplier),
            framework_id: FrameworkId(4),
            declaration: declaration.and_then(|d| d.as_object().cloned()),
            agreement_returned: false,
            agreement_returned_at: None,
        }
    }

    #[test]
    fn supplier_users_grouped_by_login_recency() {
        let state = state();
        let now = Timestamp::now();
        let old = Timestamp::from_utc(*now.as_datetime() - chrono::Duration::days(30));
        state.users.insert(UserId(1), user(1, UserRole::Supplier, Some(now)));
        state.users.insert(UserId(2), user(2, UserRole::Supplier, Some(old)));
        state.users.insert(UserId(3), user(3, UserRole::Supplier, None));
        state.users.insert(UserId(4), user(4, UserRole::Supplier, Some(old)));
        state.users.insert(UserId(5), user(5, UserRole::Buyer, Some(now)));

        let framework = state.framework_by_slug("g-cloud-7").unwrap();
        let stats = compute_stats(&state, &framework, now);
        assert_eq!(
            stats.supplier_users,
            vec![
                SupplierUserCount { count: 2, recent_login: Some(false) },
                SupplierUserCount { count: 1, recent_login: None },
                SupplierUserCount { count: 1, recent_login: Some(true) },
            ]
        );
    }

    #[test]
    fn drafts_and_interest_grouped() {
        let state = state();
        state.supplier_frameworks.insert(
            (SupplierId(1), FrameworkId(4)),
            interest(1, Some(json!({"status": "complete"}))),
        );
        state.supplier_frameworks.insert(
            (SupplierId(2), FrameworkId(4)),
            interest(2, Some(json!({"status": "started"}))),
        );
        state.supplier_frameworks.insert((SupplierId(3), FrameworkId(4)), interest(3, None));
        state.draft_services.insert(DraftId(1), draft(1, 1, "saas", DraftStatus::Submitted));
        state.draft_services.insert(DraftId(2), draft(2, 1, "saas", DraftStatus::Submitted));
        state.draft_services.insert(DraftId(3), draft(3, 2, "iaas", DraftStatus::NotSubmitted));

        let framework = state.framework_by_slug("g-cloud-7").unwrap();
        let stats = compute_stats(&state, &framework, Timestamp::now());
        assert_eq!(
            stats.services,
            vec![
                ServiceCount {
                    count: 1,
                    status: "not-submitted".into(),
                    lot: "iaas".into(),
                    declaration_made: false,
                },
                ServiceCount {
                    count: 2,
                    status: "submitted".into(),
                    lot: "saas".into(),
                    declaration_made: true,
                },
            ]
        );
        assert_eq!(
            stats.interested_suppliers,
            vec![
                InterestedSupplierCount {
                    count: 1,
                    declaration_status: None,
                    has_completed_services: false,
                },
                InterestedSupplierCount {
                    count: 1,
                    declaration_status: Some("complete".into()),
                    has_completed_services: true,
                },
                InterestedSupplierCount {
                    count: 1,
                    declaration_status: Some("started".into()),
                    has_completed_services: false,
                },
            ]
        );
    }

    #[test]
    fn agreement_returned_filter_values() {
        let query = |v: &str| FrameworkSuppliersQuery {
            agreement_returned: Some(v.to_string()),
        };
        assert!(query("true").validate().is_ok());
        assert!(query("false").validate().is_ok());
        assert!(query("yes").validate().is_err());
        assert!(FrameworkSuppliersQuery::default().validate().is_ok());
    }
}
