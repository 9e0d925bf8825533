//! # Audit Events API
//!
//! Read access to the audit log, newest entries last, filterable by type
//! and acknowledgement.

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use dmp_core::{is_valid_acknowledged_state, AuditType};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{validated, Validate};
use crate::pagination::{page_number, Page};
use crate::state::{AppState, AuditEventRecord};

/// One page of audit events.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEventListResponse {
    pub audit_events: Vec<AuditEventRecord>,
    pub links: BTreeMap<String, String>,
}

/// Query for `GET /audit-events`.
#[derive(Debug, Default, Deserialize)]
pub struct AuditEventQuery {
    #[serde(rename = "audit-type")]
    pub audit_type: Option<String>,
    pub acknowledged: Option<String>,
    pub page: Option<String>,
}

impl Validate for AuditEventQuery {
    fn validate(&self) -> Result<(), String> {
        if let Some(raw) = &self.audit_type {
            raw.parse::<AuditType>()
                .map_err(|_| format!("Invalid audit type: {raw}"))?;
        }
        match self.acknowledged.as_deref() {
            Some(raw) if !is_valid_acknowledged_state(raw) => {
                Err(format!("Invalid acknowledged state: {raw}"))
            }
            _ => Ok(()),
        }
    }
}

/// Build the audit router.
pub fn router() -> Router<AppState> {
    Router::new().route("/audit-events", get(list_audit_events))
}

/// GET /audit-events — The audit log in id order.
#[utoipa::path(
    get,
    path = "/audit-events",
    params(
        ("audit-type" = Option<String>, Query, description = "Only events of this type"),
        ("acknowledged" = Option<String>, Query, description = "`all`, `true` or `false`"),
        ("page" = Option<String>, Query, description = "1-based page number"),
    ),
    responses(
        (status = 200, description = "Audit events", body = AuditEventListResponse),
        (status = 400, description = "Invalid filter", body = crate::error::ErrorBody),
    ),
    tag = "audit"
)]
pub async fn list_audit_events(
    State(state): State<AppState>,
    Query(query): Query<AuditEventQuery>,
) -> Result<Json<AuditEventListResponse>, AppError> {
    let query = validated(query)?;
    let page_no = page_number(query.page.as_deref())?;
    let audit_type = query
        .audit_type
        .as_deref()
        .map(str::parse::<AuditType>)
        .transpose()?;
    let acknowledged = match query.acknowledged.as_deref() {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    };

    let events = state.audit_events.filter(|e| {
        audit_type.map_or(true, |t| e.audit_type == t)
            && acknowledged.map_or(true, |a| e.acknowledged == a)
    });
    let page = Page::of(events, page_no, state.config.page_size)?;

    let mut args = Vec::new();
    if let Some(t) = &query.audit_type {
        args.push(("audit-type", t.clone()));
    }
    if let Some(a) = &query.acknowledged {
        args.push(("acknowledged", a.clone()));
    }
    let base = format!("{}/audit-events", state.config.base_url);
    let links = page
        .links(&base, &args)
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

    Ok(Json(AuditEventListResponse {
        audit_events: page.items,
        links,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(audit_type: Option<&str>, acknowledged: Option<&str>) -> AuditEventQuery {
        AuditEventQuery {
            audit_type: audit_type.map(str::to_string),
            acknowledged: acknowledged.map(str::to_string),
            page: None,
        }
    }

    #[test]
    fn accepts_known_filters() {
        assert!(query(None, None).validate().is_ok());
        assert!(query(Some("contact_update"), Some("all")).validate().is_ok());
        assert!(query(Some("create_user"), Some("false")).validate().is_ok());
    }

    #[test]
    fn rejects_unknown_audit_type() {
        let err = query(Some("made_up"), None).validate().unwrap_err();
        assert!(err.contains("made_up"));
    }

    #[test]
    fn rejects_unknown_acknowledged_state() {
        assert!(query(None, Some("maybe")).validate().is_err());
    }
}
