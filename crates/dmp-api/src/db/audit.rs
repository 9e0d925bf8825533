//! Audit event persistence.

use chrono::{DateTime, Utc};
use dmp_core::{AuditType, Timestamp};
use sqlx::PgPool;

use crate::state::AuditEventRecord;

/// Append an audit event to the log.
pub async fn append(pool: &PgPool, event: &AuditEventRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_events (id, audit_type, updated_by, data, object_type,
         object_id, acknowledged, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(event.id)
    .bind(event.audit_type.as_str())
    .bind(&event.user)
    .bind(&event.data)
    .bind(&event.object_type)
    .bind(&event.object_id)
    .bind(event.acknowledged)
    .bind(*event.created_at.as_datetime())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load every persisted audit event, oldest first.
///
/// Rows with an audit type this build does not know are skipped with a
/// warning.
pub async fn load_all(pool: &PgPool) -> Result<Vec<AuditEventRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AuditEventRow>(
        "SELECT id, audit_type, updated_by, data, object_type, object_id,
         acknowledged, created_at
         FROM audit_events ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(AuditEventRow::into_record).collect())
}

/// Database row for audit events.
#[derive(sqlx::FromRow)]
pub struct AuditEventRow {
    pub id: i64,
    pub audit_type: String,
    pub updated_by: String,
    pub data: serde_json::Value,
    pub object_type: Option<String>,
    pub object_id: Option<String>,
    pub acknowledged: bool,
    pub created_at: DateTime<Utc>,
}

impl AuditEventRow {
    fn into_record(self) -> Option<AuditEventRecord> {
        let audit_type = match self.audit_type.parse::<AuditType>() {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(audit_id = self.id, error = %e, "skipping audit event");
                return None;
            }
        };
        Some(AuditEventRecord {
            id: self.id,
            audit_type,
            user: self.updated_by,
            data: self.data,
            object_type: self.object_type,
            object_id: self.object_id,
            acknowledged: self.acknowledged,
            created_at: Timestamp::from_utc(self.created_at),
        })
    }
}
