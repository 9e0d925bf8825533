//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! - **Schema registry**: loaded once before the server binds, shared
//!   read-only behind an `Arc`.
//! - **Catalogue stores**: frameworks, suppliers, supplier framework
//!   interest, services, draft services, users, and audit events, each an
//!   in-memory [`Store`].
//! - **Database pool (optional)**: when present, audit events are written
//!   through to Postgres and reloaded on startup.

use std::collections::HashMap;
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use dmp_core::{
    AuditType, DraftId, DraftStatus, FrameworkId, FrameworkStatus, ServiceId, ServiceStatus,
    SupplierId, Timestamp, UserId, UserRole,
};
use dmp_schema::SchemaRegistry;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::PgPool;
use utoipa::ToSchema;

use crate::password::PasswordHash;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not `tokio::sync`)
/// because we never hold the lock across `.await` points.
#[derive(Debug)]
pub struct Store<K, T> {
    data: Arc<RwLock<HashMap<K, T>>>,
}

impl<K, T> Clone for Store<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Eq + Hash + Ord + Clone, T: Clone> Store<K, T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: K, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by key.
    pub fn get(&self, id: &K) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records in key order.
    pub fn list(&self) -> Vec<T> {
        self.filter(|_| true)
    }

    /// Records matching `predicate`, in key order.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        let guard = self.data.read();
        let mut entries: Vec<(&K, &T)> = guard.iter().filter(|(_, v)| predicate(v)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, v)| v.clone()).collect()
    }

    /// First record (in key order) matching `predicate`.
    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.filter(predicate).into_iter().next()
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &K, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        let entry = guard.get_mut(id)?;
        f(entry);
        Some(entry.clone())
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure runs under a single write lock. Returns `None` if the
    /// record doesn't exist, or `Some(result)` with the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        id: &K,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    /// Remove a record by key.
    pub fn remove(&self, id: &K) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &K) -> bool {
        self.data.read().contains_key(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Ord + Clone, T: Clone> Default for Store<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotonic integer id allocator shared across clones.
#[derive(Debug, Clone)]
pub struct IdSequence(Arc<AtomicI64>);

impl IdSequence {
    /// A sequence whose first id is `first`.
    pub fn starting_at(first: i64) -> Self {
        Self(Arc::new(AtomicI64::new(first)))
    }

    /// Allocate the next id.
    pub fn next_id(&self) -> i64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }

    /// Make sure future ids are greater than `used`.
    pub fn advance_past(&self, used: i64) {
        self.0.fetch_max(used.saturating_add(1), Ordering::SeqCst);
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

// -- Catalogue Records --------------------------------------------------------

/// A lot within a framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LotRecord {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub one_service_limit: bool,
}

/// A procurement framework.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FrameworkRecord {
    #[schema(value_type = i64)]
    pub id: FrameworkId,
    pub name: String,
    pub slug: String,
    /// Framework family, `g-cloud` or `dos`.
    pub framework: String,
    #[schema(value_type = String)]
    pub status: FrameworkStatus,
    pub lots: Vec<LotRecord>,
}

impl FrameworkRecord {
    /// The lot with slug `slug`, if the framework has one.
    pub fn lot(&self, slug: &str) -> Option<&LotRecord> {
        self.lots.iter().find(|lot| lot.slug == slug)
    }
}

/// One contact of a supplier.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactInformation {
    #[serde(default)]
    pub id: Option<i64>,
    pub contact_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub postcode: String,
}

/// A supplier company.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierRecord {
    #[schema(value_type = i64)]
    pub id: SupplierId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duns_number: Option<String>,
    #[serde(default, rename = "eSourcingId", skip_serializing_if = "Option::is_none")]
    pub e_sourcing_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companies_house_number: Option<String>,
    #[serde(default)]
    pub clients: Vec<String>,
    pub contact_information: Vec<ContactInformation>,
}

/// A supplier's registered interest in a framework.
#[derive(Debug, Clone)]
pub struct SupplierFrameworkRecord {
    pub supplier_id: SupplierId,
    pub framework_id: FrameworkId,
    /// Selection question answers; `None` until a declaration is made.
    pub declaration: Option<Map<String, Value>>,
    pub agreement_returned: bool,
    pub agreement_returned_at: Option<Timestamp>,
}

impl SupplierFrameworkRecord {
    /// The `status` field of the declaration, if any.
    pub fn declaration_status(&self) -> Option<String> {
        self.declaration
            .as_ref()
            .and_then(|d| d.get("status"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// A published service.
#[derive(Debug, Clone)]
pub struct ServiceRecord {
    pub service_id: ServiceId,
    pub supplier_id: SupplierId,
    pub framework_id: FrameworkId,
    pub framework_slug: String,
    pub lot: String,
    pub status: ServiceStatus,
    /// Answers, without the identifying keys above.
    pub data: Map<String, Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ServiceRecord {
    /// The document validated against the service schema.
    pub fn document(&self) -> Map<String, Value> {
        let mut doc = self.data.clone();
        doc.insert("id".into(), Value::String(self.service_id.to_string()));
        doc.insert("supplierId".into(), Value::from(self.supplier_id.get()));
        doc.insert("frameworkSlug".into(), Value::String(self.framework_slug.clone()));
        doc.insert("lot".into(), Value::String(self.lot.clone()));
        doc
    }
}

/// A service being prepared for a framework application.
#[derive(Debug, Clone)]
pub struct DraftServiceRecord {
    pub id: DraftId,
    pub supplier_id: SupplierId,
    pub framework_id: FrameworkId,
    pub framework_slug: String,
    pub lot: String,
    pub status: DraftStatus,
    pub data: Map<String, Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DraftServiceRecord {
    /// The document validated against the service schema.
    pub fn document(&self) -> Map<String, Value> {
        let mut doc = self.data.clone();
        doc.insert("supplierId".into(), Value::from(self.supplier_id.get()));
        doc.insert("frameworkSlug".into(), Value::String(self.framework_slug.clone()));
        doc.insert("lot".into(), Value::String(self.lot.clone()));
        doc
    }
}

/// A user account.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: UserId,
    pub email_address: String,
    pub name: String,
    pub role: UserRole,
    pub supplier_id: Option<SupplierId>,
    pub password: PasswordHash,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub password_changed_at: Timestamp,
    pub logged_in_at: Option<Timestamp>,
}

/// An audited mutation.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEventRecord {
    pub id: i64,
    #[serde(rename = "type")]
    #[schema(value_type = String)]
    pub audit_type: AuditType,
    /// Who made the change.
    pub user: String,
    pub data: Value,
    pub object_type: Option<String>,
    pub object_id: Option<String>,
    pub acknowledged: bool,
    #[schema(value_type = String)]
    pub created_at: Timestamp,
}

// -- Configuration ------------------------------------------------------------

/// Application configuration.
///
/// Custom `Debug` redacts the auth tokens to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Accepted bearer tokens. Empty disables authentication.
    pub auth_tokens: Vec<String>,
    /// Directory holding `<schema>.json` files.
    pub schemas_path: PathBuf,
    /// Absolute base for links in responses.
    pub base_url: String,
    /// Number of records per list page.
    pub page_size: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_tokens",
                &self.auth_tokens.iter().map(|_| "[REDACTED]").collect::<Vec<_>>(),
            )
            .field("schemas_path", &self.schemas_path)
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_tokens: Vec::new(),
            schemas_path: PathBuf::from("./json_schemas"),
            base_url: "http://localhost:8080".to_string(),
            page_size: 100,
        }
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: Arc<SchemaRegistry>,

    pub frameworks: Store<FrameworkId, FrameworkRecord>,
    pub suppliers: Store<SupplierId, SupplierRecord>,
    pub supplier_frameworks: Store<(SupplierId, FrameworkId), SupplierFrameworkRecord>,
    pub services: Store<ServiceId, ServiceRecord>,
    pub draft_services: Store<DraftId, DraftServiceRecord>,
    pub users: Store<UserId, UserRecord>,
    pub audit_events: Store<i64, AuditEventRecord>,

    pub supplier_ids: IdSequence,
    pub contact_ids: IdSequence,
    pub draft_ids: IdSequence,
    pub user_ids: IdSequence,
    pub audit_ids: IdSequence,

    /// PostgreSQL pool for audit persistence. `None` means in-memory only.
    pub db_pool: Option<PgPool>,

    pub config: AppConfig,
}

impl AppState {
    /// Create state with the seeded framework catalogue and no database.
    pub fn new(registry: Arc<SchemaRegistry>, config: AppConfig) -> Self {
        let state = Self {
            registry,
            frameworks: Store::new(),
            suppliers: Store::new(),
            supplier_frameworks: Store::new(),
            services: Store::new(),
            draft_services: Store::new(),
            users: Store::new(),
            audit_events: Store::new(),
            supplier_ids: IdSequence::default(),
            contact_ids: IdSequence::default(),
            draft_ids: IdSequence::default(),
            user_ids: IdSequence::default(),
            audit_ids: IdSequence::default(),
            db_pool: None,
            config,
        };
        for framework in seed_frameworks() {
            state.frameworks.insert(framework.id, framework);
        }
        state
    }

    /// Attach a database pool.
    pub fn with_db_pool(mut self, pool: Option<PgPool>) -> Self {
        self.db_pool = pool;
        self
    }

    /// The framework with slug `slug`.
    pub fn framework_by_slug(&self, slug: &str) -> Option<FrameworkRecord> {
        self.frameworks.find(|f| f.slug == slug)
    }

    /// Record an audit event, writing it through to the database when
    /// one is attached. Database failures are logged, not returned.
    pub async fn record_audit(
        &self,
        audit_type: AuditType,
        user: &str,
        data: Value,
        object: Option<(&str, String)>,
    ) -> AuditEventRecord {
        let (object_type, object_id) = match object {
            Some((kind, id)) => (Some(kind.to_string()), Some(id)),
            None => (None, None),
        };
        let event = AuditEventRecord {
            id: self.audit_ids.next_id(),
            audit_type,
            user: user.to_string(),
            data,
            object_type,
            object_id,
            acknowledged: false,
            created_at: Timestamp::now(),
        };
        self.audit_events.insert(event.id, event.clone());

        if let Some(pool) = &self.db_pool {
            if let Err(e) = crate::db::audit::append(pool, &event).await {
                tracing::warn!(audit_id = event.id, error = %e, "failed to persist audit event");
            }
        }
        event
    }

    /// Reload persisted audit events into the in-memory store.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let events = crate::db::audit::load_all(pool)
            .await
            .map_err(|e| format!("failed to load audit events: {e}"))?;
        let count = events.len();
        for event in events {
            self.audit_ids.advance_past(event.id);
            self.audit_events.insert(event.id, event);
        }

        tracing::info!(audit_events = count, "hydrated in-memory state from database");
        Ok(())
    }
}

fn lot(id: i64, slug: &str, name: &str, one_service_limit: bool) -> LotRecord {
    LotRecord {
        id,
        slug: slug.to_string(),
        name: name.to_string(),
        one_service_limit,
    }
}

fn g_cloud_lots() -> Vec<LotRecord> {
    vec![
        lot(1, "saas", "Software as a Service", false),
        lot(2, "paas", "Platform as a Service", false),
        lot(3, "iaas", "Infrastructure as a Service", false),
        lot(4, "scs", "Specialist Cloud Services", false),
    ]
}

/// The framework catalogue every server starts with.
pub fn seed_frameworks() -> Vec<FrameworkRecord> {
    let g_cloud = |id: i64, number: u8, status: FrameworkStatus| FrameworkRecord {
        id: FrameworkId(id),
        name: format!("G-Cloud {number}"),
        slug: format!("g-cloud-{number}"),
        framework: "g-cloud".to_string(),
        status,
        lots: g_cloud_lots(),
    };
    vec![
        g_cloud(1, 4, FrameworkStatus::Expired),
        g_cloud(2, 5, FrameworkStatus::Live),
        g_cloud(3, 6, FrameworkStatus::Live),
        g_cloud(4, 7, FrameworkStatus::Open),
        FrameworkRecord {
            id: FrameworkId(5),
            name: "Digital Outcomes and Specialists".to_string(),
            slug: "digital-outcomes-and-specialists".to_string(),
            framework: "dos".to_string(),
            status: FrameworkStatus::Coming,
            lots: vec![
                lot(5, "digital-outcomes", "Digital outcomes", true),
                lot(6, "digital-specialists", "Digital specialists", true),
                lot(7, "user-research-studios", "User research studios", false),
                lot(8, "user-research-participants", "User research participants", true),
            ],
        },
    ]
}
