//! # dmp-core — Foundational Types for the Catalogue API
//!
//! Shared building blocks for every other crate in the workspace. It
//! depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `SupplierId`, `FrameworkId`, `DraftId`,
//!    `UserId` and `ServiceId` are distinct types. A `ServiceId` can only be
//!    built through its validating constructor.
//!
//! 2. **Closed domain vocabularies.** Framework, draft, service and user
//!    states are enums with a single wire spelling each, so an invalid
//!    status string is rejected at the deserialization boundary.
//!
//! 3. **Exact decimals for money.** Prices are compared with [`Decimal`],
//!    never through `f64`.
//!
//! 4. **Payload helpers operate on `serde_json` maps.** Request bodies are
//!    free-form JSON objects validated by schema; the helpers in
//!    [`payload`] clean and shape them without assuming a struct layout.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `dmp-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod decimal;
pub mod domain;
pub mod error;
pub mod identity;
pub mod payload;
pub mod temporal;

pub use decimal::Decimal;
pub use domain::{AuditType, DraftStatus, FrameworkStatus, ServiceStatus, UserRole};
pub use error::ValidationError;
pub use identity::{
    is_valid_acknowledged_state, is_valid_service_id, is_valid_string, DraftId, FrameworkId,
    ServiceId, SupplierId, UserId,
};
pub use temporal::{format_timestamp, is_valid_date, Timestamp, DATETIME_FORMAT, DATE_FORMAT};
