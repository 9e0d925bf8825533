//! # dmp-schema — Schema Validation & Error Mapping
//!
//! Validates catalogue documents (services, suppliers, users) against the
//! JSON Schemas in `json_schemas/` and turns validation failures into the
//! stable error codes front ends render.
//!
//! ## Components
//!
//! - [`SchemaRegistry`] loads the closed set of [`SchemaName`]s once,
//!   meta-validates them, and compiles a shared strict validator for each.
//! - [`SchemaRegistry::validator`] resolves a strict or relaxed
//!   ([`Enforcement`]) validator. Relaxed validators enforce only an
//!   allow-listed subset of `required` and skip `anyOf`.
//! - [`SchemaRegistry::validation_errors`] produces an [`ErrorMap`]: field
//!   codes such as `answer_required` or `under_50_words`, form errors under
//!   `_form`, and `max_less_than_min` from the price range check.
//!
//! ## Crate Policy
//!
//! - Depends only on `dmp-core` internally.
//! - Schema loading is all-or-nothing: a server must not start with a
//!   partial catalogue.
//! - Error codes are a public contract; untranslated failures keep the
//!   engine's message rather than inventing a code.

pub mod document;
pub mod error;
pub mod name;
pub mod price;
pub mod registry;
pub mod translate;

pub use document::{load_document, yaml_to_json_value};
pub use error::{SchemaValidationError, ValidationViolations, Violation};
pub use name::SchemaName;
pub use price::{check_price_range, price_keys};
pub use registry::{BoundValidator, Enforcement, SchemaRegistry};
pub use translate::{ErrorMap, FieldError, FORM_ERRORS_KEY};
