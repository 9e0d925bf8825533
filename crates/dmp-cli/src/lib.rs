//! # dmp-cli — Schema Catalogue Command-Line Interface
//!
//! Offline access to the same schema registry the API service loads, so
//! schema authors can check documents without running the server.
//!
//! ## Subcommands
//!
//! - `schemas` — List loaded schemas and their required-field counts
//! - `validate` — Validate a JSON or YAML document and print its error map
//!
//! ## Crate Policy
//!
//! - CLI construction (argument parsing) is separated from business logic.
//! - Handler functions delegate to `dmp-schema`; no validation logic here.
//! - Handlers return the process exit code: 0 on success, 1 on failure.

pub mod schemas;
pub mod validate;

use std::path::PathBuf;

/// Directory the schema registry is loaded from unless `--schemas-dir`
/// is given.
pub const DEFAULT_SCHEMAS_DIR: &str = "json_schemas";

/// Resolve the schema directory from an optional override.
pub fn schemas_dir(override_dir: Option<&PathBuf>) -> PathBuf {
    override_dir
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMAS_DIR))
}
