//! # Schema Listing
//!
//! `dmp schemas` loads the registry and prints one line per schema with
//! the number of fields it requires under strict enforcement.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use dmp_schema::SchemaRegistry;

/// Arguments for `dmp schemas`.
#[derive(Args, Debug)]
pub struct SchemasArgs {
    /// Directory containing the `<name>.json` schema files.
    #[arg(long)]
    pub schemas_dir: Option<PathBuf>,
}

/// Execute the schemas subcommand.
pub fn run_schemas(args: &SchemasArgs) -> Result<u8> {
    let dir = crate::schemas_dir(args.schemas_dir.as_ref());
    let registry = SchemaRegistry::load(&dir)
        .with_context(|| format!("loading schemas from {}", dir.display()))?;

    for line in schema_lines(&registry)? {
        println!("{line}");
    }
    tracing::info!(count = registry.schema_count(), "schemas listed");
    Ok(0)
}

/// One `name  (N required)` line per loaded schema, in catalogue order.
pub fn schema_lines(registry: &SchemaRegistry) -> Result<Vec<String>> {
    let names = registry.schema_names();
    let width = names.iter().map(|n| n.as_str().len()).max().unwrap_or(0);
    names
        .into_iter()
        .map(|name| {
            let required = registry.required_fields(name)?.len();
            Ok(format!("{:<width$}  ({required} required)", name.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmp_schema::SchemaName;
    use serde_json::json;

    #[test]
    fn lists_required_counts() {
        let registry = SchemaRegistry::from_schemas([(
            SchemaName::UsersAuth,
            json!({
                "type": "object",
                "properties": {"emailAddress": {"type": "string"}, "password": {"type": "string"}},
                "required": ["emailAddress", "password"]
            }),
        )])
        .unwrap();
        let lines = schema_lines(&registry).unwrap();
        assert_eq!(lines, vec!["users-auth  (2 required)".to_string()]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = SchemasArgs {
            schemas_dir: Some(dir.path().join("nope")),
        };
        assert!(run_schemas(&args).is_err());
    }
}
