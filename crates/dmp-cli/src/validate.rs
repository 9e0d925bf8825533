//! # Document Validation
//!
//! `dmp validate <SCHEMA> <FILE>` validates a JSON or YAML document and
//! prints the resulting field error map as JSON.
//!
//! ```bash
//! # Full validation, as a service import would run it:
//! dmp validate services-g-cloud-7-scs service.json
//!
//! # Page validation, as a draft edit would run it:
//! dmp validate services-g-cloud-7-scs page.yaml --relaxed --require serviceName
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use dmp_schema::{load_document, Enforcement, ErrorMap, SchemaName, SchemaRegistry};

/// Arguments for `dmp validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Schema name, e.g. `suppliers` or `services-g-cloud-7-scs`.
    pub schema: String,

    /// Document to validate (`.json`, `.yaml` or `.yml`).
    pub file: PathBuf,

    /// Enforce only the `--require` fields instead of the full schema.
    #[arg(long)]
    pub relaxed: bool,

    /// Field that stays required under `--relaxed`. Repeatable.
    #[arg(long = "require", requires = "relaxed")]
    pub require: Vec<String>,

    /// Directory containing the `<name>.json` schema files.
    #[arg(long)]
    pub schemas_dir: Option<PathBuf>,
}

/// Execute the validate subcommand.
///
/// Prints the error map and returns 0 when it is empty, 1 otherwise.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let dir = crate::schemas_dir(args.schemas_dir.as_ref());
    let registry = SchemaRegistry::load(&dir)
        .with_context(|| format!("loading schemas from {}", dir.display()))?;

    let errors = validate_file(&registry, args)?;
    println!("{}", serde_json::to_string_pretty(&errors)?);

    if errors.is_empty() {
        tracing::info!(schema = %args.schema, file = %args.file.display(), "document is valid");
        Ok(0)
    } else {
        tracing::info!(
            schema = %args.schema,
            file = %args.file.display(),
            errors = errors.len(),
            "document has validation errors"
        );
        Ok(1)
    }
}

/// Validate the document named by `args` against an already loaded
/// registry.
pub fn validate_file(registry: &SchemaRegistry, args: &ValidateArgs) -> Result<ErrorMap> {
    let name: SchemaName = args
        .schema
        .parse()
        .with_context(|| format!("unknown schema '{}'", args.schema))?;
    let document = read(&args.file)?;

    let enforcement = if args.relaxed {
        Enforcement::Relaxed {
            required_fields: &args.require,
        }
    } else {
        Enforcement::Strict
    };
    Ok(registry.validation_errors(name, &document, enforcement)?)
}

fn read(path: &Path) -> Result<serde_json::Value> {
    load_document(path).with_context(|| format!("reading {}", path.display()))
}
