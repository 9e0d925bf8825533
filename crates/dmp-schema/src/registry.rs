//! # Schema Registry
//!
//! Loads the catalogue's JSON Schemas once, checks each against its
//! meta-schema, and compiles a strict validator for each. Draft detection
//! follows each schema's `$schema` keyword; the catalogue is draft-04.
//!
//! ## Strict and relaxed validation
//!
//! Strict validators enforce the schema as written and are shared for the
//! life of the registry. Relaxed validators are compiled per call from a
//! copy of the schema whose `required` list is narrowed to a caller
//! allow-list and whose `anyOf` is removed. Drafts use relaxed validation
//! so that a supplier can save one page of answers at a time.
//!
//! ## Thread Safety
//!
//! `SchemaRegistry` is `Send + Sync` and immutable after construction;
//! servers share it behind an `Arc`.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jsonschema::Validator;
use serde_json::Value;

use crate::error::{SchemaValidationError, ValidationViolations, Violation};
use crate::name::SchemaName;
use crate::price::check_price_range;
use crate::translate::{translate, ErrorMap};

/// How much of a schema's `required`/`anyOf` to enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enforcement<'a> {
    /// The schema as written.
    Strict,
    /// Only the listed fields stay required, and `anyOf` is dropped.
    Relaxed {
        /// Fields still enforced as required, if the schema requires them.
        required_fields: &'a [String],
    },
}

struct LoadedSchema {
    schema: Value,
    strict: Arc<Validator>,
}

/// The loaded schema catalogue.
pub struct SchemaRegistry {
    schema_dir: Option<PathBuf>,
    schemas: HashMap<SchemaName, LoadedSchema>,
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("schema_dir", &self.schema_dir)
            .field("schemas", &self.schema_names())
            .finish()
    }
}

impl SchemaRegistry {
    /// Load every schema in [`SchemaName::ALL`] from `schema_dir`.
    ///
    /// # Errors
    ///
    /// Any schema that is missing, not valid JSON, not a valid JSON Schema,
    /// or fails to compile aborts the load. There is no partial registry.
    pub fn load(schema_dir: impl AsRef<Path>) -> Result<Self, SchemaValidationError> {
        let schema_dir = schema_dir.as_ref().to_path_buf();
        let mut schemas = HashMap::with_capacity(SchemaName::ALL.len());

        for name in SchemaName::ALL {
            let path = schema_dir.join(name.file_name());
            let content = std::fs::read_to_string(&path).map_err(|e| {
                SchemaValidationError::SchemaLoadError {
                    schema_name: path.display().to_string(),
                    reason: format!("cannot read schema file: {e}"),
                }
            })?;
            let value: Value = serde_json::from_str(&content).map_err(|e| {
                SchemaValidationError::SchemaLoadError {
                    schema_name: path.display().to_string(),
                    reason: format!("invalid JSON: {e}"),
                }
            })?;
            schemas.insert(name, LoadedSchema::prepare(name, value)?);
        }

        tracing::info!(
            count = schemas.len(),
            dir = %schema_dir.display(),
            "loaded JSON schemas"
        );
        Ok(Self {
            schema_dir: Some(schema_dir),
            schemas,
        })
    }

    /// Build a registry from in-memory schemas, with the same checks as
    /// [`SchemaRegistry::load`]. Names not supplied fail later lookups
    /// with [`SchemaValidationError::SchemaNotLoaded`].
    pub fn from_schemas(
        schemas: impl IntoIterator<Item = (SchemaName, Value)>,
    ) -> Result<Self, SchemaValidationError> {
        let schemas = schemas
            .into_iter()
            .map(|(name, value)| Ok((name, LoadedSchema::prepare(name, value)?)))
            .collect::<Result<HashMap<_, _>, SchemaValidationError>>()?;
        Ok(Self {
            schema_dir: None,
            schemas,
        })
    }

    /// Directory the schemas were loaded from, if any.
    pub fn schema_dir(&self) -> Option<&Path> {
        self.schema_dir.as_deref()
    }

    /// Number of loaded schemas.
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Loaded schema names, in catalogue order.
    pub fn schema_names(&self) -> Vec<SchemaName> {
        SchemaName::ALL
            .into_iter()
            .filter(|name| self.schemas.contains_key(name))
            .collect()
    }

    fn loaded(&self, name: SchemaName) -> Result<&LoadedSchema, SchemaValidationError> {
        self.schemas
            .get(&name)
            .ok_or_else(|| SchemaValidationError::SchemaNotLoaded(name.to_string()))
    }

    /// The stored schema document.
    pub fn schema(&self, name: SchemaName) -> Result<&Value, SchemaValidationError> {
        Ok(&self.loaded(name)?.schema)
    }

    /// Top-level `required` fields of the stored schema, in order.
    pub fn required_fields(&self, name: SchemaName) -> Result<Vec<String>, SchemaValidationError> {
        Ok(self.loaded(name)?
            .schema
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// The schema a relaxed validator for `name` is compiled from.
    pub fn relaxed_schema(
        &self,
        name: SchemaName,
        required_fields: &[String],
    ) -> Result<Value, SchemaValidationError> {
        Ok(relax(&self.loaded(name)?.schema, required_fields))
    }

    /// Resolve a validator for `name`.
    ///
    /// Strict enforcement returns the shared validator. Relaxed
    /// enforcement compiles a new one from [`relaxed_schema`](Self::relaxed_schema).
    pub fn validator(
        &self,
        name: SchemaName,
        enforcement: Enforcement<'_>,
    ) -> Result<BoundValidator<'_>, SchemaValidationError> {
        let loaded = self.loaded(name)?;
        match enforcement {
            Enforcement::Strict => Ok(BoundValidator {
                schema: Cow::Borrowed(&loaded.schema),
                validator: Arc::clone(&loaded.strict),
            }),
            Enforcement::Relaxed { required_fields } => {
                let schema = relax(&loaded.schema, required_fields);
                let validator = compile(name, &schema)?;
                Ok(BoundValidator {
                    schema: Cow::Owned(schema),
                    validator: Arc::new(validator),
                })
            }
        }
    }

    /// Whether `document` passes strict validation.
    pub fn is_valid(&self, name: SchemaName, document: &Value) -> Result<bool, SchemaValidationError> {
        Ok(self.loaded(name)?.strict.is_valid(document))
    }

    /// Strictly validate `document`, collecting every violation.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError::ValidationFailed` with structured
    /// violation details if the document is invalid.
    pub fn validate(&self, name: SchemaName, document: &Value) -> Result<(), SchemaValidationError> {
        let loaded = self.loaded(name)?;
        let violations: Vec<Violation> = loaded
            .strict
            .iter_errors(document)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaValidationError::ValidationFailed {
                schema_name: name.to_string(),
                violations: ValidationViolations::new(violations),
            })
        }
    }

    /// Validate `document` and translate every failure into an [`ErrorMap`],
    /// including the price range check.
    ///
    /// # Errors
    ///
    /// Fails only when the schema is not loaded, a relaxed validator cannot
    /// be compiled, or a price bound is not a decimal.
    pub fn validation_errors(
        &self,
        name: SchemaName,
        document: &Value,
        enforcement: Enforcement<'_>,
    ) -> Result<ErrorMap, SchemaValidationError> {
        let bound = self.validator(name, enforcement)?;
        let mut errors = bound.errors(document);
        let price_errors = check_price_range(document, &errors)?;
        errors.merge(price_errors);
        Ok(errors)
    }
}

impl LoadedSchema {
    fn prepare(name: SchemaName, schema: Value) -> Result<Self, SchemaValidationError> {
        jsonschema::meta::validate(&schema).map_err(|e| SchemaValidationError::InvalidSchema {
            schema_name: name.to_string(),
            reason: e.to_string(),
        })?;
        let strict = compile(name, &schema)?;
        Ok(Self {
            schema,
            strict: Arc::new(strict),
        })
    }
}

/// A validator together with the schema value it was compiled from.
pub struct BoundValidator<'r> {
    schema: Cow<'r, Value>,
    validator: Arc<Validator>,
}

impl BoundValidator<'_> {
    /// Translate this validator's failures for `document`. The price range
    /// check is not applied.
    pub fn errors(&self, document: &Value) -> ErrorMap {
        translate(self.validator.iter_errors(document), &self.schema)
    }
}

/// Every validator is built here so they share one format policy.
fn compile(name: SchemaName, schema: &Value) -> Result<Validator, SchemaValidationError> {
    jsonschema::options()
        .should_validate_formats(true)
        .build(schema)
        .map_err(|e| SchemaValidationError::ValidatorBuildError {
            schema_name: name.to_string(),
            reason: e.to_string(),
        })
}

/// Copy `schema` keeping only allow-listed `required` entries, and without
/// `anyOf`. An empty `required` list is removed, since draft-04 forbids it.
pub(crate) fn relax(schema: &Value, required_fields: &[String]) -> Value {
    let mut relaxed = schema.clone();
    if let Some(object) = relaxed.as_object_mut() {
        let kept: Vec<Value> = object
            .get("required")
            .and_then(Value::as_array)
            .map(|required| {
                required
                    .iter()
                    .filter(|field| {
                        field
                            .as_str()
                            .is_some_and(|f| required_fields.iter().any(|r| r == f))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if kept.is_empty() {
            object.remove("required");
        } else {
            object.insert("required".to_string(), Value::Array(kept));
        }
        object.remove("anyOf");
    }
    relaxed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::FieldError;
    use proptest::prelude::*;
    use serde_json::json;

    fn service_schema() -> Value {
        json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "title": "Test service",
            "type": "object",
            "properties": {
                "serviceName": {"type": "string", "minLength": 1, "maxLength": 100},
                "serviceSummary": {"type": "string", "pattern": "^(?:\\S+\\s+){0,49}\\S+$"},
                "priceMin": {"type": "string", "pattern": "^\\d+(?:\\.\\d{1,5})?$"},
                "priceMax": {"type": "string", "pattern": "^\\d+(?:\\.\\d{1,5})?$"},
                "priceUnit": {"enum": ["Unit", "Person", "Licence", "User"]}
            },
            "required": ["serviceName", "serviceSummary", "priceMin", "priceUnit"],
            "anyOf": [
                {"title": "priceUnit", "required": ["priceUnit"]},
                {"required": ["priceInterval"]}
            ]
        })
    }

    fn users_schema() -> Value {
        json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "type": "object",
            "properties": {
                "emailAddress": {"type": "string", "format": "email"},
                "role": {"enum": ["buyer", "supplier", "admin"]}
            },
            "required": ["emailAddress", "role"]
        })
    }

    fn registry() -> SchemaRegistry {
        SchemaRegistry::from_schemas([
            (SchemaName::ServicesGCloud7Saas, service_schema()),
            (SchemaName::Users, users_schema()),
        ])
        .unwrap()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn from_schemas_counts_and_names() {
        let reg = registry();
        assert_eq!(reg.schema_count(), 2);
        assert_eq!(
            reg.schema_names(),
            vec![SchemaName::ServicesGCloud7Saas, SchemaName::Users]
        );
        assert!(reg.schema_dir().is_none());
    }

    #[test]
    fn absent_schema_is_not_loaded() {
        let reg = registry();
        let err = reg.is_valid(SchemaName::Suppliers, &json!({})).unwrap_err();
        assert!(matches!(err, SchemaValidationError::SchemaNotLoaded(ref n) if n == "suppliers"));
    }

    #[test]
    fn meta_invalid_schema_is_rejected() {
        let bad = json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "type": "not-a-type"
        });
        let err = SchemaRegistry::from_schemas([(SchemaName::Users, bad)]).unwrap_err();
        assert!(matches!(err, SchemaValidationError::InvalidSchema { .. }), "got {err}");
    }

    #[test]
    fn required_fields_in_order() {
        let reg = registry();
        assert_eq!(
            reg.required_fields(SchemaName::ServicesGCloud7Saas).unwrap(),
            strings(&["serviceName", "serviceSummary", "priceMin", "priceUnit"])
        );
    }

    #[test]
    fn relaxed_schema_keeps_allow_listed_required_in_order() {
        let reg = registry();
        let relaxed = reg
            .relaxed_schema(
                SchemaName::ServicesGCloud7Saas,
                &strings(&["priceUnit", "serviceName", "notInSchema"]),
            )
            .unwrap();
        assert_eq!(relaxed["required"], json!(["serviceName", "priceUnit"]));
        assert!(relaxed.get("anyOf").is_none());
    }

    #[test]
    fn relaxed_schema_omits_empty_required() {
        let reg = registry();
        let relaxed = reg.relaxed_schema(SchemaName::ServicesGCloud7Saas, &[]).unwrap();
        assert!(relaxed.get("required").is_none());
        assert!(jsonschema::meta::is_valid(&relaxed));
    }

    #[test]
    fn relaxing_does_not_touch_stored_schema() {
        let reg = registry();
        let _ = reg
            .validator(SchemaName::ServicesGCloud7Saas, Enforcement::Relaxed { required_fields: &[] })
            .unwrap();
        assert_eq!(reg.schema(SchemaName::ServicesGCloud7Saas).unwrap(), &service_schema());
    }

    #[test]
    fn strict_reports_missing_required() {
        let reg = registry();
        let errors = reg
            .validation_errors(SchemaName::ServicesGCloud7Saas, &json!({}), Enforcement::Strict)
            .unwrap();
        for field in ["serviceName", "serviceSummary", "priceMin", "priceUnit"] {
            assert_eq!(errors.get(field), Some(&FieldError::AnswerRequired), "{field}");
        }
        assert_eq!(errors.form_errors(), ["priceUnit_required".to_string()]);
    }

    #[test]
    fn relaxed_reports_only_allow_listed_required() {
        let reg = registry();
        let fields = strings(&["serviceName"]);
        let errors = reg
            .validation_errors(
                SchemaName::ServicesGCloud7Saas,
                &json!({}),
                Enforcement::Relaxed { required_fields: &fields },
            )
            .unwrap();
        assert_eq!(errors.get("serviceName"), Some(&FieldError::AnswerRequired));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn relaxed_still_checks_present_values() {
        let reg = registry();
        let errors = reg
            .validation_errors(
                SchemaName::ServicesGCloud7Saas,
                &json!({"priceMin": "cheap"}),
                Enforcement::Relaxed { required_fields: &[] },
            )
            .unwrap();
        assert_eq!(errors.get("priceMin"), Some(&FieldError::NotMoneyFormat));
    }

    #[test]
    fn price_range_is_merged() {
        let reg = registry();
        let doc = json!({
            "serviceName": "Hosting",
            "serviceSummary": "Managed hosting",
            "priceMin": "20.00",
            "priceMax": "10.00",
            "priceUnit": "Unit"
        });
        let errors = reg
            .validation_errors(SchemaName::ServicesGCloud7Saas, &doc, Enforcement::Strict)
            .unwrap();
        assert_eq!(errors.get("priceMax"), Some(&FieldError::MaxLessThanMin));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn valid_document_has_no_errors() {
        let reg = registry();
        let doc = json!({
            "serviceName": "Hosting",
            "serviceSummary": "Managed hosting",
            "priceMin": "10.00",
            "priceMax": "20.00",
            "priceUnit": "Unit"
        });
        assert!(reg.is_valid(SchemaName::ServicesGCloud7Saas, &doc).unwrap());
        assert!(reg.validate(SchemaName::ServicesGCloud7Saas, &doc).is_ok());
        assert!(reg
            .validation_errors(SchemaName::ServicesGCloud7Saas, &doc, Enforcement::Strict)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn repeated_calls_give_identical_maps() {
        let reg = registry();
        let doc = json!({"serviceName": "", "priceMin": "x"});
        let first = reg
            .validation_errors(SchemaName::ServicesGCloud7Saas, &doc, Enforcement::Strict)
            .unwrap();
        let second = reg
            .validation_errors(SchemaName::ServicesGCloud7Saas, &doc, Enforcement::Strict)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn formats_are_asserted() {
        let reg = registry();
        let doc = json!({"emailAddress": "not-an-email", "role": "buyer"});
        assert!(!reg.is_valid(SchemaName::Users, &doc).unwrap());
        let ok = json!({"emailAddress": "someone@example.com", "role": "buyer"});
        assert!(reg.is_valid(SchemaName::Users, &ok).unwrap());
    }

    #[test]
    fn validate_collects_violations() {
        let reg = registry();
        let err = reg.validate(SchemaName::Users, &json!({"role": "pirate"})).unwrap_err();
        match &err {
            SchemaValidationError::ValidationFailed { schema_name, violations } => {
                assert_eq!(schema_name, "users");
                assert_eq!(violations.len(), 2);
                assert!(err.first_violation_message().is_some());
            }
            other => panic!("Expected ValidationFailed, got: {other}"),
        }
    }

    proptest! {
        #[test]
        fn relaxed_required_is_subset_of_strict(
            allow in proptest::collection::vec(
                prop_oneof![
                    Just("serviceName".to_string()),
                    Just("serviceSummary".to_string()),
                    Just("priceMin".to_string()),
                    Just("priceUnit".to_string()),
                    "[a-zA-Z]{1,12}",
                ],
                0..8,
            )
        ) {
            let strict = service_schema();
            let relaxed = relax(&strict, &allow);
            let strict_required: Vec<&Value> =
                strict["required"].as_array().map(|r| r.iter().collect()).unwrap_or_default();
            let relaxed_required: Vec<&Value> =
                relaxed.get("required").and_then(Value::as_array).map(|r| r.iter().collect()).unwrap_or_default();
            for field in &relaxed_required {
                prop_assert!(strict_required.contains(field));
                prop_assert!(allow.iter().any(|a| Some(a.as_str()) == field.as_str()));
            }
            let positions: Vec<usize> = relaxed_required
                .iter()
                .filter_map(|f| strict_required.iter().position(|s| s == f))
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(relaxed.get("anyOf").is_none());
        }
    }

    #[test]
    fn full_allow_list_equals_strict_required() {
        let strict = service_schema();
        let all = strings(&["serviceName", "serviceSummary", "priceMin", "priceUnit"]);
        assert_eq!(relax(&strict, &all)["required"], strict["required"]);
    }
}
