//! # Request Body Helpers
//!
//! Request bodies are free-form JSON objects checked against the schema
//! catalogue, so handlers take `Result<Json<Value>, JsonRejection>` and
//! use these helpers to shape and validate them. Query strings go through
//! the [`Validate`] trait.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use dmp_core::payload::json_has_required_keys;
use dmp_schema::{Enforcement, SchemaName, SchemaRegistry};
use serde_json::{Map, Value};

use crate::error::AppError;

/// Key of the editor block every audited mutation carries.
pub const UPDATE_DETAILS_KEY: &str = "update_details";

/// Trait for query types that check rules serde cannot express.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a query value and validate it using the [`Validate`] trait.
pub fn validated<T: Validate>(value: T) -> Result<T, AppError> {
    value.validate().map_err(AppError::BadRequest)?;
    Ok(value)
}

/// Extract a JSON body that must be a JSON object.
pub fn extract_object(
    result: Result<Json<Value>, JsonRejection>,
) -> Result<Map<String, Value>, AppError> {
    match extract_json(result)? {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::BadRequest(
            "Invalid JSON; must be a valid JSON object".to_string(),
        )),
    }
}

/// Take the object stored under `key`, failing when it is missing or not an object.
pub fn object_field(body: &Map<String, Value>, key: &str) -> Result<Map<String, Value>, AppError> {
    json_has_required_keys(body, &[key])?;
    body.get(key)
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| AppError::BadRequest(format!("'{key}' must be a JSON object")))
}

/// Validate the `update_details` block and return who made the change.
pub fn updated_by(
    registry: &SchemaRegistry,
    body: &Map<String, Value>,
) -> Result<String, AppError> {
    let details = object_field(body, UPDATE_DETAILS_KEY)?;
    validated_updater(registry, Value::Object(details))
}

/// Validate a `{"updated_by": ...}` document and return the editor.
pub fn validated_updater(registry: &SchemaRegistry, details: Value) -> Result<String, AppError> {
    let errors =
        registry.validation_errors(SchemaName::ServicesUpdate, &details, Enforcement::Strict)?;
    AppError::check_document(errors)?;
    details
        .get("updated_by")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest("'updated_by' must be a string".to_string()))
}

/// Validate `document` and fail with its error map when it is not empty.
pub fn check_against(
    registry: &SchemaRegistry,
    name: SchemaName,
    document: &Map<String, Value>,
    enforcement: Enforcement<'_>,
) -> Result<(), AppError> {
    let errors = registry.validation_errors(name, &Value::Object(document.clone()), enforcement)?;
    AppError::check_document(errors)
}

/// Strictly validate an account or supplier document, failing with the
/// first violation as `"JSON was not a valid format. <message>"`.
pub fn check_format(
    registry: &SchemaRegistry,
    name: SchemaName,
    document: &Map<String, Value>,
) -> Result<(), AppError> {
    registry
        .validate(name, &Value::Object(document.clone()))
        .map_err(|err| match err.first_violation_message() {
            Some(message) => AppError::Validation(format!("JSON was not a valid format. {message}")),
            None => AppError::from(err),
        })
}

/// The `page_questions` list of a draft edit; absent means none.
pub fn page_questions(body: &Map<String, Value>) -> Result<Vec<String>, AppError> {
    let Some(value) = body.get("page_questions") else {
        return Ok(Vec::new());
    };
    let invalid = || AppError::BadRequest("'page_questions' must be a list of strings".to_string());
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|q| q.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}
