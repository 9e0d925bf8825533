//! # Request Payload Helpers
//!
//! Request bodies are free-form JSON objects. These helpers clean and
//! shape a `serde_json::Map` before it reaches a schema validator, and
//! check key-set requirements that the HTTP layer reports as 400s.

use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Trim whitespace from top-level string values.
///
/// Strings inside top-level arrays are trimmed too, and array entries that
/// become empty are removed. Nested objects are left untouched.
pub fn strip_whitespace_from_data(data: &mut Map<String, Value>) {
    for value in data.values_mut() {
        match value {
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.len() != s.len() {
                    *s = trimmed.to_string();
                }
            }
            Value::Array(items) => {
                items.retain_mut(|item| match item {
                    Value::String(s) => {
                        *s = s.trim().to_string();
                        !s.is_empty()
                    }
                    _ => true,
                });
            }
            _ => {}
        }
    }
}

/// Remove top-level keys whose value is `null`.
pub fn purge_nulls_from_data(data: &mut Map<String, Value>) {
    data.retain(|_, v| !v.is_null());
}

/// Return a copy of `data` without the given keys.
pub fn drop_foreign_fields(data: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    let mut out = data.clone();
    for key in keys {
        out.remove(*key);
    }
    out
}

/// Fail unless every key in `keys` is present.
pub fn json_has_required_keys(data: &Map<String, Value>, keys: &[&str]) -> Result<(), ValidationError> {
    let missing: Vec<&str> = keys
        .iter()
        .copied()
        .filter(|k| !data.contains_key(*k))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::InvalidKeys(format!(
            "Invalid JSON must have {missing:?} keys"
        )))
    }
}

/// Fail unless the key set of `data` is exactly `keys`.
pub fn json_only_has_required_keys(
    data: &Map<String, Value>,
    keys: &[&str],
) -> Result<(), ValidationError> {
    let exact = data.len() == keys.len() && keys.iter().all(|k| data.contains_key(*k));
    if exact {
        Ok(())
    } else {
        Err(ValidationError::InvalidKeys(format!(
            "Invalid JSON must only have {keys:?} keys"
        )))
    }
}

/// Fail when `data` carries an `id` that differs from the path id.
pub fn json_has_matching_id(data: &Map<String, Value>, id: &Value) -> Result<(), ValidationError> {
    match data.get("id") {
        Some(found) if found != id => Err(ValidationError::InvalidKeys(
            "id parameter must match id in data".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Join items as English prose with an Oxford comma:
/// `a`, `a and b`, `a, b, and c`.
pub fn display_list<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [one] => one.as_ref().to_string(),
        [a, b] => format!("{} and {}", a.as_ref(), b.as_ref()),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(AsRef::as_ref).collect();
            format!("{}, and {}", head.join(", "), last.as_ref())
        }
    }
}
