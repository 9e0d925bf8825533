//! # Error Translation
//!
//! Converts raw `jsonschema` errors into an [`ErrorMap`]: one stable code
//! per field, plus an ordered list of form-level messages under `_form`.
//! Front ends key their user-facing copy on these codes, so the
//! vocabulary is fixed:
//!
//! | Constraint (field path present) | Code |
//! |---|---|
//! | `minLength`, `minItems` | `answer_required` |
//! | `minimum`, `maximum` | `not_a_number` |
//! | `maxItems` | `under_10_items` |
//! | `maxLength` | `under_character_limit` |
//! | `required` | `assurance_required` for `assurance`, else `answer_required` |
//! | `pattern` on a price key | `not_money_format` |
//! | `pattern` with a `{0,k}` quantifier | `under_<k+1>_words` |
//! | `enum` on `priceUnit` | `no_unit_specified` |
//! | `type` declared `"number"` | `not_a_number` |
//!
//! Anything else keeps the engine's message. Errors without an instance
//! path are top-level `required` (the missing property becomes the key),
//! `anyOf` (form error `<title>_required` from the first alternative's
//! title, or nothing), or a raw form error.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use jsonschema::error::{TypeKind, ValidationErrorKind};
use jsonschema::primitive_type::PrimitiveType;
use jsonschema::ValidationError;
use regex::Regex;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

/// Key under which form-level errors are reported.
pub const FORM_ERRORS_KEY: &str = "_form";

const PRICE_SUFFIXES: [&str; 4] = ["priceMin", "priceMax", "PriceMin", "PriceMax"];

/// A per-field error code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    AnswerRequired,
    AssuranceRequired,
    NotANumber,
    Under10Items,
    UnderCharacterLimit,
    NotMoneyFormat,
    /// `under_<n>_words`.
    UnderWords(u64),
    NoUnitSpecified,
    MaxLessThanMin,
    /// Untranslated engine message.
    Message(String),
}

impl FieldError {
    /// The wire code.
    pub fn code(&self) -> String {
        match self {
            Self::AnswerRequired => "answer_required".into(),
            Self::AssuranceRequired => "assurance_required".into(),
            Self::NotANumber => "not_a_number".into(),
            Self::Under10Items => "under_10_items".into(),
            Self::UnderCharacterLimit => "under_character_limit".into(),
            Self::NotMoneyFormat => "not_money_format".into(),
            Self::UnderWords(n) => format!("under_{n}_words"),
            Self::NoUnitSpecified => "no_unit_specified".into(),
            Self::MaxLessThanMin => "max_less_than_min".into(),
            Self::Message(m) => m.clone(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

impl PartialEq<&str> for FieldError {
    fn eq(&self, other: &&str) -> bool {
        self.code() == *other
    }
}

impl Serialize for FieldError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code())
    }
}

/// Field errors plus form-level errors for one validation call.
///
/// Serializes as a flat JSON object: each field key maps to its code and,
/// when present, `_form` maps to the list of form messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMap {
    fields: BTreeMap<String, FieldError>,
    form: Vec<String>,
}

impl ErrorMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when there are neither field nor form errors.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.form.is_empty()
    }

    /// Number of field errors, plus one if any form errors exist.
    pub fn len(&self) -> usize {
        self.fields.len() + usize::from(!self.form.is_empty())
    }

    /// The error recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.fields.get(field)
    }

    /// Whether `field` has an error.
    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Record a field error. Later writes replace earlier ones.
    pub fn insert(&mut self, field: impl Into<String>, error: FieldError) {
        self.fields.insert(field.into(), error);
    }

    /// Append a form-level error.
    pub fn push_form_error(&mut self, message: impl Into<String>) {
        self.form.push(message.into());
    }

    /// Form-level errors in the order they were raised.
    pub fn form_errors(&self) -> &[String] {
        &self.form
    }

    /// Field errors, sorted by key.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldError)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge `other` into `self`: fields overwrite, form errors append.
    pub fn merge(&mut self, other: ErrorMap) {
        self.fields.extend(other.fields);
        self.form.extend(other.form);
    }
}

impl Serialize for ErrorMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, error) in &self.fields {
            map.serialize_entry(key, error)?;
        }
        if !self.form.is_empty() {
            map.serialize_entry(FORM_ERRORS_KEY, &self.form)?;
        }
        map.end()
    }
}

/// Where one engine error lands in the map.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Field(String, FieldError),
    Form(String),
    Drop,
}

/// Translate every error into `schema`'s error map. `schema` must be the
/// value the validator was compiled from, so top-level `anyOf` schema
/// paths resolve.
pub(crate) fn translate<'a>(
    errors: impl Iterator<Item = ValidationError<'a>>,
    schema: &Value,
) -> ErrorMap {
    let mut map = ErrorMap::new();
    for error in errors {
        match classify(&error, schema) {
            Outcome::Field(key, code) => map.insert(key, code),
            Outcome::Form(message) => map.push_form_error(message),
            Outcome::Drop => {}
        }
    }
    map
}

fn classify(error: &ValidationError<'_>, schema: &Value) -> Outcome {
    let instance_path = error.instance_path.to_string();

    if let Some(key) = first_segment(&instance_path) {
        let code = field_code(&key, &error.kind, error.to_string());
        return Outcome::Field(key, code);
    }

    match &error.kind {
        ValidationErrorKind::Required { property } => match property.as_str() {
            Some(name) => Outcome::Field(name.to_string(), FieldError::AnswerRequired),
            None => Outcome::Form(error.to_string()),
        },
        ValidationErrorKind::AnyOf { .. } => {
            let title = schema
                .pointer(&error.schema_path.to_string())
                .and_then(|alternatives| alternatives.get(0))
                .and_then(|first| first.get("title"))
                .and_then(Value::as_str);
            match title {
                Some(title) => Outcome::Form(format!("{title}_required")),
                None => Outcome::Drop,
            }
        }
        _ => Outcome::Form(error.to_string()),
    }
}

fn field_code(key: &str, kind: &ValidationErrorKind, message: String) -> FieldError {
    match kind {
        ValidationErrorKind::MinLength { .. } | ValidationErrorKind::MinItems { .. } => {
            FieldError::AnswerRequired
        }
        ValidationErrorKind::Minimum { .. } | ValidationErrorKind::Maximum { .. } => {
            FieldError::NotANumber
        }
        ValidationErrorKind::MaxItems { .. } => FieldError::Under10Items,
        ValidationErrorKind::MaxLength { .. } => FieldError::UnderCharacterLimit,
        ValidationErrorKind::Required { property } => {
            if property.as_str() == Some("assurance") {
                FieldError::AssuranceRequired
            } else {
                FieldError::AnswerRequired
            }
        }
        ValidationErrorKind::Pattern { pattern } => {
            if is_price_key(key) {
                return FieldError::NotMoneyFormat;
            }
            word_limit(pattern)
                .map(FieldError::UnderWords)
                .unwrap_or(FieldError::Message(message))
        }
        ValidationErrorKind::Enum { .. } if key == "priceUnit" => FieldError::NoUnitSpecified,
        ValidationErrorKind::Type {
            kind: TypeKind::Single(PrimitiveType::Number),
        } => FieldError::NotANumber,
        _ => FieldError::Message(message),
    }
}

/// Whether `key` names a price bound.
pub(crate) fn is_price_key(key: &str) -> bool {
    PRICE_SUFFIXES.iter().any(|suffix| key.ends_with(suffix))
}

/// Word count allowed by a `(?:\S+\s+){0,k}\S+` style pattern: `k + 1`.
fn word_limit(pattern: &str) -> Option<u64> {
    static QUANTIFIER: OnceLock<Option<Regex>> = OnceLock::new();
    let re = QUANTIFIER
        .get_or_init(|| Regex::new(r"\{0,(\d+)").ok())
        .as_ref()?;
    let upper: u64 = re.captures(pattern)?.get(1)?.as_str().parse().ok()?;
    upper.checked_add(1)
}

/// First segment of a JSON pointer, unescaped.
fn first_segment(pointer: &str) -> Option<String> {
    let rest = pointer.strip_prefix('/')?;
    let segment = rest.split('/').next()?;
    Some(segment.replace("~1", "/").replace("~0", "~"))
}
