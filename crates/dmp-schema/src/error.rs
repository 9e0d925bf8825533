//! # Schema Errors
//!
//! Failures raised while loading schemas, resolving validators, or
//! checking documents. Load-time variants are fatal for a server process;
//! `ValidationFailed` carries every violation with its instance path,
//! schema path, and message.

use std::fmt;

use thiserror::Error;

/// Error during schema loading or validation.
#[derive(Error, Debug)]
pub enum SchemaValidationError {
    /// The document did not conform to the schema.
    #[error("validation failed against schema '{schema_name}':\n{violations}")]
    ValidationFailed {
        /// Name of the schema that was validated against.
        schema_name: String,
        /// Structured list of individual violations.
        violations: ValidationViolations,
    },

    /// The schema file could not be read or parsed.
    #[error("schema load error for '{schema_name}': {reason}")]
    SchemaLoadError {
        /// Schema name or file path.
        schema_name: String,
        /// Reason the schema could not be loaded.
        reason: String,
    },

    /// The schema parsed but does not conform to its meta-schema.
    #[error("schema '{schema_name}' is not a valid JSON Schema: {reason}")]
    InvalidSchema {
        /// Schema name.
        schema_name: String,
        /// First meta-schema violation.
        reason: String,
    },

    /// The document file could not be loaded or parsed.
    #[error("document load error for '{path}': {reason}")]
    DocumentLoadError {
        /// Path to the document that failed to load.
        path: String,
        /// Reason the document could not be loaded.
        reason: String,
    },

    /// A compiled validator could not be built.
    #[error("validator build error for schema '{schema_name}': {reason}")]
    ValidatorBuildError {
        /// Schema name.
        schema_name: String,
        /// Reason the validator could not be built.
        reason: String,
    },

    /// A schema name string outside the known catalogue.
    #[error("unknown schema: {0}")]
    UnknownSchema(String),

    /// A known schema name that this registry was not built with.
    #[error("schema not loaded: {0}")]
    SchemaNotLoaded(String),

    /// A price field could not be read as an exact decimal.
    #[error("invalid decimal in '{field}': {value}")]
    InvalidDecimal {
        /// Document key holding the value.
        field: String,
        /// The offending value, as JSON.
        value: String,
    },
}

/// A single validation violation with structured context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer path to the violating field in the instance.
    pub instance_path: String,
    /// JSON Pointer path within the schema that triggered the error.
    pub schema_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// Collection of validation violations.
#[derive(Debug, Clone, Default)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    pub(crate) fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// The first violation, in engine order.
    pub fn first(&self) -> Option<&Violation> {
        self.violations.first()
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl SchemaValidationError {
    /// Message of the first violation, for `ValidationFailed`.
    pub fn first_violation_message(&self) -> Option<&str> {
        match self {
            Self::ValidationFailed { violations, .. } => {
                violations.first().map(|v| v.message.as_str())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_display_marks_root() {
        let v = Violation {
            instance_path: String::new(),
            schema_path: "/required".into(),
            message: "\"email\" is a required property".into(),
        };
        assert_eq!(v.to_string(), "  (root): \"email\" is a required property");
    }

    #[test]
    fn first_violation_message() {
        let err = SchemaValidationError::ValidationFailed {
            schema_name: "users".into(),
            violations: ValidationViolations::new(vec![
                Violation {
                    instance_path: "/role".into(),
                    schema_path: "/properties/role/enum".into(),
                    message: "first".into(),
                },
                Violation {
                    instance_path: "/email".into(),
                    schema_path: "/properties/email/format".into(),
                    message: "second".into(),
                },
            ]),
        };
        assert_eq!(err.first_violation_message(), Some("first"));
        assert!(err.to_string().contains("/role: first"));
        assert!(SchemaValidationError::UnknownSchema("x".into())
            .first_violation_message()
            .is_none());
    }
}
