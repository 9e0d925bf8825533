//! # Error Types
//!
//! Validation failures raised by the constructors and parsers in this
//! crate. All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations and carry the offending input.

use thiserror::Error;

/// A value failed a domain validation rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Service ids are 10 to 20 characters of `[A-z0-9-]`.
    #[error("invalid service ID supplied: {0}")]
    InvalidServiceId(String),

    /// The string is not an exact decimal number.
    #[error("invalid decimal value: {0:?}")]
    InvalidDecimal(String),

    /// Not a UTC timestamp in the wire format.
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// A status string outside the closed vocabulary.
    #[error("invalid {kind} value: {value}")]
    InvalidStatus {
        /// Which vocabulary was being parsed (e.g. "framework status").
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A payload did not have the expected set of keys.
    #[error("{0}")]
    InvalidKeys(String),
}
