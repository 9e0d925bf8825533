//! # Domain Identity Newtypes
//!
//! Newtype wrappers for the catalogue's identifiers. These prevent
//! accidental identifier confusion: a `SupplierId` cannot be passed where
//! a `UserId` is expected even though both are integers on the wire.
//!
//! Service ids are strings and go through [`ServiceId::new`], which applies
//! the same character and length rules the HTTP layer enforces on path
//! parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Shortest accepted service id.
pub const MINIMUM_SERVICE_ID_LENGTH: usize = 10;
/// Longest accepted service id.
pub const MAXIMUM_SERVICE_ID_LENGTH: usize = 20;

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Access the inner integer.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>().map(Self)
            }
        }

        impl $name {
            #[doc = concat!("Short label used in audit records (`", $label, "`).")]
            pub const LABEL: &'static str = $label;
        }
    };
}

integer_id!(
    /// Supplier identifier (legacy numeric ids are preserved on import).
    SupplierId,
    "supplier"
);
integer_id!(
    /// Procurement framework identifier.
    FrameworkId,
    "framework"
);
integer_id!(
    /// Draft service identifier.
    DraftId,
    "draft_service"
);
integer_id!(
    /// User account identifier.
    UserId,
    "user"
);

/// A published service identifier, e.g. `"1234567890123456"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceId(String);

impl ServiceId {
    /// Create a validated service id.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        if is_valid_service_id(&s) {
            Ok(Self(s))
        } else {
            Err(ValidationError::InvalidServiceId(s))
        }
    }

    /// Return the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ServiceId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ServiceId> for String {
    fn from(value: ServiceId) -> Self {
        value.0
    }
}

/// Service ids contain only `[A-z0-9-]` and are 10 to 20 characters long.
pub fn is_valid_service_id(service_id: &str) -> bool {
    is_valid_string(
        service_id,
        MINIMUM_SERVICE_ID_LENGTH,
        MAXIMUM_SERVICE_ID_LENGTH,
    )
}

/// Check `s` against `^[A-z0-9-]{min,max}$`.
///
/// `A-z` is the ASCII range, so `[`, `\`, `]`, `^`, `_` and the backtick are
/// accepted alongside letters.
pub fn is_valid_string(s: &str, min: usize, max: usize) -> bool {
    let len = s.chars().count();
    (min..=max).contains(&len)
        && s
            .chars()
            .all(|c| ('A'..='z').contains(&c) || c.is_ascii_digit() || c == '-')
}

/// Acknowledged filter values accepted by audit listings.
pub fn is_valid_acknowledged_state(acknowledged: &str) -> bool {
    matches!(acknowledged, "all" | "true" | "false")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_id_accepts_digits() {
        let id = ServiceId::new("1234567890123456").unwrap();
        assert_eq!(id.as_str(), "1234567890123456");
    }

    #[test]
    fn service_id_rejects_short_and_long() {
        assert!(ServiceId::new("123456789").is_err());
        assert!(ServiceId::new("123456789012345678901").is_err());
    }

    #[test]
    fn service_id_rejects_punctuation() {
        assert!(!is_valid_service_id("1234567890-abc;"));
        assert!(!is_valid_service_id("12345 67890"));
        assert!(is_valid_service_id("abc-DEF-1234"));
    }

    #[test]
    fn ascii_range_quirk_is_preserved() {
        // `_` sits between `Z` and `a`.
        assert!(is_valid_string("a_b", 1, 255));
        assert!(!is_valid_string("a.b", 1, 255));
        assert!(!is_valid_string("", 1, 255));
    }

    #[test]
    fn service_id_deserialize_validates() {
        let ok: Result<ServiceId, _> = serde_json::from_str("\"1234567890\"");
        assert!(ok.is_ok());
        let bad: Result<ServiceId, _> = serde_json::from_str("\"bad id\"");
        assert!(bad.is_err());
    }

    #[test]
    fn integer_ids_are_transparent() {
        let json = serde_json::to_string(&SupplierId(92749)).unwrap();
        assert_eq!(json, "92749");
        assert_eq!("17".parse::<DraftId>().unwrap(), DraftId(17));
        assert_eq!(UserId(3).to_string(), "3");
    }

    #[test]
    fn acknowledged_states() {
        assert!(is_valid_acknowledged_state("all"));
        assert!(is_valid_acknowledged_state("false"));
        assert!(!is_valid_acknowledged_state("yes"));
    }
}
