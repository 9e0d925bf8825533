//! # Temporal Types — UTC Timestamps and Dates
//!
//! Defines `Timestamp`, a UTC-only timestamp rendered in the catalogue's
//! wire format: `YYYY-MM-DDTHH:MM:SS.ffffffZ`, always six fractional
//! digits and always `Z`. Record fields such as `createdAt`, `updatedAt`,
//! `loggedInAt` and `agreementReturnedAt` use this format.
//!
//! Date-only query parameters use `YYYY-MM-DD` and are checked with
//! [`is_valid_date`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Format for date-only values.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format for timestamps on the wire.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// A UTC timestamp, truncated to microsecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to microseconds.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// Wrap a `DateTime<Utc>`, discarding sub-microsecond precision.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_micros(dt))
    }

    /// Parse a wire-format timestamp. RFC 3339 strings with a `Z` suffix are
    /// also accepted; explicit offsets are rejected.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::InvalidTimestamp(s.to_string()));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, DATETIME_FORMAT) {
            return Ok(Self::from_utc(naive.and_utc()));
        }
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self::from_utc(dt.with_timezone(&Utc)))
            .map_err(|_| ValidationError::InvalidTimestamp(s.to_string()))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Render in [`DATETIME_FORMAT`].
    pub fn to_wire(&self) -> String {
        format_timestamp(&self.0)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Render a UTC datetime in [`DATETIME_FORMAT`].
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Whether `s` is a calendar date in [`DATE_FORMAT`].
pub fn is_valid_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, DATE_FORMAT).is_ok()
}

fn truncate_to_micros(dt: DateTime<Utc>) -> DateTime<Utc> {
    let micros = dt.nanosecond() / 1_000 * 1_000;
    dt.with_nanosecond(micros).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn wire_format_has_six_fraction_digits() {
        let dt = Utc.with_ymd_and_hms(2015, 6, 1, 9, 30, 0).unwrap();
        assert_eq!(format_timestamp(&dt), "2015-06-01T09:30:00.000000Z");
    }

    #[test]
    fn from_utc_truncates_to_micros() {
        let dt = Utc
            .with_ymd_and_hms(2015, 6, 1, 9, 30, 0)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap();
        let ts = Timestamp::from_utc(dt);
        assert_eq!(ts.to_wire(), "2015-06-01T09:30:00.123456Z");
    }

    #[test]
    fn parse_wire_format() {
        let ts = Timestamp::parse("2015-06-01T09:30:00.123456Z").unwrap();
        assert_eq!(ts.to_wire(), "2015-06-01T09:30:00.123456Z");
    }

    #[test]
    fn parse_accepts_rfc3339_z() {
        let ts = Timestamp::parse("2015-06-01T09:30:00Z").unwrap();
        assert_eq!(ts.to_wire(), "2015-06-01T09:30:00.000000Z");
    }

    #[test]
    fn parse_rejects_offsets_and_garbage() {
        assert!(Timestamp::parse("2015-06-01T09:30:00+01:00").is_err());
        assert!(Timestamp::parse("not-a-dateZ").is_err());
        assert!(Timestamp::parse("").is_err());
    }

    #[test]
    fn serde_uses_wire_format() {
        let ts = Timestamp::parse("2015-06-01T09:30:00.000001Z").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2015-06-01T09:30:00.000001Z\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn ordering() {
        let earlier = Timestamp::parse("2015-06-01T09:30:00.000000Z").unwrap();
        let later = Timestamp::parse("2015-06-01T09:30:00.000001Z").unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn dates() {
        assert!(is_valid_date("2015-02-28"));
        assert!(!is_valid_date("2015-02-30"));
        assert!(!is_valid_date("28/02/2015"));
        assert!(!is_valid_date(""));
    }
}
