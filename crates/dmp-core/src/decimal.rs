//! # Exact Decimal Numbers
//!
//! Money fields arrive as strings such as `"12.5"` or `"0.00001"` and must
//! be compared exactly. [`Decimal`] stores a sign, a run of significant
//! digits and a power-of-ten exponent; it never touches floating point.
//!
//! Accepted syntax: optional surrounding whitespace, an optional sign,
//! digits with at most one `.` (at least one digit overall), and an
//! optional `e`/`E` exponent. `NaN` and infinities are rejected.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// An exact, normalized decimal value.
///
/// Normalization strips leading and trailing zeros from the digit run, so
/// `"1.50"`, `"1.5"` and `"15e-1"` are equal under `==` and `Ord`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    negative: bool,
    /// Significant digits, most significant first, each `0..=9`. Empty for zero.
    digits: Vec<u8>,
    /// Value is `digits * 10^exponent`.
    exponent: i64,
}

impl Decimal {
    /// The value zero.
    pub fn zero() -> Self {
        Self {
            negative: false,
            digits: Vec::new(),
            exponent: 0,
        }
    }

    /// Whether this value is zero.
    pub fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    /// Exponent of the most significant digit plus one. Only meaningful
    /// for non-zero values.
    fn adjusted(&self) -> i64 {
        self.exponent.saturating_add(self.digits.len() as i64)
    }

    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        match (self.is_zero(), other.is_zero()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        self.adjusted()
            .cmp(&other.adjusted())
            .then_with(|| self.digits.cmp(&other.digits))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => self.cmp_magnitude(other),
            (true, true) => other.cmp_magnitude(self),
        }
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Decimal {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidDecimal(s.to_string());
        let trimmed = s.trim();

        let (negative, unsigned) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let (mantissa, exp_part) = match unsigned.find(['e', 'E']) {
            Some(pos) => (&unsigned[..pos], Some(&unsigned[pos + 1..])),
            None => (unsigned, None),
        };

        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((i, f)) => (i, f),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let mut exponent: i64 = match exp_part {
            Some(e) => {
                let e_digits = e.strip_prefix(['+', '-']).unwrap_or(e);
                if e_digits.is_empty() || !e_digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                e.parse::<i64>().map_err(|_| invalid())?
            }
            None => 0,
        };
        exponent = exponent
            .checked_sub(frac_part.len() as i64)
            .ok_or_else(invalid)?;

        let mut digits: Vec<u8> = int_part
            .bytes()
            .chain(frac_part.bytes())
            .map(|b| b - b'0')
            .skip_while(|d| *d == 0)
            .collect();
        while digits.last() == Some(&0) {
            digits.pop();
            exponent = exponent.checked_add(1).ok_or_else(invalid)?;
        }

        if digits.is_empty() {
            return Ok(Self::zero());
        }
        Ok(Self {
            negative,
            digits,
            exponent,
        })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        if self.negative {
            f.write_str("-")?;
        }
        let digits: String = self.digits.iter().map(|d| char::from(b'0' + d)).collect();
        let adjusted = self.adjusted();
        if self.exponent >= 0 {
            if self.exponent > 30 {
                return write!(f, "{digits}E{}", self.exponent);
            }
            write!(f, "{digits}{}", "0".repeat(self.exponent as usize))
        } else if adjusted > 0 {
            let (int, frac) = digits.split_at(adjusted as usize);
            write!(f, "{int}.{frac}")
        } else if adjusted > -30 {
            write!(f, "0.{}{digits}", "0".repeat((-adjusted) as usize))
        } else {
            write!(f, "{digits}E{}", self.exponent)
        }
    }
}
