//! Decimal text numbers.

use crate::error::{CodecError, CodecResult};
use std::cmp::Ordering;
use std::fmt;

/// A parsed native number.
///
/// The wire form is decimal text. Integral text parses to `Integer`,
/// anything with a fraction or exponent to `Float`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Integral number.
    Integer(i64),
    /// Fractional number.
    Float(f64),
}

impl Number {
    /// Parses decimal text.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidNumber`] if the text is not a finite
    /// decimal number.
    pub fn parse(text: &str) -> CodecResult<Self> {
        let trimmed = text.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return Ok(Number::Integer(n));
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Number::Float(f)),
            _ => Err(CodecError::invalid_number(text)),
        }
    }

    /// Returns the value as `i64`, truncating any fraction.
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(self) -> i64 {
        match self {
            Number::Integer(n) => n,
            Number::Float(f) => f.trunc() as i64,
        }
    }

    /// Returns the value as `f64`.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Integer(n) => n as f64,
            Number::Float(f) => f,
        }
    }

    /// Numeric ordering across integers and floats.
    pub fn cmp_numeric(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Number::Integer(a), Number::Integer(b)) => a.cmp(b),
            _ => self
                .as_f64()
                .partial_cmp(&other.as_f64())
                .unwrap_or(Ordering::Equal),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(n) => write!(f, "{n}"),
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Formats an integer as native number text.
pub fn format_integer(n: i64) -> String {
    n.to_string()
}

/// Formats a float as native number text.
///
/// Rust's shortest round-trip formatting guarantees that parsing the text
/// yields the same `f64`.
///
/// # Errors
///
/// Returns [`CodecError::NonFiniteNumber`] for NaN and infinities.
pub fn format_float(f: f64) -> CodecResult<String> {
    if f.is_finite() {
        Ok(f.to_string())
    } else {
        Err(CodecError::NonFiniteNumber)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_integer_and_float() {
        assert_eq!(Number::parse("42").unwrap(), Number::Integer(42));
        assert_eq!(Number::parse("-7").unwrap(), Number::Integer(-7));
        assert_eq!(Number::parse("1.5").unwrap(), Number::Float(1.5));
        assert_eq!(Number::parse("1e3").unwrap(), Number::Float(1000.0));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            Number::parse("forty"),
            Err(CodecError::InvalidNumber { .. })
        ));
        assert!(Number::parse("NaN").is_err());
        assert!(Number::parse("inf").is_err());
    }

    #[test]
    fn numeric_ordering_mixes_kinds() {
        let two = Number::Integer(2);
        let two_and_half = Number::Float(2.5);
        assert_eq!(two.cmp_numeric(&two_and_half), Ordering::Less);
        assert_eq!(
            Number::Float(2.0).cmp_numeric(&Number::Integer(2)),
            Ordering::Equal
        );
        assert_eq!(
            Number::Integer(10).cmp_numeric(&Number::Integer(9)),
            Ordering::Greater
        );
    }

    #[test]
    fn truncation() {
        assert_eq!(Number::Float(9.99).as_i64(), 9);
        assert_eq!(Number::Float(-9.99).as_i64(), -9);
    }

    #[test]
    fn float_text_roundtrips() {
        let text = format_float(0.1 + 0.2).unwrap();
        assert_eq!(Number::parse(&text).unwrap().as_f64(), 0.1 + 0.2);
        assert_eq!(format_float(f64::NAN), Err(CodecError::NonFiniteNumber));
    }
}
