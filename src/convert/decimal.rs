//! Arbitrary-precision decimal numbers (`xs:decimal`).

use std::cmp::Ordering;
use std::fmt;

use super::{all_digits, trim_xml, XmlValue};
use crate::error::{Result, TreeError};

/// A decimal number of unbounded precision.
///
/// Stored as a sign and the digits on either side of the decimal point,
/// normalized so that equal numbers compare equal: `1.50` and `+1.5` are
/// the same value, and there is no negative zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Decimal {
    negative: bool,
    /// Integer digits without leading zeros; empty for zero.
    integer: String,
    /// Fraction digits without trailing zeros.
    fraction: String,
}

impl Decimal {
    /// Returns `true` for a value below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Returns `true` for zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.integer.is_empty() && self.fraction.is_empty()
    }

    /// Number of digits after the decimal point.
    #[must_use]
    pub fn scale(&self) -> usize {
        self.fraction.len()
    }

    /// The nearest `f64`.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }

    fn normalized(negative: bool, integer: &str, fraction: &str) -> Self {
        let integer = integer.trim_start_matches('0').to_string();
        let fraction = fraction.trim_end_matches('0').to_string();
        let zero = integer.is_empty() && fraction.is_empty();
        Self {
            negative: negative && !zero,
            integer,
            fraction,
        }
    }

    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        self.integer
            .len()
            .cmp(&other.integer.len())
            .then_with(|| self.integer.cmp(&other.integer))
            .then_with(|| self.fraction.cmp(&other.fraction))
    }
}

impl XmlValue for Decimal {
    const TYPE_NAME: &'static str = "decimal";

    fn parse_xml(text: &str) -> Result<Self> {
        let trimmed = trim_xml(text);
        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let (integer, fraction) = body.split_once('.').unwrap_or((body, ""));
        let valid = match (integer.is_empty(), fraction.is_empty()) {
            (true, true) => false,
            (false, true) => all_digits(integer),
            (true, false) => all_digits(fraction),
            (false, false) => all_digits(integer) && all_digits(fraction),
        };
        if !valid {
            return Err(TreeError::format(text, Self::TYPE_NAME));
        }
        Ok(Self::normalized(negative, integer, fraction))
    }

    fn to_xml(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        if self.integer.is_empty() {
            f.write_str("0")?;
        } else {
            f.write_str(&self.integer)?;
        }
        if !self.fraction.is_empty() {
            write!(f, ".{}", self.fraction)?;
        }
        Ok(())
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self::normalized(value < 0, &value.unsigned_abs().to_string(), "")
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
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

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(text: &str) -> Decimal {
        let Ok(value) = Decimal::parse_xml(text) else {
            panic!("not a decimal: {text}");
        };
        value
    }

    #[test]
    fn test_normalization() {
        assert_eq!(dec("1.50"), dec("+001.5"));
        assert_eq!(dec("-0.000"), dec("0"));
        assert_eq!(dec("-0").to_string(), "0");
        assert_eq!(dec(".25").to_string(), "0.25");
        assert_eq!(dec("7.").to_string(), "7");
        assert_eq!(dec("-12.340").scale(), 2);
    }

    #[test]
    fn test_keeps_precision_beyond_f64() {
        let text = "123456789012345678901234567890.000000000000000000001";
        assert_eq!(dec(text).to_xml(), text);
    }

    #[test]
    fn test_rejects_non_decimal_forms() {
        for bad in ["", ".", "+", "1e5", "1,5", "--1", "1.2.3", "INF", " 1 2 "] {
            assert!(Decimal::parse_xml(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_ordering() {
        assert!(dec("-2") < dec("-1.5"));
        assert!(dec("-1") < dec("0"));
        assert!(dec("0.5") < dec("0.51"));
        assert!(dec("10") > dec("9.999"));
        assert_eq!(Decimal::from(-42), dec("-42.0"));
    }
}
