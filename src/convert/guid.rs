//! 128-bit unique identifiers.

use std::fmt;

use super::{trim_xml, XmlValue};
use crate::error::{Result, TreeError};

/// A 128-bit identifier written as 32 hex digits.
///
/// Accepted forms:
///
/// - `N`: `00112233445566778899aabbccddeeff`
/// - `D`: `00112233-4455-6677-8899-aabbccddeeff`
/// - `B`: the `D` form in braces
/// - `P`: the `D` form in parentheses
///
/// Output is always the lowercase `D` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Guid(u128);

/// Group lengths of the hyphenated form.
const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

impl Guid {
    /// The all-zero identifier.
    pub const NIL: Self = Self(0);

    /// Creates an identifier from its 128-bit value.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(value)
    }

    /// The 128-bit value.
    #[must_use]
    pub const fn as_u128(self) -> u128 {
        self.0
    }

    fn parse_hex(digits: &str) -> Option<u128> {
        (digits.len() == 32 && digits.bytes().all(|b| b.is_ascii_hexdigit()))
            .then(|| u128::from_str_radix(digits, 16).ok())
            .flatten()
    }

    fn parse_hyphenated(text: &str) -> Option<u128> {
        let groups: Vec<&str> = text.split('-').collect();
        if groups.len() != GROUPS.len() || groups.iter().zip(GROUPS).any(|(g, len)| g.len() != len) {
            return None;
        }
        Self::parse_hex(&groups.concat())
    }
}

impl XmlValue for Guid {
    const TYPE_NAME: &'static str = "guid";

    fn parse_xml(text: &str) -> Result<Self> {
        let trimmed = trim_xml(text);
        let inner = trimmed
            .strip_prefix('{')
            .and_then(|t| t.strip_suffix('}'))
            .or_else(|| trimmed.strip_prefix('(').and_then(|t| t.strip_suffix(')')));
        let value = match inner {
            Some(inner) => Self::parse_hyphenated(inner),
            None if trimmed.len() == 32 => Self::parse_hex(trimmed),
            None => Self::parse_hyphenated(trimmed),
        };
        value
            .map(Self)
            .ok_or_else(|| TreeError::format(text, Self::TYPE_NAME))
    }

    fn to_xml(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = format!("{:032x}", self.0);
        let mut start = 0;
        for (i, len) in GROUPS.iter().enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            f.write_str(&hex[start..start + len])?;
            start += len;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const D: &str = "6f9619ff-8b86-d011-b42d-00c04fc964ff";

    #[test]
    fn test_all_forms_parse_to_same_value() {
        let forms = [
            D.to_string(),
            D.replace('-', ""),
            format!("{{{D}}}"),
            format!("({D})"),
            D.to_uppercase(),
        ];
        for form in &forms {
            assert_eq!(Guid::parse_xml(form).map(|g| g.to_xml()), Ok(D.to_string()), "{form}");
        }
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in [
            "",
            "6f9619ff8b86d011b42d00c04fc964f",
            "6f9619ff-8b86-d011-b42d-00c04fc964fg",
            "6f9619ff-8b86d-011-b42d-00c04fc964ff",
            "{6f9619ff-8b86-d011-b42d-00c04fc964ff",
            "{6f9619ff8b86d011b42d00c04fc964ff}",
        ] {
            assert!(Guid::parse_xml(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_nil_display() {
        assert_eq!(Guid::NIL.to_string(), "00000000-0000-0000-0000-000000000000");
        assert_eq!(Guid::from_u128(1).as_u128(), 1);
    }
}
