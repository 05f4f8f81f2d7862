//! Typed conversions between XML text and Rust values.
//!
//! Each supported type implements [`XmlValue`], which pairs a strict
//! lexical parser with a canonical writer. Parsing never falls back to a
//! lenient form: `"inf"`, `"yes"` or `"1,5"` are rejected with
//! [`TreeError::Format`] naming the value and the target type.
//!
//! Leading and trailing XML whitespace (space, tab, CR, LF) is ignored, as
//! for attribute values and element text written with indentation.

mod datetime;
mod decimal;
mod guid;

pub use datetime::{DateTime, DateTimeOffset, Duration, TimeZone};
pub use decimal::Decimal;
pub use guid::Guid;

use crate::error::{Result, TreeError};
use crate::tree::{AttrId, NodeId, Tree};
use crate::util::qname::QName;

/// A value with an XML lexical representation.
pub trait XmlValue: Sized {
    /// The type name used in error messages, e.g. `"boolean"`.
    const TYPE_NAME: &'static str;

    /// Parses the lexical form.
    ///
    /// # Errors
    ///
    /// [`TreeError::Format`] if `text` does not match the grammar.
    fn parse_xml(text: &str) -> Result<Self>;

    /// Writes the canonical lexical form.
    fn to_xml(&self) -> String;
}

pub(crate) fn trim_xml(text: &str) -> &str {
    text.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
}

pub(crate) fn all_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

fn format_error<T: XmlValue>(text: &str) -> TreeError {
    TreeError::format(text, T::TYPE_NAME)
}

impl XmlValue for String {
    const TYPE_NAME: &'static str = "string";

    fn parse_xml(text: &str) -> Result<Self> {
        Ok(text.to_string())
    }

    fn to_xml(&self) -> String {
        self.clone()
    }
}

impl XmlValue for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn parse_xml(text: &str) -> Result<Self> {
        let trimmed = trim_xml(text);
        if trimmed == "1" || trimmed.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if trimmed == "0" || trimmed.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(format_error::<Self>(text))
        }
    }

    fn to_xml(&self) -> String {
        (if *self { "true" } else { "false" }).to_string()
    }
}

macro_rules! integer_value {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl XmlValue for $ty {
                const TYPE_NAME: &'static str = $name;

                fn parse_xml(text: &str) -> Result<Self> {
                    let trimmed = trim_xml(text);
                    let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
                    if !all_digits(unsigned) {
                        return Err(format_error::<Self>(text));
                    }
                    trimmed.parse().map_err(|_| format_error::<Self>(text))
                }

                fn to_xml(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

integer_value! {
    i32 => "int",
    u32 => "unsignedInt",
    i64 => "long",
    u64 => "unsignedLong",
}

/// Checks `[+-]? (digits ('.' digits?)? | '.' digits) ([eE] [+-]? digits)?`.
fn is_float_lexical(text: &str) -> bool {
    let body = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(at) => (&body[..at], Some(&body[at + 1..])),
        None => (body, None),
    };
    let mantissa_ok = match mantissa.split_once('.') {
        Some((int, frac)) => {
            (all_digits(int) && (frac.is_empty() || all_digits(frac))) || (int.is_empty() && all_digits(frac))
        }
        None => all_digits(mantissa),
    };
    let exponent_ok = exponent.map_or(true, |e| all_digits(e.strip_prefix(['+', '-']).unwrap_or(e)));
    mantissa_ok && exponent_ok
}

macro_rules! float_value {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl XmlValue for $ty {
                const TYPE_NAME: &'static str = $name;

                fn parse_xml(text: &str) -> Result<Self> {
                    match trim_xml(text) {
                        "INF" => Ok(<$ty>::INFINITY),
                        "-INF" => Ok(<$ty>::NEG_INFINITY),
                        "NaN" => Ok(<$ty>::NAN),
                        trimmed if is_float_lexical(trimmed) => {
                            trimmed.parse().map_err(|_| format_error::<Self>(text))
                        }
                        _ => Err(format_error::<Self>(text)),
                    }
                }

                fn to_xml(&self) -> String {
                    if self.is_nan() {
                        "NaN".to_string()
                    } else if self.is_infinite() {
                        (if *self > 0.0 { "INF" } else { "-INF" }).to_string()
                    } else {
                        let magnitude = self.abs();
                        if magnitude != 0.0 && !(1e-5..1e16).contains(&magnitude) {
                            format!("{self:E}")
                        } else {
                            self.to_string()
                        }
                    }
                }
            }
        )*
    };
}

float_value! {
    f32 => "float",
    f64 => "double",
}

impl Tree {
    /// Converts the [value](Tree::value) of a node.
    ///
    /// # Errors
    ///
    /// [`TreeError::Format`] if the text does not match `T`'s grammar.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlgrove::Tree;
    ///
    /// let mut tree = Tree::new();
    /// let price = tree.new_element_with("price", ["12.50"]).unwrap();
    /// let value: f64 = tree.value_as(price).unwrap();
    /// assert_eq!(value, 12.5);
    /// assert!(tree.value_as::<bool>(price).is_err());
    /// ```
    pub fn value_as<T: XmlValue>(&self, node: NodeId) -> Result<T> {
        T::parse_xml(&self.value(node))
    }

    /// Converts the value of an attribute.
    ///
    /// # Errors
    ///
    /// [`TreeError::Format`] if the value does not match `T`'s grammar.
    pub fn attribute_as<T: XmlValue>(&self, attr: AttrId) -> Result<T> {
        T::parse_xml(self.attr(attr).value())
    }

    /// Converts the named attribute's value, or returns `None` if the
    /// element has no such attribute.
    ///
    /// # Errors
    ///
    /// [`TreeError::Format`] if the value does not match `T`'s grammar.
    pub fn attribute_value_as<T: XmlValue>(&self, element: NodeId, name: &QName) -> Result<Option<T>> {
        self.attribute(element, name)
            .map(|a| self.attribute_as(a))
            .transpose()
    }

    /// Converts the value of the first child element with the given name,
    /// or returns `None` if there is none.
    ///
    /// # Errors
    ///
    /// [`TreeError::Format`] if the text does not match `T`'s grammar.
    pub fn element_value_as<T: XmlValue>(&self, element: NodeId, name: &QName) -> Result<Option<T>> {
        self.element(element, name)
            .map(|e| self.value_as(e))
            .transpose()
    }

    /// Sets the value of a node from a typed value.
    ///
    /// # Errors
    ///
    /// As for [`Tree::set_value`].
    pub fn set_typed_value<T: XmlValue>(&mut self, node: NodeId, value: &T) -> Result<()> {
        self.set_value(node, &value.to_xml())
    }
}
