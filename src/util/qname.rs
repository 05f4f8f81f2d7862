//! `QName` (qualified name) handling.
//!
//! A `QName` here is the *expanded* form of an XML name: a namespace URI
//! paired with a local name. Prefixes are a serialization detail and are
//! never stored in a name; they are recovered from the namespace
//! declarations in scope (see [`crate::tree::Tree::prefix_of_namespace`]).
//!
//! Namespace declarations are ordinary attributes whose names follow the
//! conventions below:
//!
//! - `xmlns="..."` is the name `xmlns` with no namespace (default declaration)
//! - `xmlns:p="..."` is the name `p` in [`XMLNS_NAMESPACE`]
//!
//! See <https://www.w3.org/TR/xml-names/#NT-QName>

use std::fmt;

use crate::error::{Result, TreeError};

/// The namespace permanently bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// The namespace permanently bound to the `xmlns` prefix.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// An expanded XML name: namespace URI plus local name.
///
/// An empty namespace string means "no namespace".
///
/// # Examples
///
/// ```
/// use xmlgrove::QName;
///
/// let name = QName::parse("{urn:books}title").unwrap();
/// assert_eq!(name.namespace(), "urn:books");
/// assert_eq!(name.local_name(), "title");
/// assert_eq!(name.to_string(), "{urn:books}title");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    namespace: String,
    local: String,
}

impl QName {
    /// Creates a name with no namespace.
    #[must_use]
    pub fn new(local: &str) -> Self {
        Self {
            namespace: String::new(),
            local: local.to_string(),
        }
    }

    /// Creates a name in the given namespace.
    #[must_use]
    pub fn with_namespace(namespace: &str, local: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            local: local.to_string(),
        }
    }

    /// Parses a name in Clark notation (`{namespace}local`) or a bare local
    /// name.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NullArgument`] if the local part is empty, and
    /// [`TreeError::Format`] if the braces are unbalanced.
    pub fn parse(expanded: &str) -> Result<Self> {
        let name = match expanded.strip_prefix('{') {
            Some(rest) => {
                let Some(close) = rest.find('}') else {
                    return Err(TreeError::format(expanded, "expanded name"));
                };
                Self::with_namespace(&rest[..close], &rest[close + 1..])
            }
            None if expanded.contains(['{', '}']) => {
                return Err(TreeError::format(expanded, "expanded name"));
            }
            None => Self::new(expanded),
        };
        name.validate()?;
        Ok(name)
    }

    /// Returns the name of the attribute that declares `prefix`.
    ///
    /// An empty prefix gives the default-namespace declaration `xmlns`.
    #[must_use]
    pub fn xmlns(prefix: &str) -> Self {
        if prefix.is_empty() {
            Self::new("xmlns")
        } else {
            Self::with_namespace(XMLNS_NAMESPACE, prefix)
        }
    }

    /// Returns a name in the reserved `xml` namespace (e.g. `xml:space`).
    #[must_use]
    pub fn xml(local: &str) -> Self {
        Self::with_namespace(XML_NAMESPACE, local)
    }

    /// The namespace URI, or `""` for no namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The local part of the name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local
    }

    /// Returns `true` if the name is in a namespace.
    #[must_use]
    pub fn has_namespace(&self) -> bool {
        !self.namespace.is_empty()
    }

    /// Returns `true` if an attribute with this name declares a namespace.
    #[must_use]
    pub fn is_namespace_declaration(&self) -> bool {
        self.namespace == XMLNS_NAMESPACE || (self.namespace.is_empty() && self.local == "xmlns")
    }

    /// For a namespace-declaration name, returns the prefix it declares
    /// (`""` for the default declaration). `None` for any other name.
    #[must_use]
    pub fn declared_prefix(&self) -> Option<&str> {
        if self.namespace == XMLNS_NAMESPACE {
            Some(&self.local)
        } else if self.namespace.is_empty() && self.local == "xmlns" {
            Some("")
        } else {
            None
        }
    }

    /// Rejects names with an empty local part.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.local.is_empty() {
            return Err(TreeError::NullArgument("name"));
        }
        Ok(())
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}

impl From<&str> for QName {
    fn from(local: &str) -> Self {
        Self::new(local)
    }
}

impl From<(&str, &str)> for QName {
    fn from((namespace, local): (&str, &str)) -> Self {
        Self::with_namespace(namespace, local)
    }
}

impl From<&QName> for QName {
    fn from(name: &QName) -> Self {
        name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clark_notation() {
        let Ok(name) = QName::parse("{urn:a}b") else {
            panic!("failed to parse clark name");
        };
        assert_eq!(name, QName::with_namespace("urn:a", "b"));
    }

    #[test]
    fn test_parse_local_only() {
        assert_eq!(QName::parse("div").ok(), Some(QName::new("div")));
    }

    #[test]
    fn test_parse_empty_local_is_null_argument() {
        assert_eq!(QName::parse("{urn:a}"), Err(TreeError::NullArgument("name")));
        assert_eq!(QName::parse(""), Err(TreeError::NullArgument("name")));
    }

    #[test]
    fn test_parse_unbalanced_braces() {
        assert!(matches!(QName::parse("{urn:a"), Err(TreeError::Format { .. })));
        assert!(matches!(QName::parse("a}b"), Err(TreeError::Format { .. })));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let name = QName::with_namespace("http://example.com/ns", "item");
        assert_eq!(QName::parse(&name.to_string()).ok(), Some(name));
    }

    #[test]
    fn test_xmlns_names() {
        assert_eq!(QName::xmlns(""), QName::new("xmlns"));
        assert_eq!(QName::xmlns("p"), QName::with_namespace(XMLNS_NAMESPACE, "p"));
        assert_eq!(QName::xmlns("").declared_prefix(), Some(""));
        assert_eq!(QName::xmlns("p").declared_prefix(), Some("p"));
        assert!(QName::xmlns("p").is_namespace_declaration());
    }

    #[test]
    fn test_ordinary_names_are_not_declarations() {
        assert!(!QName::new("id").is_namespace_declaration());
        assert!(!QName::xml("lang").is_namespace_declaration());
        assert_eq!(QName::with_namespace("urn:x", "xmlns").declared_prefix(), None);
    }
}
