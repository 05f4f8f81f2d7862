//! Error types and source locations.
//!
//! Every fallible tree operation returns [`TreeError`]. Failures are always
//! reported to the caller that triggered them: nothing is retried, and
//! validation runs before any list is touched, so an `Err` means the tree
//! is exactly as it was before the call.

use std::fmt;

use thiserror::Error;

use crate::util::qname::QName;

/// Convenience alias used throughout the crate.
pub type Result<T, E = TreeError> = std::result::Result<T, E>;

/// Source location of a node, as reported by an event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
}

impl SourceLocation {
    /// Creates a location from a line and column.
    #[must_use]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The error type for tree construction, mutation, loading and conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// A required argument was absent or empty.
    #[error("required argument `{0}` is missing or empty")]
    NullArgument(&'static str),

    /// An attribute with the same name already exists on the element.
    #[error("duplicate attribute `{0}`")]
    DuplicateAttribute(QName),

    /// The node (or attribute) cannot be a child of this container.
    #[error("{child} cannot be added to {container}")]
    InvalidChildType {
        /// The kind of the rejected item.
        child: &'static str,
        /// The kind of the container.
        container: &'static str,
    },

    /// The change would break the document-level content rules.
    #[error("invalid document structure: {0}")]
    InvalidDocumentStructure(&'static str),

    /// The operation positions content relative to a node that has no parent.
    #[error("the node has no parent")]
    MissingParent,

    /// Loading expected an element start but the source produced something else.
    #[error("expected the start of an element, found {found}")]
    UnexpectedNodeKind {
        /// Description of the event that was found.
        found: String,
    },

    /// Non-trivial content follows the root element.
    #[error("unexpected {found} after the root element")]
    UnexpectedTrailingContent {
        /// Description of the offending event.
        found: String,
    },

    /// The event source ended before the root element was complete.
    #[error("event stream ended inside an element")]
    UnexpectedEndOfEvents,

    /// A notification observer changed the structure that was being mutated.
    #[error("the tree was modified by an observer during {operation}")]
    ExternalMutation {
        /// The operation that detected the change.
        operation: &'static str,
    },

    /// A `Changing` observer vetoed the mutation.
    #[error("change rejected by observer: {0}")]
    Rejected(String),

    /// A start tag declares a prefix with one namespace while its own name
    /// needs the same prefix bound to another.
    #[error("prefix `{prefix}` is declared as `{declared}` but the element needs `{required}`")]
    ConflictingNamespace {
        /// The prefix, empty for the default namespace.
        prefix: String,
        /// The namespace the start tag declares.
        declared: String,
        /// The namespace the element name requires.
        required: String,
    },

    /// The two nodes do not share a root.
    #[error("the nodes are not in the same tree")]
    Disconnected,

    /// A typed conversion failed against its lexical grammar.
    #[error("`{value}` is not a valid {target}")]
    Format {
        /// The text that failed to convert.
        value: String,
        /// The target type name.
        target: &'static str,
    },
}

impl TreeError {
    pub(crate) fn format(value: &str, target: &'static str) -> Self {
        Self::Format {
            value: value.to_string(),
            target,
        }
    }

    pub(crate) fn external(operation: &'static str) -> Self {
        tracing::warn!(operation, "tree changed by an observer during mutation");
        Self::ExternalMutation { operation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_location_display() {
        assert_eq!(SourceLocation::new(10, 5).to_string(), "10:5");
    }

    #[test]
    fn test_duplicate_attribute_display() {
        let err = TreeError::DuplicateAttribute(QName::with_namespace("urn:a", "id"));
        assert_eq!(err.to_string(), "duplicate attribute `{urn:a}id`");
    }

    #[test]
    fn test_invalid_child_display() {
        let err = TreeError::InvalidChildType {
            child: "document type",
            container: "element",
        };
        assert_eq!(err.to_string(), "document type cannot be added to element");
    }

    #[test]
    fn test_format_display() {
        assert_eq!(
            TreeError::format("maybe", "boolean").to_string(),
            "`maybe` is not a valid boolean"
        );
    }

    #[test]
    fn test_tree_error_is_error_trait() {
        let err = TreeError::MissingParent;
        let _: &dyn std::error::Error = &err;
    }
}
