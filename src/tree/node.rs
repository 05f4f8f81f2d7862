//! Node type definitions.
//!
//! `NodeKind` is the closed set of node variants. Each variant carries its
//! own payload; the sibling and parent links live in `NodeData`.

use super::{AttrId, NodeId};
use crate::util::qname::QName;

/// Child content of a container (document or element).
///
/// A container holds either nothing, a single run of text, or a circular
/// list of child nodes referenced by its *last* member.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Content {
    /// No content at all; an element with this content is written `<a/>`.
    #[default]
    Empty,
    /// Text held by the container itself. Non-empty text is materialized as
    /// a text node when stored, so in practice this is `Text("")`, the
    /// `<a></a>` form.
    Text(String),
    /// The last child of a non-empty circular child list.
    Nodes(NodeId),
}

/// The XML declaration carried by a document node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Declaration {
    /// The version pseudo-attribute, e.g. `"1.0"`.
    pub version: Option<String>,
    /// The encoding pseudo-attribute, e.g. `"UTF-8"`.
    pub encoding: Option<String>,
    /// The standalone pseudo-attribute.
    pub standalone: Option<bool>,
}

/// The kind of an XML node and its associated data.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A document node; the root of a complete document.
    Document {
        /// Child content.
        content: Content,
        /// The XML declaration, if any.
        declaration: Option<Declaration>,
    },

    /// An element node, e.g. `<div class="x">`.
    Element {
        /// The expanded element name.
        name: QName,
        /// Child content.
        content: Content,
        /// The last attribute of the circular attribute list.
        last_attr: Option<AttrId>,
    },

    /// A text node containing character data.
    Text {
        /// The decoded text.
        content: String,
    },

    /// A comment node (without the `<!--` and `-->` delimiters).
    Comment {
        /// The comment text.
        content: String,
    },

    /// A processing instruction, e.g. `<?target data?>`.
    ProcessingInstruction {
        /// The PI target.
        target: String,
        /// The PI data; may be empty.
        data: String,
    },

    /// A document type declaration, e.g. `<!DOCTYPE html>`.
    DocumentType {
        /// The declared root element name.
        name: String,
        /// The PUBLIC identifier, if any.
        public_id: Option<String>,
        /// The SYSTEM identifier, if any.
        system_id: Option<String>,
        /// The internal subset text, if any.
        internal_subset: Option<String>,
    },
}

impl NodeKind {
    /// Human-readable kind name, used in error messages.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Document { .. } => "document",
            Self::Element { .. } => "element",
            Self::Text { .. } => "text",
            Self::Comment { .. } => "comment",
            Self::ProcessingInstruction { .. } => "processing instruction",
            Self::DocumentType { .. } => "document type",
        }
    }

    /// Returns `true` for documents and elements.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Document { .. } | Self::Element { .. })
    }

    pub(crate) fn content(&self) -> Option<&Content> {
        match self {
            Self::Document { content, .. } | Self::Element { content, .. } => Some(content),
            _ => None,
        }
    }

    pub(crate) fn content_mut(&mut self) -> Option<&mut Content> {
        match self {
            Self::Document { content, .. } | Self::Element { content, .. } => Some(content),
            _ => None,
        }
    }
}
