//! Building trees from an [`EventSource`].
//!
//! Loading is iterative: an explicit stack of open elements replaces
//! recursion, so depth is bounded by memory rather than the call stack.
//! Nothing is observed while a subtree is under construction, so no
//! notifications are raised.

use super::{EventSource, XmlEvent};
use crate::error::{Result, SourceLocation, TreeError};
use crate::tree::{Declaration, Item, NodeId, Tree};
use crate::util::is_xml_whitespace;
use crate::util::qname::QName;

/// Options controlling how a tree is built from events.
///
/// # Examples
///
/// ```
/// use xmlgrove::LoadOptions;
///
/// let options = LoadOptions::default().preserve_whitespace(true).set_line_info(true);
/// assert!(options.preserves_whitespace());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    preserve_whitespace: bool,
    set_base_uri: bool,
    set_line_info: bool,
}

impl LoadOptions {
    /// Keeps whitespace-only text everywhere.
    ///
    /// When disabled (the default), whitespace-only text is kept only
    /// inside an `xml:space="preserve"` scope.
    #[must_use]
    pub fn preserve_whitespace(mut self, enable: bool) -> Self {
        self.preserve_whitespace = enable;
        self
    }

    /// Records the source's base URI on the loaded root.
    #[must_use]
    pub fn set_base_uri(mut self, enable: bool) -> Self {
        self.set_base_uri = enable;
        self
    }

    /// Records the location of each element start tag.
    #[must_use]
    pub fn set_line_info(mut self, enable: bool) -> Self {
        self.set_line_info = enable;
        self
    }

    /// Returns `true` if whitespace-only text is always kept.
    #[must_use]
    pub fn preserves_whitespace(&self) -> bool {
        self.preserve_whitespace
    }
}

/// An element still waiting for its end event.
struct Open {
    element: NodeId,
    preserve_space: bool,
}

/// Reads the next event, treating end of input as an error.
fn require(source: &mut impl EventSource) -> Result<XmlEvent> {
    source.next_event()?.ok_or(TreeError::UnexpectedEndOfEvents)
}

/// The whitespace mode set by an `xml:space` attribute, if any.
fn space_mode(attributes: &[(QName, String)]) -> Option<bool> {
    let space = QName::xml("space");
    attributes
        .iter()
        .find(|(name, _)| *name == space)
        .and_then(|(_, value)| match value.as_str() {
            "preserve" => Some(true),
            "default" => Some(false),
            _ => None,
        })
}

impl Tree {
    /// Loads one element, with its subtree, from `source`.
    ///
    /// Leading declarations, comments, processing instructions and
    /// whitespace are skipped. After the root element ends, the rest of the
    /// input may hold only comments, processing instructions and
    /// whitespace; all of it is consumed and dropped.
    ///
    /// # Errors
    ///
    /// - [`TreeError::UnexpectedNodeKind`] if the first significant event is
    ///   not an element start
    /// - [`TreeError::UnexpectedTrailingContent`] for anything else after
    ///   the root element
    /// - [`TreeError::UnexpectedEndOfEvents`] if the input ends early
    /// - any construction error for invalid names or attributes
    pub fn load_element(&mut self, source: &mut impl EventSource, options: &LoadOptions) -> Result<NodeId> {
        let root = loop {
            let event = require(source)?;
            match event {
                XmlEvent::StartElement {
                    name,
                    attributes,
                    location,
                } => break self.build_element(source, name, &attributes, location, false, options)?,
                XmlEvent::Declaration { .. }
                | XmlEvent::DocumentType { .. }
                | XmlEvent::Comment(_)
                | XmlEvent::ProcessingInstruction { .. } => {}
                ref text if text.is_whitespace() => {}
                other => {
                    return Err(TreeError::UnexpectedNodeKind {
                        found: other.describe(),
                    })
                }
            }
        };

        while let Some(event) = source.next_event()? {
            match event {
                XmlEvent::Comment(_) | XmlEvent::ProcessingInstruction { .. } => {}
                ref text if text.is_whitespace() => {}
                other => {
                    return Err(TreeError::UnexpectedTrailingContent {
                        found: other.describe(),
                    })
                }
            }
        }

        if options.set_base_uri {
            if let Some(uri) = source.base_uri() {
                self.set_base_uri(root, uri);
            }
        }
        tracing::debug!(nodes = self.node_count(), "loaded element");
        Ok(root)
    }

    /// Loads a whole document from `source`.
    ///
    /// The input may open with an XML declaration, followed by comments,
    /// processing instructions, at most one document type and exactly one
    /// root element, in the order the document rules allow.
    ///
    /// # Errors
    ///
    /// - [`TreeError::InvalidDocumentStructure`] if the top level breaks the
    ///   document rules (two roots, a late document type, non-whitespace
    ///   text)
    /// - [`TreeError::UnexpectedNodeKind`] for a misplaced declaration or
    ///   a stray end event
    /// - [`TreeError::UnexpectedEndOfEvents`] if there is no root element or
    ///   the input ends inside it
    pub fn load_document(&mut self, source: &mut impl EventSource, options: &LoadOptions) -> Result<NodeId> {
        let document = self.new_document(None);
        let mut first = true;
        let mut has_root = false;

        while let Some(event) = source.next_event()? {
            match event {
                XmlEvent::Declaration {
                    version,
                    encoding,
                    standalone,
                } if first => {
                    self.set_declaration(
                        document,
                        Some(Declaration {
                            version,
                            encoding,
                            standalone,
                        }),
                    )?;
                }
                XmlEvent::DocumentType {
                    name,
                    public_id,
                    system_id,
                    internal_subset,
                } => {
                    let doctype = self.new_document_type(
                        &name,
                        public_id.as_deref(),
                        system_id.as_deref(),
                        internal_subset.as_deref(),
                    )?;
                    self.add_quiet(document, Item::Node(doctype))?;
                }
                XmlEvent::StartElement {
                    name,
                    attributes,
                    location,
                } => {
                    let root = self.build_element(source, name, &attributes, location, false, options)?;
                    self.add_quiet(document, Item::Node(root))?;
                    has_root = true;
                }
                XmlEvent::Comment(text) => {
                    let comment = self.new_comment(&text);
                    self.add_quiet(document, Item::Node(comment))?;
                }
                XmlEvent::ProcessingInstruction { target, data } => {
                    let pi = self.new_processing_instruction(&target, &data)?;
                    self.add_quiet(document, Item::Node(pi))?;
                }
                XmlEvent::Text(text) => {
                    if !text.is_empty() && (options.preserve_whitespace || !is_xml_whitespace(&text)) {
                        self.add_quiet(document, Item::Text(text))?;
                    }
                }
                other @ (XmlEvent::Declaration { .. } | XmlEvent::EndElement) => {
                    return Err(TreeError::UnexpectedNodeKind {
                        found: other.describe(),
                    })
                }
            }
            first = false;
        }

        if !has_root {
            return Err(TreeError::UnexpectedEndOfEvents);
        }
        if options.set_base_uri {
            if let Some(uri) = source.base_uri() {
                self.set_base_uri(document, uri);
            }
        }
        tracing::debug!(nodes = self.node_count(), "loaded document");
        Ok(document)
    }

    /// Creates an element from a start event and its attributes.
    fn start_element(
        &mut self,
        name: QName,
        attributes: &[(QName, String)],
        location: Option<SourceLocation>,
        options: &LoadOptions,
    ) -> Result<NodeId> {
        let element = self.new_element(name)?;
        for (name, value) in attributes {
            let attr = self.new_attribute(name.clone(), value)?;
            self.add_quiet(element, Item::Attribute(attr))?;
        }
        if options.set_line_info {
            if let Some(location) = location {
                self.set_line_info(element, location);
            }
        }
        Ok(element)
    }

    /// Reads events up to the end of the element whose start event has
    /// already been consumed.
    fn build_element(
        &mut self,
        source: &mut impl EventSource,
        name: QName,
        attributes: &[(QName, String)],
        location: Option<SourceLocation>,
        inherited_space: bool,
        options: &LoadOptions,
    ) -> Result<NodeId> {
        let root = self.start_element(name, attributes, location, options)?;
        let mut stack = vec![Open {
            element: root,
            preserve_space: space_mode(attributes).unwrap_or(inherited_space),
        }];

        while let Some(top) = stack.last() {
            let parent = top.element;
            let preserve_space = top.preserve_space;
            match require(source)? {
                XmlEvent::StartElement {
                    name,
                    attributes,
                    location,
                } => {
                    let child = self.start_element(name, &attributes, location, options)?;
                    self.add_quiet(parent, Item::Node(child))?;
                    stack.push(Open {
                        element: child,
                        preserve_space: space_mode(&attributes).unwrap_or(preserve_space),
                    });
                }
                XmlEvent::EndElement => {
                    stack.pop();
                }
                XmlEvent::Text(text) => {
                    // empty text is kept: it turns `<a/>` into `<a></a>`
                    let keep = text.is_empty()
                        || options.preserve_whitespace
                        || preserve_space
                        || !is_xml_whitespace(&text);
                    if keep {
                        self.add_text_quiet(parent, &text);
                    }
                }
                XmlEvent::Comment(text) => {
                    let comment = self.new_comment(&text);
                    self.add_quiet(parent, Item::Node(comment))?;
                }
                XmlEvent::ProcessingInstruction { target, data } => {
                    let pi = self.new_processing_instruction(&target, &data)?;
                    self.add_quiet(parent, Item::Node(pi))?;
                }
                other @ (XmlEvent::Declaration { .. } | XmlEvent::DocumentType { .. }) => {
                    return Err(TreeError::UnexpectedNodeKind {
                        found: other.describe(),
                    })
                }
            }
        }
        Ok(root)
    }
}
