//! Writing trees to an [`EventSink`].

use super::{EventSink, XmlEvent};
use crate::error::Result;
use crate::serial::{SerializeOptions, TextWriter};
use crate::tree::{Content, NodeId, NodeKind, Tree};

/// Options controlling how a tree is written.
///
/// # Examples
///
/// ```
/// use xmlgrove::{SaveOptions, Tree};
///
/// let mut tree = Tree::new();
/// let root = tree.new_element("root").unwrap();
/// let child = tree.new_element("child").unwrap();
/// tree.add(root, child).unwrap();
///
/// let indented = tree.to_xml_string(root, &SaveOptions::default()).unwrap();
/// assert_eq!(indented, "<root>\n  <child />\n</root>");
///
/// let flat = tree.to_xml_string(root, &SaveOptions::default().disable_formatting(true)).unwrap();
/// assert_eq!(flat, "<root><child /></root>");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    disable_formatting: bool,
    omit_duplicate_namespaces: bool,
}

impl SaveOptions {
    /// Writes text exactly as stored, without indentation.
    #[must_use]
    pub fn disable_formatting(mut self, disable: bool) -> Self {
        self.disable_formatting = disable;
        self
    }

    /// Drops a namespace declaration when an enclosing written element
    /// already binds the same prefix to the same namespace.
    #[must_use]
    pub fn omit_duplicate_namespaces(mut self, omit: bool) -> Self {
        self.omit_duplicate_namespaces = omit;
        self
    }

    /// The writer settings implied by these options.
    #[must_use]
    pub fn serialize_options(&self) -> SerializeOptions {
        SerializeOptions::default().indent(!self.disable_formatting)
    }
}

/// Prefix bindings written by enclosing elements, innermost last.
#[derive(Default)]
struct WrittenScope {
    bindings: Vec<(String, String)>,
}

impl WrittenScope {
    fn is_bound(&self, prefix: &str, uri: &str) -> bool {
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .is_some_and(|(_, u)| u == uri)
    }
}

impl Tree {
    /// Writes a node and its subtree to `sink` as events.
    ///
    /// Empty text content still produces a text event, so `<a></a>`
    /// round-trips rather than collapsing to `<a/>`.
    ///
    /// # Errors
    ///
    /// Whatever `sink` reports.
    pub fn write_to(&self, node: NodeId, sink: &mut impl EventSink, options: &SaveOptions) -> Result<()> {
        let mut scope = WrittenScope::default();
        self.write_node(node, sink, options, &mut scope)
    }

    /// Serializes a node and its subtree to XML text.
    ///
    /// A document node is written with its XML declaration, if it has one.
    ///
    /// # Errors
    ///
    /// [`TreeError::ConflictingNamespace`](crate::TreeError::ConflictingNamespace)
    /// if an element without a namespace declares a non-empty default
    /// namespace on itself, which no start tag can express.
    pub fn to_xml_string(&self, node: NodeId, options: &SaveOptions) -> Result<String> {
        let mut writer = TextWriter::new(options.serialize_options());
        self.write_to(node, &mut writer, options)?;
        let text = writer.finish()?;
        tracing::debug!(bytes = text.len(), "saved subtree");
        Ok(text)
    }

    fn write_node(
        &self,
        id: NodeId,
        sink: &mut impl EventSink,
        options: &SaveOptions,
        scope: &mut WrittenScope,
    ) -> Result<()> {
        match &self.node(id).kind {
            NodeKind::Document { declaration, .. } => {
                if let Some(declaration) = declaration {
                    sink.write_event(XmlEvent::Declaration {
                        version: declaration.version.clone(),
                        encoding: declaration.encoding.clone(),
                        standalone: declaration.standalone,
                    })?;
                }
                self.write_content(id, sink, options, scope)
            }
            NodeKind::Element { name, .. } => {
                let mark = scope.bindings.len();
                let mut attributes = Vec::new();
                for a in self.attributes(id) {
                    let attr = self.attr(a);
                    if let Some(prefix) = attr.name().declared_prefix() {
                        if options.omit_duplicate_namespaces && scope.is_bound(prefix, attr.value()) {
                            continue;
                        }
                        scope.bindings.push((prefix.to_string(), attr.value().to_string()));
                    }
                    attributes.push((attr.name().clone(), attr.value().to_string()));
                }
                sink.write_event(XmlEvent::StartElement {
                    name: name.clone(),
                    attributes,
                    location: self.line_info(id),
                })?;
                self.write_content(id, sink, options, scope)?;
                scope.bindings.truncate(mark);
                sink.write_event(XmlEvent::EndElement)
            }
            NodeKind::Text { content } => sink.write_event(XmlEvent::Text(content.clone())),
            NodeKind::Comment { content } => sink.write_event(XmlEvent::Comment(content.clone())),
            NodeKind::ProcessingInstruction { target, data } => sink.write_event(XmlEvent::ProcessingInstruction {
                target: target.clone(),
                data: data.clone(),
            }),
            NodeKind::DocumentType {
                name,
                public_id,
                system_id,
                internal_subset,
            } => sink.write_event(XmlEvent::DocumentType {
                name: name.clone(),
                public_id: public_id.clone(),
                system_id: system_id.clone(),
                internal_subset: internal_subset.clone(),
            }),
        }
    }

    fn write_content(
        &self,
        id: NodeId,
        sink: &mut impl EventSink,
        options: &SaveOptions,
        scope: &mut WrittenScope,
    ) -> Result<()> {
        match self.content(id) {
            Some(Content::Text(text)) => sink.write_event(XmlEvent::Text(text.clone())),
            Some(Content::Nodes(_)) => {
                for child in self.nodes(id) {
                    self.write_node(child, sink, options, scope)?;
                }
                Ok(())
            }
            Some(Content::Empty) | None => Ok(()),
        }
    }
}
