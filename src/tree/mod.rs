//! Arena-based mutable XML tree.
//!
//! All nodes and attributes live in two contiguous vectors owned by a
//! [`Tree`] and are referenced by [`NodeId`] / [`AttrId`], newtypes over
//! `NonZeroU32`. Any number of independent trees (detached elements,
//! documents, fragments) can share one arena; a node belongs to whichever
//! container its `parent` link names.
//!
//! # Storage
//!
//! Siblings form a singly linked *circular* list. A container does not keep
//! a head pointer: its [`Content`] is either empty, a run of text, or the id
//! of its **last** child, whose `next` is the first child. Attributes use the
//! same scheme through `last_attr`. See `list.rs` for the primitives.
//!
//! Detached nodes are never freed individually; they stay in the arena
//! until the `Tree` is dropped. A `Tree` holds at most `u32::MAX` nodes and
//! as many attributes; allocating beyond that panics.

mod compare;
mod list;
mod mutate;
mod namespace;
mod navigate;
mod node;

pub use compare::DeepKey;
pub use mutate::Item;
pub use navigate::{Ancestors, Attributes, DescendantNodes, Nodes};
pub use node::{Content, Declaration, NodeKind};

use std::collections::HashMap;
use std::num::NonZeroU32;

use crate::error::{Result, SourceLocation, TreeError};
use crate::notify::Observers;
use crate::util::qname::QName;

/// A typed index into the node arena.
///
/// `Option<NodeId>` has the same size as `NodeId` (niche optimization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

/// Maps arena slot `index` to its handle value, `index + 1`.
///
/// # Panics
///
/// Panics once an arena would hold more than `u32::MAX` entries; handles
/// are never reused.
#[allow(clippy::expect_used)]
fn slot_handle(index: usize) -> NonZeroU32 {
    u32::try_from(index)
        .ok()
        .and_then(|i| i.checked_add(1))
        .and_then(NonZeroU32::new)
        .expect("arena is limited to u32::MAX entries")
}

impl NodeId {
    fn from_index(index: usize) -> Self {
        Self(slot_handle(index))
    }

    fn as_index(self) -> usize {
        self.0.get() as usize - 1
    }

    /// Converts this id to a raw non-zero `u32`.
    #[must_use]
    pub fn into_raw(self) -> u32 {
        self.0.get()
    }

    /// Creates an id from a raw `u32`, if non-zero.
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }
}

/// A typed index into the attribute arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct AttrId(NonZeroU32);

impl AttrId {
    fn from_index(index: usize) -> Self {
        Self(slot_handle(index))
    }

    fn as_index(self) -> usize {
        self.0.get() as usize - 1
    }
}

/// Storage for a single node in the arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is and its payload.
    pub kind: NodeKind,
    /// The owning container, or `None` for a root or detached node.
    parent: Option<NodeId>,
    /// Next sibling in the circular list; the node itself when alone.
    next: NodeId,
}

impl NodeData {
    /// The owning container.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Storage for a single attribute in the arena.
#[derive(Debug, Clone)]
pub struct AttrData {
    name: QName,
    value: String,
    parent: Option<NodeId>,
    next: AttrId,
}

impl AttrData {
    /// The attribute's expanded name.
    #[must_use]
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// The attribute value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The owning element.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns `true` if this attribute declares a namespace.
    #[must_use]
    pub fn is_namespace_declaration(&self) -> bool {
        self.name.is_namespace_declaration()
    }
}

/// An arena of XML nodes and attributes.
///
/// # Examples
///
/// ```
/// use xmlgrove::{QName, Tree};
///
/// let mut tree = Tree::new();
/// let book = tree.new_element("book").unwrap();
/// tree.set_attribute_value(book, "id", Some("bk1")).unwrap();
/// tree.set_element_value(book, "title", Some("Dune")).unwrap();
///
/// let title = tree.element(book, &QName::new("title")).unwrap();
/// assert_eq!(tree.value(title), "Dune");
/// assert_eq!(tree.get_attribute(book, &QName::new("id")), Some("bk1"));
/// ```
#[derive(Default)]
pub struct Tree {
    nodes: Vec<NodeData>,
    attrs: Vec<AttrData>,
    pub(crate) observers: Observers,
    line_info: HashMap<NodeId, SourceLocation>,
    base_uris: HashMap<NodeId, String>,
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.nodes.len())
            .field("attrs", &self.attrs.len())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Tree {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a reference to the data of a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not allocated by this tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Returns a reference to the data of an attribute.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not allocated by this tree.
    #[must_use]
    pub fn attr(&self, id: AttrId) -> &AttrData {
        &self.attrs[id.as_index()]
    }

    pub(crate) fn attr_mut(&mut self, id: AttrId) -> &mut AttrData {
        &mut self.attrs[id.as_index()]
    }

    /// Returns the kind and payload of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    /// Total number of nodes ever allocated in this arena.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of attributes ever allocated in this arena.
    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.attrs.len()
    }

    // --- Construction ---

    pub(crate) fn alloc_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            next: id,
        });
        id
    }

    fn alloc_attr(&mut self, name: QName, value: String) -> AttrId {
        let id = AttrId::from_index(self.attrs.len());
        self.attrs.push(AttrData {
            name,
            value,
            parent: None,
            next: id,
        });
        id
    }

    /// Creates a detached, empty element.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NullArgument`] if the local name is empty.
    pub fn new_element(&mut self, name: impl Into<QName>) -> Result<NodeId> {
        let name = name.into();
        name.validate()?;
        Ok(self.alloc_node(NodeKind::Element {
            name,
            content: Content::Empty,
            last_attr: None,
        }))
    }

    /// Creates a detached element and fills it with `items`.
    ///
    /// Adjacent text items are merged into one text node; an empty string on
    /// its own gives `<name></name>`.
    ///
    /// # Errors
    ///
    /// Fails like [`Tree::new_element`] and [`Tree::add`]; on failure the
    /// partially built element is left detached.
    pub fn new_element_with<I>(&mut self, name: impl Into<QName>, items: I) -> Result<NodeId>
    where
        I: IntoIterator,
        I::Item: Into<Item>,
    {
        let element = self.new_element(name)?;
        for item in items {
            self.add_quiet(element, item.into())?;
        }
        Ok(element)
    }

    /// Creates a detached document node.
    pub fn new_document(&mut self, declaration: Option<Declaration>) -> NodeId {
        self.alloc_node(NodeKind::Document {
            content: Content::Empty,
            declaration,
        })
    }

    /// Creates a detached text node.
    pub fn new_text(&mut self, text: &str) -> NodeId {
        self.alloc_node(NodeKind::Text {
            content: text.to_string(),
        })
    }

    /// Creates a detached comment node.
    pub fn new_comment(&mut self, text: &str) -> NodeId {
        self.alloc_node(NodeKind::Comment {
            content: text.to_string(),
        })
    }

    /// Creates a detached processing instruction.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NullArgument`] if `target` is empty.
    pub fn new_processing_instruction(&mut self, target: &str, data: &str) -> Result<NodeId> {
        if target.is_empty() {
            return Err(TreeError::NullArgument("target"));
        }
        Ok(self.alloc_node(NodeKind::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        }))
    }

    /// Creates a detached document type node.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NullArgument`] if `name` is empty.
    pub fn new_document_type(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        internal_subset: Option<&str>,
    ) -> Result<NodeId> {
        if name.is_empty() {
            return Err(TreeError::NullArgument("name"));
        }
        Ok(self.alloc_node(NodeKind::DocumentType {
            name: name.to_string(),
            public_id: public_id.map(str::to_string),
            system_id: system_id.map(str::to_string),
            internal_subset: internal_subset.map(str::to_string),
        }))
    }

    /// Creates a detached attribute.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NullArgument`] for an empty local name and
    /// [`TreeError::Format`] for a namespace declaration that binds a
    /// reserved prefix or namespace illegally.
    pub fn new_attribute(&mut self, name: impl Into<QName>, value: &str) -> Result<AttrId> {
        let name = name.into();
        name.validate()?;
        validate_attribute_value(&name, value)?;
        Ok(self.alloc_attr(name, value.to_string()))
    }

    /// Creates a deep copy of a node and its whole subtree. The copy is
    /// detached; attributes are copied in order. Source annotations (line
    /// info, base URI) are not copied.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        match &self.node(id).kind {
            NodeKind::Element { name, content, .. } => {
                let name = name.clone();
                let content = content.clone();
                let attrs: Vec<(QName, String)> = self
                    .attributes(id)
                    .map(|a| (self.attr(a).name.clone(), self.attr(a).value.clone()))
                    .collect();
                let children: Vec<NodeId> = self.nodes(id).collect();
                let element = self.alloc_node(NodeKind::Element {
                    name,
                    content: Content::Empty,
                    last_attr: None,
                });
                for (name, value) in attrs {
                    let a = self.alloc_attr(name, value);
                    self.append_attr_link(element, a);
                }
                self.copy_content_into(element, content, &children);
                element
            }
            NodeKind::Document {
                content,
                declaration,
            } => {
                let content = content.clone();
                let declaration = declaration.clone();
                let children: Vec<NodeId> = self.nodes(id).collect();
                let document = self.new_document(declaration);
                self.copy_content_into(document, content, &children);
                document
            }
            leaf => {
                let leaf = leaf.clone();
                self.alloc_node(leaf)
            }
        }
    }

    fn copy_content_into(&mut self, target: NodeId, content: Content, children: &[NodeId]) {
        match content {
            Content::Nodes(_) => {
                for &child in children {
                    let copy = self.deep_copy(child);
                    self.append_link(target, copy);
                }
            }
            other => {
                if let Some(slot) = self.node_mut(target).kind.content_mut() {
                    *slot = other;
                }
            }
        }
    }

    /// Creates a detached copy of an attribute.
    pub fn copy_attribute(&mut self, id: AttrId) -> AttrId {
        let name = self.attr(id).name.clone();
        let value = self.attr(id).value.clone();
        self.alloc_attr(name, value)
    }

    /// Copies a node and its subtree out of another arena into this one.
    pub fn import(&mut self, other: &Tree, id: NodeId) -> NodeId {
        match &other.node(id).kind {
            NodeKind::Element { name, content, .. } => {
                let element = self.alloc_node(NodeKind::Element {
                    name: name.clone(),
                    content: Content::Empty,
                    last_attr: None,
                });
                for a in other.attributes(id) {
                    let data = other.attr(a);
                    let copy = self.alloc_attr(data.name.clone(), data.value.clone());
                    self.append_attr_link(element, copy);
                }
                self.import_content(other, id, element, content);
                element
            }
            NodeKind::Document {
                content,
                declaration,
            } => {
                let document = self.new_document(declaration.clone());
                self.import_content(other, id, document, content);
                document
            }
            leaf => self.alloc_node(leaf.clone()),
        }
    }

    fn import_content(&mut self, other: &Tree, source: NodeId, target: NodeId, content: &Content) {
        if let Content::Nodes(_) = content {
            for child in other.nodes(source) {
                let copy = self.import(other, child);
                self.append_link(target, copy);
            }
        } else if let Some(slot) = self.node_mut(target).kind.content_mut() {
            *slot = content.clone();
        }
    }

    // --- Simple accessors ---

    /// Returns the name of an element, or `None` for other node kinds.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&QName> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns `true` if the node is an element.
    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Element { .. })
    }

    /// Returns the content of a container, or `None` for leaf nodes.
    #[must_use]
    pub fn content(&self, id: NodeId) -> Option<&Content> {
        self.node(id).kind.content()
    }

    /// Returns the XML declaration of a document node.
    #[must_use]
    pub fn declaration(&self, id: NodeId) -> Option<&Declaration> {
        match &self.node(id).kind {
            NodeKind::Document { declaration, .. } => declaration.as_ref(),
            _ => None,
        }
    }

    /// Returns the text a container holds as content rather than as child
    /// nodes. Trees built by this crate only ever keep the empty string
    /// there, marking `<a></a>`.
    #[must_use]
    pub fn text_of(&self, id: NodeId) -> Option<&str> {
        match self.content(id) {
            Some(Content::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Returns the string value of a node.
    ///
    /// - elements and documents: the concatenated text of their *direct*
    ///   text children (child elements are skipped)
    /// - text and comments: their text
    /// - processing instructions: their data
    /// - document types: the empty string
    #[must_use]
    pub fn value(&self, id: NodeId) -> String {
        match &self.node(id).kind {
            NodeKind::Text { content } | NodeKind::Comment { content } => content.clone(),
            NodeKind::ProcessingInstruction { data, .. } => data.clone(),
            NodeKind::DocumentType { .. } => String::new(),
            NodeKind::Element { content, .. } | NodeKind::Document { content, .. } => match content
            {
                Content::Empty => String::new(),
                Content::Text(text) => text.clone(),
                Content::Nodes(_) => {
                    let mut buf = String::new();
                    for child in self.nodes(id) {
                        if let NodeKind::Text { content } = &self.node(child).kind {
                            buf.push_str(content);
                        }
                    }
                    buf
                }
            },
        }
    }

    /// Returns the concatenated text of a node and all of its descendants.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut buf = String::new();
        self.collect_text(id, &mut buf);
        buf
    }

    fn collect_text(&self, id: NodeId, buf: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text { content } => buf.push_str(content),
            NodeKind::Element { content, .. } | NodeKind::Document { content, .. } => {
                match content {
                    Content::Text(text) => buf.push_str(text),
                    Content::Nodes(_) => {
                        for child in self.nodes(id) {
                            self.collect_text(child, buf);
                        }
                    }
                    Content::Empty => {}
                }
            }
            _ => {}
        }
    }

    /// Returns the concatenated text if the container holds only text
    /// (text content or text-node children), else `None`.
    pub(crate) fn text_only(&self, id: NodeId) -> Option<String> {
        match self.content(id)? {
            Content::Empty => None,
            Content::Text(text) => Some(text.clone()),
            Content::Nodes(_) => {
                let mut buf = String::new();
                for child in self.nodes(id) {
                    match &self.node(child).kind {
                        NodeKind::Text { content } => buf.push_str(content),
                        _ => return None,
                    }
                }
                Some(buf)
            }
        }
    }

    // --- Annotations ---

    /// Returns the source location recorded for a node at load time.
    #[must_use]
    pub fn line_info(&self, id: NodeId) -> Option<SourceLocation> {
        self.line_info.get(&id).copied()
    }

    pub(crate) fn set_line_info(&mut self, id: NodeId, location: SourceLocation) {
        self.line_info.insert(id, location);
    }

    /// Returns the base URI in effect for a node: the nearest annotation on
    /// the node or one of its ancestors.
    #[must_use]
    pub fn base_uri(&self, id: NodeId) -> Option<&str> {
        self.ancestors_and_self_raw(id)
            .find_map(|n| self.base_uris.get(&n).map(String::as_str))
    }

    /// Attaches a base URI to a node.
    pub fn set_base_uri(&mut self, id: NodeId, uri: &str) {
        self.base_uris.insert(id, uri.to_string());
    }
}

/// Checks the reserved-namespace rules for namespace declarations.
pub(crate) fn validate_attribute_value(name: &QName, value: &str) -> Result<()> {
    use crate::util::qname::{XMLNS_NAMESPACE, XML_NAMESPACE};

    let Some(prefix) = name.declared_prefix() else {
        return Ok(());
    };
    let valid = match prefix {
        "" => value != XML_NAMESPACE && value != XMLNS_NAMESPACE,
        "xml" => value == XML_NAMESPACE,
        "xmlns" => false,
        _ => !value.is_empty() && value != XML_NAMESPACE && value != XMLNS_NAMESPACE,
    };
    if valid {
        Ok(())
    } else {
        Err(TreeError::format(value, "namespace declaration"))
    }
}
