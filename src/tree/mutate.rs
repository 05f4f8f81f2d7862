//! Validated, notifying mutation.
//!
//! Every public operation here follows the same sequence:
//!
//! 1. validate the request against the container's content rules
//! 2. clone the incoming node if it already has a parent (or is the root of
//!    the target's own tree), so a node never ends up in two places
//! 3. raise `Changing`; an observer error aborts the operation
//! 4. re-check the precondition, since observers may have mutated the tree
//! 5. relink through the `list` primitives
//! 6. raise `Changed`
//!
//! Batch operations snapshot their input before clearing anything, so a
//! container's own children or attributes can be passed back in.

use super::{validate_attribute_value, AttrId, Content, Declaration, NodeId, NodeKind, Tree};
use crate::error::{Result, TreeError};
use crate::notify::ChangeKind;
use crate::util::is_xml_whitespace;
use crate::util::qname::QName;

/// One piece of content to add to a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// A node; cloned first if it already has a parent.
    Node(NodeId),
    /// An attribute; only valid for elements.
    Attribute(AttrId),
    /// Character data, merged with adjacent text.
    Text(String),
}

impl From<NodeId> for Item {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<AttrId> for Item {
    fn from(id: AttrId) -> Self {
        Self::Attribute(id)
    }
}

impl From<&str> for Item {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Item {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&String> for Item {
    fn from(text: &String) -> Self {
        Self::Text(text.clone())
    }
}

const ONE_ROOT: &str = "a document can have only one root element";
const ONE_DOCTYPE: &str = "a document can have only one document type";
const DOCTYPE_FIRST: &str = "the document type must precede the root element";
const WHITESPACE_ONLY: &str = "only whitespace text is allowed at document level";

/// Where a batch of items is going, for up-front validation.
#[derive(Debug, Clone, Copy)]
enum Placement {
    Append,
    Siblings,
    ReplaceNode(NodeId),
    ReplaceNodes,
    ReplaceAttributes,
    ReplaceAll,
}

impl Placement {
    fn keeps_node(self, n: NodeId) -> bool {
        match self {
            Self::ReplaceNodes | Self::ReplaceAll => false,
            Self::ReplaceNode(replaced) => n != replaced,
            _ => true,
        }
    }

    fn keeps_attributes(self) -> bool {
        !matches!(self, Self::ReplaceAttributes | Self::ReplaceAll)
    }

    fn allows_attributes(self) -> bool {
        !matches!(self, Self::Siblings | Self::ReplaceNode(_))
    }
}

impl Tree {
    // --- Validation ---

    fn ensure_container(&self, id: NodeId) -> Result<()> {
        let kind = &self.node(id).kind;
        if kind.is_container() {
            Ok(())
        } else {
            Err(TreeError::InvalidChildType {
                child: "content",
                container: kind.describe(),
            })
        }
    }

    fn ensure_element(&self, id: NodeId, child: &'static str) -> Result<()> {
        let kind = &self.node(id).kind;
        if matches!(kind, NodeKind::Element { .. }) {
            Ok(())
        } else {
            Err(TreeError::InvalidChildType {
                child,
                container: kind.describe(),
            })
        }
    }

    fn check_text(&self, parent: NodeId, text: &str) -> Result<()> {
        if matches!(self.node(parent).kind, NodeKind::Document { .. }) && !is_xml_whitespace(text) {
            return Err(TreeError::InvalidDocumentStructure(WHITESPACE_ONLY));
        }
        Ok(())
    }

    /// Checks that `child` may be linked into `parent` directly after
    /// `anchor` (`None` meaning at the start).
    fn check_child(&self, parent: NodeId, child: NodeId, anchor: Option<NodeId>) -> Result<()> {
        let container = self.node(parent).kind.describe();
        let child_kind = &self.node(child).kind;
        match (&self.node(parent).kind, child_kind) {
            (_, NodeKind::Document { .. }) => Err(TreeError::InvalidChildType {
                child: "document",
                container,
            }),
            (NodeKind::Element { .. }, NodeKind::DocumentType { .. }) => {
                Err(TreeError::InvalidChildType {
                    child: "document type",
                    container,
                })
            }
            (NodeKind::Document { .. }, NodeKind::Text { content }) => self.check_text(parent, content),
            (NodeKind::Document { .. }, NodeKind::Element { .. } | NodeKind::DocumentType { .. }) => {
                let is_element = matches!(child_kind, NodeKind::Element { .. });
                let mut before = anchor.is_some();
                for n in self.nodes(parent) {
                    match self.node(n).kind {
                        NodeKind::Element { .. } if is_element => {
                            return Err(TreeError::InvalidDocumentStructure(ONE_ROOT));
                        }
                        NodeKind::Element { .. } if before => {
                            return Err(TreeError::InvalidDocumentStructure(DOCTYPE_FIRST));
                        }
                        NodeKind::DocumentType { .. } if !is_element => {
                            return Err(TreeError::InvalidDocumentStructure(ONE_DOCTYPE));
                        }
                        NodeKind::DocumentType { .. } if !before => {
                            return Err(TreeError::InvalidDocumentStructure(DOCTYPE_FIRST));
                        }
                        _ => {}
                    }
                    if Some(n) == anchor {
                        before = false;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Validates a whole batch before anything is modified.
    fn check_items(&self, parent: NodeId, items: &[Item], placement: Placement) -> Result<()> {
        self.ensure_container(parent)?;
        let kind = &self.node(parent).kind;
        let is_document = matches!(kind, NodeKind::Document { .. });
        let mut names: Vec<&QName> = if placement.keeps_attributes() {
            self.attributes(parent).map(|a| self.attr(a).name()).collect()
        } else {
            Vec::new()
        };
        let mut roots = 0;
        let mut doctypes = 0;
        if is_document {
            for n in self.nodes(parent).filter(|&n| placement.keeps_node(n)) {
                match self.node(n).kind {
                    NodeKind::Element { .. } => roots += 1,
                    NodeKind::DocumentType { .. } => doctypes += 1,
                    _ => {}
                }
            }
        }
        for item in items {
            match item {
                Item::Attribute(_) if !placement.allows_attributes() => {
                    return Err(TreeError::InvalidChildType {
                        child: "attribute",
                        container: "a sibling position",
                    });
                }
                Item::Attribute(a) => {
                    self.ensure_element(parent, "attribute")?;
                    let name = self.attr(*a).name();
                    if names.contains(&name) {
                        return Err(TreeError::DuplicateAttribute(name.clone()));
                    }
                    names.push(name);
                }
                Item::Text(text) => self.check_text(parent, text)?,
                Item::Node(n) => match &self.node(*n).kind {
                    NodeKind::Document { .. } => {
                        return Err(TreeError::InvalidChildType {
                            child: "document",
                            container: kind.describe(),
                        });
                    }
                    NodeKind::DocumentType { .. } if !is_document => {
                        return Err(TreeError::InvalidChildType {
                            child: "document type",
                            container: kind.describe(),
                        });
                    }
                    NodeKind::DocumentType { .. } => {
                        doctypes += 1;
                        if doctypes > 1 {
                            return Err(TreeError::InvalidDocumentStructure(ONE_DOCTYPE));
                        }
                    }
                    NodeKind::Element { .. } if is_document => {
                        roots += 1;
                        if roots > 1 {
                            return Err(TreeError::InvalidDocumentStructure(ONE_ROOT));
                        }
                    }
                    NodeKind::Text { content } => self.check_text(parent, content)?,
                    _ => {}
                },
            }
        }
        Ok(())
    }

    /// Returns `node` itself if it can be linked into `parent` as is, or a
    /// deep copy if it is owned elsewhere or is the root of `parent`'s tree.
    fn claim(&mut self, parent: NodeId, node: NodeId) -> NodeId {
        if self.node(node).parent.is_some() || self.root(parent) == node {
            self.deep_copy(node)
        } else {
            node
        }
    }

    fn claim_attribute(&mut self, attr: AttrId) -> AttrId {
        if self.attr(attr).parent.is_some() {
            self.copy_attribute(attr)
        } else {
            attr
        }
    }

    // --- Adding ---

    /// Adds one item at the end of a container.
    ///
    /// # Errors
    ///
    /// - [`TreeError::InvalidChildType`] for an item the container cannot
    ///   hold (e.g. an attribute on a document)
    /// - [`TreeError::InvalidDocumentStructure`] if a document's rules
    ///   would be broken
    /// - [`TreeError::DuplicateAttribute`] for a repeated attribute name
    /// - any error returned by a `Changing` observer, or
    ///   [`TreeError::ExternalMutation`] if an observer interfered
    pub fn add(&mut self, parent: NodeId, item: impl Into<Item>) -> Result<()> {
        match item.into() {
            Item::Node(n) => self.add_node(parent, n).map(|_| ()),
            Item::Attribute(a) => self.add_attribute(parent, a).map(|_| ()),
            Item::Text(text) => self.add_text(parent, &text),
        }
    }

    /// Adds items at the end of a container, in order.
    ///
    /// # Errors
    ///
    /// See [`Tree::add`]. The whole batch is validated first.
    pub fn add_all<I>(&mut self, parent: NodeId, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Item>,
    {
        let items: Vec<Item> = items.into_iter().map(Into::into).collect();
        self.check_items(parent, &items, Placement::Append)?;
        for item in items {
            self.add(parent, item)?;
        }
        Ok(())
    }

    /// Appends a node and returns the node actually linked (a copy if
    /// `node` was owned elsewhere).
    ///
    /// # Errors
    ///
    /// See [`Tree::add`].
    pub fn add_node(&mut self, parent: NodeId, node: NodeId) -> Result<NodeId> {
        self.ensure_container(parent)?;
        self.check_child(parent, node, self.last_node(parent))?;
        let node = self.claim(parent, node);
        self.notify_changing(parent.into(), ChangeKind::Add, node.into())?;
        if self.node(node).parent.is_some() {
            return Err(TreeError::external("add"));
        }
        self.convert_text_to_node(parent);
        self.append_link(parent, node);
        self.notify_changed(parent.into(), ChangeKind::Add, node.into())?;
        Ok(node)
    }

    /// Appends an attribute and returns the attribute actually linked.
    ///
    /// # Errors
    ///
    /// See [`Tree::add`].
    pub fn add_attribute(&mut self, element: NodeId, attr: AttrId) -> Result<AttrId> {
        self.ensure_element(element, "attribute")?;
        let name = self.attr(attr).name().clone();
        if self.attribute(element, &name).is_some() {
            return Err(TreeError::DuplicateAttribute(name));
        }
        let attr = self.claim_attribute(attr);
        self.notify_changing(element.into(), ChangeKind::Add, attr.into())?;
        if self.attr(attr).parent.is_some() || self.attribute(element, &name).is_some() {
            return Err(TreeError::external("add attribute"));
        }
        self.append_attr_link(element, attr);
        self.notify_changed(element.into(), ChangeKind::Add, attr.into())?;
        Ok(attr)
    }

    /// Appends character data, merging it into trailing text.
    ///
    /// Adding `""` to an empty element turns `<a/>` into `<a></a>`.
    ///
    /// # Errors
    ///
    /// See [`Tree::add`].
    pub fn add_text(&mut self, parent: NodeId, text: &str) -> Result<()> {
        self.ensure_container(parent)?;
        self.check_text(parent, text)?;
        let is_element = self.is_element(parent);
        let was_empty = self.content(parent) == Some(&Content::Empty);
        if text.is_empty() {
            if !was_empty {
                return Ok(());
            }
            if is_element {
                self.notify_changing(parent.into(), ChangeKind::Value, parent.into())?;
                if self.content(parent) != Some(&Content::Empty) {
                    return Err(TreeError::external("add text"));
                }
            }
            self.set_content(parent, Content::Text(String::new()));
            if is_element {
                self.notify_changed(parent.into(), ChangeKind::Value, parent.into())?;
            }
            return Ok(());
        }
        self.convert_text_to_node(parent);
        let last_text = self
            .last_node(parent)
            .filter(|&last| matches!(self.node(last).kind, NodeKind::Text { .. }));
        match last_text {
            Some(last) => {
                let merged = self.value(last) + text;
                self.set_value(last, &merged)
            }
            None => {
                let node = self.new_text(text);
                self.add_node(parent, node).map(|_| ())
            }
        }
    }

    fn set_content(&mut self, parent: NodeId, content: Content) {
        if let Some(slot) = self.node_mut(parent).kind.content_mut() {
            *slot = content;
        }
    }

    /// Inserts items as the first children of a container.
    ///
    /// # Errors
    ///
    /// See [`Tree::add`]; attributes are rejected with
    /// [`TreeError::InvalidChildType`].
    pub fn add_first<I>(&mut self, parent: NodeId, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Item>,
    {
        let items: Vec<Item> = items.into_iter().map(Into::into).collect();
        self.check_items(parent, &items, Placement::Siblings)?;
        self.insert_items(parent, None, items)
    }

    /// Inserts items as siblings directly after `node`.
    ///
    /// # Errors
    ///
    /// [`TreeError::MissingParent`] if `node` is detached; otherwise see
    /// [`Tree::add_first`].
    pub fn add_after_self<I>(&mut self, node: NodeId, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Item>,
    {
        let parent = self.parent(node).ok_or(TreeError::MissingParent)?;
        let items: Vec<Item> = items.into_iter().map(Into::into).collect();
        self.check_items(parent, &items, Placement::Siblings)?;
        self.insert_items(parent, Some(node), items)
    }

    /// Inserts items as siblings directly before `node`.
    ///
    /// # Errors
    ///
    /// See [`Tree::add_after_self`].
    pub fn add_before_self<I>(&mut self, node: NodeId, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Item>,
    {
        let parent = self.parent(node).ok_or(TreeError::MissingParent)?;
        let items: Vec<Item> = items.into_iter().map(Into::into).collect();
        self.check_items(parent, &items, Placement::Siblings)?;
        let anchor = self.previous_node(node);
        self.insert_items(parent, anchor, items)
    }

    /// Links each item after `anchor`, advancing the anchor as it goes.
    /// Adjacent strings are joined into one text node.
    fn insert_items(&mut self, parent: NodeId, mut anchor: Option<NodeId>, items: Vec<Item>) -> Result<()> {
        let mut pending = String::new();
        let mut saw_text = false;
        for item in items {
            match item {
                Item::Text(text) => {
                    pending.push_str(&text);
                    saw_text = true;
                }
                Item::Node(n) => {
                    if !pending.is_empty() {
                        let text = self.new_text(&std::mem::take(&mut pending));
                        anchor = Some(self.insert_node_after(parent, anchor, text)?);
                    }
                    anchor = Some(self.insert_node_after(parent, anchor, n)?);
                }
                Item::Attribute(_) => {
                    return Err(TreeError::InvalidChildType {
                        child: "attribute",
                        container: "a sibling position",
                    });
                }
            }
        }
        if !pending.is_empty() {
            let text = self.new_text(&pending);
            self.insert_node_after(parent, anchor, text)?;
        } else if saw_text && self.content(parent) == Some(&Content::Empty) {
            self.add_text(parent, "")?;
        }
        Ok(())
    }

    fn insert_node_after(&mut self, parent: NodeId, anchor: Option<NodeId>, node: NodeId) -> Result<NodeId> {
        self.check_child(parent, node, anchor)?;
        let node = self.claim(parent, node);
        self.notify_changing(parent.into(), ChangeKind::Add, node.into())?;
        let anchor_moved = anchor.is_some_and(|a| self.node(a).parent != Some(parent));
        if self.node(node).parent.is_some() || anchor_moved {
            return Err(TreeError::external("insert"));
        }
        self.convert_text_to_node(parent);
        self.insert_link_after(parent, anchor, node);
        self.notify_changed(parent.into(), ChangeKind::Add, node.into())?;
        Ok(node)
    }

    // --- Removing ---

    /// Detaches a node from its parent.
    ///
    /// # Errors
    ///
    /// [`TreeError::MissingParent`] if the node is already detached, an
    /// observer veto, or [`TreeError::ExternalMutation`].
    pub fn remove(&mut self, node: NodeId) -> Result<()> {
        let parent = self.parent(node).ok_or(TreeError::MissingParent)?;
        self.notify_changing(parent.into(), ChangeKind::Remove, node.into())?;
        if self.parent(node) != Some(parent) {
            return Err(TreeError::external("remove"));
        }
        self.unlink(node);
        self.notify_changed(parent.into(), ChangeKind::Remove, node.into())
    }

    /// Detaches an attribute from its element.
    ///
    /// # Errors
    ///
    /// See [`Tree::remove`].
    pub fn remove_attribute(&mut self, attr: AttrId) -> Result<()> {
        let element = self.attr(attr).parent.ok_or(TreeError::MissingParent)?;
        self.notify_changing(element.into(), ChangeKind::Remove, attr.into())?;
        if self.attr(attr).parent != Some(element) {
            return Err(TreeError::external("remove attribute"));
        }
        self.unlink_attr(attr);
        self.notify_changed(element.into(), ChangeKind::Remove, attr.into())
    }

    /// Removes all child content of a container, text included.
    ///
    /// Children are removed first-to-last, each in O(1).
    ///
    /// # Errors
    ///
    /// An observer veto or [`TreeError::ExternalMutation`].
    pub fn remove_nodes(&mut self, parent: NodeId) -> Result<()> {
        self.ensure_container(parent)?;
        if !self.has_observers() {
            let children: Vec<NodeId> = self.nodes(parent).collect();
            for child in children {
                let data = self.node_mut(child);
                data.parent = None;
                data.next = child;
            }
            self.set_content(parent, Content::Empty);
            return Ok(());
        }
        loop {
            match self.content(parent).cloned() {
                None | Some(Content::Empty) => return Ok(()),
                Some(Content::Text(text)) if !text.is_empty() => self.convert_text_to_node(parent),
                Some(Content::Text(_)) => {
                    if !self.is_element(parent) {
                        self.set_content(parent, Content::Empty);
                        continue;
                    }
                    self.notify_changing(parent.into(), ChangeKind::Value, parent.into())?;
                    if !matches!(self.content(parent), Some(Content::Text(t)) if t.is_empty()) {
                        return Err(TreeError::external("remove nodes"));
                    }
                    self.set_content(parent, Content::Empty);
                    self.notify_changed(parent.into(), ChangeKind::Value, parent.into())?;
                }
                Some(Content::Nodes(last)) => {
                    let first = self.node(last).next;
                    self.notify_changing(parent.into(), ChangeKind::Remove, first.into())?;
                    if self.last_node(parent) != Some(last) || self.node(last).next != first {
                        return Err(TreeError::external("remove nodes"));
                    }
                    self.unlink(first);
                    self.notify_changed(parent.into(), ChangeKind::Remove, first.into())?;
                }
            }
        }
    }

    /// Removes all attributes of an element.
    ///
    /// # Errors
    ///
    /// See [`Tree::remove_nodes`].
    pub fn remove_attributes(&mut self, element: NodeId) -> Result<()> {
        self.ensure_element(element, "attribute")?;
        if !self.has_observers() {
            let attrs: Vec<AttrId> = self.attributes(element).collect();
            for a in attrs {
                let data = self.attr_mut(a);
                data.parent = None;
                data.next = a;
            }
            if let NodeKind::Element { last_attr, .. } = &mut self.node_mut(element).kind {
                *last_attr = None;
            }
            return Ok(());
        }
        while let Some(last) = self.last_attribute(element) {
            let first = self.attr(last).next;
            self.notify_changing(element.into(), ChangeKind::Remove, first.into())?;
            if self.last_attribute(element) != Some(last) || self.attr(last).next != first {
                return Err(TreeError::external("remove attributes"));
            }
            self.unlink_attr(first);
            self.notify_changed(element.into(), ChangeKind::Remove, first.into())?;
        }
        Ok(())
    }

    /// Removes all attributes and all child content.
    ///
    /// # Errors
    ///
    /// See [`Tree::remove_nodes`].
    pub fn remove_all(&mut self, container: NodeId) -> Result<()> {
        if self.is_element(container) {
            self.remove_attributes(container)?;
        }
        self.remove_nodes(container)
    }

    // --- Replacing ---

    /// Replaces a node with the given items.
    ///
    /// # Errors
    ///
    /// [`TreeError::MissingParent`] if `node` is detached; otherwise see
    /// [`Tree::add_first`].
    pub fn replace_with<I>(&mut self, node: NodeId, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Item>,
    {
        let parent = self.parent(node).ok_or(TreeError::MissingParent)?;
        let items: Vec<Item> = items.into_iter().map(Into::into).collect();
        self.check_items(parent, &items, Placement::ReplaceNode(node))?;
        let anchor = self.previous_node(node);
        self.remove(node)?;
        if anchor.is_some_and(|a| self.parent(a) != Some(parent)) {
            return Err(TreeError::external("replace"));
        }
        self.insert_items(parent, anchor, items)
    }

    /// Replaces all child content of a container.
    ///
    /// # Errors
    ///
    /// See [`Tree::add_all`].
    pub fn replace_nodes<I>(&mut self, parent: NodeId, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Item>,
    {
        let items: Vec<Item> = items.into_iter().map(Into::into).collect();
        self.check_items(parent, &items, Placement::ReplaceNodes)?;
        self.remove_nodes(parent)?;
        for item in items {
            self.add(parent, item)?;
        }
        Ok(())
    }

    /// Replaces all attributes of an element.
    ///
    /// # Errors
    ///
    /// See [`Tree::add_all`].
    pub fn replace_attributes<I>(&mut self, element: NodeId, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Item>,
    {
        self.ensure_element(element, "attribute")?;
        let items: Vec<Item> = items.into_iter().map(Into::into).collect();
        self.check_items(element, &items, Placement::ReplaceAttributes)?;
        self.remove_attributes(element)?;
        for item in items {
            self.add(element, item)?;
        }
        Ok(())
    }

    /// Replaces all attributes and child content of an element.
    ///
    /// # Errors
    ///
    /// See [`Tree::add_all`].
    pub fn replace_all<I>(&mut self, element: NodeId, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Item>,
    {
        let items: Vec<Item> = items.into_iter().map(Into::into).collect();
        self.check_items(element, &items, Placement::ReplaceAll)?;
        self.remove_all(element)?;
        for item in items {
            self.add(element, item)?;
        }
        Ok(())
    }

    // --- Names and values ---

    /// Renames an element.
    ///
    /// # Errors
    ///
    /// [`TreeError::NullArgument`] for an empty local name,
    /// [`TreeError::InvalidChildType`] for a non-element, or an observer
    /// veto.
    pub fn set_name(&mut self, element: NodeId, name: impl Into<QName>) -> Result<()> {
        let name = name.into();
        name.validate()?;
        self.ensure_element(element, "name")?;
        self.notify_changing(element.into(), ChangeKind::Name, element.into())?;
        if let NodeKind::Element { name: slot, .. } = &mut self.node_mut(element).kind {
            *slot = name;
        }
        self.notify_changed(element.into(), ChangeKind::Name, element.into())
    }

    /// Changes the target of a processing instruction.
    ///
    /// # Errors
    ///
    /// [`TreeError::NullArgument`] for an empty target or an observer veto.
    pub fn set_target(&mut self, pi: NodeId, target: &str) -> Result<()> {
        if target.is_empty() {
            return Err(TreeError::NullArgument("target"));
        }
        if !matches!(self.node(pi).kind, NodeKind::ProcessingInstruction { .. }) {
            return Err(TreeError::InvalidChildType {
                child: "target",
                container: self.node(pi).kind.describe(),
            });
        }
        self.notify_changing(pi.into(), ChangeKind::Name, pi.into())?;
        if let NodeKind::ProcessingInstruction { target: slot, .. } = &mut self.node_mut(pi).kind {
            *slot = target.to_string();
        }
        self.notify_changed(pi.into(), ChangeKind::Name, pi.into())
    }

    /// Sets the value of a node.
    ///
    /// For elements and documents all content is replaced by `value` as
    /// text. For text and comments the text changes; for a processing
    /// instruction its data.
    ///
    /// # Errors
    ///
    /// [`TreeError::InvalidChildType`] for a document type node, an
    /// observer veto, or [`TreeError::ExternalMutation`].
    pub fn set_value(&mut self, node: NodeId, value: &str) -> Result<()> {
        match self.node(node).kind {
            NodeKind::Element { .. } | NodeKind::Document { .. } => {
                self.check_text(node, value)?;
                self.remove_nodes(node)?;
                self.add_text(node, value)
            }
            NodeKind::DocumentType { .. } => Err(TreeError::InvalidChildType {
                child: "value",
                container: "document type",
            }),
            _ => {
                self.notify_changing(node.into(), ChangeKind::Value, node.into())?;
                match &mut self.node_mut(node).kind {
                    NodeKind::Text { content } | NodeKind::Comment { content } => {
                        *content = value.to_string();
                    }
                    NodeKind::ProcessingInstruction { data, .. } => *data = value.to_string(),
                    _ => {}
                }
                self.notify_changed(node.into(), ChangeKind::Value, node.into())
            }
        }
    }

    /// Sets the value of an attribute.
    ///
    /// # Errors
    ///
    /// [`TreeError::Format`] for an illegal namespace declaration or an
    /// observer veto.
    pub fn set_attribute_node_value(&mut self, attr: AttrId, value: &str) -> Result<()> {
        validate_attribute_value(self.attr(attr).name(), value)?;
        self.notify_changing(attr.into(), ChangeKind::Value, attr.into())?;
        self.attr_mut(attr).value = value.to_string();
        self.notify_changed(attr.into(), ChangeKind::Value, attr.into())
    }

    /// Sets, adds or (with `None`) removes the named attribute.
    ///
    /// # Errors
    ///
    /// [`TreeError::NullArgument`] for an empty name, or as for
    /// [`Tree::add`] and [`Tree::remove_attribute`].
    pub fn set_attribute_value(
        &mut self,
        element: NodeId,
        name: impl Into<QName>,
        value: Option<&str>,
    ) -> Result<()> {
        let name = name.into();
        name.validate()?;
        self.ensure_element(element, "attribute")?;
        match (self.attribute(element, &name), value) {
            (Some(a), None) => self.remove_attribute(a),
            (Some(a), Some(v)) => self.set_attribute_node_value(a, v),
            (None, Some(v)) => {
                let a = self.new_attribute(name, v)?;
                self.add_attribute(element, a).map(|_| ())
            }
            (None, None) => Ok(()),
        }
    }

    /// Sets the text of the first child element with the given name,
    /// creating it if needed; `None` removes that child.
    ///
    /// # Errors
    ///
    /// As for [`Tree::add`], [`Tree::remove`] and [`Tree::set_value`].
    pub fn set_element_value(
        &mut self,
        element: NodeId,
        name: impl Into<QName>,
        value: Option<&str>,
    ) -> Result<()> {
        let name = name.into();
        name.validate()?;
        match (self.element(element, &name), value) {
            (Some(child), None) => self.remove(child),
            (Some(child), Some(v)) => self.set_value(child, v),
            (None, Some(v)) => {
                let child = self.new_element(name)?;
                self.add_text_quiet(child, v);
                self.add_node(element, child).map(|_| ())
            }
            (None, None) => Ok(()),
        }
    }

    /// Replaces a document's XML declaration.
    ///
    /// # Errors
    ///
    /// [`TreeError::InvalidChildType`] if `document` is not a document.
    pub fn set_declaration(&mut self, document: NodeId, declaration: Option<Declaration>) -> Result<()> {
        match &mut self.node_mut(document).kind {
            NodeKind::Document { declaration: slot, .. } => {
                *slot = declaration;
                Ok(())
            }
            other => Err(TreeError::InvalidChildType {
                child: "declaration",
                container: other.describe(),
            }),
        }
    }

    // --- Construction without notification ---

    /// Adds an item to a container no observer can be watching yet (a
    /// freshly built element or a tree under construction).
    pub(crate) fn add_quiet(&mut self, parent: NodeId, item: Item) -> Result<()> {
        self.ensure_container(parent)?;
        match item {
            Item::Text(text) => {
                self.check_text(parent, &text)?;
                self.add_text_quiet(parent, &text);
            }
            Item::Attribute(a) => {
                self.ensure_element(parent, "attribute")?;
                let name = self.attr(a).name();
                if self.attribute(parent, name).is_some() {
                    return Err(TreeError::DuplicateAttribute(name.clone()));
                }
                let a = self.claim_attribute(a);
                self.append_attr_link(parent, a);
            }
            Item::Node(n) => {
                self.check_child(parent, n, self.last_node(parent))?;
                let n = self.claim(parent, n);
                self.convert_text_to_node(parent);
                self.append_link(parent, n);
            }
        }
        Ok(())
    }

    /// Appends text, merging it into a trailing text node.
    ///
    /// Non-empty text always lands in a text node so the child axis sees
    /// it. Empty text only marks an empty container as `<a></a>`.
    pub(crate) fn add_text_quiet(&mut self, parent: NodeId, text: &str) {
        if text.is_empty() {
            if let Some(content @ Content::Empty) = self.node_mut(parent).kind.content_mut() {
                *content = Content::Text(String::new());
            }
            return;
        }
        self.convert_text_to_node(parent);
        let last_text = self
            .last_node(parent)
            .filter(|&last| matches!(self.node(last).kind, NodeKind::Text { .. }));
        match last_text {
            Some(last) => {
                if let NodeKind::Text { content } = &mut self.node_mut(last).kind {
                    content.push_str(text);
                }
            }
            None => {
                let node = self.new_text(text);
                self.append_link(parent, node);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tree: &mut Tree, name: &str) -> NodeId {
        let Ok(id) = tree.new_element(name) else {
            panic!("element");
        };
        id
    }

    fn names(tree: &Tree, parent: NodeId) -> Vec<String> {
        tree.nodes(parent)
            .map(|n| match tree.name(n) {
                Some(name) => name.to_string(),
                None => format!("#{}", tree.value(n)),
            })
            .collect()
    }

    #[test]
    fn test_add_detached_node_links_it() {
        let mut tree = Tree::new();
        let root = element(&mut tree, "root");
        let child = element(&mut tree, "child");
        let Ok(linked) = tree.add_node(root, child) else {
            panic!("add failed");
        };
        assert_eq!(linked, child);
        assert_eq!(tree.parent(child), Some(root));
    }

    #[test]
    fn test_add_owned_node_clones() {
        let mut tree = Tree::new();
        let a = element(&mut tree, "a");
        let b = element(&mut tree, "b");
        let child = element(&mut tree, "child");
        let Ok(_) = tree.add_node(a, child) else {
            panic!("add failed");
        };
        let Ok(copy) = tree.add_node(b, child) else {
            panic!("add failed");
        };
        assert_ne!(copy, child);
        assert_eq!(tree.parent(child), Some(a));
        assert_eq!(tree.parent(copy), Some(b));
    }

    #[test]
    fn test_add_own_root_clones() {
        let mut tree = Tree::new();
        let root = element(&mut tree, "root");
        let child = element(&mut tree, "child");
        let Ok(_) = tree.add_node(root, child) else {
            panic!("add failed");
        };
        let Ok(copy) = tree.add_node(child, root) else {
            panic!("add failed");
        };
        assert_ne!(copy, root);
        assert_eq!(tree.parent(root), None);
        assert_eq!(tree.root(copy), root);
    }

    #[test]
    fn test_add_text_merges_into_content() {
        let mut tree = Tree::new();
        let root = element(&mut tree, "root");
        let Ok(()) = tree.add(root, "a") else {
            panic!("add failed");
        };
        let Ok(()) = tree.add(root, "b") else {
            panic!("add failed");
        };
        assert_eq!(tree.value(root), "ab");
        assert_eq!(tree.nodes(root).count(), 1);
    }

    #[test]
    fn test_add_empty_text_marks_non_empty() {
        let mut tree = Tree::new();
        let root = element(&mut tree, "root");
        assert!(tree.is_empty(root));
        let Ok(()) = tree.add(root, "") else {
            panic!("add failed");
        };
        assert!(!tree.is_empty(root));
        assert_eq!(tree.content(root), Some(&Content::Text(String::new())));
    }

    #[test]
    fn test_element_rejects_document_and_doctype() {
        let mut tree = Tree::new();
        let root = element(&mut tree, "root");
        let doc = tree.new_document(None);
        let Ok(doctype) = tree.new_document_type("root", None, None, None) else {
            panic!("doctype");
        };
        assert!(matches!(
            tree.add(root, doc),
            Err(TreeError::InvalidChildType { child: "document", .. })
        ));
        assert!(matches!(
            tree.add(root, doctype),
            Err(TreeError::InvalidChildType { child: "document type", .. })
        ));
    }

    #[test]
    fn test_document_rules() {
        let mut tree = Tree::new();
        let doc = tree.new_document(None);
        let a = element(&mut tree, "a");
        let b = element(&mut tree, "b");
        let Ok(doctype) = tree.new_document_type("a", None, None, None) else {
            panic!("doctype");
        };
        let Ok(()) = tree.add(doc, a) else {
            panic!("add failed");
        };
        assert_eq!(
            tree.add(doc, b),
            Err(TreeError::InvalidDocumentStructure(ONE_ROOT))
        );
        assert_eq!(
            tree.add(doc, doctype),
            Err(TreeError::InvalidDocumentStructure(DOCTYPE_FIRST))
        );
        let Ok(()) = tree.add_first(doc, [doctype]) else {
            panic!("add_first failed");
        };
        assert_eq!(
            tree.add(doc, "text"),
            Err(TreeError::InvalidDocumentStructure(WHITESPACE_ONLY))
        );
        let Ok(attr) = tree.new_attribute("x", "1") else {
            panic!("attribute");
        };
        assert!(matches!(
            tree.add(doc, attr),
            Err(TreeError::InvalidChildType { child: "attribute", .. })
        ));
    }

    #[test]
    fn test_batch_is_validated_before_mutation() {
        let mut tree = Tree::new();
        let root = element(&mut tree, "root");
        let Ok(x1) = tree.new_attribute("x", "1") else {
            panic!("attribute");
        };
        let Ok(x2) = tree.new_attribute("x", "2") else {
            panic!("attribute");
        };
        let child = element(&mut tree, "child");
        let result = tree.add_all(root, [Item::Node(child), Item::Attribute(x1), Item::Attribute(x2)]);
        assert_eq!(result, Err(TreeError::DuplicateAttribute(QName::new("x"))));
        assert!(tree.is_empty(root));
        assert!(!tree.has_attributes(root));
    }

    #[test]
    fn test_sibling_insertion() {
        let mut tree = Tree::new();
        let root = element(&mut tree, "root");
        let b = element(&mut tree, "b");
        let Ok(()) = tree.add(root, b) else {
            panic!("add failed");
        };
        let a = element(&mut tree, "a");
        let c = element(&mut tree, "c");
        let Ok(()) = tree.add_before_self(b, [a]) else {
            panic!("before failed");
        };
        let Ok(()) = tree.add_after_self(b, [Item::Node(c), Item::from("t")]) else {
            panic!("after failed");
        };
        assert_eq!(names(&tree, root), vec!["a", "b", "c", "#t"]);

        let detached = element(&mut tree, "d");
        assert_eq!(tree.add_after_self(detached, ["x"]), Err(TreeError::MissingParent));
        let Ok(attr) = tree.new_attribute("k", "v") else {
            panic!("attribute");
        };
        assert!(tree.add_after_self(b, [attr]).is_err());
    }

    #[test]
    fn test_replace_with_own_children() {
        let mut tree = Tree::new();
        let root = element(&mut tree, "root");
        let a = element(&mut tree, "a");
        let b = element(&mut tree, "b");
        let Ok(()) = tree.add_all(root, [a, b]) else {
            panic!("add failed");
        };
        let reversed: Vec<NodeId> = tree.nodes(root).collect::<Vec<_>>().into_iter().rev().collect();
        let Ok(()) = tree.replace_nodes(root, reversed) else {
            panic!("replace failed");
        };
        assert_eq!(names(&tree, root), vec!["b", "a"]);
        // detached first, so the originals are re-linked rather than cloned
        assert_eq!(tree.parent(a), Some(root));
    }

    #[test]
    fn test_replace_with_node() {
        let mut tree = Tree::new();
        let root = element(&mut tree, "root");
        let a = element(&mut tree, "a");
        let b = element(&mut tree, "b");
        let Ok(()) = tree.add_all(root, [a, b]) else {
            panic!("add failed");
        };
        let x = element(&mut tree, "x");
        let Ok(()) = tree.replace_with(a, [Item::Node(x), Item::from("t")]) else {
            panic!("replace failed");
        };
        assert_eq!(names(&tree, root), vec!["x", "#t", "b"]);
        assert_eq!(tree.parent(a), None);
    }

    #[test]
    fn test_remove_nodes_clears_text_too() {
        let mut tree = Tree::new();
        let Ok(root) = tree.new_element_with("root", ["text"]) else {
            panic!("construction failed");
        };
        let Ok(()) = tree.remove_nodes(root) else {
            panic!("remove failed");
        };
        assert!(tree.is_empty(root));
    }

    #[test]
    fn test_set_attribute_value_add_update_remove() {
        let mut tree = Tree::new();
        let root = element(&mut tree, "root");
        let Ok(()) = tree.set_attribute_value(root, "x", Some("1")) else {
            panic!("set failed");
        };
        let Ok(()) = tree.set_attribute_value(root, "x", Some("2")) else {
            panic!("set failed");
        };
        assert_eq!(tree.get_attribute(root, &QName::new("x")), Some("2"));
        assert_eq!(tree.attributes(root).count(), 1);
        let Ok(()) = tree.set_attribute_value(root, "x", None) else {
            panic!("set failed");
        };
        assert!(!tree.has_attributes(root));
        assert_eq!(
            tree.set_attribute_value(root, "", Some("v")),
            Err(TreeError::NullArgument("name"))
        );
    }

    #[test]
    fn test_set_value_replaces_children() {
        let mut tree = Tree::new();
        let root = element(&mut tree, "root");
        let child = element(&mut tree, "child");
        let Ok(()) = tree.add(root, child) else {
            panic!("add failed");
        };
        let Ok(()) = tree.set_value(root, "plain") else {
            panic!("set failed");
        };
        assert_eq!(tree.value(root), "plain");
        assert!(!tree.has_elements(root));
        assert_eq!(tree.parent(child), None);
    }

    #[test]
    fn test_set_name_and_target() {
        let mut tree = Tree::new();
        let root = element(&mut tree, "root");
        let Ok(()) = tree.set_name(root, ("urn:x", "renamed")) else {
            panic!("rename failed");
        };
        assert_eq!(tree.name(root), Some(&QName::with_namespace("urn:x", "renamed")));
        let Ok(pi) = tree.new_processing_instruction("a", "b") else {
            panic!("pi");
        };
        let Ok(()) = tree.set_target(pi, "c") else {
            panic!("target failed");
        };
        assert!(matches!(&tree.node(pi).kind, NodeKind::ProcessingInstruction { target, .. } if target == "c"));
    }
}
