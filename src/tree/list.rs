//! Circular sibling lists.
//!
//! Children and attributes are both stored as singly linked circular lists
//! referenced by their *last* member. The first member is `last.next`, so
//! appending is O(1) and no separate head pointer exists. Removal has to find
//! the predecessor by walking from `last`, which is O(k) in the list length.
//!
//! These primitives never validate or notify; they only keep the links
//! consistent. Callers in `mutate` do the checking and run the notifier.

use super::{AttrId, Content, NodeId, NodeKind, Tree};

impl Tree {
    /// Returns the last child of a container, or `None` for `<a></a>`,
    /// empty containers and leaf nodes.
    #[must_use]
    pub fn last_node(&self, parent: NodeId) -> Option<NodeId> {
        match self.node(parent).kind.content() {
            Some(Content::Nodes(last)) => Some(*last),
            _ => None,
        }
    }

    /// Returns the first child of a container.
    #[must_use]
    pub fn first_node(&self, parent: NodeId) -> Option<NodeId> {
        self.last_node(parent).map(|last| self.node(last).next)
    }

    /// Replaces text content with an equivalent text node (or nothing, for
    /// empty text) so that nodes can be linked into the container.
    pub(crate) fn convert_text_to_node(&mut self, parent: NodeId) {
        let Some(content) = self.node_mut(parent).kind.content_mut() else {
            return;
        };
        let Content::Text(text) = content else {
            return;
        };
        let text = std::mem::take(text);
        *content = Content::Empty;
        if !text.is_empty() {
            let node = self.alloc_node(NodeKind::Text { content: text });
            self.append_link(parent, node);
        }
    }

    /// Links a detached `child` as the new last child of `parent`.
    pub(crate) fn append_link(&mut self, parent: NodeId, child: NodeId) {
        let previous_last = self.last_node(parent);
        debug_assert!(
            !matches!(self.node(parent).kind.content(), Some(Content::Text(t)) if !t.is_empty()),
            "text content must be converted before linking nodes"
        );
        match previous_last {
            Some(last) => {
                let first = self.node(last).next;
                self.node_mut(child).next = first;
                self.node_mut(last).next = child;
            }
            None => self.node_mut(child).next = child,
        }
        self.node_mut(child).parent = Some(parent);
        if let Some(content) = self.node_mut(parent).kind.content_mut() {
            *content = Content::Nodes(child);
        }
    }

    /// Links a detached `child` directly after `anchor`, or as the first
    /// child when `anchor` is `None`.
    pub(crate) fn insert_link_after(
        &mut self,
        parent: NodeId,
        anchor: Option<NodeId>,
        child: NodeId,
    ) {
        let Some(last) = self.last_node(parent) else {
            self.append_link(parent, child);
            return;
        };
        match anchor {
            Some(anchor) if anchor == last => self.append_link(parent, child),
            Some(anchor) => {
                let after = self.node(anchor).next;
                self.node_mut(child).next = after;
                self.node_mut(anchor).next = child;
                self.node_mut(child).parent = Some(parent);
            }
            None => {
                let first = self.node(last).next;
                self.node_mut(child).next = first;
                self.node_mut(last).next = child;
                self.node_mut(child).parent = Some(parent);
            }
        }
    }

    /// Finds the node whose `next` is `child`, walking from the parent's
    /// last child. For the first child this is the last child; for a lone
    /// child it is the child itself.
    pub(crate) fn predecessor(&self, child: NodeId) -> Option<NodeId> {
        let parent = self.node(child).parent?;
        let last = self.last_node(parent)?;
        let mut p = last;
        loop {
            let next = self.node(p).next;
            if next == child {
                return Some(p);
            }
            if next == last {
                return None;
            }
            p = next;
        }
    }

    /// Unlinks `child` from its parent's list and leaves it as a lone,
    /// detached node. No-op for a detached node.
    pub(crate) fn unlink(&mut self, child: NodeId) {
        let Some(parent) = self.node(child).parent else {
            return;
        };
        let Some(p) = self.predecessor(child) else {
            return;
        };
        let last = self.last_node(parent);
        if p == child {
            if let Some(content) = self.node_mut(parent).kind.content_mut() {
                *content = Content::Empty;
            }
        } else {
            let after = self.node(child).next;
            self.node_mut(p).next = after;
            if last == Some(child) {
                if let Some(content) = self.node_mut(parent).kind.content_mut() {
                    *content = Content::Nodes(p);
                }
            }
        }
        let node = self.node_mut(child);
        node.parent = None;
        node.next = child;
    }

    /// Returns the last attribute of an element.
    #[must_use]
    pub fn last_attribute(&self, element: NodeId) -> Option<AttrId> {
        match &self.node(element).kind {
            NodeKind::Element { last_attr, .. } => *last_attr,
            _ => None,
        }
    }

    /// Returns the first attribute of an element.
    #[must_use]
    pub fn first_attribute(&self, element: NodeId) -> Option<AttrId> {
        self.last_attribute(element).map(|last| self.attr(last).next)
    }

    fn set_last_attribute(&mut self, element: NodeId, value: Option<AttrId>) {
        if let NodeKind::Element { last_attr, .. } = &mut self.node_mut(element).kind {
            *last_attr = value;
        }
    }

    /// Links a detached attribute as the last attribute of `element`.
    pub(crate) fn append_attr_link(&mut self, element: NodeId, attr: AttrId) {
        match self.last_attribute(element) {
            Some(last) => {
                let first = self.attr(last).next;
                self.attr_mut(attr).next = first;
                self.attr_mut(last).next = attr;
            }
            None => self.attr_mut(attr).next = attr,
        }
        self.attr_mut(attr).parent = Some(element);
        self.set_last_attribute(element, Some(attr));
    }

    /// Finds the attribute whose `next` is `attr`.
    pub(crate) fn attr_predecessor(&self, attr: AttrId) -> Option<AttrId> {
        let element = self.attr(attr).parent?;
        let last = self.last_attribute(element)?;
        let mut p = last;
        loop {
            let next = self.attr(p).next;
            if next == attr {
                return Some(p);
            }
            if next == last {
                return None;
            }
            p = next;
        }
    }

    /// Unlinks an attribute from its element. No-op when detached.
    pub(crate) fn unlink_attr(&mut self, attr: AttrId) {
        let Some(element) = self.attr(attr).parent else {
            return;
        };
        let Some(p) = self.attr_predecessor(attr) else {
            return;
        };
        if p == attr {
            self.set_last_attribute(element, None);
        } else {
            let after = self.attr(attr).next;
            self.attr_mut(p).next = after;
            if self.last_attribute(element) == Some(attr) {
                self.set_last_attribute(element, Some(p));
            }
        }
        let data = self.attr_mut(attr);
        data.parent = None;
        data.next = attr;
    }
}
