//! Read-only navigation: children, siblings, ancestors, descendants and
//! attributes.
//!
//! All traversals are lazy iterators borrowing the tree. Iterating while
//! mutating is prevented by the borrow checker; collect first to mutate.

use super::{AttrId, NodeId, NodeKind, Tree};
use crate::util::qname::QName;

impl Tree {
    /// Returns the container a node belongs to.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Returns the parent if it is an element.
    #[must_use]
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&p| self.is_element(p))
    }

    /// Returns the topmost container of the tree `id` belongs to (possibly
    /// `id` itself).
    #[must_use]
    pub fn root(&self, id: NodeId) -> NodeId {
        self.ancestors_and_self_raw(id).last().unwrap_or(id)
    }

    /// Returns the document node at the root of `id`'s tree, if the root is
    /// a document.
    #[must_use]
    pub fn document(&self, id: NodeId) -> Option<NodeId> {
        let root = self.root(id);
        matches!(self.node(root).kind, NodeKind::Document { .. }).then_some(root)
    }

    /// Returns the root element of a document.
    #[must_use]
    pub fn document_element(&self, document: NodeId) -> Option<NodeId> {
        self.elements(document).next()
    }

    /// Returns the document type node of a document.
    #[must_use]
    pub fn document_type(&self, document: NodeId) -> Option<NodeId> {
        self.nodes(document)
            .find(|&n| matches!(self.node(n).kind, NodeKind::DocumentType { .. }))
    }

    // --- Children ---

    /// Iterates the child nodes of a container in document order, text
    /// nodes included.
    pub fn nodes(&self, parent: NodeId) -> Nodes<'_> {
        let last = self.last_node(parent);
        Nodes {
            tree: self,
            next: last.map(|l| self.node(l).next),
            last,
        }
    }

    /// Iterates the child elements of a container.
    pub fn elements(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes(parent).filter(move |&n| self.is_element(n))
    }

    /// Iterates the child elements with the given name.
    pub fn elements_named<'a>(
        &'a self,
        parent: NodeId,
        name: &'a QName,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.nodes(parent)
            .filter(move |&n| self.name(n) == Some(name))
    }

    /// Returns the first child element with the given name.
    #[must_use]
    pub fn element(&self, parent: NodeId, name: &QName) -> Option<NodeId> {
        self.elements_named(parent, name).next()
    }

    /// Returns `true` if the container has at least one child element.
    #[must_use]
    pub fn has_elements(&self, parent: NodeId) -> bool {
        self.elements(parent).next().is_some()
    }

    /// Returns `true` if the element has no content at all, which is
    /// distinct from having empty text content (`<a/>` versus `<a></a>`).
    #[must_use]
    pub fn is_empty(&self, id: NodeId) -> bool {
        matches!(self.content(id), Some(super::Content::Empty))
    }

    // --- Siblings ---

    /// Returns the next sibling, or `None` for the last child or a detached
    /// node.
    #[must_use]
    pub fn next_node(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id).parent?;
        if self.last_node(parent) == Some(id) {
            None
        } else {
            Some(self.node(id).next)
        }
    }

    /// Returns the previous sibling, or `None` for the first child or a
    /// detached node. This walks the parent's list.
    #[must_use]
    pub fn previous_node(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id).parent?;
        if self.first_node(parent) == Some(id) {
            return None;
        }
        self.predecessor(id)
    }

    /// Iterates the siblings after a node.
    pub fn nodes_after_self(&self, id: NodeId) -> Nodes<'_> {
        let (next, last) = match self.node(id).parent {
            Some(parent) => (self.next_node(id), self.last_node(parent)),
            None => (None, None),
        };
        Nodes {
            tree: self,
            next,
            last,
        }
    }

    /// Iterates the siblings before a node, in document order.
    pub fn nodes_before_self(&self, id: NodeId) -> Nodes<'_> {
        let (next, last) = match self.previous_node(id) {
            Some(previous) => (self.node(id).parent.and_then(|p| self.first_node(p)), Some(previous)),
            None => (None, None),
        };
        Nodes {
            tree: self,
            next,
            last,
        }
    }

    /// Iterates the sibling elements after a node.
    pub fn elements_after_self(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes_after_self(id).filter(move |&n| self.is_element(n))
    }

    /// Iterates the sibling elements before a node.
    pub fn elements_before_self(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes_before_self(id).filter(move |&n| self.is_element(n))
    }

    // --- Ancestors ---

    /// Walks from a node up through every container, the node included.
    pub(crate) fn ancestors_and_self_raw(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: Some(id),
        }
    }

    /// Iterates the element ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        Ancestors {
            tree: self,
            next: self.node(id).parent,
        }
        .filter(move |&n| self.is_element(n))
    }

    /// Iterates the element ancestors with the given name.
    pub fn ancestors_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a QName,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.ancestors(id).filter(move |&n| self.name(n) == Some(name))
    }

    /// Iterates the node itself (if it is an element) and its element
    /// ancestors.
    pub fn ancestors_and_self(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.ancestors_and_self_raw(id)
            .filter(move |&n| self.is_element(n))
    }

    // --- Descendants ---

    /// Iterates all descendant nodes in document order (depth-first,
    /// pre-order), excluding `root`.
    pub fn descendant_nodes(&self, root: NodeId) -> DescendantNodes<'_> {
        DescendantNodes {
            tree: self,
            root,
            next: self.first_node(root),
        }
    }

    /// Like [`Tree::descendant_nodes`] but starting with `root` itself.
    pub fn descendant_nodes_and_self(&self, root: NodeId) -> DescendantNodes<'_> {
        DescendantNodes {
            tree: self,
            root,
            next: Some(root),
        }
    }

    /// Iterates all descendant elements in document order.
    pub fn descendants(&self, root: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.descendant_nodes(root)
            .filter(move |&n| self.is_element(n))
    }

    /// Iterates the descendant elements with the given name.
    pub fn descendants_named<'a>(
        &'a self,
        root: NodeId,
        name: &'a QName,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.descendant_nodes(root)
            .filter(move |&n| self.name(n) == Some(name))
    }

    /// Iterates `root` (if it is an element) and its descendant elements.
    pub fn descendants_and_self(&self, root: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.descendant_nodes_and_self(root)
            .filter(move |&n| self.is_element(n))
    }

    /// Like [`Tree::descendants_and_self`], restricted to one name.
    pub fn descendants_and_self_named<'a>(
        &'a self,
        root: NodeId,
        name: &'a QName,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.descendant_nodes_and_self(root)
            .filter(move |&n| self.name(n) == Some(name))
    }

    // --- Attributes ---

    /// Iterates the attributes of an element in document order.
    pub fn attributes(&self, element: NodeId) -> Attributes<'_> {
        let last = self.last_attribute(element);
        Attributes {
            tree: self,
            next: last.map(|l| self.attr(l).next),
            last,
        }
    }

    /// Iterates the attributes with the given name (zero or one).
    pub fn attributes_named<'a>(
        &'a self,
        element: NodeId,
        name: &'a QName,
    ) -> impl Iterator<Item = AttrId> + 'a {
        self.attributes(element)
            .filter(move |&a| self.attr(a).name() == name)
    }

    /// Returns the attribute with the given name.
    #[must_use]
    pub fn attribute(&self, element: NodeId, name: &QName) -> Option<AttrId> {
        self.attributes(element).find(|&a| self.attr(a).name() == name)
    }

    /// Returns the value of the attribute with the given name.
    #[must_use]
    pub fn get_attribute(&self, element: NodeId, name: &QName) -> Option<&str> {
        self.attribute(element, name).map(|a| self.attr(a).value())
    }

    /// Returns `true` if the element has any attributes.
    #[must_use]
    pub fn has_attributes(&self, element: NodeId) -> bool {
        self.last_attribute(element).is_some()
    }

    /// Returns the attribute after `attr` on its element.
    #[must_use]
    pub fn next_attribute(&self, attr: AttrId) -> Option<AttrId> {
        let element = self.attr(attr).parent()?;
        if self.last_attribute(element) == Some(attr) {
            None
        } else {
            Some(self.attr(attr).next)
        }
    }

    /// Returns the attribute before `attr` on its element.
    #[must_use]
    pub fn previous_attribute(&self, attr: AttrId) -> Option<AttrId> {
        let element = self.attr(attr).parent()?;
        if self.first_attribute(element) == Some(attr) {
            return None;
        }
        self.attr_predecessor(attr)
    }
}

// --- Iterators ---

/// Iterator over a run of sibling nodes.
pub struct Nodes<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
    last: Option<NodeId>,
}

impl Iterator for Nodes<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = if Some(current) == self.last {
            None
        } else {
            Some(self.tree.node(current).next)
        };
        Some(current)
    }
}

/// Iterator over a node and the containers above it.
pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.node(current).parent;
        Some(current)
    }
}

/// Depth-first, pre-order iterator over a subtree.
pub struct DescendantNodes<'a> {
    tree: &'a Tree,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for DescendantNodes<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        // Go deeper first
        if let Some(child) = self.tree.first_node(current) {
            self.next = Some(child);
            return Some(current);
        }
        if current == self.root {
            self.next = None;
            return Some(current);
        }

        // Then the next sibling, walking up as needed
        let mut n = current;
        loop {
            if let Some(sibling) = self.tree.next_node(n) {
                self.next = Some(sibling);
                break;
            }
            match self.tree.node(n).parent {
                Some(parent) if parent != self.root => n = parent,
                _ => {
                    self.next = None;
                    break;
                }
            }
        }
        Some(current)
    }
}

/// Iterator over the attributes of one element.
pub struct Attributes<'a> {
    tree: &'a Tree,
    next: Option<AttrId>,
    last: Option<AttrId>,
}

impl Iterator for Attributes<'_> {
    type Item = AttrId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = if Some(current) == self.last {
            None
        } else {
            Some(self.tree.attr(current).next)
        };
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `<root><a><b/></a>text<c/></root>`
    fn sample(tree: &mut Tree) -> (NodeId, NodeId, NodeId, NodeId, NodeId) {
        let Ok(root) = tree.new_element("root") else {
            panic!("root");
        };
        let Ok(a) = tree.new_element("a") else {
            panic!("a");
        };
        let Ok(b) = tree.new_element("b") else {
            panic!("b");
        };
        let Ok(c) = tree.new_element("c") else {
            panic!("c");
        };
        let text = tree.new_text("text");
        tree.append_link(a, b);
        tree.append_link(root, a);
        tree.append_link(root, text);
        tree.append_link(root, c);
        (root, a, b, text, c)
    }

    #[test]
    fn test_nodes_and_elements() {
        let mut tree = Tree::new();
        let (root, a, _, text, c) = sample(&mut tree);
        assert_eq!(tree.nodes(root).collect::<Vec<_>>(), vec![a, text, c]);
        assert_eq!(tree.elements(root).collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(tree.element(root, &QName::new("c")), Some(c));
        assert_eq!(tree.element(root, &QName::new("zzz")), None);
    }

    #[test]
    fn test_siblings() {
        let mut tree = Tree::new();
        let (root, a, _, text, c) = sample(&mut tree);
        assert_eq!(tree.next_node(a), Some(text));
        assert_eq!(tree.next_node(c), None);
        assert_eq!(tree.previous_node(a), None);
        assert_eq!(tree.previous_node(c), Some(text));
        assert_eq!(tree.next_node(root), None);
        assert_eq!(tree.nodes_after_self(a).collect::<Vec<_>>(), vec![text, c]);
        assert_eq!(tree.nodes_before_self(c).collect::<Vec<_>>(), vec![a, text]);
        assert_eq!(tree.nodes_before_self(a).count(), 0);
        assert_eq!(tree.elements_after_self(a).collect::<Vec<_>>(), vec![c]);
        assert_eq!(tree.elements_before_self(c).collect::<Vec<_>>(), vec![a]);
    }

    #[test]
    fn test_descendants_in_document_order() {
        let mut tree = Tree::new();
        let (root, a, b, text, c) = sample(&mut tree);
        assert_eq!(
            tree.descendant_nodes(root).collect::<Vec<_>>(),
            vec![a, b, text, c]
        );
        assert_eq!(
            tree.descendants_and_self(root).collect::<Vec<_>>(),
            vec![root, a, b, c]
        );
        assert_eq!(tree.descendant_nodes(a).collect::<Vec<_>>(), vec![b]);
        assert_eq!(tree.descendant_nodes(b).count(), 0);
        assert_eq!(
            tree.descendants_named(root, &QName::new("b")).collect::<Vec<_>>(),
            vec![b]
        );
    }

    #[test]
    fn test_ancestors_and_root() {
        let mut tree = Tree::new();
        let (root, a, b, _, _) = sample(&mut tree);
        assert_eq!(tree.ancestors(b).collect::<Vec<_>>(), vec![a, root]);
        assert_eq!(tree.ancestors_and_self(b).collect::<Vec<_>>(), vec![b, a, root]);
        assert_eq!(tree.root(b), root);
        assert_eq!(tree.document(b), None);
        assert_eq!(
            tree.ancestors_named(b, &QName::new("root")).collect::<Vec<_>>(),
            vec![root]
        );
    }

    #[test]
    fn test_document_accessors() {
        let mut tree = Tree::new();
        let doc = tree.new_document(None);
        let Ok(doctype) = tree.new_document_type("root", None, None, None) else {
            panic!("doctype");
        };
        let Ok(root) = tree.new_element("root") else {
            panic!("root");
        };
        tree.append_link(doc, doctype);
        tree.append_link(doc, root);
        assert_eq!(tree.document(root), Some(doc));
        assert_eq!(tree.document_element(doc), Some(root));
        assert_eq!(tree.document_type(doc), Some(doctype));
        // document nodes are not element ancestors
        assert_eq!(tree.ancestors(root).count(), 0);
    }

    #[test]
    fn test_attribute_navigation() {
        let mut tree = Tree::new();
        let Ok(el) = tree.new_element("el") else {
            panic!("el");
        };
        let mut ids = Vec::new();
        for name in ["x", "y", "z"] {
            let Ok(a) = tree.new_attribute(name, name) else {
                panic!("attribute");
            };
            tree.append_attr_link(el, a);
            ids.push(a);
        }
        assert_eq!(tree.attributes(el).collect::<Vec<_>>(), ids);
        assert_eq!(tree.next_attribute(ids[0]), Some(ids[1]));
        assert_eq!(tree.next_attribute(ids[2]), None);
        assert_eq!(tree.previous_attribute(ids[0]), None);
        assert_eq!(tree.previous_attribute(ids[2]), Some(ids[1]));
        assert_eq!(tree.get_attribute(el, &QName::new("y")), Some("y"));
        assert_eq!(tree.attributes_named(el, &QName::new("z")).count(), 1);
        assert!(tree.has_attributes(el));
    }
}
