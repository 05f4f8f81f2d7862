//! Structural equality, hashing and document order.
//!
//! Equality is order-sensitive for both children and attributes. The hash
//! folds children in order but combines attribute hashes with XOR, so
//! permuted attributes collide without being equal. That is allowed: equal
//! trees always hash the same.

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::{Content, NodeId, NodeKind, Tree};
use crate::error::{Result, TreeError};

fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn nodes_equal(ta: &Tree, a: NodeId, tb: &Tree, b: NodeId) -> bool {
    match (&ta.node(a).kind, &tb.node(b).kind) {
        (NodeKind::Text { content: x }, NodeKind::Text { content: y })
        | (NodeKind::Comment { content: x }, NodeKind::Comment { content: y }) => x == y,
        (
            NodeKind::ProcessingInstruction { target: t1, data: d1 },
            NodeKind::ProcessingInstruction { target: t2, data: d2 },
        ) => t1 == t2 && d1 == d2,
        (
            NodeKind::DocumentType {
                name: n1,
                public_id: p1,
                system_id: s1,
                internal_subset: i1,
            },
            NodeKind::DocumentType {
                name: n2,
                public_id: p2,
                system_id: s2,
                internal_subset: i2,
            },
        ) => n1 == n2 && p1 == p2 && s1 == s2 && i1 == i2,
        (NodeKind::Element { name: n1, .. }, NodeKind::Element { name: n2, .. }) => {
            n1 == n2 && attributes_equal(ta, a, tb, b) && contents_equal(ta, a, tb, b)
        }
        (NodeKind::Document { .. }, NodeKind::Document { .. }) => contents_equal(ta, a, tb, b),
        _ => false,
    }
}

fn attributes_equal(ta: &Tree, a: NodeId, tb: &Tree, b: NodeId) -> bool {
    let mut left = ta.attributes(a);
    let mut right = tb.attributes(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) => {
                let (x, y) = (ta.attr(x), tb.attr(y));
                if x.name() != y.name() || x.value() != y.value() {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

fn contents_equal(ta: &Tree, a: NodeId, tb: &Tree, b: NodeId) -> bool {
    match (ta.content(a), tb.content(b)) {
        (Some(Content::Empty), Some(Content::Empty)) => return true,
        (Some(Content::Empty), _) | (_, Some(Content::Empty)) => return false,
        _ => {}
    }
    if let Some(text) = ta.text_only(a) {
        return tb.text_only(b).is_some_and(|other| other == text);
    }
    let mut left = ta.nodes(a);
    let mut right = tb.nodes(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) if nodes_equal(ta, x, tb, y) => {}
            _ => return false,
        }
    }
}

fn node_hash(tree: &Tree, id: NodeId) -> u64 {
    match &tree.node(id).kind {
        NodeKind::Text { content } => hash_of(content.as_str()),
        NodeKind::Comment { content } => hash_of(&("comment", content)),
        NodeKind::ProcessingInstruction { target, data } => hash_of(&(target, data)),
        NodeKind::DocumentType {
            name,
            public_id,
            system_id,
            internal_subset,
        } => hash_of(&(name, public_id, system_id, internal_subset)),
        NodeKind::Element { name, .. } => {
            let attrs = tree.attributes(id).fold(0u64, |h, a| {
                let attr = tree.attr(a);
                h ^ hash_of(&(attr.name(), attr.value()))
            });
            hash_of(name) ^ contents_hash(tree, id) ^ attrs
        }
        NodeKind::Document { .. } => contents_hash(tree, id),
    }
}

fn contents_hash(tree: &Tree, id: NodeId) -> u64 {
    if let Some(text) = tree.text_only(id) {
        return hash_of(text.as_str());
    }
    tree.nodes(id)
        .fold(0u64, |h, child| h.wrapping_mul(31).wrapping_add(node_hash(tree, child)))
}

impl Tree {
    /// Returns `true` if two nodes of this tree are structurally equal.
    ///
    /// Attributes must match in order as well as name and value. Content
    /// that is only text compares as one string regardless of how it is
    /// split into nodes; `<a/>` and `<a></a>` are not equal.
    #[must_use]
    pub fn deep_equals(&self, a: NodeId, b: NodeId) -> bool {
        nodes_equal(self, a, self, b)
    }

    /// Like [`Tree::deep_equals`] for a node of another tree.
    #[must_use]
    pub fn deep_equals_in(&self, a: NodeId, other: &Tree, b: NodeId) -> bool {
        nodes_equal(self, a, other, b)
    }

    /// A hash consistent with [`Tree::deep_equals`].
    #[must_use]
    pub fn deep_hash(&self, id: NodeId) -> u64 {
        node_hash(self, id)
    }

    /// Wraps a node for use as a key in hashed collections under
    /// structural equality.
    #[must_use]
    pub fn deep_key(&self, id: NodeId) -> DeepKey<'_> {
        DeepKey { tree: self, node: id }
    }

    /// Orders two nodes of the same tree in document order (a node precedes
    /// its descendants).
    ///
    /// # Errors
    ///
    /// [`TreeError::Disconnected`] if the nodes have different roots.
    pub fn compare_document_order(&self, a: NodeId, b: NodeId) -> Result<Ordering> {
        if a == b {
            return Ok(Ordering::Equal);
        }
        let mut path_a: Vec<NodeId> = self.ancestors_and_self_raw(a).collect();
        let mut path_b: Vec<NodeId> = self.ancestors_and_self_raw(b).collect();
        path_a.reverse();
        path_b.reverse();
        if path_a.first() != path_b.first() {
            return Err(TreeError::Disconnected);
        }
        let shared = path_a
            .iter()
            .zip(&path_b)
            .take_while(|(x, y)| x == y)
            .count();
        match (path_a.get(shared), path_b.get(shared)) {
            (None, _) => Ok(Ordering::Less),
            (_, None) => Ok(Ordering::Greater),
            (Some(&x), Some(&y)) => {
                let parent = path_a[shared - 1];
                for n in self.nodes(parent) {
                    if n == x {
                        return Ok(Ordering::Less);
                    }
                    if n == y {
                        return Ok(Ordering::Greater);
                    }
                }
                Err(TreeError::Disconnected)
            }
        }
    }
}

/// A node compared and hashed by structure.
///
/// ```
/// use std::collections::HashSet;
/// use xmlgrove::Tree;
///
/// let mut tree = Tree::new();
/// let a = tree.new_element_with("item", ["x"]).unwrap();
/// let b = tree.new_element_with("item", ["x"]).unwrap();
/// let set: HashSet<_> = [tree.deep_key(a), tree.deep_key(b)].into_iter().collect();
/// assert_eq!(set.len(), 1);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DeepKey<'a> {
    tree: &'a Tree,
    node: NodeId,
}

impl DeepKey<'_> {
    /// The wrapped node.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl PartialEq for DeepKey<'_> {
    fn eq(&self, other: &Self) -> bool {
        nodes_equal(self.tree, self.node, other.tree, other.node)
    }
}

impl Eq for DeepKey<'_> {}

impl Hash for DeepKey<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(node_hash(self.tree, self.node));
    }
}
