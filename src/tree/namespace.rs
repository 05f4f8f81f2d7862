//! Lexical namespace resolution.
//!
//! Nothing is cached: both directions walk the live attribute lists of the
//! element and its ancestors, so a declaration added or removed anywhere
//! is visible to the next query. Inner declarations shadow outer ones.

use super::{AttrId, NodeId, Tree};
use crate::util::qname::{XMLNS_NAMESPACE, XML_NAMESPACE};

impl Tree {
    /// Iterates the namespace-declaration attributes of an element.
    pub fn namespace_declarations(&self, element: NodeId) -> impl Iterator<Item = AttrId> + '_ {
        self.attributes(element)
            .filter(move |&a| self.attr(a).is_namespace_declaration())
    }

    /// Resolves a prefix to its namespace URI as seen from `element`.
    ///
    /// The empty prefix asks for the default namespace. `"xmlns"` always
    /// resolves to [`XMLNS_NAMESPACE`]; `"xml"` resolves to
    /// [`XML_NAMESPACE`] unless explicitly declared.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlgrove::{QName, Tree};
    ///
    /// let mut tree = Tree::new();
    /// let outer = tree.new_element("a").unwrap();
    /// tree.set_attribute_value(outer, QName::xmlns("p"), Some("urn:outer")).unwrap();
    /// let inner = tree.new_element("b").unwrap();
    /// tree.add(outer, inner).unwrap();
    ///
    /// assert_eq!(tree.resolve_prefix(inner, "p"), Some("urn:outer"));
    /// assert_eq!(tree.resolve_prefix(inner, "q"), None);
    /// ```
    #[must_use]
    pub fn resolve_prefix(&self, element: NodeId, prefix: &str) -> Option<&str> {
        if prefix == "xmlns" {
            return Some(XMLNS_NAMESPACE);
        }
        self.resolve_prefix_within(element, prefix, None)
            .or_else(|| (prefix == "xml").then_some(XML_NAMESPACE))
    }

    /// Looks for a declaration of `prefix` from `element` upwards, stopping
    /// before `stop_at`.
    fn resolve_prefix_within(
        &self,
        element: NodeId,
        prefix: &str,
        stop_at: Option<NodeId>,
    ) -> Option<&str> {
        for e in self.ancestors_and_self(element) {
            if Some(e) == stop_at {
                return None;
            }
            for a in self.attributes(e) {
                let attr = self.attr(a);
                if attr.name().declared_prefix() == Some(prefix) {
                    return Some(attr.value());
                }
            }
        }
        None
    }

    /// The default namespace in scope at `element`, or `""`.
    #[must_use]
    pub fn default_namespace(&self, element: NodeId) -> &str {
        self.resolve_prefix_within(element, "", None).unwrap_or("")
    }

    /// Finds a prefix bound to `namespace` at `element`.
    ///
    /// Prefixed declarations win: the nearest one whose prefix is not
    /// redeclared closer to `element` is returned. A default declaration
    /// for `namespace` that is not itself shadowed yields `Some("")`, but
    /// only when no usable prefixed declaration exists. The reserved
    /// namespaces fall back to `"xml"` and `"xmlns"`.
    #[must_use]
    pub fn prefix_of_namespace(&self, element: NodeId, namespace: &str) -> Option<&str> {
        if namespace.is_empty() {
            return Some("");
        }
        let mut has_in_scope_namespace = false;
        let mut default_seen = false;
        let mut default_candidate = false;
        for e in self.ancestors_and_self(element) {
            let mut has_local_namespace = false;
            for a in self.namespace_declarations(e) {
                let attr = self.attr(a);
                let Some(prefix) = attr.name().declared_prefix() else {
                    continue;
                };
                has_local_namespace = true;
                if prefix.is_empty() {
                    // only the nearest default declaration is in effect
                    if !default_seen {
                        default_candidate = attr.value() == namespace;
                    }
                    default_seen = true;
                    continue;
                }
                if attr.value() == namespace
                    && (!has_in_scope_namespace
                        || self.resolve_prefix_within(element, prefix, Some(e)).is_none())
                {
                    return Some(attr.name().local_name());
                }
            }
            has_in_scope_namespace |= has_local_namespace;
        }
        if default_candidate {
            return Some("");
        }
        if namespace == XML_NAMESPACE {
            if !has_in_scope_namespace || self.resolve_prefix_within(element, "xml", None).is_none() {
                return Some("xml");
            }
        } else if namespace == XMLNS_NAMESPACE {
            return Some("xmlns");
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::qname::QName;

    fn element(tree: &mut Tree, name: &str) -> NodeId {
        let Ok(id) = tree.new_element(name) else {
            panic!("element");
        };
        id
    }

    fn declare(tree: &mut Tree, el: NodeId, prefix: &str, uri: &str) {
        let Ok(()) = tree.set_attribute_value(el, QName::xmlns(prefix), Some(uri)) else {
            panic!("declaration failed");
        };
    }

    /// `<a xmlns:p="urn:outer"><b xmlns:p="urn:inner"><c/></b></a>`
    fn nested(tree: &mut Tree) -> (NodeId, NodeId, NodeId) {
        let a = element(tree, "a");
        let b = element(tree, "b");
        let c = element(tree, "c");
        declare(tree, a, "p", "urn:outer");
        declare(tree, b, "p", "urn:inner");
        tree.append_link(b, c);
        tree.append_link(a, b);
        (a, b, c)
    }

    #[test]
    fn test_nearest_declaration_wins() {
        let mut tree = Tree::new();
        let (a, _, c) = nested(&mut tree);
        assert_eq!(tree.resolve_prefix(c, "p"), Some("urn:inner"));
        assert_eq!(tree.resolve_prefix(a, "p"), Some("urn:outer"));
    }

    #[test]
    fn test_reserved_prefixes() {
        let mut tree = Tree::new();
        let a = element(&mut tree, "a");
        assert_eq!(tree.resolve_prefix(a, "xml"), Some(XML_NAMESPACE));
        assert_eq!(tree.resolve_prefix(a, "xmlns"), Some(XMLNS_NAMESPACE));
        assert_eq!(tree.prefix_of_namespace(a, XML_NAMESPACE), Some("xml"));
        assert_eq!(tree.prefix_of_namespace(a, XMLNS_NAMESPACE), Some("xmlns"));
    }

    #[test]
    fn test_default_namespace() {
        let mut tree = Tree::new();
        let (a, b, c) = nested(&mut tree);
        assert_eq!(tree.default_namespace(c), "");
        declare(&mut tree, a, "", "urn:default");
        assert_eq!(tree.default_namespace(c), "urn:default");
        declare(&mut tree, b, "", "");
        assert_eq!(tree.default_namespace(c), "");
    }

    #[test]
    fn test_prefix_of_namespace_skips_shadowed_prefix() {
        let mut tree = Tree::new();
        let (_, _, c) = nested(&mut tree);
        assert_eq!(tree.prefix_of_namespace(c, "urn:inner"), Some("p"));
        // `p` is redeclared closer to `c`, so urn:outer has no usable prefix
        assert_eq!(tree.prefix_of_namespace(c, "urn:outer"), None);
    }

    #[test]
    fn test_prefix_of_namespace_prefers_prefixed_over_default() {
        let mut tree = Tree::new();
        let a = element(&mut tree, "a");
        let b = element(&mut tree, "b");
        tree.append_link(a, b);
        declare(&mut tree, b, "", "urn:x");
        assert_eq!(tree.prefix_of_namespace(b, "urn:x"), Some(""));
        declare(&mut tree, a, "q", "urn:x");
        assert_eq!(tree.prefix_of_namespace(b, "urn:x"), Some("q"));
    }

    #[test]
    fn test_shadowed_default_is_not_a_candidate() {
        let mut tree = Tree::new();
        let a = element(&mut tree, "a");
        let b = element(&mut tree, "b");
        tree.append_link(a, b);
        declare(&mut tree, a, "", "urn:x");
        declare(&mut tree, b, "", "urn:y");
        assert_eq!(tree.prefix_of_namespace(b, "urn:x"), None);
        assert_eq!(tree.prefix_of_namespace(b, "urn:y"), Some(""));
    }
}
