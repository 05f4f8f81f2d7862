//! # xmlgrove
//!
//! A mutable, in-memory XML tree with namespace-aware names, structural
//! equality, change notification and a bridge to event streams for loading
//! and saving.
//!
//! All nodes live in a [`Tree`] arena and are addressed by [`NodeId`];
//! attributes are addressed by [`AttrId`]. Children and attributes are
//! kept in circular singly-linked lists threaded through the arena, so
//! appending and finding the first or last item are constant time.
//!
//! ## Quick Start
//!
//! ```
//! use xmlgrove::{QName, SaveOptions, Tree};
//!
//! let mut tree = Tree::new();
//! let book = tree.new_element(("urn:books", "book")).unwrap();
//! tree.set_attribute_value(book, QName::xmlns("b"), Some("urn:books")).unwrap();
//! tree.set_element_value(book, ("urn:books", "title"), Some("Dune")).unwrap();
//!
//! let title = QName::with_namespace("urn:books", "title");
//! assert_eq!(tree.element(book, &title).map(|t| tree.value(t)), Some("Dune".to_string()));
//! assert_eq!(tree.prefix_of_namespace(book, "urn:books"), Some("b"));
//!
//! let xml = tree.to_xml_string(book, &SaveOptions::default().disable_formatting(true)).unwrap();
//! assert_eq!(xml, r#"<b:book xmlns:b="urn:books"><b:title>Dune</b:title></b:book>"#);
//! ```
//!
//! ## Modules
//!
//! - [`tree`]: the arena, navigation, mutation, namespaces and comparison
//! - [`notify`]: `Changing`/`Changed` observers with veto
//! - [`events`]: loading from an [`EventSource`](events::EventSource) and
//!   saving to an [`EventSink`](events::EventSink)
//! - [`serial`]: an event sink that writes XML text
//! - [`convert`]: typed values read from and written to text

pub mod convert;
pub mod error;
pub mod events;
pub mod notify;
pub mod serial;
pub mod tree;
pub mod util;

// Re-export primary types at the crate root for convenience.
pub use convert::XmlValue;
pub use error::{Result, SourceLocation, TreeError};
pub use events::{LoadOptions, SaveOptions};
pub use tree::{AttrId, Content, Declaration, DeepKey, Item, NodeId, NodeKind, Tree};
pub use util::qname::QName;
