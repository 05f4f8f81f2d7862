//! XML text serialization.
//!
//! [`TextWriter`] is an [`EventSink`](crate::events::EventSink) that turns
//! events into well-formed XML text. It handles escaping, optional
//! indentation and the choice of namespace prefixes, declaring a prefix
//! itself when a name uses a namespace nothing in scope binds.

pub mod xml;

pub use xml::{SerializeOptions, TextWriter};
