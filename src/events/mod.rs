//! The bridge between trees and streams of XML events.
//!
//! A tree is loaded from anything that implements [`EventSource`] and saved
//! to anything that implements [`EventSink`]. Parsing and encoding live
//! outside this crate: a parser adapts itself as an `EventSource`, and the
//! [`TextWriter`](crate::serial::TextWriter) in this crate is one `EventSink`.
//!
//! [`EventBuffer`] and [`EventRecorder`] are in-memory ends of the bridge,
//! useful for tests and for moving a subtree between trees as events.
//!
//! ```
//! use xmlgrove::events::{EventBuffer, XmlEvent};
//! use xmlgrove::{LoadOptions, Tree};
//!
//! let mut source = EventBuffer::new(vec![
//!     XmlEvent::start("greeting"),
//!     XmlEvent::Text("hello".to_string()),
//!     XmlEvent::EndElement,
//! ]);
//! let mut tree = Tree::new();
//! let root = tree.load_element(&mut source, &LoadOptions::default()).unwrap();
//! assert_eq!(tree.value(root), "hello");
//! ```

mod load;
mod save;

pub use load::LoadOptions;
pub use save::SaveOptions;

use std::collections::VecDeque;

use crate::error::{Result, SourceLocation};
use crate::util::is_xml_whitespace;
use crate::util::qname::QName;

/// One step of a document read or written in order.
///
/// Attribute values and text are already unescaped. Namespace declarations
/// travel as ordinary attributes named `{http://www.w3.org/2000/xmlns/}p`
/// (or `xmlns` with no namespace for the default declaration).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    /// The XML declaration (`<?xml version="1.0"?>`).
    Declaration {
        /// The `version` pseudo-attribute.
        version: Option<String>,
        /// The `encoding` pseudo-attribute.
        encoding: Option<String>,
        /// The `standalone` pseudo-attribute.
        standalone: Option<bool>,
    },
    /// A document type declaration (`<!DOCTYPE ...>`).
    DocumentType {
        /// The declared root element name.
        name: String,
        /// The public identifier.
        public_id: Option<String>,
        /// The system identifier.
        system_id: Option<String>,
        /// The raw internal subset.
        internal_subset: Option<String>,
    },
    /// An element start tag together with its attributes.
    StartElement {
        /// The expanded element name.
        name: QName,
        /// Attributes in document order.
        attributes: Vec<(QName, String)>,
        /// Where the start tag was read, if the source tracks positions.
        location: Option<SourceLocation>,
    },
    /// The end of the most recently started element.
    EndElement,
    /// Character data. Whitespace-only text is reported like any other.
    Text(String),
    /// A comment (`<!-- ... -->`).
    Comment(String),
    /// A processing instruction (`<?target data?>`).
    ProcessingInstruction {
        /// The target name.
        target: String,
        /// Everything after the target, possibly empty.
        data: String,
    },
}

impl XmlEvent {
    /// A start tag without attributes or location.
    pub fn start(name: impl Into<QName>) -> Self {
        Self::StartElement {
            name: name.into(),
            attributes: Vec::new(),
            location: None,
        }
    }

    /// A start tag with attributes.
    pub fn start_with<N, V>(name: impl Into<QName>, attributes: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<QName>,
        V: Into<String>,
    {
        Self::StartElement {
            name: name.into(),
            attributes: attributes
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
            location: None,
        }
    }

    /// Returns `true` for text made only of XML whitespace, including empty
    /// text.
    #[must_use]
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Self::Text(t) if is_xml_whitespace(t))
    }

    /// A short description used in error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Declaration { .. } => "XML declaration".to_string(),
            Self::DocumentType { name, .. } => format!("document type `{name}`"),
            Self::StartElement { name, .. } => format!("start of element `{name}`"),
            Self::EndElement => "end of element".to_string(),
            Self::Text(text) => format!("text {text:?}"),
            Self::Comment(_) => "comment".to_string(),
            Self::ProcessingInstruction { target, .. } => format!("processing instruction `{target}`"),
        }
    }
}

/// A pull-based producer of events, read one at a time.
pub trait EventSource {
    /// Returns the next event, or `None` at the end of input.
    ///
    /// # Errors
    ///
    /// Whatever the underlying reader reports; loading stops at the first
    /// error.
    fn next_event(&mut self) -> Result<Option<XmlEvent>>;

    /// The base URI of the input, if known.
    fn base_uri(&self) -> Option<&str> {
        None
    }
}

/// A consumer of events, fed one at a time in document order.
pub trait EventSink {
    /// Accepts the next event.
    ///
    /// # Errors
    ///
    /// Whatever the sink reports; saving stops at the first error.
    fn write_event(&mut self, event: XmlEvent) -> Result<()>;
}

impl EventSink for Vec<XmlEvent> {
    fn write_event(&mut self, event: XmlEvent) -> Result<()> {
        self.push(event);
        Ok(())
    }
}

/// An [`EventSource`] over events held in memory.
#[derive(Debug, Clone, Default)]
pub struct EventBuffer {
    events: VecDeque<XmlEvent>,
    base_uri: Option<String>,
}

impl EventBuffer {
    /// Creates a source that yields `events` in order.
    #[must_use]
    pub fn new(events: Vec<XmlEvent>) -> Self {
        Self {
            events: events.into(),
            base_uri: None,
        }
    }

    /// Reports `uri` as the base URI of the input.
    #[must_use]
    pub fn with_base_uri(mut self, uri: &str) -> Self {
        self.base_uri = Some(uri.to_string());
        self
    }

    /// Number of events not yet read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl EventSource for EventBuffer {
    fn next_event(&mut self) -> Result<Option<XmlEvent>> {
        Ok(self.events.pop_front())
    }

    fn base_uri(&self) -> Option<&str> {
        self.base_uri.as_deref()
    }
}

impl FromIterator<XmlEvent> for EventBuffer {
    fn from_iter<I: IntoIterator<Item = XmlEvent>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// An [`EventSink`] that keeps every event it receives.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Vec<XmlEvent>,
}

impl EventRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The events recorded so far.
    #[must_use]
    pub fn events(&self) -> &[XmlEvent] {
        &self.events
    }

    /// Consumes the recorder, returning its events.
    #[must_use]
    pub fn into_events(self) -> Vec<XmlEvent> {
        self.events
    }

    /// Consumes the recorder, returning a source that replays its events.
    #[must_use]
    pub fn into_buffer(self) -> EventBuffer {
        EventBuffer::new(self.events)
    }
}

impl EventSink for EventRecorder {
    fn write_event(&mut self, event: XmlEvent) -> Result<()> {
        self.events.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_yields_in_order() {
        let mut buffer: EventBuffer = [XmlEvent::start("a"), XmlEvent::EndElement].into_iter().collect();
        assert_eq!(buffer.remaining(), 2);
        assert_eq!(buffer.next_event(), Ok(Some(XmlEvent::start("a"))));
        assert_eq!(buffer.next_event(), Ok(Some(XmlEvent::EndElement)));
        assert_eq!(buffer.next_event(), Ok(None));
        assert_eq!(buffer.base_uri(), None);
    }

    #[test]
    fn test_base_uri_option() {
        let buffer = EventBuffer::new(Vec::new()).with_base_uri("file:///a.xml");
        assert_eq!(buffer.base_uri(), Some("file:///a.xml"));
    }

    #[test]
    fn test_recorder_replays() {
        let mut recorder = EventRecorder::new();
        let Ok(()) = recorder.write_event(XmlEvent::Comment("c".to_string())) else {
            panic!("record");
        };
        assert_eq!(recorder.events().len(), 1);
        let mut buffer = recorder.into_buffer();
        assert_eq!(buffer.next_event(), Ok(Some(XmlEvent::Comment("c".to_string()))));
    }

    #[test]
    fn test_whitespace_classification() {
        assert!(XmlEvent::Text(" \n\t".to_string()).is_whitespace());
        assert!(XmlEvent::Text(String::new()).is_whitespace());
        assert!(!XmlEvent::Text(" x ".to_string()).is_whitespace());
        assert!(!XmlEvent::EndElement.is_whitespace());
    }

    #[test]
    fn test_start_with_attributes() {
        let XmlEvent::StartElement { name, attributes, .. } =
            XmlEvent::start_with("a", [("id", "1"), ("class", "x")])
        else {
            panic!("expected a start tag");
        };
        assert_eq!(name, QName::new("a"));
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[1], (QName::new("class"), "x".to_string()));
    }
}
