//! XML text writer.
//!
//! Consumes events in document order and produces a well-formed XML string.

use crate::error::{Result, TreeError};
use crate::events::{EventSink, XmlEvent};
use crate::util::qname::{QName, XML_NAMESPACE, XMLNS_NAMESPACE};

/// Options controlling XML text output.
///
/// # Examples
///
/// ```
/// use xmlgrove::events::{EventSink, XmlEvent};
/// use xmlgrove::serial::{SerializeOptions, TextWriter};
///
/// let mut writer = TextWriter::new(SerializeOptions::default().indent(true));
/// writer.write_event(XmlEvent::start("root")).unwrap();
/// writer.write_event(XmlEvent::start("child")).unwrap();
/// writer.write_event(XmlEvent::EndElement).unwrap();
/// writer.write_event(XmlEvent::EndElement).unwrap();
/// assert_eq!(writer.finish().unwrap(), "<root>\n  <child />\n</root>");
/// ```
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Whether to produce indented (pretty-printed) output.
    /// Defaults to `false`.
    pub indent: bool,
    /// The indentation string used for each level when `indent` is `true`.
    /// Defaults to two spaces.
    pub indent_str: String,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            indent: false,
            indent_str: "  ".to_string(),
        }
    }
}

impl SerializeOptions {
    /// Enables or disables indented (pretty-printed) output.
    ///
    /// When enabled, child nodes are placed on their own lines. Once an
    /// element receives text, nothing more inside it is indented, so mixed
    /// content is written exactly as stored.
    #[must_use]
    pub fn indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the indentation string used for each nesting level.
    #[must_use]
    pub fn indent_str(mut self, s: &str) -> Self {
        self.indent_str = s.to_string();
        self
    }
}

/// An element whose end tag has not been written yet.
struct Frame {
    /// The qualified name as written in the start tag.
    tag: String,
    /// Prefix bindings declared on this element.
    bindings: Vec<(String, String)>,
    /// Text was written directly inside the element.
    mixed: bool,
    /// Some node was written inside the element.
    has_children: bool,
}

/// An [`EventSink`] producing XML text.
pub struct TextWriter {
    options: SerializeOptions,
    out: String,
    stack: Vec<Frame>,
    /// The last start tag is still missing its closing `>`.
    start_open: bool,
    generated_prefixes: usize,
}

impl TextWriter {
    /// Creates a writer with the given options.
    #[must_use]
    pub fn new(options: SerializeOptions) -> Self {
        Self {
            options,
            out: String::new(),
            stack: Vec::new(),
            start_open: false,
            generated_prefixes: 0,
        }
    }

    /// Returns the text written so far.
    ///
    /// # Errors
    ///
    /// [`TreeError::UnexpectedEndOfEvents`] if an element is still open.
    pub fn finish(self) -> Result<String> {
        if !self.stack.is_empty() {
            return Err(TreeError::UnexpectedEndOfEvents);
        }
        Ok(self.out)
    }

    /// The namespace `prefix` is bound to at the current position.
    fn lookup(&self, prefix: &str) -> Option<&str> {
        match prefix {
            "xml" => return Some(XML_NAMESPACE),
            "xmlns" => return Some(XMLNS_NAMESPACE),
            _ => {}
        }
        self.stack
            .iter()
            .rev()
            .flat_map(|f| f.bindings.iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    /// The nearest prefix bound to `uri` that is not shadowed.
    fn find_prefix(&self, uri: &str, allow_default: bool) -> Option<String> {
        self.stack
            .iter()
            .rev()
            .flat_map(|f| f.bindings.iter().rev())
            .find(|(p, u)| u == uri && (allow_default || !p.is_empty()) && self.lookup(p) == Some(uri))
            .map(|(p, _)| p.clone())
    }

    fn generate_prefix(&mut self) -> String {
        loop {
            self.generated_prefixes += 1;
            let candidate = format!("p{}", self.generated_prefixes);
            if self.lookup(&candidate).is_none() {
                return candidate;
            }
        }
    }

    /// Closes a pending start tag and writes indentation for a new child.
    fn begin_child(&mut self, is_text: bool) {
        if self.start_open {
            self.out.push('>');
            self.start_open = false;
        }
        let depth = self.stack.len();
        let indent = self.options.indent;
        let mixed = match self.stack.last_mut() {
            Some(frame) => {
                frame.has_children = true;
                if is_text {
                    frame.mixed = true;
                }
                frame.mixed
            }
            None => is_text,
        };
        if indent && !mixed && !self.out.is_empty() {
            self.out.push('\n');
            for _ in 0..depth {
                self.out.push_str(&self.options.indent_str);
            }
        }
    }

    fn qualify(prefix: &str, local: &str) -> String {
        if prefix.is_empty() {
            local.to_string()
        } else {
            format!("{prefix}:{local}")
        }
    }

    fn start_element(&mut self, name: &QName, attributes: &[(QName, String)]) -> Result<()> {
        let own_default = attributes
            .iter()
            .find(|(n, _)| n.declared_prefix() == Some(""))
            .map(|(_, uri)| uri.as_str());
        // an unqualified name needs the default namespace undeclared
        if let Some(uri) = own_default.filter(|uri| !uri.is_empty() && !name.has_namespace()) {
            return Err(TreeError::ConflictingNamespace {
                prefix: String::new(),
                declared: uri.to_string(),
                required: String::new(),
            });
        }
        self.begin_child(false);
        self.stack.push(Frame {
            tag: String::new(),
            bindings: attributes
                .iter()
                .filter_map(|(n, v)| n.declared_prefix().map(|p| (p.to_string(), v.clone())))
                .collect(),
            mixed: false,
            has_children: false,
        });

        let mut extra = Vec::new();
        let element_prefix = if name.has_namespace() {
            match self.find_prefix(name.namespace(), true) {
                Some(prefix) => prefix,
                None => {
                    let prefix = if own_default.is_some() {
                        self.generate_prefix()
                    } else {
                        String::new()
                    };
                    extra.push((prefix.clone(), name.namespace().to_string()));
                    prefix
                }
            }
        } else {
            if self.lookup("").is_some_and(|uri| !uri.is_empty()) {
                extra.push((String::new(), String::new()));
            }
            String::new()
        };
        self.push_bindings(&extra);

        let mut written = Vec::with_capacity(attributes.len());
        for (attr_name, value) in attributes {
            let qualified = match attr_name.declared_prefix() {
                Some("") => "xmlns".to_string(),
                Some(prefix) => format!("xmlns:{prefix}"),
                None if !attr_name.has_namespace() => attr_name.local_name().to_string(),
                None => {
                    let prefix = match self.find_prefix(attr_name.namespace(), false) {
                        Some(prefix) => prefix,
                        None if attr_name.namespace() == XML_NAMESPACE => "xml".to_string(),
                        None => {
                            let prefix = self.generate_prefix();
                            let binding = (prefix.clone(), attr_name.namespace().to_string());
                            self.push_bindings(std::slice::from_ref(&binding));
                            extra.push(binding);
                            prefix
                        }
                    };
                    Self::qualify(&prefix, attr_name.local_name())
                }
            };
            written.push((qualified, value.as_str()));
        }

        let tag = Self::qualify(&element_prefix, name.local_name());
        self.out.push('<');
        self.out.push_str(&tag);
        for (qualified, value) in written {
            write_attribute(&mut self.out, &qualified, value);
        }
        for (prefix, uri) in &extra {
            let qualified = if prefix.is_empty() {
                "xmlns".to_string()
            } else {
                format!("xmlns:{prefix}")
            };
            write_attribute(&mut self.out, &qualified, uri);
        }
        if let Some(top) = self.stack.last_mut() {
            top.tag = tag;
        }
        self.start_open = true;
        Ok(())
    }

    fn push_bindings(&mut self, bindings: &[(String, String)]) {
        if let Some(top) = self.stack.last_mut() {
            top.bindings.extend_from_slice(bindings);
        }
    }

    fn end_element(&mut self) -> Result<()> {
        let Some(frame) = self.stack.pop() else {
            return Err(TreeError::UnexpectedNodeKind {
                found: XmlEvent::EndElement.describe(),
            });
        };
        if self.start_open {
            self.out.push_str(" />");
            self.start_open = false;
            return Ok(());
        }
        if self.options.indent && frame.has_children && !frame.mixed {
            self.out.push('\n');
            for _ in 0..self.stack.len() {
                self.out.push_str(&self.options.indent_str);
            }
        }
        self.out.push_str("</");
        self.out.push_str(&frame.tag);
        self.out.push('>');
        Ok(())
    }
}

impl EventSink for TextWriter {
    fn write_event(&mut self, event: XmlEvent) -> Result<()> {
        match event {
            XmlEvent::Declaration {
                version,
                encoding,
                standalone,
            } => {
                self.out.push_str("<?xml version=\"");
                self.out.push_str(version.as_deref().unwrap_or("1.0"));
                self.out.push('"');
                if let Some(encoding) = encoding {
                    self.out.push_str(" encoding=\"");
                    self.out.push_str(&encoding);
                    self.out.push('"');
                }
                if let Some(standalone) = standalone {
                    self.out.push_str(" standalone=\"");
                    self.out.push_str(if standalone { "yes" } else { "no" });
                    self.out.push('"');
                }
                self.out.push_str("?>");
            }
            XmlEvent::DocumentType {
                name,
                public_id,
                system_id,
                internal_subset,
            } => {
                self.begin_child(false);
                self.out.push_str("<!DOCTYPE ");
                self.out.push_str(&name);
                match (public_id, system_id) {
                    (Some(public_id), system_id) => {
                        self.out.push_str(" PUBLIC \"");
                        self.out.push_str(&public_id);
                        self.out.push_str("\" \"");
                        self.out.push_str(system_id.as_deref().unwrap_or(""));
                        self.out.push('"');
                    }
                    (None, Some(system_id)) => {
                        self.out.push_str(" SYSTEM \"");
                        self.out.push_str(&system_id);
                        self.out.push('"');
                    }
                    (None, None) => {}
                }
                if let Some(subset) = internal_subset {
                    self.out.push_str(" [");
                    self.out.push_str(&subset);
                    self.out.push(']');
                }
                self.out.push('>');
            }
            XmlEvent::StartElement { name, attributes, .. } => self.start_element(&name, &attributes)?,
            XmlEvent::EndElement => self.end_element()?,
            XmlEvent::Text(text) => {
                self.begin_child(true);
                write_escaped_text(&mut self.out, &text);
            }
            XmlEvent::Comment(text) => {
                self.begin_child(false);
                self.out.push_str("<!--");
                self.out.push_str(&text);
                self.out.push_str("-->");
            }
            XmlEvent::ProcessingInstruction { target, data } => {
                self.begin_child(false);
                self.out.push_str("<?");
                self.out.push_str(&target);
                if !data.is_empty() {
                    self.out.push(' ');
                    self.out.push_str(&data);
                }
                self.out.push_str("?>");
            }
        }
        Ok(())
    }
}

/// Writes a hexadecimal character reference (`&#xHH;`) for a code point.
fn write_hex_char_ref(out: &mut String, ch: char) {
    use std::fmt::Write;
    let _ = write!(out, "&#x{:X};", ch as u32);
}

fn write_attribute(out: &mut String, qualified: &str, value: &str) {
    out.push(' ');
    out.push_str(qualified);
    out.push_str("=\"");
    write_escaped_attr(out, value);
    out.push('"');
}

/// Escapes text content.
///
/// - `<`, `>`, `&` are escaped with named entity references
/// - `\r` is encoded as `&#xD;` so that it survives end-of-line handling
/// - other control characters are hex-encoded
fn write_escaped_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\t' | '\n' => out.push(ch),
            c if (c as u32) < 0x20 => write_hex_char_ref(out, c),
            _ => out.push(ch),
        }
    }
}

/// Escapes attribute values.
///
/// Whitespace other than the space character is written as a character
/// reference so that attribute-value normalization leaves it intact.
fn write_escaped_attr(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c if (c as u32) < 0x20 => write_hex_char_ref(out, c),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(events: Vec<XmlEvent>, indent: bool) -> String {
        let mut writer = TextWriter::new(SerializeOptions::default().indent(indent));
        for event in events {
            let Ok(()) = writer.write_event(event) else {
                panic!("write failed");
            };
        }
        let Ok(text) = writer.finish() else {
            panic!("unbalanced events");
        };
        text
    }

    fn text(s: &str) -> XmlEvent {
        XmlEvent::Text(s.to_string())
    }

    #[test]
    fn test_empty_element_forms() {
        assert_eq!(write(vec![XmlEvent::start("a"), XmlEvent::EndElement], false), "<a />");
        assert_eq!(
            write(vec![XmlEvent::start("a"), text(""), XmlEvent::EndElement], false),
            "<a></a>"
        );
    }

    #[test]
    fn test_escaping() {
        let events = vec![
            XmlEvent::start_with("a", [("q", "x\"<&>\n\t")]),
            text("1 < 2 & 3 > 2\r"),
            XmlEvent::EndElement,
        ];
        assert_eq!(
            write(events, false),
            "<a q=\"x&quot;&lt;&amp;&gt;&#xA;&#x9;\">1 &lt; 2 &amp; 3 &gt; 2&#xD;</a>"
        );
    }

    #[test]
    fn test_pretty_print() {
        let events = vec![
            XmlEvent::start("root"),
            XmlEvent::start("a"),
            text("x"),
            XmlEvent::EndElement,
            XmlEvent::Comment(" c ".to_string()),
            XmlEvent::start("b"),
            XmlEvent::EndElement,
            XmlEvent::EndElement,
        ];
        assert_eq!(
            write(events, true),
            "<root>\n  <a>x</a>\n  <!-- c -->\n  <b />\n</root>"
        );
    }

    #[test]
    fn test_pretty_print_mixed_content() {
        let events = vec![
            XmlEvent::start("p"),
            text("Hello "),
            XmlEvent::start("b"),
            text("world"),
            XmlEvent::EndElement,
            XmlEvent::EndElement,
        ];
        assert_eq!(write(events, true), "<p>Hello <b>world</b></p>");
    }

    #[test]
    fn test_custom_indent() {
        let mut writer = TextWriter::new(SerializeOptions::default().indent(true).indent_str("\t"));
        for event in [
            XmlEvent::start("r"),
            XmlEvent::start("c"),
            XmlEvent::EndElement,
            XmlEvent::EndElement,
        ] {
            let Ok(()) = writer.write_event(event) else {
                panic!("write failed");
            };
        }
        assert_eq!(writer.finish(), Ok("<r>\n\t<c />\n</r>".to_string()));
    }

    #[test]
    fn test_uses_declared_prefixes() {
        let events = vec![
            XmlEvent::start_with(("urn:x", "root"), [(QName::xmlns("x"), "urn:x")]),
            XmlEvent::start_with(("urn:x", "child"), [(QName::with_namespace("urn:x", "id"), "1")]),
            XmlEvent::EndElement,
            XmlEvent::EndElement,
        ];
        assert_eq!(
            write(events, false),
            "<x:root xmlns:x=\"urn:x\"><x:child x:id=\"1\" /></x:root>"
        );
    }

    #[test]
    fn test_declares_unbound_namespaces() {
        let events = vec![
            XmlEvent::start_with(("urn:e", "root"), [(QName::with_namespace("urn:a", "id"), "1")]),
            XmlEvent::start("plain"),
            XmlEvent::EndElement,
            XmlEvent::EndElement,
        ];
        assert_eq!(
            write(events, false),
            "<root p1:id=\"1\" xmlns=\"urn:e\" xmlns:p1=\"urn:a\"><plain xmlns=\"\" /></root>"
        );
    }

    #[test]
    fn test_unqualified_element_with_own_default_declaration() {
        let mut writer = TextWriter::new(SerializeOptions::default());
        let result = writer.write_event(XmlEvent::start_with("a", [(QName::xmlns(""), "urn:x")]));
        assert_eq!(
            result,
            Err(TreeError::ConflictingNamespace {
                prefix: String::new(),
                declared: "urn:x".to_string(),
                required: String::new(),
            })
        );

        // an explicit undeclaration is written once
        let events = vec![
            XmlEvent::start_with(("urn:x", "root"), [(QName::xmlns(""), "urn:x")]),
            XmlEvent::start_with("a", [(QName::xmlns(""), "")]),
            XmlEvent::EndElement,
            XmlEvent::EndElement,
        ];
        assert_eq!(
            write(events, false),
            "<root xmlns=\"urn:x\"><a xmlns=\"\" /></root>"
        );
    }

    #[test]
    fn test_xml_prefix_is_implicit() {
        let events = vec![
            XmlEvent::start_with("a", [(QName::xml("lang"), "en")]),
            XmlEvent::EndElement,
        ];
        assert_eq!(write(events, false), "<a xml:lang=\"en\" />");
    }

    #[test]
    fn test_document_prolog() {
        let events = vec![
            XmlEvent::Declaration {
                version: Some("1.0".to_string()),
                encoding: Some("UTF-8".to_string()),
                standalone: Some(true),
            },
            XmlEvent::DocumentType {
                name: "html".to_string(),
                public_id: None,
                system_id: Some("about:legacy-compat".to_string()),
                internal_subset: None,
            },
            XmlEvent::ProcessingInstruction {
                target: "pi".to_string(),
                data: "d".to_string(),
            },
            XmlEvent::start("html"),
            XmlEvent::EndElement,
        ];
        assert_eq!(
            write(events, true),
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<!DOCTYPE html SYSTEM \"about:legacy-compat\">\n<?pi d?>\n<html />"
        );
    }

    #[test]
    fn test_unbalanced_events() {
        let mut writer = TextWriter::new(SerializeOptions::default());
        assert!(writer.write_event(XmlEvent::EndElement).is_err());
        let Ok(()) = writer.write_event(XmlEvent::start("open")) else {
            panic!("write failed");
        };
        assert_eq!(writer.finish(), Err(TreeError::UnexpectedEndOfEvents));
    }
}
