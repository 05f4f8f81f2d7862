//! Utility modules for xmlgrove.
//!
//! Contains qualified-name handling, the reserved namespace constants and
//! the whitespace test shared by tree rules and event loading.

pub mod qname;

/// Returns `true` if `text` holds only XML whitespace (space, tab, CR, LF).
/// The empty string counts as whitespace.
pub(crate) fn is_xml_whitespace(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_xml_whitespace() {
        assert!(is_xml_whitespace(""));
        assert!(is_xml_whitespace(" \r\n\t"));
        assert!(!is_xml_whitespace(" x "));
        assert!(!is_xml_whitespace("\u{a0}"));
    }
}
