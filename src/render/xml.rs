//! XML text escaping.

use std::borrow::Cow;

/// Stand-in for characters XML 1.0 does not allow.
pub const REPLACEMENT_CHAR: char = '\u{FFFD}';

/// Whether `c` may appear in an XML 1.0 document.
pub fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Escape text for element content or attribute values.
///
/// Markup characters become entities; characters outside the XML 1.0
/// character range become [`REPLACEMENT_CHAR`].
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.chars().any(|c| matches!(c, '&' | '<' | '>' | '"' | '\'') || !is_xml_char(c)) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if is_xml_char(c) => out.push(c),
            _ => out.push(REPLACEMENT_CHAR),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_markup() {
        assert_eq!(escape("a & b < c > d"), "a &amp; b &lt; c &gt; d");
        assert_eq!(escape(r#"say "hi" it's"#), "say &quot;hi&quot; it&apos;s");
    }

    #[test]
    fn test_escape_control_characters() {
        assert_eq!(escape("bad\u{2}char"), "bad\u{FFFD}char");
        assert_eq!(escape("\u{0}\u{1F}\u{FFFE}"), "\u{FFFD}\u{FFFD}\u{FFFD}");
        assert_eq!(escape("tab\there\nnew"), "tab\there\nnew");
    }

    #[test]
    fn test_plain_text_borrowed() {
        assert!(matches!(escape("plain text 日本"), Cow::Borrowed(_)));
    }
}
