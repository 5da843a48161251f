use std::borrow::Cow;

use scraper::Html;
use thiserror::Error;

/// Markup larger than this is refused rather than parsed (1 MB).
const MAX_MARKUP_LEN: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("markup too large ({0} bytes, max {MAX_MARKUP_LEN})")]
    TooLarge(usize),
}

/// Converts an HTML fragment (feed title or summary) into plain text.
///
/// Tags are dropped, entities are decoded and the text nodes are concatenated
/// in document order. Control characters other than tab, newline and carriage
/// return are removed from the result. Leading and trailing whitespace is kept
/// as-is apart from that.
///
/// # Errors
///
/// Returns [`SanitizeError::TooLarge`] when the input exceeds 1 MB.
///
/// # Examples
///
/// ```
/// use feedlens::util::to_plain_text;
///
/// assert_eq!(to_plain_text("<b>Hi</b>").unwrap(), "Hi");
/// assert_eq!(to_plain_text("Fish &amp; Chips").unwrap(), "Fish & Chips");
/// ```
pub fn to_plain_text(html: &str) -> Result<String, SanitizeError> {
    if html.len() > MAX_MARKUP_LEN {
        return Err(SanitizeError::TooLarge(html.len()));
    }

    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();

    Ok(strip_control_chars(&text).into_owned())
}

/// Returns the longest prefix of `s` holding at most `max_chars` characters.
///
/// Cuts on character boundaries, never inside a multi-byte code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn is_stripped(c: char) -> bool {
    c.is_control() && !matches!(c, '\t' | '\n' | '\r')
}

fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_stripped) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|c| !is_stripped(*c)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_tags() {
        assert_eq!(to_plain_text("<b>Hi</b>").unwrap(), "Hi");
        assert_eq!(
            to_plain_text("<p>One <a href=\"x\">two</a></p><p>three</p>").unwrap(),
            "One twothree"
        );
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(to_plain_text("World").unwrap(), "World");
    }

    #[test]
    fn test_decodes_entities() {
        assert_eq!(to_plain_text("a &lt; b &amp;&amp; c").unwrap(), "a < b && c");
    }

    #[test]
    fn test_removes_control_chars() {
        assert_eq!(to_plain_text("bell\u{7} ring\ttab").unwrap(), "bell ring\ttab");
    }

    #[test]
    fn test_oversized_markup_rejected() {
        let huge = "x".repeat(MAX_MARKUP_LEN + 1);
        assert!(matches!(
            to_plain_text(&huge),
            Err(SanitizeError::TooLarge(n)) if n == MAX_MARKUP_LEN + 1
        ));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("Hello World", 5), "Hello");
        assert_eq!(truncate_chars("short", 50), "short");
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
        assert_eq!(truncate_chars("", 3), "");
    }
}
