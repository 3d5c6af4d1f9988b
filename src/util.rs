//! Small helpers shared across the extraction pipeline.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static PRE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<pre[^>]*>(.*?)</pre>").unwrap());

/// Collapse runs of whitespace (including newlines) into single spaces and
/// trim the ends.
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Recover an XML document that a server wrapped in `<pre>` with escaped
/// entities (a common failure mode when a feed URL is served as HTML).
///
/// Returns `None` when the body does not look wrapped, so callers can use the
/// body as-is.
pub fn unwrap_pre_encoded(body: &str) -> Option<String> {
    if !body.contains("<pre") || !body.contains("&lt;") {
        return None;
    }
    let captures = PRE_BLOCK.captures(body)?;
    let inner = captures.get(1)?.as_str();
    let decoded = html_escape::decode_html_entities(inner).into_owned();
    if decoded.trim_start().starts_with('<') {
        Some(decoded)
    } else {
        None
    }
}

/// Resolve an extracted link against the document it came from.
///
/// Values that already carry an http(s) scheme pass through untouched;
/// anything else is joined against `base`. Unresolvable values yield `None`
/// so the field is dropped rather than emitted relative.
pub fn resolve_link(raw: &str, base: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with("http") {
        return Some(raw.to_string());
    }
    let base = Url::parse(base).ok()?;
    base.join(raw).ok().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b   c "), "a b c");
        assert_eq!(collapse_whitespace(""), "");
        assert_eq!(collapse_whitespace("one"), "one");
    }

    #[test]
    fn test_unwrap_pre_encoded_feed() {
        let body = r#"<html><body><pre style="word-wrap: break-word;">&lt;rss version="2.0"&gt;&lt;channel&gt;&lt;title&gt;T&lt;/title&gt;&lt;/channel&gt;&lt;/rss&gt;</pre></body></html>"#;
        let unwrapped = unwrap_pre_encoded(body).unwrap();
        assert!(unwrapped.starts_with(r#"<rss version="2.0">"#));
        assert!(unwrapped.contains("<title>T</title>"));
    }

    #[test]
    fn test_unwrap_pre_encoded_ignores_plain_html() {
        assert!(unwrap_pre_encoded("<html><body>no feed here</body></html>").is_none());
        // A <pre> without escaped markup is just a code block.
        assert!(unwrap_pre_encoded("<pre>plain text</pre>").is_none());
    }

    #[test]
    fn test_unwrap_pre_encoded_rejects_non_markup() {
        let body = "<pre>2 &lt; 3 is true</pre>";
        assert!(unwrap_pre_encoded(body).is_none());
    }

    #[test]
    fn test_resolve_link_absolute_passthrough() {
        assert_eq!(
            resolve_link("https://example.com/a", "https://other.com/"),
            Some("https://example.com/a".into())
        );
    }

    #[test]
    fn test_resolve_link_relative() {
        assert_eq!(
            resolve_link("/a/b", "https://example.com/x"),
            Some("https://example.com/a/b".into())
        );
        assert_eq!(
            resolve_link("item.html", "https://example.com/feed/index.html"),
            Some("https://example.com/feed/item.html".into())
        );
    }

    #[test]
    fn test_resolve_link_failures_drop() {
        assert_eq!(resolve_link("", "https://example.com/"), None);
        assert_eq!(resolve_link("   ", "https://example.com/"), None);
        assert_eq!(resolve_link("/a", "not a url"), None);
    }
}
