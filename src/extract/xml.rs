use quick_xml::events::Event;
use quick_xml::Reader;

/// One element of a parsed XML document.
///
/// Names keep their namespace prefix and case (`media:thumbnail` stays
/// `media:thumbnail`), which is what the tag mapping matches against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.as_str() == name)
            .map(|(_, value)| value.as_str())
    }

    /// Concatenated text of this element and its descendants, trimmed.
    pub fn deep_text(&self) -> String {
        fn collect(element: &XmlElement, out: &mut String) {
            out.push_str(&element.text);
            for child in &element.children {
                collect(child, out);
            }
        }

        let mut out = String::new();
        collect(self, &mut out);
        out.trim().to_string()
    }
}

/// Parse an XML document into a tree, returning its root element.
///
/// Parsing is lenient: malformed input ends the parse early and whatever
/// was read up to that point is kept, since real-world feeds are routinely
/// truncated or sloppy. Returns `None` when no root element was found.
pub fn parse_document(input: &str) -> Option<XmlElement> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut roots: Vec<XmlElement> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                stack.push(element_from_tag(
                    e.name().as_ref(),
                    e.attributes().flatten(),
                ));
            }
            Ok(Event::Empty(e)) => {
                let element = element_from_tag(e.name().as_ref(), e.attributes().flatten());
                attach(&mut stack, &mut roots, element);
            }
            Ok(Event::End(_)) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut roots, element);
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(parent) = stack.last_mut() {
                    let raw = String::from_utf8_lossy(t.as_ref());
                    parent
                        .text
                        .push_str(&html_escape::decode_html_entities(&raw));
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(parent) = stack.last_mut() {
                    parent.text.push_str(&String::from_utf8_lossy(c.as_ref()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("XML parse stopped early: {}", e);
                break;
            }
        }
    }

    // Unclosed elements still hold parsed content; fold them into their
    // parents instead of dropping them.
    while let Some(element) = stack.pop() {
        attach(&mut stack, &mut roots, element);
    }

    roots.into_iter().next()
}

fn element_from_tag<'a>(
    name: &[u8],
    attributes: impl Iterator<Item = quick_xml::events::attributes::Attribute<'a>>,
) -> XmlElement {
    XmlElement {
        name: String::from_utf8_lossy(name).into_owned(),
        attributes: attributes
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                let raw = String::from_utf8_lossy(&attr.value);
                let value = html_escape::decode_html_entities(&raw).into_owned();
                (key, value)
            })
            .collect(),
        text: String::new(),
        children: Vec::new(),
    }
}

fn attach(stack: &mut [XmlElement], roots: &mut Vec<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => roots.push(element),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_rss_document() {
        let root = parse_document(
            r#"<rss version="2.0"><channel><title>Example</title><item><link>http://x/1</link></item></channel></rss>"#,
        )
        .unwrap();

        assert_eq!(root.name, "rss");
        assert_eq!(root.attr("version"), Some("2.0"));

        let channel = &root.children[0];
        assert_eq!(channel.name, "channel");
        assert_eq!(channel.children[0].deep_text(), "Example");

        let item = &channel.children[1];
        assert_eq!(item.name, "item");
        assert_eq!(item.children[0].name, "link");
        assert_eq!(item.children[0].deep_text(), "http://x/1");
    }

    #[test]
    fn test_empty_elements_keep_attributes() {
        let root = parse_document(
            r#"<feed><link rel="alternate" href="http://example.com/post"/></feed>"#,
        )
        .unwrap();

        let link = &root.children[0];
        assert_eq!(link.attr("rel"), Some("alternate"));
        assert_eq!(link.attr("href"), Some("http://example.com/post"));
        assert_eq!(link.attr("missing"), None);
    }

    #[test]
    fn test_cdata_is_kept_verbatim() {
        let root =
            parse_document("<item><description><![CDATA[<p>Hello & bye</p>]]></description></item>")
                .unwrap();
        assert_eq!(root.children[0].deep_text(), "<p>Hello & bye</p>");
    }

    #[test]
    fn test_entities_are_decoded() {
        let root = parse_document("<item><title>Ball &amp; Chain &#169;</title></item>").unwrap();
        assert_eq!(root.children[0].deep_text(), "Ball & Chain \u{a9}");
    }

    #[test]
    fn test_namespaced_names_are_preserved() {
        let root = parse_document(
            r#"<item><media:thumbnail url="http://x/t.jpg"/><content:encoded>body</content:encoded></item>"#,
        )
        .unwrap();
        assert_eq!(root.children[0].name, "media:thumbnail");
        assert_eq!(root.children[1].name, "content:encoded");
    }

    #[test]
    fn test_truncated_document_keeps_partial_tree() {
        let root = parse_document("<rss><channel><title>Cut off</title>").unwrap();
        assert_eq!(root.name, "rss");
        assert_eq!(root.children[0].children[0].deep_text(), "Cut off");
    }

    #[test]
    fn test_deep_text_spans_children() {
        let root = parse_document("<item><a>one</a><b>two</b></item>").unwrap();
        assert_eq!(root.deep_text(), "onetwo");
    }

    #[test]
    fn test_no_root() {
        assert_eq!(parse_document(""), None);
        assert_eq!(parse_document("   "), None);
    }
}
