use std::collections::HashSet;

use ego_tree::{NodeId, NodeRef};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

/// Tags serialized as-is (modulo attribute stripping). Everything textual
/// plus the media tags article content legitimately embeds.
static ALLOWED_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "address",
        "article",
        "aside",
        "footer",
        "header",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hgroup",
        "main",
        "nav",
        "section",
        "blockquote",
        "dd",
        "div",
        "dl",
        "dt",
        "figcaption",
        "figure",
        "hr",
        "li",
        "ol",
        "p",
        "pre",
        "ul",
        "a",
        "abbr",
        "b",
        "bdi",
        "bdo",
        "br",
        "cite",
        "code",
        "data",
        "dfn",
        "em",
        "i",
        "kbd",
        "mark",
        "q",
        "rb",
        "rp",
        "rt",
        "rtc",
        "ruby",
        "s",
        "samp",
        "small",
        "span",
        "strong",
        "sub",
        "sup",
        "time",
        "u",
        "var",
        "wbr",
        "caption",
        "col",
        "colgroup",
        "table",
        "tbody",
        "td",
        "tfoot",
        "th",
        "thead",
        "tr",
        "picture",
        "img",
        "video",
        "audio",
        "source",
        "iframe",
    ])
});

/// Tags removed together with their entire subtree.
static DROP_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "script",
        "style",
        "noscript",
        "template",
        "form",
        "input",
        "button",
        "select",
        "textarea",
        "option",
        "optgroup",
        "object",
        "embed",
        "applet",
        "link",
        "meta",
        "base",
        "frame",
        "frameset",
        "title",
    ])
});

static VOID_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ])
});

/// Serialize `element` (tag included) to sanitized HTML.
///
/// Dangerous subtrees are dropped, unknown wrappers are unwrapped into
/// their children, event-handler and style attributes are stripped, and
/// everything else passes through with entities re-encoded.
pub fn sanitize_element(element: ElementRef) -> String {
    let mut out = String::new();
    write_node(*element, &mut out);
    out
}

fn write_node(node: NodeRef<Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => {
            let content: &str = &text.text;
            out.push_str(&html_escape::encode_text(content));
        }
        Node::Element(element) => {
            let name = element.name();
            if DROP_TAGS.contains(name) {
                return;
            }
            if !ALLOWED_TAGS.contains(name) {
                for child in node.children() {
                    write_node(child, out);
                }
                return;
            }

            out.push('<');
            out.push_str(name);
            for (attr_name, value) in element.attrs() {
                if attr_name == "style" || attr_name.starts_with("on") {
                    continue;
                }
                out.push(' ');
                out.push_str(attr_name);
                out.push_str("=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(value));
                out.push('"');
            }
            out.push('>');

            if VOID_TAGS.contains(name) {
                return;
            }

            for child in node.children() {
                write_node(child, out);
            }

            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        Node::Document | Node::Fragment => {
            for child in node.children() {
                write_node(child, out);
            }
        }
        _ => {}
    }
}

/// Plain text of `element`, skipping the subtrees sanitization would drop.
pub fn text_content(element: ElementRef) -> String {
    let mut out = String::new();
    collect_text(*element, &mut out);
    out
}

fn collect_text(node: NodeRef<Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => {
            let content: &str = &text.text;
            out.push_str(content);
        }
        Node::Element(element) => {
            if DROP_TAGS.contains(element.name()) {
                return;
            }
            for child in node.children() {
                collect_text(child, out);
            }
        }
        _ => {
            for child in node.children() {
                collect_text(child, out);
            }
        }
    }
}

/// Detach every element matching `selector` from the document.
pub fn remove_matching(document: &mut Html, selector: &Selector) {
    let ids: Vec<NodeId> = document.select(selector).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Prune the document down to the matches of `selector`: kept nodes are the
/// matches, their subtrees, and the ancestor chain leading to them. Without
/// any match the document is left untouched.
pub fn prune_to_include(document: &mut Html, selector: &Selector) {
    let mut keep: HashSet<NodeId> = HashSet::new();
    for matched in document.select(selector) {
        for ancestor in matched.ancestors() {
            keep.insert(ancestor.id());
        }
        for descendant in matched.descendants() {
            keep.insert(descendant.id());
        }
    }
    if keep.is_empty() {
        return;
    }

    let root = document.tree.root();
    keep.insert(root.id());

    let doomed: Vec<NodeId> = root
        .descendants()
        .filter(|node| {
            !keep.contains(&node.id())
                && node.parent().is_some_and(|parent| keep.contains(&parent.id()))
        })
        .map(|node| node.id())
        .collect();

    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}
