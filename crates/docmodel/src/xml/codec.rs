//! Conversion between the raw element tree and [`Node`], and XML output

use std::borrow::Cow;

use tracing::debug;

use crate::node::{Node, Object};
use crate::path;
use crate::xml::model::{Content, Element};

/// Tag used for entries when a bare list is exported as a document root
pub const LIST_ITEM_TAG: &str = "item";

const DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// Options for [`to_xml`]
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExportOptions {
    /// Indent one tab per nesting level, one element per line
    pub pretty: bool,
    /// Reorder the root element's children by this attribute (`@id`,
    /// `@attributes.id`) or dotted field path. Lexical order, missing
    /// values sort as the empty string.
    pub sort_by: Option<String>,
    /// Emit an `<?xml ...?>` declaration first
    pub declaration: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            sort_by: None,
            declaration: true,
        }
    }
}

impl ExportOptions {
    /// Single-line output with no declaration
    pub fn compact() -> Self {
        Self {
            pretty: false,
            sort_by: None,
            declaration: false,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self
    }

    pub fn with_declaration(mut self, declaration: bool) -> Self {
        self.declaration = declaration;
        self
    }
}

/// Apply the collapse and merge rules to a raw element.
///
/// Attributes are copied verbatim. Child elements are inserted by tag,
/// repeated tags becoming a list. Text is kept only when the element has no
/// child elements; an element with neither attributes nor children becomes
/// a bare scalar of its joined text.
pub fn to_node(element: Element) -> Node {
    let text = if element.has_element_children() {
        None
    } else {
        element.joined_text()
    };

    let mut object = Object::new();
    object.attributes = element.attributes;
    for child in element.children {
        if let Content::Element(child) = child {
            let name = child.name.clone();
            object.push_child(name, to_node(child));
        }
    }

    if object.children.is_empty() && object.attributes.is_empty() {
        return Node::Scalar(text.unwrap_or_default());
    }
    object.text = text;
    Node::Object(object)
}

/// Serialize `node` as an element named `root_tag`
pub fn to_xml(node: &Node, root_tag: &str, options: &ExportOptions) -> String {
    let mut writer = Writer {
        out: String::new(),
        pretty: options.pretty,
    };

    if options.declaration {
        writer.out.push_str(DECLARATION);
        writer.newline();
    }

    let mut entries = root_entries(node);
    if let Some(sort_by) = options.sort_by.as_deref() {
        entries.sort_by_cached_key(|(_, child)| sort_key(child, sort_by).into_owned());
    }
    writer.write_element(root_tag, node, entries, 0);

    debug!(
        root = root_tag,
        bytes = writer.out.len(),
        pretty = options.pretty,
        "exported xml"
    );
    writer.out
}

fn root_entries(node: &Node) -> Vec<(&str, &Node)> {
    match node {
        Node::List(items) => {
            let mut entries = Vec::new();
            push_entries(LIST_ITEM_TAG, items, &mut entries);
            entries
        }
        other => child_entries(other),
    }
}

/// Child elements of `node` in output order, lists expanded to siblings
fn child_entries(node: &Node) -> Vec<(&str, &Node)> {
    let mut entries = Vec::new();
    if let Node::Object(object) = node {
        for (name, child) in &object.children {
            push_entries(name, std::slice::from_ref(child), &mut entries);
        }
    }
    entries
}

fn push_entries<'a>(name: &'a str, nodes: &'a [Node], entries: &mut Vec<(&'a str, &'a Node)>) {
    for node in nodes {
        match node {
            Node::List(items) => push_entries(name, items, entries),
            other => entries.push((name, other)),
        }
    }
}

fn sort_key<'a>(node: &'a Node, sort_by: &str) -> Cow<'a, str> {
    let sort_by = sort_by.strip_prefix("@attributes.").map_or_else(
        || Cow::Borrowed(sort_by),
        |name| Cow::Owned(format!("@{name}")),
    );

    match path::get(node, &sort_by) {
        Some(Cow::Borrowed(Node::Scalar(value))) => Cow::Borrowed(value.as_str()),
        Some(Cow::Borrowed(Node::Object(object))) => object
            .text
            .as_deref()
            .map_or(Cow::Borrowed(""), Cow::Borrowed),
        Some(Cow::Owned(Node::Scalar(value))) => Cow::Owned(value),
        _ => Cow::Borrowed(""),
    }
}

struct Writer {
    out: String,
    pretty: bool,
}

impl Writer {
    fn newline(&mut self) {
        if self.pretty {
            self.out.push('\n');
        }
    }

    fn indent(&mut self, depth: usize) {
        if self.pretty {
            for _ in 0..depth {
                self.out.push('\t');
            }
        }
    }

    fn write_element(&mut self, tag: &str, node: &Node, entries: Vec<(&str, &Node)>, depth: usize) {
        self.indent(depth);
        self.out.push('<');
        self.out.push_str(tag);

        let text = match node {
            Node::Scalar(value) => Some(value.as_str()).filter(|v| !v.is_empty()),
            Node::Object(object) => {
                for (name, value) in &object.attributes {
                    self.out.push(' ');
                    self.out.push_str(name);
                    self.out.push_str("=\"");
                    self.out.push_str(&escape_xml(value));
                    self.out.push('"');
                }
                object.text.as_deref()
            }
            Node::List(_) => None,
        };

        if text.is_none() && entries.is_empty() {
            self.out.push_str("/>");
            self.newline();
            return;
        }

        self.out.push('>');
        if let Some(text) = text {
            self.out.push_str(&escape_xml(text));
        }
        if !entries.is_empty() {
            self.newline();
            for (name, child) in entries {
                let grandchildren = child_entries(child);
                self.write_element(name, child, grandchildren, depth + 1);
            }
            self.indent(depth);
        }
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
        self.newline();
    }
}

fn escape_xml(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(input);
    }
    Cow::Owned(
        input
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::xml::parser::Parser;

    fn parse(input: &str) -> Result<Node> {
        Parser::new(input.as_bytes()).parse().map(to_node)
    }

    #[test]
    fn test_collapse_rules() -> Result<()> {
        assert_eq!(parse("<a/>")?, Node::scalar(""));
        assert_eq!(parse("<a>hi</a>")?, Node::scalar("hi"));
        assert_eq!(parse("<a>  hi  </a>")?, Node::scalar("hi"));
        assert_eq!(
            parse("<a x=\"1\"/>")?,
            Node::Object(Object::new().with_attribute("x", "1"))
        );
        Ok(())
    }

    #[test]
    fn test_attribute_with_text_keeps_text() -> Result<()> {
        assert_eq!(
            parse("<a x=\"1\">hi</a>")?,
            Node::Object(Object::new().with_attribute("x", "1").with_text("hi"))
        );
        Ok(())
    }

    #[test]
    fn test_text_beside_children_is_dropped() -> Result<()> {
        assert_eq!(
            parse("<a>lead<b>x</b>tail</a>")?,
            Node::Object(Object::new().with_child("b", "x"))
        );
        Ok(())
    }

    #[test]
    fn test_compact_export() {
        let node = Node::Object(
            Object::new()
                .with_attribute("id", "1")
                .with_child("i", "a & b")
                .with_child("i", "")
                .with_child("j", Object::new().with_attribute("k", "\"v\"")),
        );
        let xml = to_xml(&node, "r", &ExportOptions::compact());
        assert_eq!(
            xml,
            "<r id=\"1\"><i>a &amp; b</i><i/><j k=\"&quot;v&quot;\"/></r>"
        );
    }

    #[test]
    fn test_pretty_export_uses_tabs() {
        let node = Node::Object(
            Object::new().with_child("Item", Object::new().with_attribute("id", "1").with_child("name", "x")),
        );
        let xml = to_xml(&node, "Items", &ExportOptions::default());
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Items>\n\t<Item id=\"1\">\n\t\t<name>x</name>\n\t</Item>\n</Items>\n"
        );
    }

    #[test]
    fn test_root_list_uses_item_tag() {
        let node = Node::List(vec![Node::scalar("a"), Node::scalar("b")]);
        let xml = to_xml(&node, "rows", &ExportOptions::compact());
        assert_eq!(xml, "<rows><item>a</item><item>b</item></rows>");
    }

    #[test]
    fn test_sort_by_attribute() -> Result<()> {
        let node = parse("<r><i id=\"b\"/><i id=\"a\"/><j/><i id=\"c\"/></r>")?;
        let options = ExportOptions::compact().with_sort_by("@id");
        assert_eq!(
            to_xml(&node, "r", &options),
            "<r><j/><i id=\"a\"/><i id=\"b\"/><i id=\"c\"/></r>"
        );

        let legacy = ExportOptions::compact().with_sort_by("@attributes.id");
        assert_eq!(to_xml(&node, "r", &options), to_xml(&node, "r", &legacy));
        Ok(())
    }

    #[test]
    fn test_sort_by_field_is_top_level_only() -> Result<()> {
        let node = parse(
            "<r><i><n>2</n><s><k>z</k><k>a</k></s></i><i><n>1</n><s><k>b</k></s></i></r>",
        )?;
        let xml = to_xml(&node, "r", &ExportOptions::compact().with_sort_by("n"));
        assert_eq!(
            xml,
            "<r><i><n>1</n><s><k>b</k></s></i><i><n>2</n><s><k>z</k><k>a</k></s></i></r>"
        );
        Ok(())
    }

    #[test]
    fn test_export_then_parse_is_stable() -> Result<()> {
        let source = "<Items><Item id=\"1\" w=\"2.5\"><name>a&lt;b</name><tag>x</tag><tag>y</tag></Item><Item id=\"2\">note</Item></Items>";
        let first = parse(source)?;
        let pretty = to_xml(&first, "Items", &ExportOptions::default());
        assert_eq!(parse(&pretty)?, first);
        let compact = to_xml(&first, "Items", &ExportOptions::compact());
        assert_eq!(parse(&compact)?, first);
        Ok(())
    }
}
