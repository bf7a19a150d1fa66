#![allow(clippy::panic)]
#![allow(clippy::panic_in_result_fn)]
#![allow(clippy::indexing_slicing)]

use docmodel::{
    path, xml_export, xml_export_with_options, xml_parse, xml_parse_document,
    xml_parse_with_config, ErrorKind, ExportOptions, Node, Object, ParseConfig, Result,
};

#[test]
fn test_collapse_invariant() -> Result<()> {
    assert_eq!(xml_parse("<a/>")?, Node::scalar(""));
    assert_eq!(xml_parse("<a>hi</a>")?, Node::scalar("hi"));
    assert_eq!(
        xml_parse("<a x=\"1\"/>")?,
        Node::Object(Object::new().with_attribute("x", "1"))
    );
    Ok(())
}

#[test]
fn test_repetition_invariant() -> Result<()> {
    let repeated = xml_parse("<r><i>1</i><i>2</i></r>")?;
    assert_eq!(
        repeated.as_object().and_then(|r| r.child("i")),
        Some(&Node::List(vec![Node::scalar("1"), Node::scalar("2")]))
    );

    let single = xml_parse("<r><i>1</i></r>")?;
    assert_eq!(
        single.as_object().and_then(|r| r.child("i")),
        Some(&Node::scalar("1"))
    );
    Ok(())
}

#[test]
fn test_repeated_children_keep_first_position() -> Result<()> {
    let node = xml_parse("<r><i>1</i><j>x</j><i>2</i></r>")?;
    let keys: Vec<_> = node
        .as_object()
        .map(|r| r.children.keys().map(String::as_str).collect())
        .unwrap_or_default();
    assert_eq!(keys, ["i", "j"]);
    Ok(())
}

#[test]
fn test_text_fragments_joined_with_space() -> Result<()> {
    assert_eq!(
        xml_parse("<a>one<!-- note -->two</a>")?,
        Node::scalar("one two")
    );
    assert_eq!(
        xml_parse("<a>  left <![CDATA[a < b]]>  </a>")?,
        Node::scalar("left a < b")
    );
    Ok(())
}

#[test]
fn test_entities_decoded() -> Result<()> {
    let node = xml_parse("<a t=\"&lt;&amp;&gt;\">&#65;&#x42;&quot;&apos;</a>")?;
    assert_eq!(
        node,
        Node::Object(Object::new().with_attribute("t", "<&>").with_text("AB\"'"))
    );
    Ok(())
}

/// Text next to element children is dropped and stays dropped after export.
#[test]
fn test_mixed_content_is_lossy() -> Result<()> {
    let source = "<r>lead<b>x</b>tail</r>";
    let parsed = xml_parse(source)?;
    assert_eq!(parsed, Node::Object(Object::new().with_child("b", "x")));

    let exported = xml_export(&parsed, "r", false, None);
    assert!(!exported.contains("lead"));
    assert_eq!(xml_parse(&exported)?, parsed);
    Ok(())
}

/// Text beside attributes only is kept through a round trip.
#[test]
fn test_attribute_text_is_lossless() -> Result<()> {
    let source = "<r a=\"1\">hi there</r>";
    let parsed = xml_parse(source)?;
    assert_eq!(
        parsed,
        Node::Object(Object::new().with_attribute("a", "1").with_text("hi there"))
    );
    let exported = xml_export(&parsed, "r", false, None);
    assert!(exported.ends_with("<r a=\"1\">hi there</r>"));
    Ok(())
}

#[test]
fn test_malformed_documents() {
    let cases = [
        "",
        "<r>",
        "<r><a></r>",
        "<r>&nope;</r>",
        "<r>&amp</r>",
        "<r a=\"1\" a=\"2\"/>",
        "<r/><r/>",
        "text only",
        "<r a=1/>",
    ];
    for case in cases {
        match xml_parse(case) {
            Ok(node) => panic!("{case:?} parsed as {node:?}"),
            Err(err) => assert_eq!(err.kind(), &ErrorKind::MalformedDocument, "{case:?}"),
        }
    }
}

#[test]
fn test_malformed_reports_position() {
    let err = xml_parse("<r>\n  <a></b>\n</r>").err();
    let err = err.as_ref().map(|e| (e.span().start.line, e.to_string()));
    let (line, message) = err.unwrap_or_default();
    assert_eq!(line, 2);
    assert!(message.contains("mismatched closing tag"), "{message}");
}

#[test]
fn test_depth_limit() {
    let nested = format!("{}{}", "<a>".repeat(10), "</a>".repeat(10));
    let err = xml_parse_with_config(&nested, ParseConfig::new(4, 0)).err();
    assert_eq!(
        err.map(|e| e.kind().clone()),
        Some(ErrorKind::MaxDepthExceeded { max: 4 })
    );
    assert!(xml_parse_with_config(&nested, ParseConfig::new(10, 0)).is_ok());
}

#[test]
fn test_size_limit() {
    let err = xml_parse_with_config("<a>0123456789</a>", ParseConfig::new(0, 8)).err();
    assert!(err.is_some_and(|e| e.kind().is_malformed()));
}

#[test]
fn test_document_scenario_paths() -> Result<()> {
    let doc = xml_parse_document(r#"<Items><Item id="1" w="2.5"/><Item id="2" w="3.0"/></Items>"#)?;
    assert_eq!(doc.root_tag, "Items");

    let tree = doc.into_tree();
    assert_eq!(
        path::get(&tree, "Items.Item.0.@id").as_deref(),
        Some(&Node::scalar("1"))
    );
    assert_eq!(
        path::get(&tree, "Items.Item.1.@w").as_deref(),
        Some(&Node::scalar("3.0"))
    );
    Ok(())
}

#[test]
fn test_export_declaration_and_pretty() -> Result<()> {
    let node = xml_parse("<r><i>1</i><i>2</i></r>")?;
    let pretty = xml_export(&node, "r", true, None);
    assert_eq!(
        pretty,
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<r>\n\t<i>1</i>\n\t<i>2</i>\n</r>\n"
    );
    let compact = xml_export(&node, "r", false, None);
    assert_eq!(
        compact,
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><r><i>1</i><i>2</i></r>"
    );
    Ok(())
}

#[test]
fn test_export_sort_missing_values_first() -> Result<()> {
    let node = xml_parse(r#"<r><i n="b"/><i/><i n="a"/></r>"#)?;
    let xml = xml_export_with_options(&node, "r", &ExportOptions::compact().with_sort_by("@n"));
    assert_eq!(xml, r#"<r><i/><i n="a"/><i n="b"/></r>"#);
    Ok(())
}

#[test]
fn test_export_preserves_attribute_order() -> Result<()> {
    let source = r#"<r z="1" a="2" m="3"/>"#;
    let xml = xml_export_with_options(&xml_parse(source)?, "r", &ExportOptions::compact());
    assert_eq!(xml, source);
    Ok(())
}
