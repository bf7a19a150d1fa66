//! docmodel - Generic document tree for XML-centric configuration data
//!
//! Parse XML into a [`Node`] tree, infer a schema from sample instances,
//! edit the tree by path, take bounded representative samples of large
//! lists, and export back to XML.
//!
//! # Quick Start
//!
//! ```
//! use docmodel::{path, xml_parse_document, Node};
//! # fn main() -> Result<(), docmodel::Error> {
//! let doc = xml_parse_document(r#"<Items><Item id="1" w="2.5"/><Item id="2" w="3.0"/></Items>"#)?;
//! let tree = doc.into_tree();
//! let id = path::get(&tree, "Items.Item.0.@id");
//! assert_eq!(id.as_deref(), Some(&Node::scalar("1")));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub use error::{Error, ErrorKind, Pos, Result, Span};

pub mod node;
pub use node::{Document, Node, Object};

pub mod xml;
pub use xml::{Config as ParseConfig, ExportOptions};

pub mod path;
pub use path::{Condition, Validation};

pub mod schema;
pub use schema::{
    ArrayItemPolicy, FieldSummary, NumericRange, Ratio, SchemaDescriptor, SchemaPolicy,
    SchemaSummary, SchemaType,
};

pub mod sample;
pub use sample::{Sampler, Strategy};

use std::borrow::Cow;

use rand::Rng;
use tracing::{debug, instrument};

/// Parse XML text into the tree of its document element
pub fn xml_parse(text: &str) -> Result<Node> {
    xml_parse_document(text).map(|doc| doc.root)
}

/// Parse XML text, keeping the document element's tag
pub fn xml_parse_document(text: &str) -> Result<Document> {
    xml_parse_with_config(text, ParseConfig::default())
}

/// Parse with custom nesting and size limits
#[instrument(level = "debug", skip(text), fields(bytes = text.len()))]
pub fn xml_parse_with_config(text: &str, config: ParseConfig) -> Result<Document> {
    let element = xml::Parser::with_config(text.as_bytes(), config).parse()?;
    let root_tag = element.name.clone();
    let root = xml::to_node(element);
    debug!(root = %root_tag, "parsed document");
    Ok(Document::new(root_tag, root))
}

/// Serialize `node` under `root_tag`. A declaration is always written.
pub fn xml_export(node: &Node, root_tag: &str, pretty: bool, sort_by: Option<&str>) -> String {
    let options = ExportOptions {
        pretty,
        sort_by: sort_by.map(str::to_owned),
        declaration: true,
    };
    xml_export_with_options(node, root_tag, &options)
}

/// Serialize `node` under `root_tag` with full [`ExportOptions`]
pub fn xml_export_with_options(node: &Node, root_tag: &str, options: &ExportOptions) -> String {
    xml::to_xml(node, root_tag, options)
}

/// Multi-sample schema inference with the default [`SchemaPolicy`]
pub fn infer_schema(samples: &[Node]) -> SchemaSummary {
    schema::infer_schema(samples)
}

/// Resolve a path; see [`path::get`]
pub fn path_get<'a>(node: &'a Node, path: &str) -> Option<Cow<'a, Node>> {
    path::get(node, path)
}

/// Assign a value at a path; see [`path::set`]
pub fn path_set(root: &mut Node, path: &str, value: Node) -> bool {
    path::set(root, path, value)
}

/// Collect list elements matching a condition; see [`path::filter`]
pub fn path_filter(root: &Node, path: Option<&str>, condition: &Condition) -> Result<Vec<Node>> {
    path::filter(root, path, condition)
}

/// Append an element to a list; see [`path::create`]
pub fn path_create(root: &mut Node, path: &str, item: Node) -> Result<usize> {
    path::create(root, path, item)
}

/// Merge a patch into matching elements; see [`path::update`]
pub fn path_update(root: &mut Node, path: &str, condition: &Condition, patch: &Object) -> Result<usize> {
    path::update(root, path, condition, patch)
}

/// Remove matching elements; see [`path::delete`]
pub fn path_delete(root: &mut Node, path: &str, condition: &Condition) -> Result<usize> {
    path::delete(root, path, condition)
}

/// Bounded representative subset; see [`sample::sample`]
pub fn diversity_sample<R>(items: &[Node], max_items: usize, strategy: Strategy, rng: &mut R) -> Result<Vec<Node>>
where
    R: Rng + ?Sized,
{
    sample::sample(items, max_items, strategy, rng)
}
