//! XML codec: text to [`Node`](crate::Node) and back

pub mod codec;
mod cursor;
pub mod model;
pub mod parser;

pub use codec::{to_node, to_xml, ExportOptions, LIST_ITEM_TAG};
pub use model::{Content, Element};
pub use parser::{Config, Parser};
