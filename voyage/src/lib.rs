//! voyage: transforms Wikivoyage page markup into structured document trees.
//!
//! The entry point is [`parse`], which turns the wikitext of one travel-guide
//! page into a [`tree::Node`] rooted at a `root` node: sections nest by
//! heading level, listing templates (`see`, `do`, `eat`, ...) become typed
//! leaves, document-wide templates land in the root's properties, and free
//! text is converted to markdown.

mod markdown;
pub mod parser;
pub mod tree;

pub use parser::parse;
pub use tree::{Node, NodeKind, Property};
