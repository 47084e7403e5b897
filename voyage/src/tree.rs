//! The document tree produced by the parser.
//!
//! Every node carries a closed-set `type` tag, a property map and an ordered
//! child list, and serializes to the `{"type", "properties", "children"}`
//! shape consumed by downstream sinks. Property maps are `BTreeMap`s so the
//! JSON encoding is canonical (keys sorted).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Node type tags. Listing kinds mirror the Wikivoyage listing templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Section,
    Text,
    Template,
    See,
    Do,
    Buy,
    Eat,
    Drink,
    Sleep,
    Listing,
}

impl NodeKind {
    /// Resolves a listing-template name to its node kind.
    pub fn listing(name: &str) -> Option<NodeKind> {
        match name {
            "see" => Some(NodeKind::See),
            "do" => Some(NodeKind::Do),
            "buy" => Some(NodeKind::Buy),
            "eat" => Some(NodeKind::Eat),
            "drink" => Some(NodeKind::Drink),
            "sleep" => Some(NodeKind::Sleep),
            "listing" => Some(NodeKind::Listing),
            _ => None,
        }
    }
}

/// A property value: plain string, section level, or a nested string map
/// (document templates on `root`, `params` on `template` nodes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Property {
    Str(String),
    Int(u8),
    Map(BTreeMap<String, String>),
}

impl Property {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Property::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<String> for Property {
    fn from(value: String) -> Self {
        Property::Str(value)
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Property::Str(value.to_string())
    }
}

/// One node of the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub properties: BTreeMap<String, Property>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Node {
        Node {
            kind,
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// The empty document.
    pub fn root() -> Node {
        Node::new(NodeKind::Root)
    }

    /// A text leaf holding already-converted markdown.
    pub fn text(markdown: impl Into<String>) -> Node {
        let mut node = Node::new(NodeKind::Text);
        node.properties
            .insert("markdown".to_string(), Property::Str(markdown.into()));
        node
    }

    /// A section header node; children are attached by the parser.
    pub fn section(title: impl Into<String>, level: u8) -> Node {
        let mut node = Node::new(NodeKind::Section);
        node.properties
            .insert("title".to_string(), Property::Str(title.into()));
        node.properties.insert("level".to_string(), Property::Int(level));
        node
    }

    /// Overwrites the document title in the root properties.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.properties
            .insert("title".to_string(), Property::Str(title.into()));
    }

    /// The document title, when present.
    pub fn title(&self) -> Option<&str> {
        self.properties.get("title").and_then(Property::as_str)
    }
}
