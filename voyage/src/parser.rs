//! Wikitext-to-tree transformation.
//!
//! [`parse`] walks the token stream produced by `parse_wiki_text` and folds
//! it into a document tree: headings open sections (nested by level),
//! templates become document properties, listings or generic template nodes,
//! and everything in between is rendered to markdown text leaves. The
//! function is pure and never fails; markup it does not understand degrades
//! to raw text.

use std::collections::BTreeMap;
use std::mem;
use std::sync::LazyLock;

use parse_wiki_text::{Configuration, Node as Markup, Parameter};

use crate::markdown;
use crate::tree::{Node, NodeKind, Property};

/// Templates whose parameters describe the whole page rather than an
/// in-body element; matched against the lowercased template name.
const DOCUMENT_TEMPLATES: [&str; 8] = [
    "pagebanner",
    "mapframe",
    "routebox",
    "geo",
    "ispartof",
    "usablecity",
    "guidecity",
    "outlinecity",
];

static CONFIG: LazyLock<Configuration> = LazyLock::new(Configuration::default);

/// Parses one page of wikitext into a document tree.
pub fn parse(wikitext: &str) -> Node {
    let output = CONFIG.parse(wikitext);
    let mut builder = TreeBuilder::new(wikitext);
    builder.process(&output.nodes);
    builder.finish()
}

struct FlatNode {
    kind: NodeKind,
    properties: BTreeMap<String, Property>,
    children: Vec<usize>,
}

impl FlatNode {
    fn new(kind: NodeKind) -> FlatNode {
        FlatNode {
            kind,
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }
}

/// Index arena for the tree under construction. Index 0 is the root;
/// `sections` records emitted sections in document order, which is what
/// parent resolution for a new heading scans in reverse.
struct TreeBuilder<'a> {
    source: &'a str,
    arena: Vec<FlatNode>,
    sections: Vec<usize>,
    current: usize,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str) -> TreeBuilder<'a> {
        TreeBuilder {
            source,
            arena: vec![FlatNode::new(NodeKind::Root)],
            sections: Vec::new(),
            current: 0,
        }
    }

    fn process(&mut self, nodes: &[Markup<'a>]) {
        let mut run_start = 0;
        for (i, node) in nodes.iter().enumerate() {
            match node {
                Markup::Heading {
                    level,
                    nodes: title,
                    ..
                } => {
                    self.flush_text(&nodes[run_start..i]);
                    run_start = i + 1;
                    self.open_section(*level, title);
                }
                Markup::Template {
                    name, parameters, ..
                } => {
                    self.flush_text(&nodes[run_start..i]);
                    run_start = i + 1;
                    self.handle_template(name, parameters);
                }
                _ => {}
            }
        }
        self.flush_text(&nodes[run_start..]);
    }

    /// Renders a run of inline nodes and attaches it as a text leaf;
    /// whitespace-only runs are dropped.
    fn flush_text(&mut self, run: &[Markup]) {
        if run.is_empty() {
            return;
        }
        let rendered = markdown::render_nodes(self.source, run);
        let trimmed = rendered.trim();
        if trimmed.is_empty() {
            return;
        }
        let mut node = FlatNode::new(NodeKind::Text);
        node.properties
            .insert("markdown".to_string(), Property::Str(trimmed.to_string()));
        self.attach(node);
    }

    fn attach(&mut self, node: FlatNode) -> usize {
        let idx = self.arena.len();
        self.arena.push(node);
        self.arena[self.current].children.push(idx);
        idx
    }

    fn open_section(&mut self, level: u8, title: &[Markup]) {
        let title = markdown::nodes_source(self.source, title).trim().to_string();
        let level = level.clamp(2, 6);

        let parent = self
            .sections
            .iter()
            .rev()
            .copied()
            .find(|&idx| self.section_level(idx) < level)
            .unwrap_or(0);

        let mut node = FlatNode::new(NodeKind::Section);
        node.properties
            .insert("title".to_string(), Property::Str(title));
        node.properties
            .insert("level".to_string(), Property::Int(level));

        let idx = self.arena.len();
        self.arena.push(node);
        self.arena[parent].children.push(idx);
        self.sections.push(idx);
        self.current = idx;
    }

    fn section_level(&self, idx: usize) -> u8 {
        match self.arena[idx].properties.get("level") {
            Some(Property::Int(level)) => *level,
            _ => u8::MAX,
        }
    }

    fn handle_template(&mut self, name: &[Markup], parameters: &[Parameter<'a>]) {
        let name = markdown::nodes_source(self.source, name)
            .trim()
            .to_lowercase();

        if DOCUMENT_TEMPLATES.contains(&name.as_str()) {
            let params = self.string_params(parameters);
            // Later occurrences overwrite earlier ones.
            self.arena[0].properties.insert(name, Property::Map(params));
        } else if let Some(kind) = NodeKind::listing(&name) {
            let mut node = FlatNode::new(kind);
            for (key, value) in self.named_params(parameters) {
                let prop = if key == "content" {
                    Property::Str(
                        markdown::render_nodes(self.source, value)
                            .trim()
                            .to_string(),
                    )
                } else {
                    Property::Str(
                        markdown::nodes_source(self.source, value)
                            .trim()
                            .to_string(),
                    )
                };
                node.properties.insert(key, prop);
            }
            self.attach(node);
        } else {
            let params = self.string_params(parameters);
            let mut node = FlatNode::new(NodeKind::Template);
            node.properties
                .insert("name".to_string(), Property::Str(name));
            node.properties
                .insert("params".to_string(), Property::Map(params));
            self.attach(node);
        }
    }

    /// Parameter keys with their value node lists; unnamed parameters get
    /// 1-based positional keys.
    fn named_params<'p>(
        &self,
        parameters: &'p [Parameter<'a>],
    ) -> Vec<(String, &'p [Markup<'a>])> {
        let mut next_ordinal = 1u32;
        parameters
            .iter()
            .map(|param| {
                let key = match &param.name {
                    Some(name) => markdown::nodes_source(self.source, name)
                        .trim()
                        .to_string(),
                    None => {
                        let key = next_ordinal.to_string();
                        next_ordinal += 1;
                        key
                    }
                };
                (key, param.value.as_slice())
            })
            .collect()
    }

    fn string_params(&self, parameters: &[Parameter<'a>]) -> BTreeMap<String, String> {
        self.named_params(parameters)
            .into_iter()
            .map(|(key, value)| {
                let value = markdown::nodes_source(self.source, value)
                    .trim()
                    .to_string();
                (key, value)
            })
            .collect()
    }

    fn finish(mut self) -> Node {
        build_node(&mut self.arena, 0)
    }
}

fn build_node(arena: &mut [FlatNode], idx: usize) -> Node {
    let kind = arena[idx].kind;
    let properties = mem::take(&mut arena[idx].properties);
    let child_indices = mem::take(&mut arena[idx].children);
    let children = child_indices
        .into_iter()
        .map(|child| build_node(arena, child))
        .collect();
    Node {
        kind,
        properties,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn parsed(wikitext: &str) -> Value {
        serde_json::to_value(parse(wikitext)).unwrap()
    }

    fn wrap(children: Value) -> Value {
        json!({"type": "root", "properties": {}, "children": children})
    }

    fn text(markdown: &str) -> Value {
        json!({"type": "text", "properties": {"markdown": markdown}, "children": []})
    }

    #[test]
    fn empty_input_is_root_only() {
        assert_eq!(parsed(""), wrap(json!([])));
    }

    #[test]
    fn whitespace_only_input_produces_no_text_node() {
        assert_eq!(parsed("  \n\n   \t"), wrap(json!([])));
    }

    #[test]
    fn plain_text_node() {
        assert_eq!(
            parsed("Just some plain text."),
            wrap(json!([text("Just some plain text.")]))
        );
    }

    #[test]
    fn template_node() {
        assert_eq!(
            parsed("{{foo|a=1|b=two}}"),
            wrap(json!([{
                "type": "template",
                "properties": {"name": "foo", "params": {"a": "1", "b": "two"}},
                "children": []
            }]))
        );
    }

    #[test]
    fn see_listing_full_properties() {
        let snippet = "{{see\
            |name=Statue|alt=Monument|url=http://x|email=a@b.com\
            |address=1 Road|lat=1.23|long=4.56|directions=North\
            |phone=12345|tollfree=800|fax=54321|hours=24/7|price=Free\
            |lastedit=2020-01-01|wikipedia=Statue|wikidata=Q1\
            |content=Big statue}}";
        assert_eq!(
            parsed(snippet),
            wrap(json!([{
                "type": "see",
                "properties": {
                    "name": "Statue", "alt": "Monument", "url": "http://x",
                    "email": "a@b.com", "address": "1 Road", "lat": "1.23",
                    "long": "4.56", "directions": "North", "phone": "12345",
                    "tollfree": "800", "fax": "54321", "hours": "24/7",
                    "price": "Free", "lastedit": "2020-01-01",
                    "wikipedia": "Statue", "wikidata": "Q1",
                    "content": "Big statue"
                },
                "children": []
            }]))
        );
    }

    #[test]
    fn sleep_listing_keeps_checkin_checkout() {
        let snippet =
            "{{sleep|name=Hotel|checkin=3PM|checkout=11AM|price=$100|content=Cozy rooms}}";
        assert_eq!(
            parsed(snippet),
            wrap(json!([{
                "type": "sleep",
                "properties": {
                    "name": "Hotel", "checkin": "3PM", "checkout": "11AM",
                    "price": "$100", "content": "Cozy rooms"
                },
                "children": []
            }]))
        );
    }

    #[test]
    fn listing_content_is_rendered_to_markdown() {
        assert_eq!(
            parsed("{{see|name=X|content='''Big''' statue}}"),
            wrap(json!([{
                "type": "see",
                "properties": {"name": "X", "content": "**Big** statue"},
                "children": []
            }]))
        );
    }

    #[test]
    fn every_listing_template_maps_to_its_kind() {
        for kind in ["see", "do", "buy", "eat", "drink", "sleep", "listing"] {
            let doc = parsed(&format!("{{{{{kind}|name=N}}}}"));
            assert_eq!(doc["children"][0]["type"], kind, "template {kind}");
        }
    }

    #[test]
    fn document_template_lands_in_root_properties() {
        assert_eq!(
            parsed("{{geo|lat=42.36|long=-71.06}}"),
            json!({
                "type": "root",
                "properties": {"geo": {"lat": "42.36", "long": "-71.06"}},
                "children": []
            })
        );
    }

    #[test]
    fn later_document_template_overwrites() {
        let doc = parsed("{{geo|lat=1|long=2}}\n{{geo|lat=3|long=4}}");
        assert_eq!(doc["properties"]["geo"], json!({"lat": "3", "long": "4"}));
    }

    #[test]
    fn document_template_name_is_lowercased() {
        let doc = parsed("{{isPartOf|Massachusetts}}");
        assert_eq!(
            doc["properties"]["ispartof"],
            json!({"1": "Massachusetts"})
        );
    }

    #[test]
    fn unnamed_parameters_get_positional_keys() {
        let doc = parsed("{{routebox|north|south|image=I}}");
        assert_eq!(
            doc["properties"]["routebox"],
            json!({"1": "north", "2": "south", "image": "I"})
        );
    }

    #[test]
    fn sections_nest_by_level() {
        assert_eq!(
            parsed("Intro\n== First ==\nHello\n=== Sub ===\nWorld"),
            wrap(json!([
                text("Intro"),
                {
                    "type": "section",
                    "properties": {"title": "First", "level": 2},
                    "children": [
                        text("Hello"),
                        {
                            "type": "section",
                            "properties": {"title": "Sub", "level": 3},
                            "children": [text("World")]
                        }
                    ]
                }
            ]))
        );
    }

    #[test]
    fn sibling_section_attaches_to_root_not_deeper_section() {
        let doc = parsed("== A ==\n=== B ===\n== C ==\ntail");
        let children = doc["children"].as_array().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0]["properties"]["title"], "A");
        assert_eq!(children[1]["properties"]["title"], "C");
        assert_eq!(children[1]["children"][0], text("tail"));
    }

    #[test]
    fn listings_attach_to_current_section() {
        let doc = parsed("== Eat ==\n{{eat|name=Diner}}");
        assert_eq!(doc["children"][0]["children"][0]["type"], "eat");
    }

    #[test]
    fn inline_markup_becomes_markdown_text() {
        assert_eq!(
            parsed("See [[Boston|the city]] and '''enjoy'''."),
            wrap(json!([text("See [the city](Boston) and **enjoy**.")]))
        );
    }

    #[test]
    fn section_levels_always_in_range() {
        for input in [
            "= Top =\nx",
            "== Two ==\nx",
            "====== Six ======\nx",
            "text only",
        ] {
            let doc = parse(input);
            assert_section_levels(&doc);
        }
    }

    fn assert_section_levels(node: &Node) {
        if node.kind == NodeKind::Section {
            match node.properties.get("level") {
                Some(Property::Int(level)) => {
                    assert!((2..=6).contains(level), "level {level} out of range")
                }
                other => panic!("section without integer level: {other:?}"),
            }
        }
        for child in &node.children {
            assert_section_levels(child);
        }
    }

    #[test]
    fn parsed_tree_round_trips_through_json() {
        let doc = parse(
            "{{pagebanner|Banner.jpg}}\nIntro\n== See ==\n{{see|name=X|content=''Nice''}}\n=== Nearby ===\nMore",
        );
        let json = serde_json::to_vec(&doc).unwrap();
        let back: Node = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, doc);
    }
}
