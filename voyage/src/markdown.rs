//! Inline markdown rendering for runs of markup nodes.
//!
//! Open/close tag pairs (and the `'''`/`''` quote toggles) are tracked on a
//! frame stack so nested inline markup wraps its converted inner content.
//! Node kinds with no markdown equivalent contribute their raw source slice.

use std::sync::LazyLock;

use parse_wiki_text::Node;
use regex::Regex;

static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>/]+))"#).unwrap()
});
static SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>/]+))"#).unwrap()
});
static ALT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\balt\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>/]+))"#).unwrap()
});

/// Byte span of a node in the source wikitext.
pub(crate) fn node_span(node: &Node) -> (usize, usize) {
    match node {
        Node::Bold { start, end, .. }
        | Node::BoldItalic { start, end, .. }
        | Node::Category { start, end, .. }
        | Node::CharacterEntity { start, end, .. }
        | Node::Comment { start, end, .. }
        | Node::DefinitionList { start, end, .. }
        | Node::EndTag { start, end, .. }
        | Node::ExternalLink { start, end, .. }
        | Node::Heading { start, end, .. }
        | Node::HorizontalDivider { start, end, .. }
        | Node::Image { start, end, .. }
        | Node::Italic { start, end, .. }
        | Node::Link { start, end, .. }
        | Node::MagicWord { start, end, .. }
        | Node::OrderedList { start, end, .. }
        | Node::ParagraphBreak { start, end, .. }
        | Node::Parameter { start, end, .. }
        | Node::Preformatted { start, end, .. }
        | Node::Redirect { start, end, .. }
        | Node::StartTag { start, end, .. }
        | Node::Table { start, end, .. }
        | Node::Tag { start, end, .. }
        | Node::Template { start, end, .. }
        | Node::Text { start, end, .. }
        | Node::UnorderedList { start, end, .. } => (*start, *end),
    }
}

/// The raw source text covered by a node list (template names, parameter
/// names and values, heading titles).
pub(crate) fn nodes_source<'s>(source: &'s str, nodes: &[Node]) -> &'s str {
    let (Some(first), Some(last)) = (nodes.first(), nodes.last()) else {
        return "";
    };
    let (start, _) = node_span(first);
    let (_, end) = node_span(last);
    &source[start..end]
}

/// Renders one run of inline nodes to markdown.
pub(crate) fn render_nodes(source: &str, nodes: &[Node]) -> String {
    let mut renderer = Renderer::new(source);
    renderer.render(nodes);
    renderer.finish()
}

#[derive(Debug, Clone, PartialEq)]
enum Style {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    Pre,
    Heading(usize),
    Anchor(String),
    /// Unknown tags keep their inner content unchanged.
    Plain,
}

fn style_for(tag: &str) -> Style {
    match tag {
        "b" | "strong" => Style::Bold,
        "i" | "em" => Style::Italic,
        "u" => Style::Underline,
        "s" | "strike" | "del" => Style::Strike,
        "code" => Style::Code,
        "pre" => Style::Pre,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            Style::Heading((tag.as_bytes()[1] - b'0') as usize)
        }
        _ => Style::Plain,
    }
}

struct Frame {
    tag: String,
    style: Style,
    text: String,
}

fn render_frame(frame: Frame) -> String {
    let content = frame.text;
    match frame.style {
        Style::Bold => format!("**{content}**"),
        Style::Italic => format!("*{content}*"),
        Style::Underline => format!("_{content}_"),
        Style::Strike => format!("~~{content}~~"),
        Style::Code => format!("`{content}`"),
        Style::Pre => format!("```\n{content}\n```"),
        Style::Heading(level) => format!("\n{} {content}\n", "#".repeat(level)),
        Style::Anchor(href) => format!("[{content}]({href})"),
        Style::Plain => content,
    }
}

struct Renderer<'a> {
    source: &'a str,
    text: String,
    frames: Vec<Frame>,
}

impl<'a> Renderer<'a> {
    fn new(source: &'a str) -> Self {
        Renderer {
            source,
            text: String::new(),
            frames: Vec::new(),
        }
    }

    fn buf(&mut self) -> &mut String {
        match self.frames.last_mut() {
            Some(frame) => &mut frame.text,
            None => &mut self.text,
        }
    }

    fn push_str(&mut self, s: &str) {
        self.buf().push_str(s);
    }

    fn open(&mut self, tag: &str, style: Style) {
        self.frames.push(Frame {
            tag: tag.to_string(),
            style,
            text: String::new(),
        });
    }

    fn close_top(&mut self) {
        if let Some(frame) = self.frames.pop() {
            let rendered = render_frame(frame);
            self.push_str(&rendered);
        }
    }

    /// Closes the innermost frame opened for `tag`, implicitly closing
    /// anything opened inside it. An unmatched close tag degrades to its
    /// raw source text.
    fn close_named(&mut self, tag: &str, raw: &str) {
        if !self.frames.iter().any(|frame| frame.tag == tag) {
            self.push_str(raw);
            return;
        }
        while let Some(frame) = self.frames.pop() {
            let done = frame.tag == tag;
            let rendered = render_frame(frame);
            self.push_str(&rendered);
            if done {
                break;
            }
        }
    }

    fn toggle(&mut self, tag: &str, style: Style) {
        if self.frames.last().is_some_and(|frame| frame.tag == tag) {
            self.close_top();
        } else {
            self.open(tag, style);
        }
    }

    fn toggle_bold_italic(&mut self) {
        if self.frames.last().is_some_and(|frame| frame.tag == "i") {
            self.close_top();
            if self.frames.last().is_some_and(|frame| frame.tag == "b") {
                self.close_top();
            }
        } else {
            self.open("b", Style::Bold);
            self.open("i", Style::Italic);
        }
    }

    fn finish(mut self) -> String {
        while !self.frames.is_empty() {
            self.close_top();
        }
        self.text
    }

    fn render(&mut self, nodes: &[Node]) {
        let source = self.source;
        for node in nodes {
            match node {
                Node::Text { value, .. } => self.push_str(value),
                Node::CharacterEntity { character, .. } => {
                    self.buf().push(*character);
                }
                Node::Comment { .. } => {}
                Node::Link { target, text, .. } => self.render_link(target, text),
                Node::Image { target, text, .. } => self.render_link(target, text),
                Node::Category { target, .. } => {
                    let link = format!("[{target}]({target})");
                    self.push_str(&link);
                }
                Node::ExternalLink { nodes, .. } => {
                    let inner = render_nodes(source, nodes);
                    match inner.split_once(' ') {
                        Some((url, title)) if !title.trim().is_empty() => {
                            let link = format!("[{title}]({url})");
                            self.push_str(&link);
                        }
                        _ => self.push_str(&inner),
                    }
                }
                Node::Bold { .. } => self.toggle("b", Style::Bold),
                Node::Italic { .. } => self.toggle("i", Style::Italic),
                Node::BoldItalic { .. } => self.toggle_bold_italic(),
                Node::HorizontalDivider { .. } => self.push_str("\n---\n"),
                Node::StartTag { name, start, end } => {
                    self.start_tag(&name.to_ascii_lowercase(), (*start, *end));
                }
                Node::EndTag { name, start, end } => {
                    self.end_tag(&name.to_ascii_lowercase(), (*start, *end));
                }
                Node::Tag { name, nodes, .. } => {
                    let tag = name.to_ascii_lowercase();
                    let frame = Frame {
                        style: style_for(&tag),
                        tag,
                        text: render_nodes(source, nodes),
                    };
                    let rendered = render_frame(frame);
                    self.push_str(&rendered);
                }
                other => {
                    let (start, end) = node_span(other);
                    self.push_str(&source[start..end]);
                }
            }
        }
    }

    fn render_link(&mut self, target: &str, text: &[Node]) {
        let label = render_nodes(self.source, text);
        let link = if label.is_empty() {
            format!("[{target}]({target})")
        } else {
            format!("[{label}]({target})")
        };
        self.push_str(&link);
    }

    fn start_tag(&mut self, tag: &str, span: (usize, usize)) {
        let source = self.source;
        match tag {
            "br" => self.push_str("\n"),
            "hr" => self.push_str("\n---\n"),
            "img" => {
                let raw = &source[span.0..span.1];
                let image = format!(
                    "![{}]({})",
                    attr_value(raw, &ALT_RE).unwrap_or_default(),
                    attr_value(raw, &SRC_RE).unwrap_or_default(),
                );
                self.push_str(&image);
            }
            "a" => {
                let raw = &source[span.0..span.1];
                let href = attr_value(raw, &HREF_RE).unwrap_or_default();
                self.open("a", Style::Anchor(href));
            }
            _ => self.open(tag, style_for(tag)),
        }
    }

    fn end_tag(&mut self, tag: &str, span: (usize, usize)) {
        if matches!(tag, "br" | "hr" | "img") {
            return;
        }
        let source = self.source;
        let raw = &source[span.0..span.1];
        self.close_named(tag, raw);
    }
}

fn attr_value(tag_source: &str, attr: &Regex) -> Option<String> {
    attr.captures(tag_source).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().to_string())
    })
}
