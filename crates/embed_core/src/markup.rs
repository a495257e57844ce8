//! Owned markup tree for CMS and oEmbed fragments.
//!
//! Fragments are parsed with `scraper` (html5ever fragment parsing, so the
//! result matches what a browser builds for bulk `innerHTML` injection) and
//! copied into a small mutable tree that can be edited and serialized again.

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::Html;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fragment {
    pub nodes: Vec<MarkupNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element(ElementNode),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
    /// Whether a script element has run. Scripts parsed from a string stay inert.
    pub started: bool,
}

impl ElementNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
            started: false,
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attrs
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_whitespace().any(|c| c.eq_ignore_ascii_case(class)))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let classes = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_string(),
        };
        self.set_attr("class", classes);
    }

    /// Concatenated text of direct text children (a script's payload).
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                MarkupNode::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Fragment {
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_fragment(html);
        let nodes = document
            .root_element()
            .children()
            .filter_map(convert_node)
            .collect();
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Removes every `<script>` element at any depth; returns how many were removed.
    pub fn strip_scripts(&mut self) -> usize {
        strip_scripts_in(&mut self.nodes)
    }

    /// Script elements in document order.
    pub fn scripts(&self) -> Vec<&ElementNode> {
        let mut found = Vec::new();
        self.visit_elements(&mut |element| {
            if element.is("script") {
                found.push(element);
            }
        });
        found
    }

    /// Pre-order walk over every element.
    pub fn visit_elements<'a>(&'a self, f: &mut impl FnMut(&'a ElementNode)) {
        visit_in(&self.nodes, f);
    }

    /// Pre-order walk over every element, allowing in-place replacement.
    pub fn visit_elements_mut(&mut self, f: &mut impl FnMut(&mut ElementNode)) {
        visit_mut_in(&mut self.nodes, f);
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            write_node(node, &mut out, false);
        }
        out
    }
}

/// Parses `html`, drops every script element and serializes the rest.
pub fn strip_scripts(html: &str) -> String {
    let mut fragment = Fragment::parse(html);
    fragment.strip_scripts();
    fragment.to_html()
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

fn convert_node(node: NodeRef<'_, Node>) -> Option<MarkupNode> {
    match node.value() {
        Node::Text(text) => Some(MarkupNode::Text(text.text.to_string())),
        Node::Comment(comment) => Some(MarkupNode::Comment(comment.comment.to_string())),
        Node::Element(element) => Some(MarkupNode::Element(ElementNode {
            name: element.name().to_ascii_lowercase(),
            attrs: element
                .attrs()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            children: node.children().filter_map(convert_node).collect(),
            started: false,
        })),
        _ => None,
    }
}

fn strip_scripts_in(nodes: &mut Vec<MarkupNode>) -> usize {
    let before = nodes.len();
    nodes.retain(|node| !matches!(node, MarkupNode::Element(el) if el.is("script")));
    let mut removed = before - nodes.len();
    for node in nodes.iter_mut() {
        if let MarkupNode::Element(element) = node {
            removed += strip_scripts_in(&mut element.children);
        }
    }
    removed
}

fn visit_in<'a>(nodes: &'a [MarkupNode], f: &mut impl FnMut(&'a ElementNode)) {
    for node in nodes {
        if let MarkupNode::Element(element) = node {
            f(element);
            visit_in(&element.children, f);
        }
    }
}

fn visit_mut_in(nodes: &mut [MarkupNode], f: &mut impl FnMut(&mut ElementNode)) {
    for node in nodes.iter_mut() {
        if let MarkupNode::Element(element) = node {
            f(element);
            visit_mut_in(&mut element.children, f);
        }
    }
}

fn write_node(node: &MarkupNode, out: &mut String, raw_text: bool) {
    match node {
        MarkupNode::Text(text) if raw_text => out.push_str(text),
        MarkupNode::Text(text) => out.push_str(&escape_text(text)),
        MarkupNode::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        MarkupNode::Element(element) => {
            out.push('<');
            out.push_str(&element.name);
            for (key, value) in &element.attrs {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&element.name.as_str()) {
                return;
            }
            let raw = RAW_TEXT_ELEMENTS.contains(&element.name.as_str());
            for child in &element.children {
                write_node(child, out, raw);
            }
            out.push_str("</");
            out.push_str(&element.name);
            out.push('>');
        }
    }
}
