//! Owned visual node tree.
//!
//! A `VisualTree` is the native counterpart of a rendered DOM subtree: an
//! element hierarchy with attributes, inline style declarations and text
//! runs. It is parsed from HTML with `scraper` and fully owned, so a
//! [`VisualTree::detached_copy`] never aliases the tree it was taken from.

use scraper::{ElementRef, Html};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// A node in the visual tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element with attributes and parsed inline style
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    /// Attributes excluding `style`
    pub attrs: BTreeMap<String, String>,
    /// Inline style declarations
    pub style: BTreeMap<String, String>,
    pub children: Vec<Node>,
}

/// Load state of an image referenced by the tree
#[derive(Debug, Clone, PartialEq)]
pub enum ImageState {
    /// Loaded and embeddable as a data URL. `natural` is the decoded size in
    /// pixels when the format reports one.
    Ready { data_url: String, natural: Option<(u32, u32)> },
    Failed { reason: String },
    TimedOut,
}

/// A detached, owned visual tree plus its image resources
#[derive(Debug, Clone, PartialEq)]
pub struct VisualTree {
    pub root: Element,
    /// Image states keyed by the `src` attribute as it reads after rewriting
    pub resources: BTreeMap<String, ImageState>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn set_attr(&mut self, key: &str, value: &str) {
        if key == "style" {
            self.style = parse_declarations(value);
        } else {
            self.attrs.insert(key.to_string(), value.to_string());
        }
    }

    pub fn style_value(&self, prop: &str) -> Option<&str> {
        self.style.get(prop).map(String::as_str)
    }

    pub fn set_style(&mut self, prop: &str, value: &str) {
        self.style.insert(prop.to_string(), value.to_string());
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }

    pub fn has_visible_text(&self) -> bool {
        !self.text_content().trim().is_empty()
    }

    /// Pre-order walk over this element and every descendant element
    pub fn visit_mut(&mut self, f: &mut dyn FnMut(&mut Element)) {
        f(self);
        for child in &mut self.children {
            if let Node::Element(e) = child {
                e.visit_mut(f);
            }
        }
    }

    pub fn visit(&self, f: &mut dyn FnMut(&Element)) {
        f(self);
        for child in &self.children {
            if let Node::Element(e) = child {
                e.visit(f);
            }
        }
    }

    /// Walk descendants only, excluding `self`
    pub fn visit_descendants_mut(&mut self, f: &mut dyn FnMut(&mut Element)) {
        for child in &mut self.children {
            if let Node::Element(e) = child {
                e.visit_mut(f);
            }
        }
    }

    pub fn find_all(&self, tag: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        collect_tag(self, tag, &mut found);
        found
    }

    /// Serialize as markup, letting `filter` adjust each element copy first
    pub fn write_markup(&self, out: &mut String, filter: &mut dyn FnMut(&mut Element)) {
        let mut el = Element {
            tag: self.tag.clone(),
            attrs: self.attrs.clone(),
            style: self.style.clone(),
            children: Vec::new(),
        };
        filter(&mut el);
        let _ = write!(out, "<{}", el.tag);
        for (k, v) in &el.attrs {
            let _ = write!(out, " {}=\"{}\"", k, escape(v));
        }
        if !el.style.is_empty() {
            let _ = write!(out, " style=\"{}\"", escape(&serialize_declarations(&el.style)));
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(&escape(t)),
                Node::Element(e) => e.write_markup(out, filter),
            }
        }
        let _ = write!(out, "</{}>", el.tag);
    }

    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out, &mut |_| {});
        out
    }
}

fn collect_tag<'a>(el: &'a Element, tag: &str, found: &mut Vec<&'a Element>) {
    if el.tag == tag {
        found.push(el);
    }
    for child in &el.children {
        if let Node::Element(e) = child {
            collect_tag(e, tag, found);
        }
    }
}

impl VisualTree {
    pub fn new(root: Element) -> Self {
        Self {
            root,
            resources: BTreeMap::new(),
        }
    }

    /// Parse an HTML fragment. The first top-level element becomes the root;
    /// multiple top-level nodes are wrapped in a `div`.
    pub fn parse_html(html: &str) -> Self {
        let fragment = Html::parse_fragment(html);
        let mut nodes = convert_children(fragment.root_element());
        nodes.retain(|n| !matches!(n, Node::Text(t) if t.trim().is_empty()));
        let root = match nodes.pop() {
            Some(Node::Element(e)) if nodes.is_empty() => e,
            last => {
                nodes.extend(last);
                Element {
                    tag: "div".to_string(),
                    children: nodes,
                    ..Default::default()
                }
            }
        };
        Self::new(root)
    }

    /// Deep copy that shares no storage with `self`.
    ///
    /// Every later mutation in an export (color normalization, image
    /// rewriting, resource loading) targets the copy only.
    pub fn detached_copy(&self) -> Self {
        Self {
            root: self.root.clone(),
            resources: self.resources.clone(),
        }
    }

    pub fn image_state(&self, src: &str) -> Option<&ImageState> {
        self.resources.get(src)
    }

    /// Decoded pixel size of a loaded image
    pub fn natural_size(&self, src: &str) -> Option<(u32, u32)> {
        match self.resources.get(src) {
            Some(ImageState::Ready { natural, .. }) => *natural,
            _ => None,
        }
    }
}

fn convert_children(el: ElementRef<'_>) -> Vec<Node> {
    let mut out = Vec::new();
    for child in el.children() {
        match child.value() {
            scraper::Node::Text(text) => out.push(Node::Text((&**text).to_string())),
            scraper::Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    out.push(Node::Element(convert_element(child)));
                }
            }
            _ => {}
        }
    }
    out
}

fn convert_element(el: ElementRef<'_>) -> Element {
    let value = el.value();
    let mut out = Element::new(value.name());
    for (k, v) in value.attrs() {
        out.set_attr(k, v);
    }
    out.children = convert_children(el);
    out
}

/// Parse `a: b; c: d` into a map. Declarations without a colon are dropped.
pub fn parse_declarations(text: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let mut depth = 0i32;
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut push = |decl: &str| {
        if let Some((k, v)) = decl.split_once(':') {
            let (k, v) = (k.trim(), v.trim());
            if !k.is_empty() {
                out.insert(k.to_ascii_lowercase(), v.to_string());
            }
        }
    };
    for (i, b) in bytes.iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => depth -= 1,
            b';' if depth <= 0 => {
                push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    push(&text[start..]);
    out
}

pub fn serialize_declarations(style: &BTreeMap<String, String>) -> String {
    style
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Escape text for attribute values and character data
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_html_keeps_structure_and_style() {
        let tree = VisualTree::parse_html(
            r#"<div class="card" style="padding: 8px; background: linear-gradient(90deg, #fff, #000)"><p>Hello <b>world</b></p></div>"#,
        );
        assert_eq!(tree.root.tag, "div");
        assert!(tree.root.has_class("card"));
        assert_eq!(tree.root.style_value("padding"), Some("8px"));
        assert_eq!(
            tree.root.style_value("background"),
            Some("linear-gradient(90deg, #fff, #000)")
        );
        assert_eq!(tree.root.text_content(), "Hello world");
    }

    #[test]
    fn inline_svg_keeps_camel_case_names() {
        let tree = VisualTree::parse_html(
            r#"<div><svg viewBox="0 0 10 10"><text><textPath>hi</textPath></text></svg></div>"#,
        );
        let svg = tree.root.find_all("svg");
        assert_eq!(svg.len(), 1);
        assert_eq!(svg[0].attr("viewBox"), Some("0 0 10 10"));
        assert_eq!(tree.root.find_all("textPath").len(), 1);
    }

    #[test]
    fn detached_copy_does_not_alias() {
        let live = VisualTree::parse_html("<div><p>a</p></div>");
        let mut copy = live.detached_copy();
        copy.root.set_style("color", "red");
        copy.root.children.clear();
        assert!(live.root.style.is_empty());
        assert_eq!(live.root.text_content(), "a");
    }

    #[test]
    fn markup_escapes_text_and_attributes() {
        let el = Element::new("text")
            .with_attr("data-x", "a\"b")
            .with_child(Node::Text("1 < 2 & 3".into()));
        assert_eq!(el.to_markup(), r#"<text data-x="a&quot;b">1 &lt; 2 &amp; 3</text>"#);
    }
}
