/// Block layout for visual trees.
///
/// Stacks blocks vertically, wraps inline text greedily using estimated glyph
/// advances and sizes replaced content (images, diagrams) from attributes,
/// falling back to the decoded size of loaded images.
/// Styles come from inline declarations; a few tags carry structural
/// defaults (heading scale, list indent, paragraph spacing).

use crate::style::{preset_fill, Fill, Paint, Rgba};
use crate::tree::{Element, ImageState, Node};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Four edge widths (margin or padding)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    fn uniform(v: f32) -> Self {
        Self { top: v, right: v, bottom: v, left: v }
    }

    fn vertical(top: f32, bottom: f32) -> Self {
        Self { top, bottom, ..Default::default() }
    }

    fn horizontal(&self) -> f32 {
        self.left + self.right
    }
}

/// A styled run of text inside a line
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub color: String,
    pub bold: bool,
    pub italic: bool,
    pub mono: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutKind {
    Background { fill: Fill, radius: f32 },
    TextLine { runs: Vec<TextRun>, font_size: f32, baseline: f32 },
    Image { src: String },
    Diagram { svg: Element },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub rect: Rect,
    pub kind: LayoutKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    pub nodes: Vec<LayoutNode>,
    pub width: f32,
    pub height: f32,
}

/// Default size of an image without explicit dimensions
pub const DEFAULT_IMAGE_SIZE: (f32, f32) = (320.0, 180.0);
/// Default size of an `svg` without dimensions or viewBox
pub const DEFAULT_SVG_SIZE: (f32, f32) = (300.0, 150.0);

const SKIPPED: &[&str] = &["head", "style", "script", "title", "template"];
const INLINE: &[&str] = &[
    "span", "strong", "b", "em", "i", "code", "a", "del", "s", "u", "mark", "kbd", "sup", "sub",
    "small", "br", "input", "label", "abbr",
];

/// Inherited text properties
#[derive(Debug, Clone)]
struct TextStyle {
    color: String,
    font_size: f32,
    line_height: f32,
    bold: bool,
    italic: bool,
    mono: bool,
    /// Chip behind inline text such as `code`
    highlight: Option<Rgba>,
}

impl TextStyle {
    fn word(&self, text: String) -> Inline {
        Inline::Word(self.run(text), self.highlight)
    }

    fn run(&self, text: String) -> TextRun {
        TextRun {
            text,
            color: self.color.clone(),
            bold: self.bold,
            italic: self.italic,
            mono: self.mono,
        }
    }

    fn line_box(&self) -> f32 {
        self.font_size * self.line_height
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            color: "#000000".to_string(),
            font_size: 16.0,
            line_height: 1.5,
            bold: false,
            italic: false,
            mono: false,
            highlight: None,
        }
    }
}

/// Inline content waiting to be broken into lines
enum Inline {
    Word(TextRun, Option<Rgba>),
    Space,
    Break,
}

struct Flow<'a> {
    images: &'a BTreeMap<String, ImageState>,
    nodes: Vec<LayoutNode>,
    inline: Vec<Inline>,
    /// List marker for the next line that gets emitted
    marker: Option<TextRun>,
}

/// Lay out `root` into a box `width` CSS pixels wide (or the root's own
/// `width` declaration when present).
pub fn layout_tree(root: &Element, width: f32) -> LayoutResult {
    layout_with_images(root, width, &BTreeMap::new())
}

/// Like [`layout_tree`], sizing images without explicit dimensions from
/// their loaded state in `images`
pub fn layout_with_images(root: &Element, width: f32, images: &BTreeMap<String, ImageState>) -> LayoutResult {
    let width = root.style_value("width").and_then(parse_px).unwrap_or(width);
    let mut flow = Flow { images, nodes: Vec::new(), inline: Vec::new(), marker: None };
    let height = layout_block(root, 0.0, 0.0, width, &TextStyle::default(), &mut flow);
    LayoutResult { nodes: flow.nodes, width, height }
}

/// Returns the vertical space consumed including margins
fn layout_block(el: &Element, x: f32, y: f32, width: f32, parent: &TextStyle, flow: &mut Flow) -> f32 {
    let style = TextStyle { highlight: None, ..text_style(el, parent) };
    let margin = edges(el, "margin", default_margin(el, &style));
    let padding = edges(el, "padding", default_padding(el));
    let box_w = el
        .style_value("width")
        .and_then(parse_px)
        .unwrap_or(width - margin.horizontal())
        .min(width - margin.horizontal())
        .max(0.0);
    let box_x = x + margin.left;
    let box_y = y + margin.top;

    let background_at = background(el).map(|fill| {
        let radius = el.style_value("border-radius").and_then(parse_px).unwrap_or(0.0);
        flow.nodes.push(LayoutNode {
            rect: Rect { x: box_x, y: box_y, width: box_w, height: 0.0 },
            kind: LayoutKind::Background { fill, radius },
        });
        flow.nodes.len() - 1
    });
    let border_at = border_left(el).map(|(w, fill)| {
        flow.nodes.push(LayoutNode {
            rect: Rect { x: box_x, y: box_y, width: w, height: 0.0 },
            kind: LayoutKind::Background { fill, radius: 0.0 },
        });
        (flow.nodes.len() - 1, w)
    });

    let border_w = border_at.map(|(_, w)| w).unwrap_or(0.0);
    let content_x = box_x + padding.left + border_w;
    let content_w = (box_w - padding.horizontal() - border_w).max(1.0);
    let mut cursor = box_y + padding.top;

    if el.tag == "pre" {
        cursor += layout_preformatted(el, content_x, cursor, &style, flow);
    } else if el.tag == "hr" {
        flow.nodes.push(LayoutNode {
            rect: Rect { x: content_x, y: cursor, width: content_w, height: 1.0 },
            kind: LayoutKind::Background {
                fill: Fill::Solid(Rgba::parse(&style.color).unwrap_or_default().faded()),
                radius: 0.0,
            },
        });
        cursor += 1.0;
    } else {
        cursor = layout_children(el, content_x, cursor, content_w, &style, flow);
        cursor += flush_inline(content_x, cursor, content_w, &style, flow);
    }

    let box_h = cursor + padding.bottom - box_y;
    if let Some(i) = background_at {
        flow.nodes[i].rect.height = box_h;
    }
    if let Some((i, _)) = border_at {
        flow.nodes[i].rect.height = box_h;
    }
    box_h + margin.top + margin.bottom
}

fn layout_children(el: &Element, x: f32, mut y: f32, width: f32, style: &TextStyle, flow: &mut Flow) -> f32 {
    let ordered = el.tag == "ol";
    let mut index = el.attr("start").and_then(|s| s.parse::<u32>().ok()).unwrap_or(1);
    for child in &el.children {
        match child {
            Node::Text(t) => push_text(t, style, flow),
            Node::Element(c) if SKIPPED.contains(&c.tag.as_str()) => {}
            Node::Element(c) if c.tag == "img" || c.tag == "svg" => {
                y += flush_inline(x, y, width, style, flow);
                y += layout_replaced(c, x, y, width, flow);
            }
            Node::Element(c) if c.tag == "tr" => {
                y += flush_inline(x, y, width, style, flow);
                layout_row(c, style, flow);
                y += flush_inline(x, y, width, style, flow);
            }
            // a linked image stays visible: the wrapper's children join this flow
            Node::Element(c) if INLINE.contains(&c.tag.as_str()) && contains_replaced(c) => {
                y = layout_children(c, x, y, width, &inline_style(c, style), flow);
            }
            Node::Element(c) if INLINE.contains(&c.tag.as_str()) => layout_inline(c, style, flow),
            Node::Element(c) => {
                y += flush_inline(x, y, width, style, flow);
                if c.tag == "li" {
                    let marker = if ordered { format!("{}. ", index) } else { "• ".to_string() };
                    index += 1;
                    flow.marker = Some(style.run(marker));
                }
                y += layout_block(c, x, y, width, style, flow);
            }
        }
    }
    y
}

fn contains_replaced(el: &Element) -> bool {
    el.children.iter().any(|c| match c {
        Node::Element(e) => e.tag == "img" || e.tag == "svg" || contains_replaced(e),
        Node::Text(_) => false,
    })
}

fn inline_style(el: &Element, parent: &TextStyle) -> TextStyle {
    let mut style = text_style(el, parent);
    if let Some(c) = el.style_value("background-color").or_else(|| el.style_value("background")).and_then(Rgba::parse) {
        style.highlight = Some(c);
    }
    style
}

fn layout_inline(el: &Element, parent: &TextStyle, flow: &mut Flow) {
    let style = inline_style(el, parent);
    match el.tag.as_str() {
        "br" => flow.inline.push(Inline::Break),
        "input" if el.attr("type") == Some("checkbox") => {
            let mark = if el.attrs.contains_key("checked") { "☑" } else { "☐" };
            flow.inline.push(style.word(mark.to_string()));
            flow.inline.push(Inline::Space);
        }
        _ => {
            for child in &el.children {
                match child {
                    Node::Text(t) => push_text(t, &style, flow),
                    Node::Element(c) if SKIPPED.contains(&c.tag.as_str()) => {}
                    Node::Element(c) => layout_inline(c, &style, flow),
                }
            }
        }
    }
}

/// Table rows become one line with cells separated by a bar
fn layout_row(tr: &Element, style: &TextStyle, flow: &mut Flow) {
    let mut first = true;
    for cell in tr.children.iter().filter_map(|n| match n {
        Node::Element(e) if e.tag == "td" || e.tag == "th" => Some(e),
        _ => None,
    }) {
        if !first {
            flow.inline.push(Inline::Space);
            flow.inline.push(style.word("│".to_string()));
            flow.inline.push(Inline::Space);
        }
        first = false;
        let mut cell_style = text_style(cell, style);
        cell_style.bold |= cell.tag == "th";
        for child in &cell.children {
            match child {
                Node::Text(t) => push_text(t, &cell_style, flow),
                Node::Element(c) => layout_inline(c, &cell_style, flow),
            }
        }
    }
}

fn push_text(text: &str, style: &TextStyle, flow: &mut Flow) {
    let mut word = String::new();
    let flush_word = |word: &mut String, flow: &mut Flow| {
        if !word.is_empty() {
            flow.inline.push(style.word(std::mem::take(word)));
        }
    };
    for c in text.chars() {
        if c.is_whitespace() {
            flush_word(&mut word, flow);
            if !matches!(flow.inline.last(), Some(Inline::Space) | None) {
                flow.inline.push(Inline::Space);
            }
        } else if is_wide(c) {
            // wide scripts break between any two characters
            flush_word(&mut word, flow);
            flow.inline.push(style.word(c.to_string()));
        } else {
            word.push(c);
        }
    }
    flush_word(&mut word, flow);
}

/// Break pending inline content into lines; returns the height used
fn flush_inline(x: f32, y: f32, width: f32, style: &TextStyle, flow: &mut Flow) -> f32 {
    let items = std::mem::take(&mut flow.inline);
    if items.iter().all(|i| matches!(i, Inline::Space)) {
        return 0.0;
    }
    let line_h = style.line_box();
    let mut lines: Vec<Vec<TextRun>> = vec![Vec::new()];
    // (line, x offset, width, color)
    let mut chips: Vec<(usize, f32, f32, Rgba)> = Vec::new();
    let mut line_w = 0.0f32;
    let mut pending_space = false;
    if let Some(marker) = flow.marker.take() {
        line_w += text_width(&marker.text, style.font_size, marker.mono);
        lines[0].push(marker);
    }
    for item in items {
        match item {
            Inline::Space => pending_space = true,
            Inline::Break => {
                lines.push(Vec::new());
                line_w = 0.0;
                pending_space = false;
            }
            Inline::Word(run, highlight) => {
                let space_w = if pending_space { text_width(" ", style.font_size, run.mono) } else { 0.0 };
                let word_w = text_width(&run.text, style.font_size, run.mono);
                let current = lines.last_mut().map(|l| !l.is_empty()).unwrap_or(false);
                let wraps = current && line_w + space_w + word_w > width;
                if wraps {
                    lines.push(Vec::new());
                    line_w = 0.0;
                } else if current && pending_space {
                    append(lines.last_mut(), &run, " ");
                    line_w += space_w;
                }
                let joined = current && !wraps;
                pending_space = false;
                if let Some(color) = highlight {
                    let line = lines.len() - 1;
                    match chips.last_mut() {
                        // extend across the gap to the previous highlighted word
                        Some(chip) if joined && chip.0 == line && chip.3 == color && chip.1 + chip.2 + space_w >= line_w - 0.01 => {
                            chip.2 = line_w + word_w - chip.1;
                        }
                        _ => chips.push((line, line_w, word_w, color)),
                    }
                }
                line_w += word_w;
                append(lines.last_mut(), &run, &run.text);
            }
        }
    }

    let mut top = y;
    for (i, runs) in lines.into_iter().enumerate() {
        let chip_h = style.font_size * 1.25;
        for &(_, offset, w, color) in chips.iter().filter(|c| c.0 == i) {
            flow.nodes.push(LayoutNode {
                rect: Rect { x: x + offset - 3.0, y: top + (line_h - chip_h) / 2.0, width: w + 6.0, height: chip_h },
                kind: LayoutKind::Background { fill: Fill::Solid(color), radius: 4.0 },
            });
        }
        if !runs.is_empty() {
            let baseline = top + (line_h - style.font_size) / 2.0 + style.font_size * 0.8;
            flow.nodes.push(LayoutNode {
                rect: Rect { x, y: top, width, height: line_h },
                kind: LayoutKind::TextLine { runs, font_size: style.font_size, baseline },
            });
        }
        top += line_h;
    }
    top - y
}

/// Extend the last run when the style matches, otherwise start a new run
fn append(line: Option<&mut Vec<TextRun>>, like: &TextRun, text: &str) {
    let Some(line) = line else { return };
    match line.last_mut() {
        Some(last)
            if last.color == like.color
                && last.bold == like.bold
                && last.italic == like.italic
                && last.mono == like.mono =>
        {
            last.text.push_str(text)
        }
        _ => line.push(TextRun { text: text.to_string(), ..like.clone() }),
    }
}

fn layout_preformatted(el: &Element, x: f32, y: f32, style: &TextStyle, flow: &mut Flow) -> f32 {
    let style = TextStyle { mono: true, ..style.clone() };
    let text = el.text_content();
    let text = text.strip_suffix('\n').unwrap_or(&text);
    let line_h = style.font_size * 1.5;
    let mut top = y;
    for line in text.split('\n') {
        if !line.is_empty() {
            let baseline = top + (line_h - style.font_size) / 2.0 + style.font_size * 0.8;
            flow.nodes.push(LayoutNode {
                rect: Rect { x, y: top, width: text_width(line, style.font_size, true), height: line_h },
                kind: LayoutKind::TextLine {
                    runs: vec![style.run(line.to_string())],
                    font_size: style.font_size,
                    baseline,
                },
            });
        }
        top += line_h;
    }
    top - y
}

/// Images and inline diagrams. Returns the height used, including a small
/// bottom gap.
fn layout_replaced(el: &Element, x: f32, y: f32, width: f32, flow: &mut Flow) -> f32 {
    let natural = match (el.tag.as_str(), el.attr("src").and_then(|src| flow.images.get(src))) {
        ("img", Some(ImageState::Ready { natural: Some((w, h)), .. })) if *w > 0 && *h > 0 => {
            Some((*w as f32, *h as f32))
        }
        _ => None,
    };
    let (w, h) = replaced_size(el, natural);
    let scale = if w > width { width / w } else { 1.0 };
    let rect = Rect { x, y, width: w * scale, height: h * scale };
    let kind = if el.tag == "img" {
        LayoutKind::Image { src: el.attr("src").unwrap_or_default().to_string() }
    } else {
        LayoutKind::Diagram { svg: el.clone() }
    };
    flow.nodes.push(LayoutNode { rect, kind });
    rect.height + 8.0
}

/// Natural size from `width`/`height` attributes, then the viewBox
pub fn intrinsic_size(el: &Element) -> (f32, f32) {
    replaced_size(el, None)
}

/// `natural` is the decoded image size; it provides both the fallback size
/// and the aspect ratio for a single given dimension
fn replaced_size(el: &Element, natural: Option<(f32, f32)>) -> (f32, f32) {
    let attr = |k: &str| el.attr(k).and_then(parse_px).or_else(|| el.style_value(k).and_then(parse_px));
    let view_box = natural.or_else(|| el.attr("viewBox").and_then(parse_view_box));
    let (default_w, default_h) = if el.tag == "img" { DEFAULT_IMAGE_SIZE } else { DEFAULT_SVG_SIZE };
    match (attr("width"), attr("height"), view_box) {
        (Some(w), Some(h), _) => (w, h),
        (Some(w), None, Some((vw, vh))) => (w, w * vh / vw),
        (None, Some(h), Some((vw, vh))) => (h * vw / vh, h),
        (None, None, Some(vb)) => vb,
        (Some(w), None, None) => (w, w * default_h / default_w),
        (None, Some(h), None) => (h * default_w / default_h, h),
        (None, None, None) => (default_w, default_h),
    }
}

pub fn parse_view_box(text: &str) -> Option<(f32, f32)> {
    let nums: Vec<f32> = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    match nums.as_slice() {
        [_, _, w, h] if *w > 0.0 && *h > 0.0 => Some((*w, *h)),
        _ => None,
    }
}

/// `12px`, `12` or `0`; percentages and other units are rejected
pub fn parse_px(text: &str) -> Option<f32> {
    let t = text.trim();
    let t = t.strip_suffix("px").unwrap_or(t).trim();
    t.parse::<f32>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

fn edges(el: &Element, prop: &str, default: Edges) -> Edges {
    let mut out = default;
    if let Some(short) = el.style_value(prop) {
        let v: Vec<f32> = short.split_whitespace().filter_map(parse_px).collect();
        out = match v.as_slice() {
            [a] => Edges::uniform(*a),
            [a, b] => Edges { top: *a, right: *b, bottom: *a, left: *b },
            [a, b, c] => Edges { top: *a, right: *b, bottom: *c, left: *b },
            [a, b, c, d] => Edges { top: *a, right: *b, bottom: *c, left: *d },
            _ => out,
        };
    }
    let side = |name: &str| el.style_value(&format!("{}-{}", prop, name)).and_then(parse_px);
    out.top = side("top").unwrap_or(out.top);
    out.right = side("right").unwrap_or(out.right);
    out.bottom = side("bottom").unwrap_or(out.bottom);
    out.left = side("left").unwrap_or(out.left);
    out
}

fn default_margin(el: &Element, style: &TextStyle) -> Edges {
    match el.tag.as_str() {
        "h1" => Edges::vertical(0.0, 16.0),
        "h2" => Edges::vertical(0.0, 12.0),
        "h3" | "h4" | "h5" | "h6" => Edges::vertical(0.0, 8.0),
        "p" => Edges::vertical(0.0, 12.0),
        "ul" | "ol" | "table" => Edges::vertical(0.0, 16.0),
        "li" => Edges::vertical(0.0, 4.0),
        "blockquote" | "hr" => Edges::vertical(16.0, 16.0),
        "pre" => Edges::vertical(style.font_size, style.font_size),
        _ => Edges::default(),
    }
}

fn default_padding(el: &Element) -> Edges {
    match el.tag.as_str() {
        "ul" | "ol" => Edges { left: 20.0, ..Default::default() },
        _ => Edges::default(),
    }
}

fn text_style(el: &Element, parent: &TextStyle) -> TextStyle {
    let mut s = parent.clone();
    match el.tag.as_str() {
        "h1" => {
            s.font_size = parent.font_size * 1.5;
            s.bold = true;
            s.line_height = 1.25;
        }
        "h2" => {
            s.font_size = parent.font_size * 1.25;
            s.bold = true;
            s.line_height = 1.25;
        }
        "h3" => {
            s.font_size = parent.font_size * 1.125;
            s.bold = true;
            s.line_height = 1.25;
        }
        "h4" | "h5" | "h6" | "strong" | "b" | "th" => s.bold = true,
        "em" | "i" => s.italic = true,
        "code" | "kbd" | "pre" => s.mono = true,
        _ => {}
    }
    if let Some(c) = el.style_value("color") {
        s.color = c.to_string();
    }
    if let Some(fs) = el.style_value("font-size").and_then(parse_px) {
        s.font_size = fs;
    }
    if let Some(lh) = el.style_value("line-height") {
        match lh.trim().strip_suffix("px") {
            Some(px) => {
                if let Ok(px) = px.trim().parse::<f32>() {
                    s.line_height = px / s.font_size.max(1.0);
                }
            }
            None => {
                if let Ok(mul) = lh.trim().parse::<f32>() {
                    s.line_height = mul;
                }
            }
        }
    }
    if let Some(w) = el.style_value("font-weight") {
        s.bold = w == "bold" || w.parse::<u32>().map(|n| n >= 600).unwrap_or(false);
    }
    if el.style_value("font-style") == Some("italic") {
        s.italic = true;
    }
    if el.style_value("font-family").map(|f| f.contains("mono")).unwrap_or(false) {
        s.mono = true;
    }
    s
}

/// Inline `background`/`background-color`, then preset classes
fn background(el: &Element) -> Option<Fill> {
    el.style_value("background")
        .or_else(|| el.style_value("background-color"))
        .and_then(Paint::from_css)
        .and_then(|p| p.fill())
        .or_else(|| el.attr("class").and_then(preset_fill))
}

/// `border-left: 4px solid #60a5fa`
fn border_left(el: &Element) -> Option<(f32, Fill)> {
    let decl = el.style_value("border-left")?;
    let mut width = None;
    let mut color = None;
    for part in decl.split_whitespace() {
        if let Some(px) = parse_px(part) {
            width = Some(px);
        } else if let Some(c) = Rgba::parse(part) {
            color = Some(c);
        }
    }
    Some((width?, Fill::Solid(color?)))
}

/// Estimated advance width of `text` in CSS pixels
pub fn text_width(text: &str, font_size: f32, mono: bool) -> f32 {
    text.chars()
        .map(|c| {
            if is_wide(c) {
                font_size
            } else if mono {
                font_size * 0.6
            } else {
                font_size * 0.55
            }
        })
        .sum()
}

/// CJK and other full-width characters
fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F | 0x2E80..=0xA4CF | 0xAC00..=0xD7A3 | 0xF900..=0xFAFF | 0xFE30..=0xFE4F | 0xFF00..=0xFF60 | 0xFFE0..=0xFFE6)
}

impl Rgba {
    /// Same color at 30% opacity
    fn faded(self) -> Rgba {
        Rgba { a: (self.a as f32 * 0.3).round() as u8, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::VisualTree;

    fn lines(result: &LayoutResult) -> Vec<String> {
        result
            .nodes
            .iter()
            .filter_map(|n| match &n.kind {
                LayoutKind::TextLine { runs, .. } => {
                    Some(runs.iter().map(|r| r.text.as_str()).collect::<String>())
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn layout_stacks_heading_and_paragraphs() {
        let tree = VisualTree::parse_html(
            "<div><h1>Heading</h1><p>Hello world</p><p>More text</p></div>",
        );
        let result = layout_tree(&tree.root, 200.0);
        assert_eq!(lines(&result), vec!["Heading", "Hello world", "More text"]);
        let ys: Vec<f32> = result.nodes.iter().map(|n| n.rect.y).collect();
        assert!(ys.windows(2).all(|w| w[0] < w[1]));
        assert!(result.height > 0.0);
    }

    #[test]
    fn long_paragraph_wraps_to_width() {
        let tree = VisualTree::parse_html(
            "<p>one two three four five six seven eight nine ten eleven twelve</p>",
        );
        let result = layout_tree(&tree.root, 120.0);
        let lines = lines(&result);
        assert!(lines.len() > 2, "{:?}", lines);
        for l in &lines {
            assert!(text_width(l, 16.0, false) <= 120.0 + 16.0, "{}", l);
        }
    }

    #[test]
    fn wide_characters_break_anywhere() {
        let tree = VisualTree::parse_html("<p>春江潮水连海平海上明月共潮生</p>");
        let result = layout_tree(&tree.root, 64.0);
        assert!(lines(&result).iter().all(|l| l.chars().count() <= 4));
    }

    #[test]
    fn list_items_get_markers() {
        let tree = VisualTree::parse_html("<div><ul><li>a</li><li>b</li></ul><ol start=\"3\"><li>c</li></ol></div>");
        let result = layout_tree(&tree.root, 300.0);
        assert_eq!(lines(&result), vec!["• a", "• b", "3. c"]);
    }

    #[test]
    fn background_box_covers_padded_content() {
        let tree = VisualTree::parse_html(
            r#"<div style="width: 400px; padding: 10px; background: #ff0000"><p>x</p></div>"#,
        );
        let result = layout_tree(&tree.root, 1000.0);
        assert_eq!(result.width, 400.0);
        match &result.nodes[0] {
            LayoutNode { rect, kind: LayoutKind::Background { fill: Fill::Solid(c), .. } } => {
                assert_eq!(c.hex(), "#ff0000");
                assert_eq!(rect.width, 400.0);
                assert_eq!(rect.height, result.height);
            }
            other => panic!("unexpected first node {:?}", other),
        }
    }

    #[test]
    fn replaced_content_scales_to_width() {
        let tree = VisualTree::parse_html(
            r#"<div><svg viewBox="0 0 800 400"></svg><img src="a.png" width="100" height="50"></div>"#,
        );
        let result = layout_tree(&tree.root, 400.0);
        let rects: Vec<Rect> = result.nodes.iter().map(|n| n.rect).collect();
        assert_eq!((rects[0].width, rects[0].height), (400.0, 200.0));
        assert_eq!((rects[1].width, rects[1].height), (100.0, 50.0));
    }

    #[test]
    fn inline_code_chip_sits_behind_its_words() {
        let tree = VisualTree::parse_html(
            r#"<p>run <code style="background-color: #374151">cargo doc</code> now</p>"#,
        );
        let result = layout_tree(&tree.root, 400.0);
        let chip = result.nodes.iter().position(|n| matches!(n.kind, LayoutKind::Background { .. })).unwrap();
        let text = result.nodes.iter().position(|n| matches!(n.kind, LayoutKind::TextLine { .. })).unwrap();
        assert!(chip < text);
        assert_eq!(result.nodes.iter().filter(|n| matches!(n.kind, LayoutKind::Background { .. })).count(), 1);
        let rect = result.nodes[chip].rect;
        let expected = text_width("cargo doc", 16.0, true) + 6.0;
        assert!((rect.width - expected).abs() < 0.01, "{:?}", rect);
        // the gap before a code word is measured in the code font
        let start = text_width("run", 16.0, false) + text_width(" ", 16.0, true);
        assert!((rect.x - (start - 3.0)).abs() < 0.01, "{:?}", rect);
    }

    #[test]
    fn loaded_image_uses_natural_size() {
        let tree = VisualTree::parse_html(r#"<div><img src="big.png"><img src="gone.png"></div>"#);
        let mut images = BTreeMap::new();
        images.insert("big.png".to_string(), ImageState::Ready { data_url: String::new(), natural: Some((800, 400)) });
        images.insert("gone.png".to_string(), ImageState::TimedOut);
        let result = layout_with_images(&tree.root, 400.0, &images);
        let rects: Vec<Rect> = result.nodes.iter().map(|n| n.rect).collect();
        assert_eq!((rects[0].width, rects[0].height), (400.0, 200.0));
        assert_eq!((rects[1].width, rects[1].height), DEFAULT_IMAGE_SIZE);
    }

    #[test]
    fn preformatted_keeps_lines() {
        let tree = VisualTree::parse_html("<pre><code>fn main() {\n    run();\n}\n</code></pre>");
        let result = layout_tree(&tree.root, 300.0);
        assert_eq!(lines(&result), vec!["fn main() {", "    run();", "}"]);
    }
}
