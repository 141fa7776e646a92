//! Live preview construction.
//!
//! Markdown is rendered to HTML with `pulldown-cmark` (GFM tables,
//! strikethrough, task lists, every newline a hard break), fenced diagram
//! blocks are replaced by their rendered SVG, and the result is wrapped in
//! the styled card and parsed into a [`VisualTree`]. The element's size is
//! measured with the same layout pass the rasterizer uses.

use crate::rendering::layout::layout_tree;
use crate::style::{resolve, Paint, ResolvedStyle, StyleConfig};
use crate::tree::{escape, Element, Node, VisualTree};
use crate::{Error, Mode, Result};
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};

/// Padding of the outer card around the text panel
pub const CARD_PADDING: u32 = 32;
/// Background of fenced code panels
pub const CODE_BACKGROUND: &str = "#1e293b";
const CODE_TEXT: &str = "#abb2bf";

/// Renders the source of a fenced diagram block to SVG markup
pub trait DiagramRenderer: Send + Sync {
    /// Whether fences tagged `language` belong to this renderer
    fn handles(&self, language: &str) -> bool;

    fn render(&self, language: &str, source: &str, mode: Mode) -> Result<String>;
}

/// Accepts ```` ```svg ```` fences verbatim
pub struct InlineSvgRenderer;

impl DiagramRenderer for InlineSvgRenderer {
    fn handles(&self, language: &str) -> bool {
        language == "svg"
    }

    fn render(&self, _language: &str, source: &str, _mode: Mode) -> Result<String> {
        let trimmed = source.trim();
        if !trimmed.starts_with("<svg") {
            return Err(Error::RenderError("svg block does not start with <svg>".to_string()));
        }
        Ok(trimmed.to_string())
    }
}

/// Claims diagram languages that have no renderer and reports a failure, so
/// the block shows up as an inline error instead of plain code
pub struct UnsupportedDiagrams;

const DIAGRAM_LANGUAGES: &[&str] = &["mermaid", "flow", "sequence"];

impl DiagramRenderer for UnsupportedDiagrams {
    fn handles(&self, language: &str) -> bool {
        DIAGRAM_LANGUAGES.contains(&language)
    }

    fn render(&self, language: &str, _source: &str, _mode: Mode) -> Result<String> {
        Err(Error::RenderError(format!("no renderer available for {} diagrams", language)))
    }
}

/// The live preview: a rendered tree and its size in CSS pixels
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewElement {
    pub tree: VisualTree,
    pub width: u32,
    pub height: u32,
}

impl PreviewElement {
    pub fn new(tree: VisualTree, width: u32, height: u32) -> Self {
        Self { tree, width, height }
    }

    /// Wrap `tree` and measure it at `width`
    pub fn measured(tree: VisualTree, width: u32) -> Self {
        let layout = layout_tree(&tree.root, width as f32);
        let width = layout.width.ceil() as u32;
        let height = layout.height.ceil() as u32;
        Self { tree, width, height }
    }

    /// Build with the default diagram renderers
    pub fn from_markdown(markdown: &str, config: &StyleConfig, mode: Mode) -> Result<Self> {
        PreviewBuilder::default().build(markdown, config, mode)
    }
}

pub struct PreviewBuilder {
    renderers: Vec<Box<dyn DiagramRenderer>>,
}

impl Default for PreviewBuilder {
    fn default() -> Self {
        Self {
            renderers: vec![Box::new(InlineSvgRenderer), Box::new(UnsupportedDiagrams)],
        }
    }
}

impl PreviewBuilder {
    /// Builder without any diagram renderers; diagram fences stay code
    pub fn empty() -> Self {
        Self { renderers: Vec::new() }
    }

    /// Register a renderer ahead of the existing ones
    pub fn with_renderer(mut self, renderer: Box<dyn DiagramRenderer>) -> Self {
        self.renderers.insert(0, renderer);
        self
    }

    pub fn build(&self, markdown: &str, config: &StyleConfig, mode: Mode) -> Result<PreviewElement> {
        let style = resolve(config, mode);
        let body = self.markdown_to_html(markdown, mode);
        let html = card_html(&body, &style);
        let mut tree = VisualTree::parse_html(&html);
        apply_content_styles(&mut tree.root, &style, mode);
        let total_width = style.metrics.width + 2 * style.metrics.margin + 2 * CARD_PADDING;
        let preview = PreviewElement::measured(tree, total_width);
        if preview.height == 0 {
            return Err(Error::RenderError("preview has no content".to_string()));
        }
        log::debug!("preview measured at {}x{}", preview.width, preview.height);
        Ok(preview)
    }

    fn markdown_to_html(&self, markdown: &str, mode: Mode) -> String {
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
        let toc = table_of_contents(markdown);
        let mut events: Vec<Event<'_>> = Vec::new();
        let mut fence: Option<(String, String)> = None;
        let mut paragraph: Vec<Event<'_>> = Vec::new();
        let mut in_paragraph = false;

        for event in Parser::new_ext(markdown, options) {
            if let Some((language, source)) = fence.as_mut() {
                match event {
                    Event::Text(t) => source.push_str(&t),
                    Event::End(TagEnd::CodeBlock) => {
                        let block = self.render_diagram(language, source, mode);
                        events.push(Event::Html(CowStr::from(block)));
                        fence = None;
                    }
                    _ => {}
                }
                continue;
            }
            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(ref info))) => {
                    let language = info.split_whitespace().next().unwrap_or_default().to_string();
                    if self.renderers.iter().any(|r| r.handles(&language)) {
                        fence = Some((language, String::new()));
                    } else {
                        events.push(event);
                    }
                }
                Event::SoftBreak => {
                    let target = if in_paragraph { &mut paragraph } else { &mut events };
                    target.push(Event::HardBreak);
                }
                Event::Start(Tag::Paragraph) => {
                    in_paragraph = true;
                    paragraph.push(event);
                }
                Event::End(TagEnd::Paragraph) => {
                    in_paragraph = false;
                    paragraph.push(event);
                    if is_toc_marker(&paragraph) {
                        events.push(Event::Html(CowStr::from(toc.clone())));
                        paragraph.clear();
                    } else {
                        events.append(&mut paragraph);
                    }
                }
                other if in_paragraph => paragraph.push(other),
                other => events.push(other),
            }
        }

        let mut out = String::new();
        html::push_html(&mut out, events.into_iter());
        out
    }

    fn render_diagram(&self, language: &str, source: &str, mode: Mode) -> String {
        let renderer = self.renderers.iter().find(|r| r.handles(language));
        let result = match renderer {
            Some(r) => r.render(language, source.trim_end_matches('\n'), mode),
            None => Err(Error::RenderError(format!("no renderer for {}", language))),
        };
        match result {
            Ok(svg) => format!("<div class=\"diagram\">{}</div>\n", svg),
            Err(e) => {
                log::warn!("{} diagram failed to render: {}", language, e);
                error_block(&e.to_string(), source, mode)
            }
        }
    }
}

/// Inline error block: title, message and the raw diagram source
fn error_block(message: &str, source: &str, mode: Mode) -> String {
    let (bg, fg, pre_bg) = if mode.is_dark() {
        ("rgba(127, 29, 29, 0.2)", "#f87171", "#1f2937")
    } else {
        ("#fef2f2", "#dc2626", "#f3f4f6")
    };
    format!(
        "<div class=\"diagram-error\" style=\"margin: 16px 0; padding: 16px; border-radius: 4px; background: {bg}; color: {fg}\">\
<p style=\"font-weight: bold\">Diagram render error</p>\
<p style=\"font-size: 14px\">{msg}</p>\
<pre style=\"margin: 8px 0 0 0; padding: 8px; border-radius: 4px; font-size: 12px; background: {pre_bg}\">{src}</pre></div>\n",
        bg = bg,
        fg = fg,
        pre_bg = pre_bg,
        msg = escape(message),
        src = escape(source.trim_end_matches('\n')),
    )
}

/// A paragraph consisting only of `[toc]`
fn is_toc_marker(paragraph: &[Event<'_>]) -> bool {
    let mut text = String::new();
    for event in paragraph {
        match event {
            Event::Start(Tag::Paragraph) | Event::End(TagEnd::Paragraph) => {}
            Event::Text(t) => text.push_str(t),
            _ => return false,
        }
    }
    text.trim().eq_ignore_ascii_case("[toc]")
}

/// Contents list of `#`..`###` headings, indented by level
fn table_of_contents(markdown: &str) -> String {
    let mut items = String::new();
    for line in markdown.lines().filter(|l| l.starts_with('#')) {
        let level = line.chars().take_while(|c| *c == '#').count();
        if level > 3 {
            continue;
        }
        let title = line[level..].trim();
        items.push_str(&format!(
            "<li style=\"margin-left: {}px\">{}</li>",
            (level - 1) * 16,
            escape(title)
        ));
    }
    format!(
        "<div class=\"toc\" style=\"margin: 0 0 24px 0; padding: 16px; border-radius: 8px\">\
<h3>Contents</h3><ul>{}</ul></div>\n",
        items
    )
}

/// Outer gradient card and inner text panel around the rendered body
fn card_html(body: &str, style: &ResolvedStyle) -> String {
    let m = &style.metrics;
    let outer_width = m.width + 2 * m.margin + 2 * CARD_PADDING;
    let mut outer_style = format!(
        "width: {}px; padding: {}px; border-radius: 12px",
        outer_width, CARD_PADDING
    );
    let mut class = String::new();
    match &style.background {
        Paint::Preset(token) => class = token.clone(),
        other => {
            if let Some(css) = other.to_css() {
                outer_style.push_str(&format!("; background: {}", css));
            }
        }
    }

    let mut panel_style = format!(
        "width: {}px; padding: {}px; margin: {}px; font-size: {}px; line-height: {}; color: {}; border-radius: 8px",
        m.width, m.padding, m.margin, m.font_size, m.line_height, style.text_color
    );
    let mut panel_class = String::new();
    match &style.text_background {
        Paint::Preset(token) => panel_class = token.clone(),
        other => {
            if let Some(css) = other.to_css() {
                panel_style.push_str(&format!("; background: {}", css));
            }
        }
    }

    format!(
        "<div class=\"{}\" style=\"{}\"><div class=\"{}\" style=\"{}\">{}</div></div>",
        escape(&class),
        outer_style,
        escape(&panel_class),
        panel_style,
        body
    )
}

/// Mode-dependent styling the HTML renderer cannot express
fn apply_content_styles(root: &mut Element, style: &ResolvedStyle, mode: Mode) {
    let (quote_border, quote_bg) = if mode.is_dark() {
        ("#93c5fd", "rgba(30, 58, 138, 0.3)")
    } else {
        ("#60a5fa", "rgba(239, 246, 255, 0.8)")
    };
    let toc_bg = if mode.is_dark() { "#1f2937" } else { "#f9fafb" };
    let text_color = style.text_color;
    root.visit_mut(&mut |el| match el.tag.clone().as_str() {
        "pre" if el.style_value("background").is_none() => {
            el.set_style("background", CODE_BACKGROUND);
            el.set_style("padding", "16px");
            el.set_style("border-radius", "6px");
            el.set_style("color", CODE_TEXT);
            el.set_style("font-size", &format!("{}px", (style.metrics.font_size as f32 * 0.875).round()));
        }
        "blockquote" => {
            el.set_style("border-left", &format!("4px solid {}", quote_border));
            el.set_style("background", quote_bg);
            el.set_style("padding", "8px 8px 8px 16px");
            el.set_style("border-radius", "0 4px 4px 0");
        }
        "hr" => el.set_style("color", text_color),
        "div" if el.has_class("toc") => el.set_style("background", toc_bg),
        _ => {}
    });
    style_inline_code(root, style, mode);
}

/// Chip styling for `code` outside of `pre`
fn style_inline_code(el: &mut Element, style: &ResolvedStyle, mode: Mode) {
    let (bg, fg) = if mode.is_dark() { ("#374151", "#e5e7eb") } else { ("#1f2937", "#f3f4f6") };
    for child in &mut el.children {
        let Node::Element(c) = child else { continue };
        match c.tag.as_str() {
            "pre" => {}
            "code" => {
                c.set_style("background-color", bg);
                c.set_style("color", fg);
                c.set_style("padding", "2px 6px");
                c.set_style("border-radius", "4px");
                c.set_style("font-size", &format!("{}px", (style.metrics.font_size as f32 * 0.875).round()));
            }
            _ => style_inline_code(c, style, mode),
        }
    }
}
