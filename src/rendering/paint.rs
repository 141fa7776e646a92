/// Display list construction.
///
/// Turns a layout into ordered paint commands. Images are resolved against the
/// tree's resource table; diagrams are serialized back to standalone SVG
/// markup with their text fill pinned to the theme color.

use crate::rendering::layout::{layout_with_images, LayoutKind, Rect, TextRun};
use crate::style::Fill;
use crate::tree::{Element, ImageState, Node, VisualTree};

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    FillRect {
        rect: Rect,
        fill: Fill,
        radius: f32,
    },
    Text {
        x: f32,
        baseline: f32,
        font_size: f32,
        runs: Vec<TextRun>,
    },
    Image {
        rect: Rect,
        data_url: String,
    },
    /// Placeholder for an image that failed or timed out
    BrokenImage {
        rect: Rect,
    },
    Svg {
        rect: Rect,
        markup: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayList {
    pub width: f32,
    pub height: f32,
    pub commands: Vec<PaintCommand>,
}

impl DisplayList {
    /// All serialized diagram markup, in paint order
    pub fn svg_markup(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            PaintCommand::Svg { markup, .. } => Some(markup.as_str()),
            _ => None,
        })
    }

    pub fn broken_images(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, PaintCommand::BrokenImage { .. }))
            .count()
    }
}

const SVG_TEXT_TAGS: &[&str] = &["text", "tspan", "textPath"];

/// Lay out `tree` at `width` and build its display list. `text_fill` is
/// forced onto every diagram text element.
pub fn build_display_list(tree: &VisualTree, width: f32, text_fill: &str) -> DisplayList {
    let layout = layout_with_images(&tree.root, width, &tree.resources);
    let commands = layout
        .nodes
        .into_iter()
        .map(|node| match node.kind {
            LayoutKind::Background { fill, radius } => PaintCommand::FillRect { rect: node.rect, fill, radius },
            LayoutKind::TextLine { runs, font_size, baseline } => PaintCommand::Text {
                x: node.rect.x,
                baseline,
                font_size,
                runs,
            },
            LayoutKind::Image { src } => match image_source(tree, &src) {
                Some(data_url) => PaintCommand::Image { rect: node.rect, data_url },
                None => PaintCommand::BrokenImage { rect: node.rect },
            },
            LayoutKind::Diagram { svg } => PaintCommand::Svg {
                rect: node.rect,
                markup: svg_markup(&svg, text_fill),
            },
        })
        .collect();
    DisplayList { width: layout.width, height: layout.height, commands }
}

fn image_source(tree: &VisualTree, src: &str) -> Option<String> {
    match tree.image_state(src) {
        Some(ImageState::Ready { data_url, .. }) => Some(data_url.clone()),
        Some(_) => None,
        // never prepared; only inline data can still be drawn
        None if src.starts_with("data:") => Some(src.to_string()),
        None => None,
    }
}

/// Standalone SVG document for an inline `svg` element
pub fn svg_markup(svg: &Element, text_fill: &str) -> String {
    let mut svg = svg.clone();
    replace_foreign_objects(&mut svg, text_fill);
    if svg.attr("viewBox").is_none() {
        let (w, h) = crate::rendering::layout::intrinsic_size(&svg);
        svg.set_attr("viewBox", &format!("0 0 {} {}", w, h));
    }
    let mut out = String::new();
    let mut root = true;
    svg.write_markup(&mut out, &mut |el| {
        if root {
            el.attrs.insert("xmlns".to_string(), "http://www.w3.org/2000/svg".to_string());
            // the outer document sizes the diagram
            el.attrs.remove("width");
            el.attrs.remove("height");
            el.style.remove("width");
            el.style.remove("height");
            root = false;
        }
        if SVG_TEXT_TAGS.contains(&el.tag.as_str()) {
            el.attrs.insert("fill".to_string(), text_fill.to_string());
            el.style.insert("fill".to_string(), text_fill.to_string());
        }
    });
    out
}

/// HTML labels inside `foreignObject` cannot be drawn by a pure SVG renderer;
/// swap each one for a centered `text` carrying the label's text content.
fn replace_foreign_objects(el: &mut Element, text_fill: &str) {
    for child in &mut el.children {
        if let Node::Element(c) = child {
            if c.tag == "foreignObject" {
                *child = Node::Element(foreign_object_label(c, text_fill));
            } else {
                replace_foreign_objects(c, text_fill);
            }
        }
    }
}

fn foreign_object_label(fo: &Element, text_fill: &str) -> Element {
    let num = |k: &str| fo.attr(k).and_then(|v| v.trim().parse::<f32>().ok()).unwrap_or(0.0);
    let cx = num("x") + num("width") / 2.0;
    let cy = num("y") + num("height") / 2.0;
    let label = fo.text_content().split_whitespace().collect::<Vec<_>>().join(" ");
    Element::new("text")
        .with_attr("x", &format!("{}", cx))
        .with_attr("y", &format!("{}", cy))
        .with_attr("text-anchor", "middle")
        .with_attr("dominant-baseline", "central")
        .with_attr("font-size", "16")
        .with_attr("fill", text_fill)
        .with_child(Node::Text(label))
}
