//! Diagram color normalization.
//!
//! Diagram renderers bake their own theme into the SVG they emit. An export
//! must match the app's current mode instead, so every vector subtree in the
//! detached tree is recolored after the fact. Colors are written both as
//! presentation attributes and as inline style because renderers differ in
//! which of the two wins.

use crate::tree::{Element, VisualTree};
use crate::Mode;

/// Colors applied to diagram output for one mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeColors {
    pub text: &'static str,
    pub background: &'static str,
    pub stroke: &'static str,
}

/// Immutable light/dark lookup
#[derive(Debug)]
pub struct ThemeColorTable {
    pub light: ThemeColors,
    pub dark: ThemeColors,
}

impl ThemeColorTable {
    pub fn get(&self, mode: Mode) -> &ThemeColors {
        match mode {
            Mode::Light => &self.light,
            Mode::Dark => &self.dark,
        }
    }
}

pub static THEME_COLORS: ThemeColorTable = ThemeColorTable {
    light: ThemeColors {
        text: "#111827",
        background: "#f3f4f6",
        stroke: "#9ca3af",
    },
    dark: ThemeColors {
        text: "#f9fafb",
        background: "#374151",
        stroke: "#6b7280",
    },
};

const TEXT_TAGS: &[&str] = &["text", "tspan", "textPath"];
const SHAPE_TAGS: &[&str] = &["rect", "circle", "ellipse", "polygon"];

/// Recolor every `svg` subtree of `tree` in place.
///
/// Only ever call this on a detached copy. Running it twice yields the same
/// state as running it once.
pub fn normalize(tree: &mut VisualTree, colors: &ThemeColors) {
    let mut count = 0usize;
    tree.root.visit_mut(&mut |el| {
        if el.tag == "svg" {
            normalize_svg(el, colors);
            count += 1;
        }
    });
    if count > 0 {
        log::debug!("normalized {} diagram subtree(s)", count);
    }
}

fn normalize_svg(svg: &mut Element, colors: &ThemeColors) {
    svg.set_style("color", colors.text);
    svg.visit_descendants_mut(&mut |el| recolor(el, colors));
}

fn recolor(el: &mut Element, colors: &ThemeColors) {
    let has_text = el.has_visible_text();

    if TEXT_TAGS.contains(&el.tag.as_str()) || el.has_class("label") {
        paint_text(el, colors.text);
        el.set_attr("color", colors.text);
    }

    // catch-all: renderers disagree on which element carries label text
    if has_text {
        paint_text(el, colors.text);
    }

    // a shape that also contains text counts as text
    if SHAPE_TAGS.contains(&el.tag.as_str()) && !has_text {
        set_paint(el, "fill", colors.background);
        set_paint(el, "stroke", colors.stroke);
    }

    // edges never take a fill
    if el.tag == "path" {
        set_paint(el, "stroke", colors.stroke);
        set_paint(el, "fill", "none");
    }
}

fn paint_text(el: &mut Element, color: &str) {
    el.set_style("fill", color);
    el.set_style("color", color);
    el.set_attr("fill", color);
}

fn set_paint(el: &mut Element, prop: &str, value: &str) {
    el.set_style(prop, value);
    el.set_attr(prop, value);
}
