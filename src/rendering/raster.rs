/// SVG composition and rasterization.
///
/// A display list is written out as one standalone SVG document in CSS
/// pixels, parsed with `usvg` and rendered by `resvg` into a pixmap scaled by
/// the pixel ratio.

use crate::rendering::layout::Rect;
use crate::rendering::paint::{DisplayList, PaintCommand};
use crate::style::{Fill, Rgba};
use crate::tree::escape;
use crate::{Error, Result};
use base64::Engine as _;
use std::fmt::Write as _;
use std::sync::{Arc, LazyLock};

/// System fonts are loaded once per process
static FONTDB: LazyLock<Arc<usvg::fontdb::Database>> = LazyLock::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    log::debug!("loaded {} font faces", db.len());
    Arc::new(db)
});

const SANS: &str = "Arial, Helvetica, sans-serif";
const MONO: &str = "Courier New, monospace";

/// Broken-image placeholder colors
pub const BROKEN_IMAGE_FILL: &str = "#f3f4f6";
pub const BROKEN_IMAGE_STROKE: &str = "#9ca3af";

/// Compose the display list into an SVG document of `width` x `height` CSS
/// pixels.
pub fn compose_svg(list: &DisplayList, width: u32, height: u32) -> String {
    let mut defs = String::new();
    let mut body = String::new();
    let mut gradients = 0usize;

    for cmd in &list.commands {
        match cmd {
            PaintCommand::FillRect { rect, fill, radius } => {
                let paint = match fill {
                    Fill::Solid(c) => solid_paint(*c),
                    Fill::Linear { angle_deg, from, to } => {
                        let id = format!("g{}", gradients);
                        gradients += 1;
                        write_gradient(&mut defs, &id, *angle_deg, *from, *to);
                        format!("fill=\"url(#{})\"", id)
                    }
                };
                let _ = writeln!(
                    body,
                    "<rect {} rx=\"{}\" {}/>",
                    rect_attrs(rect),
                    radius,
                    paint
                );
            }
            PaintCommand::Text { x, baseline, font_size, runs } => {
                let _ = write!(
                    body,
                    "<text x=\"{}\" y=\"{}\" font-size=\"{}\" font-family=\"{}\" xml:space=\"preserve\">",
                    x, baseline, font_size, SANS
                );
                for run in runs {
                    let c = Rgba::parse(&run.color).unwrap_or(Rgba::rgb(0, 0, 0));
                    let _ = write!(body, "<tspan {}", solid_paint(c));
                    if run.bold {
                        body.push_str(" font-weight=\"bold\"");
                    }
                    if run.italic {
                        body.push_str(" font-style=\"italic\"");
                    }
                    if run.mono {
                        let _ = write!(body, " font-family=\"{}\"", MONO);
                    }
                    let _ = write!(body, ">{}</tspan>", escape(&run.text));
                }
                body.push_str("</text>\n");
            }
            PaintCommand::Image { rect, data_url } => {
                let _ = writeln!(
                    body,
                    "<image {} preserveAspectRatio=\"none\" href=\"{}\"/>",
                    rect_attrs(rect),
                    escape(data_url)
                );
            }
            PaintCommand::BrokenImage { rect } => write_broken_image(&mut body, rect),
            PaintCommand::Svg { rect, markup } => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(markup);
                let _ = writeln!(
                    body,
                    "<image {} href=\"data:image/svg+xml;base64,{}\"/>",
                    rect_attrs(rect),
                    encoded
                );
            }
        }
    }

    let mut out = String::with_capacity(defs.len() + body.len() + 256);
    let _ = writeln!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
        w = width,
        h = height
    );
    if !defs.is_empty() {
        let _ = writeln!(out, "<defs>\n{}</defs>", defs);
    }
    out.push_str(&body);
    out.push_str("</svg>\n");
    out
}

/// Whether any system font was found; without one, text renders as nothing
pub fn fonts_available() -> bool {
    !FONTDB.is_empty()
}

/// Render `svg` (sized in CSS pixels) to PNG at `pixel_ratio`.
///
/// The pixmap is exactly `round(width * ratio)` x `round(height * ratio)`.
pub fn rasterize_svg(svg: &str, width: u32, height: u32, pixel_ratio: f32) -> Result<Vec<u8>> {
    let opts = usvg::Options {
        fontdb: FONTDB.clone(),
        font_family: "Arial".to_string(),
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(svg, &opts)
        .map_err(|e| Error::RenderError(format!("Failed to parse composed SVG: {}", e)))?;

    let px_w = (width as f32 * pixel_ratio).round() as u32;
    let px_h = (height as f32 * pixel_ratio).round() as u32;
    let mut pixmap = tiny_skia::Pixmap::new(px_w, px_h).ok_or_else(|| {
        Error::RenderError(format!("Failed to allocate {}x{} pixmap", px_w, px_h))
    })?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(pixel_ratio, pixel_ratio),
        &mut pixmap.as_mut(),
    );
    pixmap
        .encode_png()
        .map_err(|e| Error::RenderError(format!("Failed to encode PNG: {}", e)))
}

fn rect_attrs(r: &Rect) -> String {
    format!("x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\"", r.x, r.y, r.width, r.height)
}

fn solid_paint(c: Rgba) -> String {
    if c.a == 255 {
        format!("fill=\"{}\"", c.hex())
    } else {
        format!("fill=\"{}\" fill-opacity=\"{}\"", c.hex(), c.opacity())
    }
}

fn stop(c: Rgba, offset: u32) -> String {
    format!(
        "<stop offset=\"{}\" stop-color=\"{}\" stop-opacity=\"{}\"/>",
        offset,
        c.hex(),
        c.opacity()
    )
}

/// CSS angles run clockwise from "to top"; map onto bounding-box endpoints
fn write_gradient(defs: &mut String, id: &str, angle_deg: f32, from: Rgba, to: Rgba) {
    let rad = angle_deg.to_radians();
    let (mut dx, mut dy) = (rad.sin(), -rad.cos());
    let scale = dx.abs().max(dy.abs());
    if scale > 0.0 {
        dx /= scale;
        dy /= scale;
    }
    let _ = writeln!(
        defs,
        "<linearGradient id=\"{}\" x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\">{}{}</linearGradient>",
        id,
        (1.0 - dx) / 2.0,
        (1.0 - dy) / 2.0,
        (1.0 + dx) / 2.0,
        (1.0 + dy) / 2.0,
        stop(from, 0),
        stop(to, 1)
    );
}

fn write_broken_image(body: &mut String, r: &Rect) {
    let _ = writeln!(
        body,
        "<rect {} fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
        rect_attrs(r),
        BROKEN_IMAGE_FILL,
        BROKEN_IMAGE_STROKE
    );
    if r.width < 24.0 || r.height < 24.0 {
        return;
    }
    // torn-picture icon in the top-left corner
    let (x, y) = (r.x + 6.0, r.y + 6.0);
    let _ = writeln!(
        body,
        "<path d=\"M{x} {b} L{m1} {t1} L{m2} {t2} L{m3} {t3} L{r} {b} Z\" fill=\"{c}\"/>",
        x = x,
        b = y + 12.0,
        m1 = x + 4.0,
        t1 = y + 5.0,
        m2 = x + 7.0,
        t2 = y + 9.0,
        m3 = x + 9.0,
        t3 = y + 7.0,
        r = x + 12.0,
        c = BROKEN_IMAGE_STROKE
    );
}
