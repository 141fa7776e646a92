use futures::future::BoxFuture;
use markpic::export::RasterBackend;
use markpic::images::{ImageLoader, LoadedImage};
use markpic::rendering::paint::build_display_list;
use markpic::{Bitmap, Document, Error, ExportOptions, ExportPhase, Mode, PreviewElement, Rasterizer, Result, VisualTree};
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};

struct Offline;

impl ImageLoader for Offline {
    fn load<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<LoadedImage>> {
        Box::pin(async move { Err(Error::NetworkError(format!("offline: {}", url))) })
    }
}

/// Keeps the tree it was asked to rasterize, then delegates
struct Recording {
    seen: Arc<Mutex<Option<VisualTree>>>,
}

impl RasterBackend for Recording {
    fn rasterize(&self, tree: &VisualTree, width: u32, height: u32, pixel_ratio: f32, mode: Mode) -> Result<Bitmap> {
        *self.seen.lock().unwrap() = Some(tree.clone());
        markpic::export::SvgRasterBackend.rasterize(tree, width, height, pixel_ratio, mode)
    }
}

fn options() -> ExportOptions {
    ExportOptions { settle_delay_ms: 0, ..Default::default() }
}

fn pixel(bitmap: &Bitmap, x: u32, y: u32) -> [u8; 4] {
    let img = image::load_from_memory(&bitmap.png_bytes().unwrap()).unwrap().to_rgba8();
    img.get_pixel(x, y).0
}

fn close(actual: [u8; 4], hex: &str) -> bool {
    let c = markpic::style::Rgba::parse(hex).unwrap();
    let expected = [c.r, c.g, c.b];
    actual[3] == 255 && actual.iter().zip(expected).all(|(a, e)| (*a as i32 - e as i32).abs() <= 2)
}

const DIAGRAM: &str = r##"<div style="width: 200px"><svg width="200" height="100" viewBox="0 0 200 100">
<rect x="0" y="0" width="200" height="100" fill="#ECECFF" stroke="#9370DB"></rect>
<text x="6" y="16" fill="#333">A</text>
<path d="M10 90 L190 90" stroke="#333" fill="#333"></path>
</svg></div>"##;

#[tokio::test]
async fn scenario_a_output_is_twice_the_preview_size() {
    let doc = Document::new();
    let live = PreviewElement::new(
        VisualTree::parse_html(r#"<div style="width: 400px; padding: 20px; background: #3b82f6"><p>Hello</p></div>"#),
        400,
        300,
    );
    let mut phases = Vec::new();
    let bitmap = Rasterizer::new(&doc, Arc::new(Offline), options())
        .export_to_image(&live, Mode::Light, |p| phases.push(p))
        .await
        .expect("export");
    assert_eq!((bitmap.width, bitmap.height), (800, 600));
    assert!(bitmap.data_url.starts_with("data:image/png;base64,"));
    let img = image::load_from_memory(&bitmap.png_bytes().unwrap()).unwrap();
    assert_eq!((img.width(), img.height()), (800, 600));
    assert_eq!(phases.last(), Some(&ExportPhase::Done));
    assert_eq!(doc.offscreen_count(), 0);
}

#[tokio::test]
async fn scenario_b_dark_mode_recolors_diagram() {
    let doc = Document::new();
    let live = PreviewElement::new(VisualTree::parse_html(DIAGRAM), 200, 100);
    let seen = Arc::new(Mutex::new(None));
    let bitmap = Rasterizer::new(&doc, Arc::new(Offline), options())
        .with_backend(Box::new(Recording { seen: seen.clone() }))
        .export_to_image(&live, Mode::Dark, |_| {})
        .await
        .expect("export");

    let tree = seen.lock().unwrap().take().expect("backend ran");
    let list = build_display_list(&tree, 200.0, "#f9fafb");
    let markup: Vec<&str> = list.svg_markup().collect();
    assert_eq!(markup.len(), 1);
    let svg = markup[0];
    assert!(svg.contains(r##"fill="#374151""##), "{}", svg);
    assert!(svg.contains(r##"stroke="#6b7280""##), "{}", svg);
    assert!(svg.contains(r##"fill="#f9fafb""##), "{}", svg);
    assert!(svg.contains(r#"fill="none""#), "{}", svg);
    assert!(!svg.contains("#ECECFF") && !svg.contains("#333"), "{}", svg);

    // interior of the node rectangle, clear of label and edge
    assert!(close(pixel(&bitmap, 300, 100), "#374151"), "{:?}", pixel(&bitmap, 300, 100));

    // the live diagram keeps its original colors
    assert!(live.tree.root.to_markup().contains("#ECECFF"));
}

const LABELED: &str = r##"<div style="width: 200px"><svg width="200" height="100" viewBox="0 0 200 100">
<rect x="0" y="0" width="200" height="100" fill="#ECECFF" stroke="#9370DB"></rect>
<text x="60" y="88" font-size="88" font-weight="bold" fill="#333">W</text>
</svg></div>"##;

#[tokio::test]
async fn scenario_b_dark_mode_label_pixels_use_dark_text_color() {
    if !markpic::rendering::raster::fonts_available() {
        return;
    }
    let doc = Document::new();
    let live = PreviewElement::new(VisualTree::parse_html(LABELED), 200, 100);
    let bitmap = Rasterizer::new(&doc, Arc::new(Offline), options())
        .export_to_image(&live, Mode::Dark, |_| {})
        .await
        .expect("export");
    let img = image::load_from_memory(&bitmap.png_bytes().unwrap()).unwrap().to_rgba8();
    // glyph box of the label at 2x
    let mut lit = 0;
    for y in 20..180 {
        for x in 110..340 {
            if close(img.get_pixel(x, y).0, "#f9fafb") {
                lit += 1;
            }
        }
    }
    assert!(lit > 200, "only {} label pixels in the dark text color", lit);
    assert!(close(pixel(&bitmap, 20, 20), "#374151"), "{:?}", pixel(&bitmap, 20, 20));
}

#[tokio::test]
async fn light_mode_uses_light_diagram_colors() {
    let doc = Document::new();
    let live = PreviewElement::new(VisualTree::parse_html(DIAGRAM), 200, 100);
    let bitmap = Rasterizer::new(&doc, Arc::new(Offline), options())
        .export_to_image(&live, Mode::Light, |_| {})
        .await
        .expect("export");
    assert!(close(pixel(&bitmap, 300, 100), "#f3f4f6"), "{:?}", pixel(&bitmap, 300, 100));
}

#[tokio::test]
async fn repeated_exports_are_byte_identical() {
    let doc = Document::new();
    let live = PreviewElement::new(VisualTree::parse_html(DIAGRAM), 200, 100);
    let rasterizer = Rasterizer::new(&doc, Arc::new(Offline), options());
    let mut digests = Vec::new();
    for _ in 0..2 {
        let bitmap = rasterizer.export_to_image(&live, Mode::Dark, |_| {}).await.unwrap();
        digests.push(hex::encode(Sha256::digest(bitmap.png_bytes().unwrap())));
    }
    assert_eq!(digests[0], digests[1]);
}

#[tokio::test]
async fn concurrent_exports_use_separate_containers() {
    let doc = Document::new();
    let live = PreviewElement::new(VisualTree::parse_html(DIAGRAM), 200, 100);
    let opts = ExportOptions { settle_delay_ms: 50, ..Default::default() };
    let a = Rasterizer::new(&doc, Arc::new(Offline), opts.clone());
    let b = Rasterizer::new(&doc, Arc::new(Offline), opts);
    let (ra, rb) = tokio::join!(
        a.export_to_image(&live, Mode::Light, |_| {}),
        b.export_to_image(&live, Mode::Dark, |_| {})
    );
    assert!(ra.is_ok() && rb.is_ok());
    assert_ne!(ra.unwrap().data_url, rb.unwrap().data_url);
    assert_eq!(doc.offscreen_count(), 0);
}

#[tokio::test]
async fn markdown_card_exports_at_measured_size() {
    let doc = Document::new();
    let live = PreviewElement::from_markdown(
        "# Weekly notes\n\n- ship it\n- **test** it\n\n```rust\nfn main() {}\n```",
        &markpic::StyleConfig::default(),
        Mode::Dark,
    )
    .unwrap();
    let bitmap = Rasterizer::new(&doc, Arc::new(Offline), options())
        .export_to_image(&live, Mode::Dark, |_| {})
        .await
        .unwrap();
    assert_eq!(bitmap.width, live.width * 2);
    assert_eq!(bitmap.height, live.height * 2);
}
