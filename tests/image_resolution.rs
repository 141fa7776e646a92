use markpic::images::{self, HttpImageLoader, ImageOptions};
use markpic::tree::ImageState;
use markpic::{Bitmap, Document, ExportOptions, Mode, PreviewElement, Rasterizer, VisualTree};
use std::sync::{Arc, Mutex, Once};
use std::time::{Duration, Instant};
use tiny_http::{Header, Response, Server};
use url::Url;

static INIT: Once = Once::new();
static ADDR: Mutex<String> = Mutex::new(String::new());
/// Request URLs seen by the test server
static SEEN: Mutex<Vec<String>> = Mutex::new(Vec::new());

fn png(r: u8, g: u8, b: u8) -> Vec<u8> {
    let mut pixmap = tiny_skia::Pixmap::new(4, 4).unwrap();
    pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, 255));
    pixmap.encode_png().unwrap()
}

fn respond(request: tiny_http::Request) {
    let path = request.url().to_string();
    SEEN.lock().unwrap().push(path.clone());
    let content_type = "Content-Type: image/png".parse::<Header>().unwrap();
    let response = if path == "/red.png" {
        Response::from_data(png(255, 0, 0)).with_header(content_type)
    } else if path.starts_with("/proxy?url=") {
        Response::from_data(png(0, 0, 255)).with_header(content_type)
    } else if path == "/slow.png" {
        std::thread::sleep(Duration::from_millis(1500));
        Response::from_data(png(0, 255, 0)).with_header(content_type)
    } else {
        Response::from_data(b"Not Found".to_vec()).with_status_code(404)
    };
    let _ = request.respond(response);
}

fn start_image_server() -> String {
    INIT.call_once(|| {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        *ADDR.lock().unwrap() = format!("http://127.0.0.1:{}", port);
        std::thread::spawn(move || {
            for request in server.incoming_requests() {
                // one thread per request so a slow response never stalls the rest
                std::thread::spawn(move || respond(request));
            }
        });
    });
    ADDR.lock().unwrap().clone()
}

fn options(base: &str) -> ImageOptions {
    ImageOptions {
        base_url: Url::parse(&format!("{}/notes/", base)).unwrap(),
        proxy_endpoint: Url::parse(&format!("{}/proxy", base)).unwrap(),
        timeout_ms: 2000,
    }
}

fn pixel(bitmap: &Bitmap, x: u32, y: u32) -> [u8; 4] {
    let img = image::load_from_memory(&bitmap.png_bytes().unwrap()).unwrap().to_rgba8();
    img.get_pixel(x, y).0
}

#[tokio::test]
async fn same_origin_loads_directly_and_cross_origin_goes_through_proxy() {
    let base = start_image_server();
    let mut tree = VisualTree::parse_html(
        r#"<div><img src="/red.png"><img src="https://elsewhere.example/pic.png"></div>"#,
    );
    let loader = HttpImageLoader::new("markpic-test").unwrap();
    images::prepare(&mut tree, &loader, &options(&base)).await;

    // same-origin sources keep their attribute and are keyed by it
    assert!(matches!(tree.image_state("/red.png"), Some(ImageState::Ready { .. })));

    let proxied = format!("{}/proxy?url=https%3A%2F%2Felsewhere.example%2Fpic.png", base);
    assert!(matches!(tree.image_state(&proxied), Some(ImageState::Ready { .. })), "{:?}", tree.resources);
    let srcs: Vec<&str> = tree.root.find_all("img").iter().filter_map(|i| i.attr("src")).collect();
    assert_eq!(srcs, vec!["/red.png", proxied.as_str()]);

    let seen = SEEN.lock().unwrap();
    assert!(seen.iter().any(|p| p == "/red.png"));
    assert!(seen.iter().any(|p| p.starts_with("/proxy?url=https%3A%2F%2Felsewhere.example")));
}

#[tokio::test]
async fn slow_image_times_out_without_blocking_others() {
    let base = start_image_server();
    let mut tree = VisualTree::parse_html(r#"<div><img src="/slow.png"><img src="/red.png"></div>"#);
    let loader = HttpImageLoader::new("markpic-test").unwrap();
    let opts = ImageOptions { timeout_ms: 300, ..options(&base) };
    let started = Instant::now();
    images::prepare(&mut tree, &loader, &opts).await;
    assert!(started.elapsed() < Duration::from_millis(1400), "took {:?}", started.elapsed());
    assert_eq!(tree.image_state("/slow.png"), Some(&ImageState::TimedOut));
    assert!(matches!(tree.image_state("/red.png"), Some(ImageState::Ready { .. })));
}

#[tokio::test]
async fn scenario_c_missing_image_renders_placeholder() {
    let base = start_image_server();
    let doc = Document::new();
    let live = PreviewElement::new(
        VisualTree::parse_html(r#"<div style="width: 320px"><img src="/missing.png" width="320" height="180"></div>"#),
        320,
        188,
    );
    let export = ExportOptions { settle_delay_ms: 0, images: options(&base), ..Default::default() };
    let loader = Arc::new(HttpImageLoader::new("markpic-test").unwrap());
    let started = Instant::now();
    let bitmap = Rasterizer::new(&doc, loader, export)
        .export_to_image(&live, Mode::Light, |_| {})
        .await
        .expect("export completes despite the 404");
    assert!(started.elapsed() < Duration::from_millis(2000));
    assert_eq!((bitmap.width, bitmap.height), (640, 376));
    assert_eq!(pixel(&bitmap, 600, 340), [0xf3, 0xf4, 0xf6, 255]);
    assert_eq!(doc.offscreen_count(), 0);
}

#[tokio::test]
async fn loaded_image_is_drawn() {
    let base = start_image_server();
    let doc = Document::new();
    let live = PreviewElement::new(
        VisualTree::parse_html(r#"<div style="width: 40px"><img src="/red.png" width="40" height="40"></div>"#),
        40,
        40,
    );
    let export = ExportOptions { settle_delay_ms: 0, images: options(&base), ..Default::default() };
    let loader = Arc::new(HttpImageLoader::new("markpic-test").unwrap());
    let bitmap = Rasterizer::new(&doc, loader, export)
        .export_to_image(&live, Mode::Light, |_| {})
        .await
        .unwrap();
    let p = pixel(&bitmap, 40, 40);
    assert!(p[0] > 240 && p[1] < 16 && p[2] < 16, "{:?}", p);
}
