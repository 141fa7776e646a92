//! External image resolution.
//!
//! Before rasterization every `img` in the detached tree is made
//! cross-origin safe, cross-origin sources are routed through an image proxy,
//! and all images are loaded concurrently with a per-image timeout. Results
//! land in the tree's resource table. [`prepare`] never fails: a broken or
//! slow image degrades to a placeholder instead of aborting the export.

use crate::tree::{ImageState, VisualTree};
use crate::{Error, Result};
use base64::Engine as _;
use futures::future::{join_all, BoxFuture};
use std::io::Cursor;
use std::time::Duration;
use url::Url;

/// Default per-image wait
pub const DEFAULT_IMAGE_TIMEOUT_MS: u64 = 8000;
/// Default CORS-friendly image proxy
pub const DEFAULT_PROXY_ENDPOINT: &str = "https://images.weserv.nl/";

/// Options for [`prepare`]
#[derive(Debug, Clone)]
pub struct ImageOptions {
    /// Document URL that relative sources resolve against and that defines
    /// the same-origin boundary
    pub base_url: Url,
    /// Proxy endpoint; the original absolute URL is passed as `?url=`
    pub proxy_endpoint: Url,
    /// Per-image wait in milliseconds
    pub timeout_ms: u64,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://localhost/").expect("static URL"),
            proxy_endpoint: Url::parse(DEFAULT_PROXY_ENDPOINT).expect("static URL"),
            timeout_ms: DEFAULT_IMAGE_TIMEOUT_MS,
        }
    }
}

/// Raw image bytes returned by a loader
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub bytes: Vec<u8>,
    /// Content type reported by the source, if any
    pub content_type: Option<String>,
}

/// Fetches image bytes for an absolute URL
pub trait ImageLoader: Send + Sync {
    fn load<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<LoadedImage>>;
}

/// `reqwest`-backed loader for `http(s)` URLs with `file:` support
pub struct HttpImageLoader {
    client: reqwest::Client,
}

impl HttpImageLoader {
    pub fn new(user_agent: &str) -> Result<Self> {
        // anonymous requests: no cookies, no referrer
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .referer(false)
            .build()
            .map_err(|e| Error::NetworkError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl ImageLoader for HttpImageLoader {
    fn load<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<LoadedImage>> {
        Box::pin(async move {
            let parsed = Url::parse(url)?;
            if parsed.scheme() == "file" {
                let path = parsed
                    .to_file_path()
                    .map_err(|_| Error::LoadError(format!("not a local path: {}", url)))?;
                let bytes = tokio::fs::read(&path).await?;
                return Ok(LoadedImage { bytes, content_type: None });
            }

            let resp = self
                .client
                .get(parsed)
                .send()
                .await
                .map_err(|e| Error::NetworkError(format!("GET {} failed: {}", url, e)))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(Error::NetworkError(format!("GET {} returned {}", url, status)));
            }
            let content_type = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());
            let bytes = resp
                .bytes()
                .await
                .map_err(|e| Error::NetworkError(format!("Failed to read {}: {}", url, e)))?;
            Ok(LoadedImage { bytes: bytes.to_vec(), content_type })
        })
    }
}

/// Same origin, with all `file:` URLs treated as one origin
pub fn is_same_origin(a: &Url, b: &Url) -> bool {
    if a.scheme() == "file" && b.scheme() == "file" {
        return true;
    }
    a.origin() == b.origin()
}

/// How one `img` source is handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    /// Value the `src` attribute ends up with
    pub src: String,
    /// Absolute URL the bytes are fetched from
    pub load_url: String,
}

/// Where an `img` source should actually be loaded from.
///
/// Returns `None` for empty sources. `data:` and same-origin sources keep
/// their attribute untouched; same-origin ones still load from the
/// resolved absolute URL. Cross-origin sources are rewritten to the proxy.
pub fn effective_source(src: &str, options: &ImageOptions) -> Option<ResolvedSource> {
    let trimmed = src.trim();
    if trimmed.is_empty() {
        return None;
    }
    let unchanged = |load_url: String| ResolvedSource { src: src.to_string(), load_url };
    if trimmed.starts_with("data:") {
        return Some(unchanged(trimmed.to_string()));
    }
    let absolute = match options.base_url.join(trimmed) {
        Ok(u) => u,
        Err(_) => return Some(unchanged(trimmed.to_string())),
    };
    if is_same_origin(&absolute, &options.base_url) {
        return Some(unchanged(absolute.to_string()));
    }
    let mut proxied = options.proxy_endpoint.clone();
    proxied
        .query_pairs_mut()
        .clear()
        .append_pair("url", absolute.as_str());
    let proxied = proxied.to_string();
    Some(ResolvedSource { src: proxied.clone(), load_url: proxied })
}

/// Rewrite and load every image in `tree`, waiting at most `timeout_ms` per
/// image. All waits run concurrently.
pub async fn prepare(tree: &mut VisualTree, loader: &dyn ImageLoader, options: &ImageOptions) {
    let mut sources: Vec<ResolvedSource> = Vec::new();
    let mut empty = 0usize;
    tree.root.visit_mut(&mut |el| {
        if el.tag != "img" {
            return;
        }
        el.set_attr("crossorigin", "anonymous");
        el.set_attr("referrerpolicy", "no-referrer");
        let src = el.attr("src").unwrap_or_default().to_string();
        match effective_source(&src, options) {
            Some(resolved) => {
                if resolved.src != src {
                    log::debug!("rewrote image source {} -> {}", src, resolved.src);
                    el.set_attr("src", &resolved.src);
                }
                if !sources.iter().any(|s| s.src == resolved.src) {
                    sources.push(resolved);
                }
            }
            None => {
                el.set_attr("src", "");
                empty += 1;
            }
        }
    });
    if empty > 0 {
        tree.resources.insert(
            String::new(),
            ImageState::Failed { reason: "empty source".to_string() },
        );
    }

    let timeout = Duration::from_millis(options.timeout_ms);
    let waits = sources.iter().map(|source| async move {
        let url = source.load_url.as_str();
        if url.starts_with("data:") {
            return ImageState::Ready {
                data_url: url.to_string(),
                natural: decode_data_url(url).and_then(|bytes| natural_size(&bytes)),
            };
        }
        match tokio::time::timeout(timeout, loader.load(url)).await {
            Ok(Ok(img)) => into_state(url, img),
            Ok(Err(e)) => {
                log::warn!("image {} failed to load: {}", url, e);
                ImageState::Failed { reason: e.to_string() }
            }
            Err(_) => {
                log::warn!("image {}: {}", url, Error::Timeout(options.timeout_ms));
                ImageState::TimedOut
            }
        }
    });
    let states = join_all(waits).await;
    for (source, state) in sources.into_iter().zip(states) {
        tree.resources.insert(source.src, state);
    }
}

fn into_state(src: &str, img: LoadedImage) -> ImageState {
    let format = match image::guess_format(&img.bytes) {
        Ok(f) => f,
        Err(_) => {
            // SVG has no magic number; trust the declared content type
            if is_svg(&img) {
                return ImageState::Ready {
                    data_url: data_url("image/svg+xml", &img.bytes),
                    natural: svg_size(&img.bytes),
                };
            }
            log::warn!("image {} is not a recognized image format", src);
            return ImageState::Failed { reason: "unrecognized image data".to_string() };
        }
    };
    ImageState::Ready {
        data_url: data_url(format.to_mime_type(), &img.bytes),
        natural: natural_size(&img.bytes),
    }
}

/// Pixel size of raster bytes, or the declared size of an SVG document
fn natural_size(bytes: &[u8]) -> Option<(u32, u32)> {
    match image::guess_format(bytes) {
        Ok(format) => image::ImageReader::with_format(Cursor::new(bytes), format)
            .into_dimensions()
            .ok(),
        Err(_) => svg_size(bytes),
    }
}

fn svg_size(bytes: &[u8]) -> Option<(u32, u32)> {
    let tree = usvg::Tree::from_data(bytes, &usvg::Options::default()).ok()?;
    let size = tree.size();
    Some((size.width().round() as u32, size.height().round() as u32))
}

/// Payload of a base64 `data:` URL
fn decode_data_url(url: &str) -> Option<Vec<u8>> {
    let (meta, payload) = url.strip_prefix("data:")?.split_once(',')?;
    if !meta.ends_with(";base64") {
        return None;
    }
    base64::engine::general_purpose::STANDARD.decode(payload.trim()).ok()
}

fn is_svg(img: &LoadedImage) -> bool {
    img.content_type
        .as_deref()
        .map(|t| t.starts_with("image/svg"))
        .unwrap_or(false)
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
