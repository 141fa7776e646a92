use anyhow::{Context, Result};
use clap::Parser;
use markpic::images::{HttpImageLoader, ImageOptions};
use markpic::platform::{NativePlatform, DEFAULT_USER_AGENT};
use markpic::sink::{DeliveryMode, FileDownloader, Notice, NoticeLevel};
use markpic::{Document, ExportOptions, Mode, OutputSink, PreviewElement, Rasterizer, StyleConfig};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// markpic - render a Markdown file into a shareable PNG card
#[derive(Parser)]
#[command(name = "markpic")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Markdown file to render (`-` reads stdin)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Render in dark mode
    #[arg(long)]
    dark: bool,

    /// Copy the image to the clipboard instead of saving it
    #[arg(long)]
    copy: bool,

    /// Directory that exported images are written to
    #[arg(long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Style configuration (JSON)
    #[arg(long, value_name = "JSON")]
    style: Option<PathBuf>,

    /// Document URL for relative images (default: the input's directory)
    #[arg(long, value_name = "URL")]
    base_url: Option<Url>,

    /// Proxy endpoint for cross-origin images
    #[arg(long, value_name = "URL")]
    proxy: Option<Url>,

    /// Per-image load timeout
    #[arg(long, value_name = "MS")]
    image_timeout_ms: Option<u64>,

    /// Wait before rasterizing
    #[arg(long, value_name = "MS")]
    settle_ms: Option<u64>,

    /// Log level
    #[arg(long, value_enum, value_name = "LEVEL", default_value = "warn")]
    log_level: LogLevelArg,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevelArg::Off => log::LevelFilter::Off,
            LogLevelArg::Error => log::LevelFilter::Error,
            LogLevelArg::Warn => log::LevelFilter::Warn,
            LogLevelArg::Info => log::LevelFilter::Info,
            LogLevelArg::Debug => log::LevelFilter::Debug,
            LogLevelArg::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Plain stderr logger
struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logging(level: LogLevelArg) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level.to_level_filter());
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s).context("Failed to read stdin")?;
        return Ok(s);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_style(path: Option<&Path>) -> Result<StyleConfig> {
    let Some(path) = path else {
        return Ok(StyleConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let config = serde_json::from_str(&text).map_err(markpic::Error::from)?;
    Ok(config)
}

fn default_base_url(input: &Path) -> Result<Url> {
    let dir = if input.as_os_str() == "-" {
        std::env::current_dir()?
    } else {
        let abs = std::fs::canonicalize(input)?;
        abs.parent().map(Path::to_path_buf).unwrap_or(abs)
    };
    Url::from_directory_path(&dir).map_err(|_| anyhow::anyhow!("cannot express {} as a URL", dir.display()))
}

fn print_notice(notice: &Notice) {
    let tag = match notice.level {
        NoticeLevel::Success => "ok",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    };
    eprintln!("{}: {} - {}", tag, notice.title, notice.detail);
}

async fn run(cli: Cli) -> Result<()> {
    let mode = Mode::from_dark(cli.dark);
    let requested = if cli.copy { DeliveryMode::Copy } else { DeliveryMode::Download };

    let markdown = read_input(&cli.input)?;
    let style = load_style(cli.style.as_deref())?;
    let preview = PreviewElement::from_markdown(&markdown, &style, mode)?;

    let mut images = ImageOptions {
        base_url: match cli.base_url {
            Some(u) => u,
            None => default_base_url(&cli.input)?,
        },
        ..Default::default()
    };
    if let Some(proxy) = cli.proxy {
        images.proxy_endpoint = proxy;
    }
    if let Some(ms) = cli.image_timeout_ms {
        images.timeout_ms = ms;
    }
    let mut options = ExportOptions { images, ..Default::default() };
    if let Some(ms) = cli.settle_ms {
        options.settle_delay_ms = ms;
    }

    let document = Document::new();
    let loader = Arc::new(HttpImageLoader::new(DEFAULT_USER_AGENT)?);
    let rasterizer = Rasterizer::new(&document, loader, options);
    let exported = rasterizer
        .export_to_image(&preview, mode, |phase| log::info!("{}", phase.message()))
        .await;
    let bitmap = match exported {
        Ok(b) => b,
        Err(e) => {
            print_notice(&Notice::failure(requested, &e));
            return Err(e.into());
        }
    };

    let platform = NativePlatform::default();
    let downloader = Box::new(FileDownloader::new(&cli.out_dir));
    let mut sink = OutputSink::from_platform(&platform, downloader, requested);
    match sink.deliver(&bitmap, requested) {
        Ok(outcome) => {
            print_notice(&outcome.notice(requested));
            Ok(())
        }
        Err(e) => {
            print_notice(&Notice::failure(requested, &e));
            Err(e.into())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level);
    if let Err(e) = run(cli).await {
        log::debug!("{:?}", e);
        std::process::exit(1);
    }
}
