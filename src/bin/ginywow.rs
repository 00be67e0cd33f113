//! CLI binary for ginywow-tools.
//!
//! A thin shim over the library crate: each subcommand builds one tool,
//! drives it through a `ToolPipeline`, and prints the rendered result.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ginywow_tools::config::{DEFAULT_API_BASE, DEFAULT_QR_API_BASE, DEFAULT_THUMBNAIL_CDN};
use ginywow_tools::tools::{
    age::AgeCalculatorTool,
    image::{BackgroundRemovalTool, ImageConvertTool},
    pdf::{PdfOperation, PdfTool},
    qr::QrTool,
    sleep::SleepCalculatorTool,
    text::{CaseConvertTool, WordCountTool},
    titles::TitleOptimizerTool,
    unit::UnitConverterTool,
    youtube::YoutubeThumbnailTool,
};
use ginywow_tools::{
    catalog, download, render, BackendClient, InputKind, Notifier, Parameters, PipelineConfig,
    PreviewHandle, RawInput, SharedNotifier, Tool, ToolPipeline, ValidationError,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── Terminal notifier using indicatif ────────────────────────────────────────

/// Prints pipeline events to stderr and shows a spinner while a request is
/// in flight.
struct CliNotifier {
    spinner: Mutex<Option<ProgressBar>>,
    show_progress: bool,
    quiet: bool,
}

impl CliNotifier {
    fn new(show_progress: bool, quiet: bool) -> Arc<Self> {
        Arc::new(Self {
            spinner: Mutex::new(None),
            show_progress,
            quiet,
        })
    }

    fn clear_spinner(&self) {
        let mut slot = self.spinner.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(bar) = slot.take() {
            bar.finish_and_clear();
        }
    }
}

impl Notifier for CliNotifier {
    fn on_acquired(&self, _tool: &str, preview: &PreviewHandle) {
        if !self.quiet {
            eprintln!("{} {}", cyan("◆"), dim(&preview.describe()));
        }
    }

    fn on_validation_error(&self, _tool: &str, error: &ValidationError) {
        eprintln!("{} {}", red("✗"), red(&error.to_string()));
    }

    fn on_submit_start(&self, tool: &str) {
        if !self.show_progress {
            return;
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix(tool.to_string());
        bar.set_message("Processing…");
        bar.enable_steady_tick(Duration::from_millis(80));
        *self.spinner.lock().unwrap_or_else(|p| p.into_inner()) = Some(bar);
    }

    fn on_success(&self, tool: &str, summary: &str) {
        self.clear_spinner();
        if !self.quiet {
            eprintln!("{} {}  {}", green("✔"), bold(tool), dim(summary));
        }
    }

    fn on_failure(&self, tool: &str, message: &str) {
        self.clear_spinner();
        eprintln!("{} {}  {}", red("✘"), bold(tool), red(message));
    }

    fn on_reset(&self, _tool: &str) {
        self.clear_spinner();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # List every tool
  ginywow list

  # Convert an image to WebP at quality 85 and save it
  ginywow --out ./out convert-image photo.png --format webp --quality 85

  # Remove a background
  ginywow --out ./out remove-bg portrait.jpg

  # PDF operations
  ginywow --out ./out pdf-to-word report.pdf
  ginywow pdf-compress report.pdf --level high
  ginywow pdf-watermark report.pdf --text "DRAFT"

  # QR code without any network call
  ginywow --out . qr "https://ginywow.com" --size 400 --offline

  # All thumbnails of a video, as JSON
  ginywow --json thumbnails "https://youtu.be/dQw4w9WgXcQ"

  # Local calculators
  ginywow age 2000-01-01 --today 2025-06-15
  ginywow sleep 07:00 --mode wake_at
  ginywow convert-unit 5 --from km --to mi
  cat essay.txt | ginywow word-count -

ENVIRONMENT VARIABLES:
  GINYWOW_API_BASE          Processing backend origin
  GINYWOW_TIMEOUT           Request timeout in seconds
  GINYWOW_DOWNLOAD_TIMEOUT  Download timeout in seconds
  GINYWOW_QR_API_BASE       QR image service origin
  GINYWOW_THUMBNAIL_CDN     YouTube thumbnail CDN base
  GINYWOW_OUT               Directory downloads are saved to
  RUST_LOG                  Overrides the log filter
"#;

/// Free online utility tools from the command line.
#[derive(Parser, Debug)]
#[command(
    name = "ginywow",
    version,
    about = "Free online utility tools from the command line",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Processing backend origin.
    #[arg(long, global = true, env = "GINYWOW_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Request timeout in seconds.
    #[arg(long, global = true, env = "GINYWOW_TIMEOUT", default_value_t = 60,
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Download timeout in seconds.
    #[arg(long, global = true, env = "GINYWOW_DOWNLOAD_TIMEOUT", default_value_t = 120,
          value_parser = clap::value_parser!(u64).range(1..))]
    download_timeout: u64,

    /// QR image service origin.
    #[arg(long, global = true, env = "GINYWOW_QR_API_BASE", default_value = DEFAULT_QR_API_BASE)]
    qr_api_base: String,

    /// YouTube thumbnail CDN base.
    #[arg(long, global = true, env = "GINYWOW_THUMBNAIL_CDN", default_value = DEFAULT_THUMBNAIL_CDN)]
    thumbnail_cdn: String,

    /// Save every download of a successful result into this directory.
    #[arg(short, long, global = true, env = "GINYWOW_OUT")]
    out: Option<PathBuf>,

    /// Print the rendered result as JSON.
    #[arg(long, global = true, env = "GINYWOW_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, global = true, env = "GINYWOW_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "GINYWOW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, global = true, env = "GINYWOW_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every available tool.
    List,
    /// Convert an image to another format.
    ConvertImage {
        file: PathBuf,
        /// png, jpeg, webp, gif, bmp or tiff.
        #[arg(long)]
        format: Option<String>,
        /// 1–100.
        #[arg(long)]
        quality: Option<u32>,
    },
    /// Remove the background from a photo.
    RemoveBg { file: PathBuf },
    /// Convert a PDF to a Word document.
    PdfToWord { file: PathBuf },
    /// Compress a PDF.
    PdfCompress {
        file: PathBuf,
        /// low, medium or high.
        #[arg(long)]
        level: Option<String>,
    },
    /// Stamp a text watermark on a PDF.
    PdfWatermark {
        file: PathBuf,
        #[arg(long)]
        text: String,
    },
    /// Generate a QR code.
    Qr {
        /// Text or URL to encode (`-` reads stdin).
        text: String,
        /// Image size in pixels (100–1000).
        #[arg(long)]
        size: Option<u32>,
        /// Encode locally instead of calling the QR service.
        #[arg(long)]
        offline: bool,
    },
    /// List every thumbnail of a YouTube video.
    Thumbnails { url: String },
    /// Suggest better titles for a video thumbnail.
    OptimizeTitle {
        thumbnail: PathBuf,
        #[arg(long)]
        title: String,
    },
    /// Count words, sentences and reading time (`-` reads stdin).
    WordCount { text: String },
    /// Change the letter case of text (`-` reads stdin).
    Case {
        text: String,
        /// upper, lower, title, sentence, camel, pascal, snake, kebab, alternating.
        #[arg(long)]
        to: Option<String>,
    },
    /// Exact age from a YYYY-MM-DD birth date.
    Age {
        birthdate: String,
        /// Reference date instead of today (YYYY-MM-DD).
        #[arg(long)]
        today: Option<String>,
    },
    /// Bed and wake-up times by sleep cycle.
    Sleep {
        /// HH:MM, 24 h.
        time: String,
        /// wake_at or bed_at.
        #[arg(long)]
        mode: Option<String>,
    },
    /// Convert a value between units.
    ConvertUnit {
        #[arg(allow_hyphen_values = true)]
        value: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
}

/// Everything a subcommand needs to run a tool.
struct Session {
    config: PipelineConfig,
    client: BackendClient,
    notifier: SharedNotifier,
    out: Option<PathBuf>,
    json: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let g = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; library INFO logs
    // would tear through it.
    let show_progress = !g.quiet && !g.no_progress && !g.json;
    let filter = if g.verbose {
        "debug"
    } else if g.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if let Command::List = cli.command {
        print_catalog(g.json)?;
        return Ok(ExitCode::SUCCESS);
    }

    let ctx = build_context(g)?;
    let success = dispatch(cli.command, &ctx).await?;
    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_context(g: &GlobalArgs) -> Result<Session> {
    let config = PipelineConfig::builder()
        .api_base_url(g.api_base.clone())
        .request_timeout_secs(g.timeout)
        .download_timeout_secs(g.download_timeout)
        .qr_api_base(g.qr_api_base.clone())
        .thumbnail_cdn_base(g.thumbnail_cdn.clone())
        .build()
        .context("Invalid configuration")?;
    let client = BackendClient::new(&config).context("Failed to build HTTP client")?;
    let show_progress = !g.quiet && !g.no_progress && !g.json;
    Ok(Session {
        config,
        client,
        notifier: CliNotifier::new(show_progress, g.quiet),
        out: g.out.clone(),
        json: g.json,
    })
}

async fn dispatch(command: Command, ctx: &Session) -> Result<bool> {
    let client = ctx.client.clone();
    match command {
        Command::List => Ok(true),
        Command::ConvertImage {
            file,
            format,
            quality,
        } => {
            let params = Parameters::new()
                .with_opt("format", format)
                .with_opt("quality", quality);
            run(ImageConvertTool::new(client), file_input(&file).await?, params, ctx).await
        }
        Command::RemoveBg { file } => {
            run(BackgroundRemovalTool::new(client), file_input(&file).await?, Parameters::new(), ctx).await
        }
        Command::PdfToWord { file } => {
            let tool = PdfTool::new(client, PdfOperation::ConvertToWord);
            run(tool, file_input(&file).await?, Parameters::new(), ctx).await
        }
        Command::PdfCompress { file, level } => {
            let tool = PdfTool::new(client, PdfOperation::Compress);
            let params = Parameters::new().with_opt("level", level);
            run(tool, file_input(&file).await?, params, ctx).await
        }
        Command::PdfWatermark { file, text } => {
            let tool = PdfTool::new(client, PdfOperation::Watermark);
            run(tool, file_input(&file).await?, Parameters::new().with("text", text), ctx).await
        }
        Command::Qr {
            text,
            size,
            offline,
        } => {
            let tool = if offline {
                QrTool::offline()
            } else {
                QrTool::online(&ctx.config, client)
            };
            let params = Parameters::new().with_opt("size", size);
            run(tool, text_input(&text)?, params, ctx).await
        }
        Command::Thumbnails { url } => {
            let tool = YoutubeThumbnailTool::from_config(&ctx.config);
            run(tool, RawInput::text(url), Parameters::new(), ctx).await
        }
        Command::OptimizeTitle { thumbnail, title } => {
            let params = Parameters::new().with("title", title);
            run(TitleOptimizerTool::new(client), file_input(&thumbnail).await?, params, ctx).await
        }
        Command::WordCount { text } => {
            run(WordCountTool, text_input(&text)?, Parameters::new(), ctx).await
        }
        Command::Case { text, to } => {
            let params = Parameters::new().with_opt("case", to);
            run(CaseConvertTool, text_input(&text)?, params, ctx).await
        }
        Command::Age { birthdate, today } => {
            let params = Parameters::new().with_opt("today", today);
            run(AgeCalculatorTool, RawInput::text(birthdate), params, ctx).await
        }
        Command::Sleep { time, mode } => {
            let params = Parameters::new().with_opt("mode", mode);
            run(SleepCalculatorTool, RawInput::text(time), params, ctx).await
        }
        Command::ConvertUnit { value, from, to } => {
            let params = Parameters::new().with("from", from).with("to", to);
            run(UnitConverterTool, RawInput::text(value), params, ctx).await
        }
    }
}

/// Drive one tool through acquire → submit → render, then save downloads.
async fn run<T: Tool>(tool: T, input: RawInput, params: Parameters, ctx: &Session) -> Result<bool> {
    let pipeline =
        ToolPipeline::new(tool, ctx.config.clone()).with_notifier(Arc::clone(&ctx.notifier));

    if pipeline.acquire(input, params).await.is_err() {
        // The notifier already reported why.
        return Ok(false);
    }
    let result = pipeline
        .submit()
        .await
        .with_context(|| format!("{}: submission was not accepted", pipeline.tool().name()))?;
    let view = render(&result);

    let mut saved = Vec::new();
    if let (Some(dir), true) = (&ctx.out, view.success) {
        for item in &view.downloads {
            let path = download(item, dir, &ctx.client)
                .await
                .with_context(|| format!("Failed to save {}", item.name))?;
            saved.push(path);
        }
    }

    if ctx.json {
        let json = serde_json::to_string_pretty(&view).context("Failed to serialise result")?;
        println!("{json}");
    } else if view.success {
        println!("{}", bold(&view.headline));
        for line in &view.lines {
            println!("  {line}");
        }
        if ctx.out.is_none() {
            for item in &view.downloads {
                println!("  {} {}", dim("↓"), item.name);
            }
        }
    }
    for path in &saved {
        eprintln!("{} {}", green("→"), path.display());
    }

    Ok(view.success)
}

async fn file_input(path: &Path) -> Result<RawInput> {
    RawInput::from_path(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// `-` reads the whole of stdin.
fn text_input(arg: &str) -> Result<RawInput> {
    if arg != "-" {
        return Ok(RawInput::text(arg));
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read stdin")?;
    Ok(RawInput::text(buf))
}

fn print_catalog(json: bool) -> Result<()> {
    let tools = catalog();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&tools).context("Failed to serialise catalog")?
        );
        return Ok(());
    }
    for t in tools {
        let input = match t.input {
            InputKind::File => "file",
            InputKind::Text => "text",
        };
        println!(
            "{}  {}  {}",
            bold(&format!("{:<18}", t.name)),
            dim(&format!("{input:<4}")),
            t.summary
        );
    }
    Ok(())
}

/// `Parameters::with` for values the user may have left out.
trait WithOpt {
    fn with_opt<V: ToString>(self, name: &str, value: Option<V>) -> Self;
}

impl WithOpt for Parameters {
    fn with_opt<V: ToString>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(name, v.to_string()),
            None => self,
        }
    }
}
