//! CLI binary for pdfink.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `SessionConfig`, replays an optional annotation script, and exports.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdfink::{
    inspect, replay, Color, ExportPageSize, ExportProgressCallback, ProgressCallback, Session,
    SessionConfig,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: renders a live progress bar and per-page log
/// lines using [indicatif]. Works correctly when pages complete
/// out-of-order (export rasterises concurrently).
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_export_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl ExportProgressCallback for CliProgressCallback {
    fn on_export_start(&self, total_pages: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Exporting");
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, jpeg_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{:>6} KiB", jpeg_len / 1024)),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = if error.len() > 80 {
            format!("{}\u{2026}", &error[..79])
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
        ));
    }

    fn on_export_complete(&self, total_pages: usize, bytes_written: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages exported ({} KiB)",
            green("✔"),
            bold(&total_pages.to_string()),
            bytes_written / 1024,
        );
    }
}

const AFTER_HELP: &str = r##"EXAMPLES:
  # Re-export a PDF as image pages (no annotations)
  pdfink document.pdf -o annotated.pdf

  # Replay an annotation script, then export
  pdfink contract.pdf --script signature.json -o signed.pdf

  # Red 5pt pen as the default for the script's strokes
  pdfink notes.pdf --script marks.json --pen-color '#d32f2f' --pen-width 5

  # Annotate a downloaded document
  pdfink https://example.com/form.pdf --script fill.json -o form-signed.pdf

  # Inspect PDF metadata (no export)
  pdfink --inspect-only document.pdf

  # Save a PNG preview of the current page after the script ran
  pdfink doc.pdf --script marks.json --preview page.png -o out.pdf

ANNOTATION SCRIPTS:
  A JSON array of commands replayed against the session in order. Stroke
  points are in page points (1/72 inch), origin at the top-left of the page:

    [
      { "op": "pen_color", "color": "#d32f2f" },
      { "op": "stroke", "points": [[120, 640], [180, 660], [240, 640]] },
      { "op": "go_to", "page": 2 },
      { "op": "stroke", "width": 6.0, "points": [[100, 100], [300, 300]] },
      { "op": "undo" }
    ]

  Ops: go_to, next_page, prev_page, stroke, undo, redo, zoom_in, zoom_out,
  toggle_mode, pen_color, pen_width, pan.

ENVIRONMENT VARIABLES:
  PDFINK_OUTPUT           Default output path
  PDFINK_EXPORT_SCALE     Export render scale
  PDFINK_QUALITY          JPEG quality (1-100)
  PDFINK_CONCURRENCY      Concurrent page rasterisations
  PDFIUM_DYNAMIC_LIB_PATH Path to an existing libpdfium

SETUP:
  pdfium is loaded from the system library path, the executable's
  directory, or PDFIUM_DYNAMIC_LIB_PATH. Prebuilt binaries:
  https://github.com/bblanchon/pdfium-binaries
"##;

/// Draw freehand ink on PDF pages and export the annotated document.
#[derive(Parser, Debug)]
#[command(
    name = "pdfink",
    version,
    about = "Draw freehand ink on PDF pages and export the annotated document",
    long_about = "Load a PDF (local file or URL), replay an annotation script of freehand \
strokes, navigation, undo/redo and zoom, then export every page — with its ink composited — \
as a new PDF of full-bleed JPEG image pages.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the annotated PDF to this file.
    #[arg(short, long, env = "PDFINK_OUTPUT", default_value = "annotated.pdf")]
    output: PathBuf,

    /// Annotation script (JSON) to replay before exporting.
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Initial pen color, #RRGGBB or #RRGGBBAA.
    #[arg(long, default_value = "#000000")]
    pen_color: String,

    /// Initial pen width in page points.
    #[arg(long, default_value_t = 3.0)]
    pen_width: f32,

    /// Render scale for exported pages (independent of any zoom the script
    /// performed).
    #[arg(long, env = "PDFINK_EXPORT_SCALE", default_value_t = 1.5)]
    export_scale: f32,

    /// JPEG quality for exported pages (1-100).
    #[arg(long, env = "PDFINK_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Output page size: a4 or letter.
    #[arg(long, default_value = "a4")]
    page_size: String,

    /// Number of concurrent page rasterisations during export.
    #[arg(short, long, env = "PDFINK_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFINK_PASSWORD")]
    password: Option<String>,

    /// Write a PNG preview of the current page (after the script ran).
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Print PDF metadata only, no export.
    #[arg(long)]
    inspect_only: bool,

    /// Output metadata as JSON (with --inspect-only).
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFINK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFINK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFINK_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDFINK_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input).await.context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialise metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = info.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = info.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", info.page_count);
            println!("PDF Version:  {}", info.pdf_version);
            if let Some(first) = info.page_sizes.first() {
                println!(
                    "Page 1 size:  {:.1} × {:.1} pt",
                    first.width_pt, first.height_pt
                );
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExportProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Open, annotate, export ───────────────────────────────────────────
    let mut session = Session::open(&cli.input, config)
        .await
        .context("Failed to open PDF")?;

    if let Some(ref script_path) = cli.script {
        let commands = pdfink::script::load_script(script_path)
            .with_context(|| format!("Failed to load script {:?}", script_path))?;
        let summary = replay(&mut session, &commands)
            .await
            .context("Script replay failed")?;
        if !cli.quiet {
            eprintln!(
                "{} {} commands replayed, {} strokes drawn",
                cyan("◆"),
                summary.commands,
                summary.strokes
            );
        }
    }

    if let Some(ref preview_path) = cli.preview {
        let view = session
            .render_current()
            .await
            .context("Preview render failed")?
            .context("Preview render was superseded")?;
        let composited = session.compose_view(&view);
        composited
            .save(preview_path)
            .with_context(|| format!("Failed to write preview {:?}", preview_path))?;
        if !cli.quiet {
            eprintln!(
                "{} preview of page {} → {}",
                cyan("◆"),
                view.page,
                preview_path.display()
            );
        }
    }

    let stats = session
        .export(&cli.output)
        .await
        .context("Export failed")?;

    // Summary line (the callback already printed the per-page log).
    if !cli.quiet && !show_progress {
        eprintln!(
            "Exported {} pages in {}ms → {}",
            stats.pages,
            stats.total_duration_ms,
            cli.output.display()
        );
    } else if !cli.quiet {
        eprintln!(
            "   {}  {}ms total  →  {}",
            dim(&format!("{} KiB", stats.bytes_written / 1024)),
            stats.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `SessionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SessionConfig> {
    let pen_color = Color::from_hex(&cli.pen_color)
        .with_context(|| format!("Invalid pen color '{}'", cli.pen_color))?;
    let page_size = parse_page_size(&cli.page_size)?;

    let mut builder = SessionConfig::builder()
        .export_scale(cli.export_scale)
        .jpeg_quality(cli.quality)
        .page_size(page_size)
        .concurrency(cli.concurrency)
        .pen_color(pen_color)
        .pen_width(cli.pen_width)
        .download_timeout_secs(cli.download_timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    let mut config = builder.build().context("Invalid configuration")?;
    config.password = cli.password.clone();
    Ok(config)
}

/// Parse `--page-size` into `ExportPageSize`.
fn parse_page_size(s: &str) -> Result<ExportPageSize> {
    match s.to_lowercase().as_str() {
        "a4" => Ok(ExportPageSize::A4),
        "letter" => Ok(ExportPageSize::Letter),
        other => {
            // Custom: "210x297" in millimetres.
            if let Some((w, h)) = other.split_once('x') {
                let width_mm: f32 = w.trim().parse().context("Invalid custom page width")?;
                let height_mm: f32 = h.trim().parse().context("Invalid custom page height")?;
                return Ok(ExportPageSize::Custom {
                    width_mm,
                    height_mm,
                });
            }
            anyhow::bail!("Unknown page size '{other}': expected a4, letter, or WxH in mm")
        }
    }
}
