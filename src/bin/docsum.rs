//! CLI binary for docsum.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ServiceConfig`, installs logging, and runs one subcommand.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docsum::{
    DispatchProgressCallback, DispatchReport, Dispatcher, PdfiumExtractor, ProgressCallback,
    RecordOutcome, RecordStore, ServiceConfig, SummaryPipeline, TextExtractor,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress for `docsum dispatch`: a bar plus one line per record.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} records  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Dispatching");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl DispatchProgressCallback for CliProgressCallback {
    fn on_dispatch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.println(format!(
            "{} {}",
            bold("◆"),
            bold(&format!("Found {total} JSON files to process"))
        ));
    }

    fn on_record_start(&self, _index: usize, _total: usize, path: &Path) {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        self.bar.set_message(name.unwrap_or_default());
    }

    fn on_record_complete(&self, index: usize, total: usize, outcome: &RecordOutcome) {
        let line = match outcome {
            RecordOutcome::Delivered { status } => {
                format!("{} sent  {}", green("✓"), dim(&format!("HTTP {status}")))
            }
            RecordOutcome::Rejected { status } => {
                format!("{} API returned status {status}", yellow("✗"))
            }
            RecordOutcome::Failed { reason } => format!("{} {}", yellow("✗"), truncate(reason)),
            RecordOutcome::Skipped => format!("{} no callback", dim("–")),
            RecordOutcome::Unreadable { reason } => format!("{} {}", red("✗"), truncate(reason)),
        };
        self.bar
            .println(format!("  {index:>3}/{total:<3}  {line}"));
        self.bar.inc(1);
    }

    fn on_record_error(&self, index: usize, total: usize, error: &str) {
        self.bar.println(format!(
            "  {index:>3}/{total:<3}  {} {}",
            red("✗"),
            red(&truncate(error))
        ));
        self.bar.inc(1);
    }

    fn on_dispatch_complete(&self, _report: &DispatchReport) {
        self.bar.finish_and_clear();
    }
}

/// Keep per-record lines on one terminal row.
fn truncate(msg: &str) -> String {
    if msg.chars().count() > 80 {
        let head: String = msg.chars().take(79).collect();
        format!("{head}\u{2026}")
    } else {
        msg.to_string()
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service on port 5000
  docsum serve

  # Upload a PDF for summarization
  curl -F file=@report.pdf -F apiFunction=https://example.com/hook \
       -F documentID=d1 -F dataSearchField=a -F dataField=b \
       http://localhost:5000/summarize

  # Forward every stored summary to its callback, then archive them
  docsum dispatch --archive

  # Check what text a PDF yields (text layer + OCR), without the model
  docsum extract scan.pdf --json

ENVIRONMENT VARIABLES:
  DOCSUM_STORE_DIR        Record store directory (default: summaries)
  DOCSUM_LOG_DIR          Rotating log directory (default: logs)
  DOCSUM_GENERATE_URL     Generation endpoint (default: Ollama on localhost)
  DOCSUM_MODEL            Model name (default: llama3)
  DOCSUM_PDFIUM_LIB       Path to libpdfium (default: system library)
  RUST_LOG                Overrides the log filter

  Variables may also be placed in a .env file in the working directory.
"#;

/// Summarise PDFs with a local LLM and relay the summaries to callbacks.
#[derive(Parser, Debug)]
#[command(
    name = "docsum",
    version,
    about = "Summarise PDFs with a local LLM and relay the summaries to callbacks",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    service: ServiceArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCSUM_VERBOSE")]
    verbose: bool,

    /// Suppress all terminal output except errors.
    #[arg(short, long, global = true, env = "DOCSUM_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "DOCSUM_BIND", default_value = "0.0.0.0:5000")]
        bind: SocketAddr,
    },

    /// Send every stored record to its callback URL once.
    Dispatch {
        /// Move the records this run processed into the archive directory afterwards.
        #[arg(long)]
        archive: bool,

        /// Disable progress bar.
        #[arg(long, env = "DOCSUM_NO_PROGRESS")]
        no_progress: bool,

        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Move every stored record into the archive directory.
    Archive,

    /// Run text extraction only and print the result.
    Extract {
        /// PDF file to read.
        pdf: PathBuf,

        /// Print the per-page report as JSON instead of the text.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct ServiceArgs {
    /// Record store directory.
    #[arg(long, global = true, env = "DOCSUM_STORE_DIR", default_value = "summaries")]
    store_dir: PathBuf,

    /// Directory for the daily-rotating log file.
    #[arg(long, global = true, env = "DOCSUM_LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,

    /// Generation endpoint URL.
    #[arg(long, global = true, env = "DOCSUM_GENERATE_URL",
          default_value = docsum::config::DEFAULT_GENERATE_URL)]
    generate_url: String,

    /// Model name sent with each generation request.
    #[arg(long, global = true, env = "DOCSUM_MODEL", default_value = docsum::config::DEFAULT_MODEL)]
    model: String,

    /// Generation timeout in seconds (default: none).
    #[arg(long, global = true, env = "DOCSUM_GENERATE_TIMEOUT")]
    generate_timeout: Option<u64>,

    /// Callback timeout in seconds.
    #[arg(long, global = true, env = "DOCSUM_CALLBACK_TIMEOUT", default_value_t = 30)]
    callback_timeout: u64,

    /// OCR executable.
    #[arg(long, global = true, env = "DOCSUM_OCR_BINARY", default_value = "tesseract")]
    ocr_binary: PathBuf,

    /// OCR language code.
    #[arg(long, global = true, env = "DOCSUM_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// Longest edge, in pixels, of pages rendered for OCR.
    #[arg(long, global = true, env = "DOCSUM_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// Path to libpdfium. Default: the system library.
    #[arg(long, global = true, env = "DOCSUM_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, global = true, env = "DOCSUM_PDF_PASSWORD")]
    pdf_password: Option<String>,

    /// Largest accepted upload in MiB.
    #[arg(long, global = true, env = "DOCSUM_MAX_UPLOAD_MB", default_value_t = 100)]
    max_upload_mb: usize,
}

impl ServiceArgs {
    fn to_config(&self) -> Result<ServiceConfig> {
        let mut builder = ServiceConfig::builder()
            .store_dir(&self.store_dir)
            .log_dir(&self.log_dir)
            .generate_url(&self.generate_url)
            .model(&self.model)
            .generate_timeout_secs(self.generate_timeout)
            .callback_timeout_secs(self.callback_timeout)
            .ocr_binary(&self.ocr_binary)
            .ocr_language(&self.ocr_lang)
            .max_rendered_pixels(self.max_pixels)
            .max_upload_bytes(self.max_upload_mb.saturating_mul(1024 * 1024));
        if let Some(ref lib) = self.pdfium_lib {
            builder = builder.pdfium_library(lib);
        }
        if let Some(ref pwd) = self.pdf_password {
            builder = builder.pdf_password(pwd);
        }
        builder.build().context("Invalid configuration")
    }
}

/// stderr layer plus a daily-rotating file under `log_dir`.
///
/// The returned guard flushes the file writer on drop and must outlive `main`'s work.
fn init_logging(log_dir: &Path, stderr_level: &str, file_level: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::daily(log_dir, "docsum.log");
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        |level: &str| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_filter(filter(stderr_level));
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer)
        .with_filter(filter(file_level));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO lines on the terminal; the log file
    // always keeps them.
    let show_progress = matches!(
        cli.command,
        Command::Dispatch {
            no_progress: false,
            json: false,
            ..
        }
    ) && !cli.quiet;
    let stderr_level = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    let file_level = if cli.verbose { "debug" } else { "info" };
    let _guard = init_logging(&cli.service.log_dir, stderr_level, file_level)?;

    let config = Arc::new(cli.service.to_config()?);

    match cli.command {
        Command::Serve { bind } => {
            let pipeline =
                SummaryPipeline::from_config(Arc::clone(&config)).context("Failed to start")?;
            if !cli.quiet {
                eprintln!(
                    "{} docsum listening on {}  {}",
                    green("◆"),
                    bold(&bind.to_string()),
                    dim(&format!("model {} @ {}", config.model, config.generate_url)),
                );
            }
            docsum::server::serve(pipeline, bind)
                .await
                .context("Server failed")?;
        }

        Command::Dispatch { archive, json, .. } => {
            let mut dispatcher = Dispatcher::new(&config)?;
            if show_progress {
                dispatcher =
                    dispatcher.with_progress(CliProgressCallback::new() as ProgressCallback);
            }
            let report = dispatcher
                .dispatch_all()
                .await
                .context("Fatal error in processing")?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Failed to serialise report")?
                );
            } else if !cli.quiet {
                print_report(&report);
            }

            if archive {
                let processed = report.processed_paths();
                let count = dispatcher.store().archive_paths(&processed).await;
                if !cli.quiet && !json {
                    eprintln!("Archived {count} files to {}", config.archive_dir().display());
                }
            }
        }

        Command::Archive => {
            let count = RecordStore::from_config(&config).archive_all().await?;
            if !cli.quiet {
                eprintln!("Archived {count} files to {}", config.archive_dir().display());
            }
        }

        Command::Extract { pdf, json } => {
            let extractor = PdfiumExtractor::new(Arc::clone(&config));
            let extracted = extractor
                .extract(&pdf)
                .await
                .with_context(|| format!("Failed to extract text from {}", pdf.display()))?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&extracted)
                        .context("Failed to serialise extraction report")?
                );
            } else {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(extracted.text.as_bytes())
                    .context("Failed to write to stdout")?;
                if !cli.quiet {
                    eprintln!(
                        "{} pages, {} via OCR, {} failed",
                        extracted.pages.len(),
                        extracted.ocr_attempts(),
                        extracted.failed_pages().count()
                    );
                }
            }
        }
    }

    Ok(())
}

fn print_report(report: &DispatchReport) {
    let tick = if report.errors == 0 {
        green("✔")
    } else {
        red("✘")
    };
    eprintln!(
        "{tick} Processing complete: {} successful, {} errors  {}",
        bold(&report.processed.to_string()),
        report.errors,
        dim(&format!("{}ms", report.duration_ms)),
    );
    if report.undelivered > 0 {
        eprintln!(
            "  {} {} delivered, {} not delivered",
            yellow("⚠"),
            report.delivered,
            report.undelivered
        );
    }
}
