//! CLI binary for child-intake.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, picks a record store, runs one batch and prints the
//! summary.

use anyhow::{Context, Result};
use child_intake::{
    extract_records, write_summary, BatchController, BatchSummary, ChildRecord,
    ExtractionConfig, HttpRecordStore, IntakeProgressCallback, JsonlRecordStore, OcrEngine,
    OutcomeEntry, ProgressCallback, RecordStore, SaveStatus, StoreError,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
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

/// Batch-wide progress bar plus a live skip/error list printed above it.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}%  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(100);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl IntakeProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.println(format!(
            "{} {}",
            bold("◆"),
            bold(&format!("Processing {total_files} files…"))
        ));
    }

    fn on_file_start(&self, file_num: usize, total_files: usize, file_name: &str) {
        self.bar.set_prefix(format!("File {file_num}/{total_files}"));
        self.bar.set_message(file_name.to_string());
    }

    fn on_page(&self, _percent: u8, page_num: usize, total_pages: usize) {
        self.bar
            .set_message(format!("page {page_num}/{total_pages}"));
    }

    fn on_batch_progress(&self, percent: f32) {
        self.bar.set_position(percent.round() as u64);
    }

    fn on_entry(&self, entry: &OutcomeEntry) {
        let marker = if entry.reason == "duplicate" {
            yellow("≡")
        } else {
            red("✗")
        };
        let name = entry
            .name
            .as_deref()
            .map(|n| format!(" ({n})"))
            .unwrap_or_default();
        self.bar.println(format!(
            "  {} {}{}  {}",
            marker,
            entry.file,
            dim(&name),
            entry.reason
        ));
    }

    fn on_file_complete(&self, _file_num: usize, _total_files: usize, records: usize) {
        self.bar.println(format!(
            "  {} {}",
            green("✓"),
            dim(&format!("{records} records"))
        ));
    }

    fn on_batch_complete(&self, _summary: &BatchSummary) {
        self.bar.finish_and_clear();
    }
}

// ── Record store selection ───────────────────────────────────────────────────

enum CliStore {
    Http(HttpRecordStore),
    Jsonl(JsonlRecordStore),
}

impl RecordStore for CliStore {
    async fn save(&self, record: &ChildRecord) -> Result<SaveStatus, StoreError> {
        match self {
            CliStore::Http(store) => store.save(record).await,
            CliStore::Jsonl(store) => store.save(record).await,
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Upload a folder of scanned forms to the backend
  child-intake scans/*.pdf --backend-url http://localhost:5000

  # Group records into a sheet
  child-intake scans/*.pdf --sheet 2024-purnea

  # Offline: append to a local JSONL file
  child-intake scans/*.pdf --jsonl records.jsonl

  # Just look at what would be extracted
  child-intake --extract-only form.pdf

  # Accept bare facility names as a low-confidence centre
  child-intake scans/*.pdf --known-centre Purnea --known-centre Gaya

ENVIRONMENT VARIABLES:
  INTAKE_BACKEND_URL   Registration backend root URL
  INTAKE_SHEET_ID      Sheet to file records under
  INTAKE_KNOWN_CENTRES Comma-separated fallback centre names
  PDFIUM_LIB_PATH      Path to libpdfium
  RUST_LOG             Log filter (overrides -v / -q)

Press Ctrl-C once to stop after the current page; nothing after that point
is saved.
"#;

/// Extract child-registration records from scanned PDF forms.
#[derive(Parser, Debug)]
#[command(
    name = "child-intake",
    version,
    about = "Extract child-registration records from scanned PDF forms",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files to process, in order.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Registration backend root URL.
    #[arg(long, env = "INTAKE_BACKEND_URL", default_value = "http://localhost:5000")]
    backend_url: String,

    /// File records under this sheet (POST /sheets/{id}/records).
    #[arg(long, env = "INTAKE_SHEET_ID")]
    sheet: Option<String>,

    /// Append records to this JSONL file instead of the backend.
    #[arg(long, env = "INTAKE_JSONL", conflicts_with = "sheet")]
    jsonl: Option<PathBuf>,

    /// Print extracted records as JSON; do not persist anything.
    #[arg(long)]
    extract_only: bool,

    /// Print the batch summary as JSON.
    #[arg(long, env = "INTAKE_JSON")]
    json: bool,

    /// Also write the batch summary to this file.
    #[arg(long, env = "INTAKE_SUMMARY")]
    summary: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "INTAKE_PASSWORD")]
    password: Option<String>,

    /// Minimum text-layer length before OCR is skipped.
    #[arg(long, env = "INTAKE_MIN_TEXT_CHARS", default_value_t = 40)]
    min_text_chars: usize,

    /// Render scale for OCR (1.0–8.0, relative to 72 DPI).
    #[arg(long, env = "INTAKE_SCALE", default_value_t = 4.0)]
    scale: f32,

    /// Tesseract language(s), e.g. eng or eng+hin.
    #[arg(long, env = "INTAKE_OCR_LANG", default_value = "eng")]
    lang: String,

    /// Directory containing *.traineddata.
    #[arg(long, env = "INTAKE_TESSDATA")]
    tessdata: Option<String>,

    /// Facility name accepted as a low-confidence centre (repeatable).
    #[arg(long = "known-centre", env = "INTAKE_KNOWN_CENTRES", value_delimiter = ',')]
    known_centres: Vec<String>,

    /// Backend request timeout in seconds.
    #[arg(long, env = "INTAKE_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Disable progress bar.
    #[arg(long, env = "INTAKE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "INTAKE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "INTAKE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar carries the per-file feedback; keep library INFO
    // logs out of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.extract_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    #[cfg(not(feature = "tesseract"))]
    tracing::warn!("Built without the `tesseract` feature: image-only pages will yield blank records");

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn IntakeProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let engine = OcrEngine::from_settings(config.ocr.clone());

    // ── Extract-only mode ────────────────────────────────────────────────
    if cli.extract_only {
        let mut records = Vec::new();
        for path in &cli.files {
            match extract_records(path, &engine, &config).await {
                Ok(output) => records.extend(output.records),
                Err(e) => eprintln!("{} {}: {}", red("✗"), path.display(), e),
            }
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&records).context("Failed to serialise records")?
        );
        return Ok(());
    }

    // ── Store ────────────────────────────────────────────────────────────
    let store = match cli.jsonl {
        Some(ref path) => CliStore::Jsonl(
            JsonlRecordStore::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        None => CliStore::Http(
            HttpRecordStore::new(
                &cli.backend_url,
                cli.sheet.as_deref(),
                Duration::from_secs(cli.timeout),
            )
            .context("Failed to build HTTP client")?,
        ),
    };

    // ── Run batch ────────────────────────────────────────────────────────
    let controller = BatchController::new(store, engine, config);
    let handle = controller.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && handle.stop() {
            eprintln!("{} stopping after the current page…", yellow("■"));
        }
    });

    let summary = controller
        .start(&cli.files)
        .await
        .context("Batch failed to start")?;

    if let Some(ref path) = cli.summary {
        write_summary(&summary, path)
            .await
            .context("Failed to write summary")?;
    }

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        print_summary(&summary, show_progress);
    }

    if !cli.files.is_empty() && summary.files_failed == cli.files.len() {
        anyhow::bail!("No file could be opened");
    }
    Ok(())
}

fn print_summary(summary: &BatchSummary, entries_already_shown: bool) {
    let headline = if summary.was_stopped {
        yellow("■ Stopped")
    } else if summary.total_errors + summary.files_failed > 0 {
        yellow("⚠ Done")
    } else {
        green("✔ Done")
    };
    eprintln!(
        "{}  {} saved ({} partial)  {} duplicates  {} errors  {} skipped",
        headline,
        bold(&summary.total_saved.to_string()),
        summary.total_partial,
        summary.total_duplicates,
        red(&summary.total_errors.to_string()),
        summary.total_skipped,
    );
    if !entries_already_shown {
        for entry in &summary.entries {
            match entry.name {
                Some(ref name) => eprintln!("  {}  {} ({})", entry.file, entry.reason, name),
                None => eprintln!("  {}  {}", entry.file, entry.reason),
            }
        }
    }
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .min_text_chars(cli.min_text_chars)
        .render_scale(cli.scale)
        .ocr_language(cli.lang.clone())
        .known_centres(cli.known_centres.iter().map(|s| s.trim().to_string()));

    if let Some(ref dir) = cli.tessdata {
        builder = builder.tessdata_path(dir.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
