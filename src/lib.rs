//! # child-intake
//!
//! Extract child-registration records from scanned PDF forms and file them
//! with a registration backend.
//!
//! ## Why this crate?
//!
//! Field workers photograph or scan paper registration forms and upload them
//! in batches. Some PDFs carry a usable text layer (forms filled on a
//! computer); most are image-only scans. This crate reads the text layer
//! where it exists, falls back to OCR where it does not, and maps the text
//! onto a fixed set of fields by anchoring on the form's printed labels.
//! One PDF page is one form, and yields one record.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF files
//!  │
//!  ├─ 1. Input     validate path (exists, readable, %PDF magic)
//!  ├─ 2. Source    open via pdfium (blocking, spawn_blocking)
//!  ├─ 3. Acquire   text layer ≥ 40 chars? use it : render → binarise → OCR
//!  ├─ 4. Normalise whitespace and invisible characters
//!  ├─ 5. Extract   label-anchored rule table → ChildRecord
//!  └─ 6. Persist   RecordStore::save → saved / duplicate / error tally
//! ```
//!
//! Steps 2–5 run per page inside a [`DocumentRun`]; step 6 and the
//! pause/resume/stop control surface live in the [`BatchController`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use child_intake::{BatchController, ExtractionConfig, JsonlRecordStore, OcrEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .known_centres(["Purnea", "Gaya"])
//!         .build()?;
//!     let engine = OcrEngine::from_settings(config.ocr.clone());
//!     let store = JsonlRecordStore::open("records.jsonl").await?;
//!
//!     let controller = BatchController::new(store, engine, config);
//!     let summary = controller.start(&["form-01.pdf", "form-02.pdf"]).await?;
//!     eprintln!(
//!         "{} saved, {} duplicates, {} errors",
//!         summary.total_saved, summary.total_duplicates, summary.total_errors
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature     | Default | Description |
//! |-------------|---------|-------------|
//! | `cli`       | on      | Enables the `child-intake` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `tesseract` | off     | Links libtesseract for OCR. Without it, image-only pages yield blank records |
//!
//! pdfium is loaded at runtime: set `PDFIUM_LIB_PATH`, place the library in
//! the working directory, or install it system-wide.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod control;
pub mod document;
pub mod error;
pub mod outcome;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{write_summary, BatchController, BatchHandle};
pub use config::{ExtractionConfig, ExtractionConfigBuilder, OcrSettings, PreprocessSettings};
pub use control::{Checkpoint, ControlToken, RunState};
pub use document::{
    extract_records, extract_records_from_bytes, DocumentOutput, DocumentRun, RecordStream,
    RunPhase,
};
pub use error::{IntakeError, OcrError, PageError, StoreError};
pub use outcome::{BatchOutcome, BatchSummary, OutcomeEntry};
pub use pipeline::fields::FieldExtractor;
pub use pipeline::normalize::normalize_text;
pub use pipeline::ocr::{OcrEngine, Recognizer};
pub use pipeline::source::{DocumentLoader, PageSource, PdfiumLoader};
pub use progress::{IntakeProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{ChildRecord, Field, Gender, TextSource};
pub use store::{HttpRecordStore, JsonlRecordStore, RecordStore, SaveStatus};
