//! Batch orchestration: many PDFs → records → store, with pause/resume/stop.
//!
//! ## Why strictly sequential?
//!
//! Form batches are small (tens of files) and the expensive step, OCR, runs
//! through a single engine instance anyway. Handling one file, one page and
//! one save at a time keeps the outcome tally trivially consistent and makes
//! "stop" mean exactly "nothing after this point was saved".
//!
//! ## Checkpoints
//!
//! The control token is consulted before each file, before each page (inside
//! [`DocumentRun`]), before each save and after each save. A record produced
//! when stop arrives is discarded, not saved.
//!
//! ## Failure isolation
//!
//! A file that cannot be opened is recorded and skipped; a save that fails
//! is counted and the batch moves on. Only a second concurrent `start()` is
//! rejected outright.

use crate::config::ExtractionConfig;
use crate::control::{Checkpoint, ControlToken, RunState};
use crate::document::{open_document, DocumentRun};
use crate::error::IntakeError;
use crate::outcome::{BatchOutcome, BatchSummary, OutcomeEntry};
use crate::pipeline::fields::FieldExtractor;
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::source::{DocumentLoader, PageSource, PdfiumLoader};
use crate::record::ChildRecord;
use crate::store::{RecordStore, SaveStatus};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Drives one batch at a time over a [`RecordStore`].
pub struct BatchController<S: RecordStore> {
    loader: Arc<dyn DocumentLoader>,
    engine: OcrEngine,
    extractor: Arc<FieldExtractor>,
    store: S,
    config: ExtractionConfig,
    token: ControlToken,
    outcome: Arc<Mutex<BatchOutcome>>,
}

/// Control surface for a running (or idle) batch. Cheap to clone; safe to
/// use from another task, a signal handler or a UI thread.
#[derive(Debug, Clone)]
pub struct BatchHandle {
    token: ControlToken,
    outcome: Arc<Mutex<BatchOutcome>>,
}

impl BatchHandle {
    /// Suspend at the next checkpoint. No-op unless running.
    pub fn pause(&self) -> bool {
        self.token.pause()
    }

    pub fn resume(&self) -> bool {
        self.token.resume()
    }

    /// Abort at the next checkpoint. No-op when idle.
    pub fn stop(&self) -> bool {
        self.token.stop()
    }

    pub fn state(&self) -> RunState {
        self.token.state()
    }

    /// Snapshot of the current tally.
    pub fn outcome(&self) -> BatchOutcome {
        lock(&self.outcome).clone()
    }

    /// Empty the skip/error list shown to the operator. Counters are kept.
    pub fn clear_entries(&self) {
        lock(&self.outcome).entries.clear();
    }
}

fn lock(outcome: &Mutex<BatchOutcome>) -> MutexGuard<'_, BatchOutcome> {
    // A panicking callback must not wedge the control surface.
    outcome.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

enum FileResult {
    Done { records: usize },
    Stopped,
}

impl<S: RecordStore> BatchController<S> {
    /// Controller reading real PDFs through pdfium.
    pub fn new(store: S, engine: OcrEngine, config: ExtractionConfig) -> Self {
        let loader = Arc::new(PdfiumLoader::new(config.password.clone()));
        Self::with_loader(loader, store, engine, config)
    }

    /// Controller with a custom document loader.
    pub fn with_loader(
        loader: Arc<dyn DocumentLoader>,
        store: S,
        engine: OcrEngine,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            loader,
            engine,
            extractor: Arc::new(FieldExtractor::new(&config.known_centres)),
            store,
            config,
            token: ControlToken::new(),
            outcome: Arc::new(Mutex::new(BatchOutcome::default())),
        }
    }

    pub fn handle(&self) -> BatchHandle {
        BatchHandle {
            token: self.token.clone(),
            outcome: Arc::clone(&self.outcome),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &OcrEngine {
        &self.engine
    }

    /// Process `files` in order and return the final tally.
    ///
    /// # Errors
    /// Only [`IntakeError::AlreadyRunning`]. Per-file and per-record
    /// failures are reported in the returned [`BatchSummary`].
    pub async fn start<P: AsRef<Path>>(&self, files: &[P]) -> Result<BatchSummary, IntakeError> {
        if !self.token.begin() {
            return Err(IntakeError::AlreadyRunning);
        }
        let batch_start = Instant::now();
        *lock(&self.outcome) = BatchOutcome::default();

        let total = files.len();
        info!("Starting batch: {} files", total);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_start(total);
        }

        let mut stopped = false;
        for (i, path) in files.iter().enumerate() {
            let path = path.as_ref();
            if self.token.checkpoint().await == Checkpoint::Stop {
                stopped = true;
                break;
            }

            let file_num = i + 1;
            let file_name = display_name(path);
            info!("File {}/{}: {}", file_num, total, file_name);
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_file_start(file_num, total, &file_name);
            }

            // ── Open ─────────────────────────────────────────────────────
            let source = match open_document(&self.loader, path).await {
                Ok(source) => source,
                Err(e) => {
                    warn!("Cannot open {}: {}", file_name, e);
                    lock(&self.outcome).files_failed += 1;
                    self.push_entry(OutcomeEntry::new(&file_name, e.to_string(), None));
                    self.report_progress(file_num as f32, total);
                    continue;
                }
            };

            // ── Extract + save ───────────────────────────────────────────
            match self.process_file(source, &file_name, i, total).await {
                FileResult::Stopped => {
                    stopped = true;
                    break;
                }
                FileResult::Done { records } => {
                    lock(&self.outcome).files_processed += 1;
                    if records == 0 {
                        warn!("{}: no records extracted", file_name);
                        lock(&self.outcome).skipped += 1;
                        self.push_entry(OutcomeEntry::new(&file_name, "no records extracted", None));
                    }
                    if let Some(ref cb) = self.config.progress_callback {
                        cb.on_file_complete(file_num, total, records);
                    }
                    self.report_progress(file_num as f32, total);
                }
            }
        }

        let summary = lock(&self.outcome).summary(stopped);
        self.token.finish();

        info!(
            "Batch {}: {} saved ({} partial), {} duplicates, {} errors, {} skipped in {}ms",
            if stopped { "stopped" } else { "complete" },
            summary.total_saved,
            summary.total_partial,
            summary.total_duplicates,
            summary.total_errors,
            summary.total_skipped,
            batch_start.elapsed().as_millis()
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_complete(&summary);
        }
        Ok(summary)
    }

    async fn process_file(
        &self,
        source: Arc<dyn PageSource>,
        file_name: &str,
        file_index: usize,
        total_files: usize,
    ) -> FileResult {
        let mut run = DocumentRun::new(
            source,
            self.engine.clone(),
            Arc::clone(&self.extractor),
            self.config.clone(),
            self.token.clone(),
        );
        let pages = run.page_count();
        let mut records = 0usize;

        while let Some(record) = run.next_record().await {
            records += 1;

            if self.token.checkpoint().await == Checkpoint::Stop {
                debug!("{}: stop before save, discarding page {}", file_name, records);
                return FileResult::Stopped;
            }

            self.save(&record, file_name).await;

            let fraction = records as f32 / pages.max(1) as f32;
            self.report_progress(file_index as f32 + fraction, total_files);

            if self.token.checkpoint().await == Checkpoint::Stop {
                return FileResult::Stopped;
            }
        }

        if run.was_stopped() {
            FileResult::Stopped
        } else {
            FileResult::Done { records }
        }
    }

    async fn save(&self, record: &ChildRecord, file_name: &str) {
        match self.store.save(record).await {
            Ok(SaveStatus::Saved) => {
                let mut outcome = lock(&self.outcome);
                outcome.saved += 1;
                if record.is_partial() {
                    outcome.partial += 1;
                    debug!(
                        "{}: saved partial record, missing {:?}",
                        file_name,
                        record.missing_fields()
                    );
                }
            }
            Ok(SaveStatus::Duplicate) => {
                info!(
                    "{}: duplicate record {}",
                    file_name,
                    record.display_name().unwrap_or("(unnamed)")
                );
                lock(&self.outcome).duplicates += 1;
                self.push_entry(OutcomeEntry::new(
                    file_name,
                    "duplicate",
                    record.display_name(),
                ));
            }
            Err(e) => {
                warn!("{}: save failed: {}", file_name, e);
                lock(&self.outcome).errors += 1;
                self.push_entry(OutcomeEntry::new(
                    file_name,
                    e.to_string(),
                    record.display_name(),
                ));
            }
        }
    }

    fn push_entry(&self, entry: OutcomeEntry) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_entry(&entry);
        }
        lock(&self.outcome).entries.push(entry);
    }

    fn report_progress(&self, files_done: f32, total_files: usize) {
        if total_files == 0 {
            return;
        }
        let percent = (files_done / total_files as f32 * 100.0).clamp(0.0, 100.0);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_progress(percent);
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Write a batch summary as pretty JSON, atomically (temp file + rename).
pub async fn write_summary(
    summary: &BatchSummary,
    path: impl AsRef<Path>,
) -> Result<(), IntakeError> {
    let path = path.as_ref();
    let write_err = |source| IntakeError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| IntakeError::Internal(format!("summary serialisation: {}", e)))?;

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}
