//! Per-document extraction: one record per page, produced lazily.
//!
//! ## Why lazy?
//!
//! The batch controller has to check for stop before every save. Producing
//! records one at a time (instead of extracting a whole document up front)
//! means a stop never pays for pages nobody will save, and a pause takes
//! effect between pages rather than after the whole file.
//!
//! [`DocumentRun`] is a small state machine:
//!
//! ```text
//! Pending ─▶ Acquiring(0) ─▶ Extracting(0) ─▶ Acquiring(1) ─▶ … ─▶ Complete
//!    │            ▲
//!    └────────────┴──── stop at a checkpoint ──────────────────────▶ Stopped
//! ```
//!
//! Each page is preceded by a control checkpoint. Pages that cannot be read
//! still yield a record (every field empty), so record *i* always belongs to
//! page *i + 1*.

use crate::config::ExtractionConfig;
use crate::control::{Checkpoint, ControlToken};
use crate::error::IntakeError;
use crate::pipeline::acquire::acquire_page_text;
use crate::pipeline::fields::FieldExtractor;
use crate::pipeline::input;
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::source::{DocumentLoader, PageSource, PdfiumLoader};
use crate::record::ChildRecord;
use futures::stream;
use serde::Serialize;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::{debug, info};

/// A boxed stream of extracted records, in page order.
pub type RecordStream = Pin<Box<dyn Stream<Item = ChildRecord> + Send>>;

/// Where a [`DocumentRun`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Pending,
    /// Reading or recognising the text of page `i` (0-based).
    Acquiring(usize),
    /// Page `i` has been handed to the field extractor.
    Extracting(usize),
    Complete,
    Stopped,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOutput {
    pub records: Vec<ChildRecord>,
    pub stopped: bool,
}

/// One-shot extraction over the pages of a single document.
pub struct DocumentRun {
    source: Arc<dyn PageSource>,
    engine: OcrEngine,
    extractor: Arc<FieldExtractor>,
    config: ExtractionConfig,
    token: ControlToken,
    phase: RunPhase,
}

impl DocumentRun {
    pub fn new(
        source: Arc<dyn PageSource>,
        engine: OcrEngine,
        extractor: Arc<FieldExtractor>,
        config: ExtractionConfig,
        token: ControlToken,
    ) -> Self {
        Self {
            source,
            engine,
            extractor,
            config,
            token,
            phase: RunPhase::Pending,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// True once the run ended because of a stop request.
    pub fn was_stopped(&self) -> bool {
        self.phase == RunPhase::Stopped
    }

    pub fn page_count(&self) -> usize {
        self.source.page_count()
    }

    /// Produce the record for the next page, or `None` when the document is
    /// exhausted or a stop was requested.
    pub async fn next_record(&mut self) -> Option<ChildRecord> {
        let index = match self.phase {
            RunPhase::Pending => 0,
            // A dropped future mid-acquire retries the same page.
            RunPhase::Acquiring(i) => i,
            RunPhase::Extracting(i) => i + 1,
            RunPhase::Complete | RunPhase::Stopped => return None,
        };

        let total = self.source.page_count();
        if index >= total {
            self.phase = RunPhase::Complete;
            debug!("{}: all {} pages extracted", self.source.name(), total);
            return None;
        }

        if self.token.checkpoint().await == Checkpoint::Stop {
            info!("{}: stopped before page {}", self.source.name(), index + 1);
            self.phase = RunPhase::Stopped;
            return None;
        }

        self.phase = RunPhase::Acquiring(index);
        let page = acquire_page_text(&self.source, index, &self.engine, &self.config).await;

        self.phase = RunPhase::Extracting(index);
        let mut record = self.extractor.extract_page(&page.text, page.source);
        record.pdf_name = self.source.name().to_string();

        let page_num = index + 1;
        let percent = (page_num * 100 / total) as u8;
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_page(percent, page_num, total);
        }
        debug!(
            "{}: page {}/{} → {} missing fields",
            self.source.name(),
            page_num,
            total,
            record.missing_fields().len()
        );

        Some(record)
    }

    /// Drain the run into memory.
    pub async fn collect(mut self) -> DocumentOutput {
        let mut records = Vec::with_capacity(self.page_count());
        while let Some(record) = self.next_record().await {
            records.push(record);
        }
        DocumentOutput {
            records,
            stopped: self.was_stopped(),
        }
    }

    /// Turn the run into a `Stream` of records.
    pub fn into_stream(self) -> RecordStream {
        Box::pin(stream::unfold(self, |mut run| async move {
            run.next_record().await.map(|record| (record, run))
        }))
    }
}

/// Open a document on the blocking pool.
pub(crate) async fn open_document(
    loader: &Arc<dyn DocumentLoader>,
    path: &Path,
) -> Result<Arc<dyn PageSource>, IntakeError> {
    let loader = Arc::clone(loader);
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || loader.open(&path))
        .await
        .map_err(|e| IntakeError::Internal(format!("Open task panicked: {}", e)))?
}

/// Extract every page of one PDF without persisting anything.
///
/// # Example
/// ```rust,no_run
/// use child_intake::{extract_records, ExtractionConfig, OcrEngine};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExtractionConfig::default();
/// let engine = OcrEngine::from_settings(config.ocr.clone());
/// let output = extract_records("form.pdf", &engine, &config).await?;
/// for record in &output.records {
///     println!("{} ({})", record.name, record.child_number);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn extract_records(
    path: impl AsRef<Path>,
    engine: &OcrEngine,
    config: &ExtractionConfig,
) -> Result<DocumentOutput, IntakeError> {
    let resolved = input::resolve_local(path.as_ref())?;
    info!("Extracting records: {}", resolved.path().display());
    run_single(resolved.path(), engine, config).await
}

/// Extract every page of an in-memory PDF (e.g. an upload).
///
/// The bytes are written to a temporary file that is removed before this
/// function returns. Records carry `file_name` as their `pdf_name`.
pub async fn extract_records_from_bytes(
    bytes: &[u8],
    file_name: &str,
    engine: &OcrEngine,
    config: &ExtractionConfig,
) -> Result<DocumentOutput, IntakeError> {
    let resolved = input::spill_bytes(bytes, file_name).await?;
    info!("Extracting records from upload: {}", file_name);
    run_single(resolved.path(), engine, config).await
}

async fn run_single(
    path: &Path,
    engine: &OcrEngine,
    config: &ExtractionConfig,
) -> Result<DocumentOutput, IntakeError> {
    let loader: Arc<dyn DocumentLoader> = Arc::new(PdfiumLoader::new(config.password.clone()));
    let source = open_document(&loader, path).await?;
    let extractor = Arc::new(FieldExtractor::new(&config.known_centres));
    let run = DocumentRun::new(
        source,
        engine.clone(),
        extractor,
        config.clone(),
        ControlToken::new(),
    );
    Ok(run.collect().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;
    use crate::record::TextSource;
    use futures::StreamExt;
    use image::DynamicImage;

    struct TextPages {
        pages: Vec<&'static str>,
    }

    impl PageSource for TextPages {
        fn name(&self) -> &str {
            "intake.pdf"
        }
        fn page_count(&self) -> usize {
            self.pages.len()
        }
        fn text_layer(&self, index: usize) -> Result<String, PageError> {
            Ok(self.pages[index].to_string())
        }
        fn render(&self, index: usize, _: f32, _: u32) -> Result<DynamicImage, PageError> {
            Err(PageError::RenderFailed {
                page: index + 1,
                detail: "no bitmap".into(),
            })
        }
    }

    const PAGE_1: &str = "Child Name: Ravi Kumar\nChild Number: 101\nGender: M\nDOB: 01/02/2015";
    const PAGE_2: &str = "Child Name: Sita Devi\nChild Number: 102\nGender: F\nDOB: 03/04/2016";

    fn run_over(pages: Vec<&'static str>, token: ControlToken) -> DocumentRun {
        DocumentRun::new(
            Arc::new(TextPages { pages }),
            OcrEngine::unavailable(Default::default()),
            Arc::new(FieldExtractor::default()),
            ExtractionConfig::default(),
            token,
        )
    }

    #[tokio::test]
    async fn one_record_per_page_in_order() {
        let out = run_over(vec![PAGE_1, PAGE_2], ControlToken::new()).collect().await;
        assert!(!out.stopped);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].name, "Ravi Kumar");
        assert_eq!(out.records[1].child_number, "102");
        assert!(out.records.iter().all(|r| r.pdf_name == "intake.pdf"));
        assert!(out.records.iter().all(|r| r.text_source == TextSource::TextLayer));
    }

    #[tokio::test]
    async fn unreadable_page_still_yields_blank_record() {
        let out = run_over(vec!["scan", PAGE_2], ControlToken::new()).collect().await;
        assert_eq!(out.records.len(), 2);
        assert!(out.records[0].is_blank());
        assert_eq!(out.records[0].text_source, TextSource::Unavailable);
    }

    #[tokio::test]
    async fn stop_ends_run_before_next_page() {
        let token = ControlToken::new();
        token.begin();
        let mut run = run_over(vec![PAGE_1, PAGE_2], token.clone());

        assert!(run.next_record().await.is_some());
        token.stop();
        assert!(run.next_record().await.is_none());
        assert!(run.was_stopped());
        assert!(run.next_record().await.is_none(), "a run is one-shot");
    }

    #[tokio::test]
    async fn stream_yields_same_records() {
        let records: Vec<_> = run_over(vec![PAGE_1, PAGE_2], ControlToken::new())
            .into_stream()
            .collect()
            .await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name, "Sita Devi");
    }

    #[tokio::test]
    async fn empty_document_completes_immediately() {
        let mut run = run_over(vec![], ControlToken::new());
        assert!(run.next_record().await.is_none());
        assert_eq!(run.phase(), RunPhase::Complete);
    }
}
