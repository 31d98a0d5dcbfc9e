//! Text acquisition: text layer first, OCR fallback for scanned pages.
//!
//! Digitally-filled forms carry a complete text layer and need no OCR at
//! all. Scanned forms have either nothing or a few stray characters (page
//! numbers, scanner watermarks). A page whose trimmed text layer reaches
//! `min_text_chars` is trusted as-is; anything shorter is rendered,
//! cleaned and recognised.
//!
//! Acquisition never fails: a page that can be neither read nor recognised
//! yields empty text tagged [`TextSource::Unavailable`], so downstream still
//! emits a (blank) record for it and page counts stay aligned with the PDF.

use crate::config::ExtractionConfig;
use crate::error::PageError;
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::preprocess::preprocess;
use crate::pipeline::source::PageSource;
use crate::record::TextSource;
use std::sync::Arc;
use tracing::{debug, warn};

/// Text for one page plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub text: String,
    pub source: TextSource,
}

impl PageText {
    fn unavailable() -> Self {
        Self {
            text: String::new(),
            source: TextSource::Unavailable,
        }
    }
}

/// Acquire the text of page `index` (0-based).
pub async fn acquire_page_text(
    source: &Arc<dyn PageSource>,
    index: usize,
    engine: &OcrEngine,
    config: &ExtractionConfig,
) -> PageText {
    let page_num = index + 1;

    // ── Text layer ───────────────────────────────────────────────────────
    let layer = {
        let source = Arc::clone(source);
        tokio::task::spawn_blocking(move || source.text_layer(index)).await
    };
    match layer {
        Ok(Ok(text)) if text.trim().chars().count() >= config.min_text_chars => {
            debug!("Page {}: using text layer", page_num);
            return PageText {
                text,
                source: TextSource::TextLayer,
            };
        }
        Ok(Ok(text)) => debug!(
            "Page {}: text layer too short ({} chars), falling back to OCR",
            page_num,
            text.trim().chars().count()
        ),
        Ok(Err(e)) => debug!("{}; falling back to OCR", e),
        Err(e) => warn!("Page {}: text layer task panicked: {}", page_num, e),
    }

    // ── OCR ──────────────────────────────────────────────────────────────
    match recognise_page(source, index, engine, config).await {
        Ok(text) => PageText {
            text,
            source: TextSource::Ocr,
        },
        Err(e) => {
            warn!("{}", e);
            PageText::unavailable()
        }
    }
}

async fn recognise_page(
    source: &Arc<dyn PageSource>,
    index: usize,
    engine: &OcrEngine,
    config: &ExtractionConfig,
) -> Result<String, PageError> {
    let page_num = index + 1;
    let scale = config.render_scale;
    let max_pixels = config.max_rendered_pixels;
    let settings = config.preprocess;

    let source = Arc::clone(source);
    let bitmap = tokio::task::spawn_blocking(move || {
        source
            .render(index, scale, max_pixels)
            .map(|image| preprocess(&image, &settings))
    })
    .await
    .map_err(|e| PageError::RenderFailed {
        page: page_num,
        detail: format!("render task panicked: {}", e),
    })??;

    engine
        .recognize(bitmap)
        .await
        .map_err(|e| PageError::RecognitionFailed {
            page: page_num,
            detail: e.to_string(),
        })
}
