//! Progress-callback trait for page, file and batch events.
//!
//! Inject an [`Arc<dyn IntakeProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through a batch.
//!
//! Callers can forward events to a terminal progress bar, a channel feeding a
//! web UI, or a log. The library does not need to know which. All methods
//! have no-op defaults so implementors override only what they display.
//!
//! # Example
//!
//! ```rust
//! use child_intake::{IntakeProgressCallback, ExtractionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter(AtomicUsize);
//!
//! impl IntakeProgressCallback for PageCounter {
//!     fn on_page(&self, percent: u8, page_num: usize, total_pages: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}/{total_pages} ({percent}%)");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(PageCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::outcome::{BatchSummary, OutcomeEntry};
use std::sync::Arc;

/// Called by the document processor and batch controller as work proceeds.
///
/// Events are delivered from whichever task drives the batch, one at a time;
/// implementations still need to be `Send + Sync` because the callback is
/// shared with blocking tasks and the control side.
pub trait IntakeProgressCallback: Send + Sync {
    /// Called once before the first file is opened.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before a file is opened.
    ///
    /// # Arguments
    /// * `file_num`    — 1-indexed position in the batch
    /// * `total_files` — batch size
    /// * `file_name`   — display name of the file
    fn on_file_start(&self, file_num: usize, total_files: usize, file_name: &str) {
        let _ = (file_num, total_files, file_name);
    }

    /// Called after each page has been extracted.
    ///
    /// # Arguments
    /// * `percent`     — progress within the current file, 0–100
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — pages in the current file
    fn on_page(&self, percent: u8, page_num: usize, total_pages: usize) {
        let _ = (percent, page_num, total_pages);
    }

    /// Whole-batch progress, 0.0–100.0. Never decreases within a run.
    fn on_batch_progress(&self, percent: f32) {
        let _ = percent;
    }

    /// A new skip/error entry was appended to the batch outcome.
    fn on_entry(&self, entry: &OutcomeEntry) {
        let _ = entry;
    }

    /// Called after the last record of a file has been handled.
    fn on_file_complete(&self, file_num: usize, total_files: usize, records: usize) {
        let _ = (file_num, total_files, records);
    }

    /// Called once when the batch ends, whether it completed or was stopped.
    fn on_batch_complete(&self, summary: &BatchSummary) {
        let _ = summary;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl IntakeProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn IntakeProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        pages: AtomicUsize,
        entries: AtomicUsize,
        last_percent: Mutex<f32>,
    }

    impl IntakeProgressCallback for TrackingCallback {
        fn on_page(&self, _percent: u8, _page_num: usize, _total_pages: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_progress(&self, percent: f32) {
            *self.last_percent.lock().unwrap() = percent;
        }

        fn on_entry(&self, _entry: &OutcomeEntry) {
            self.entries.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_file_start(1, 2, "a.pdf");
        cb.on_page(50, 1, 2);
        cb.on_batch_progress(25.0);
        cb.on_entry(&OutcomeEntry::new("a.pdf", "duplicate", Some("Ravi")));
        cb.on_file_complete(1, 2, 2);
        cb.on_batch_complete(&BatchSummary::default());
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_page(50, 1, 2);
        tracker.on_page(100, 2, 2);
        tracker.on_batch_progress(100.0);
        tracker.on_entry(&OutcomeEntry::new("b.pdf", "backend down", None));

        assert_eq!(tracker.pages.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.entries.load(Ordering::SeqCst), 1);
        assert_eq!(*tracker.last_percent.lock().unwrap(), 100.0);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(1);
        cb.on_page(100, 1, 1);
    }
}
