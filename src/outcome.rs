//! Per-batch outcome tally and completion summary.

use serde::{Deserialize, Serialize};

/// One record or file that did not make it into the store cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeEntry {
    pub file: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl OutcomeEntry {
    pub fn new(file: impl Into<String>, reason: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            file: file.into(),
            reason: reason.into(),
            name: name.map(str::to_string),
        }
    }
}

/// Running tally for one batch. Created fresh by every `start()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub saved: usize,
    pub duplicates: usize,
    pub errors: usize,
    pub skipped: usize,
    /// Saved records with at least one empty field. Also counted in `saved`.
    pub partial: usize,
    pub files_processed: usize,
    pub files_failed: usize,
    pub entries: Vec<OutcomeEntry>,
}

impl BatchOutcome {
    pub fn summary(&self, was_stopped: bool) -> BatchSummary {
        BatchSummary {
            total_saved: self.saved,
            total_duplicates: self.duplicates,
            total_partial: self.partial,
            total_errors: self.errors,
            total_skipped: self.skipped,
            files_processed: self.files_processed,
            files_failed: self.files_failed,
            was_stopped,
            entries: self.entries.clone(),
        }
    }
}

/// What a finished (or stopped) batch reports to its caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total_saved: usize,
    pub total_duplicates: usize,
    pub total_partial: usize,
    pub total_errors: usize,
    pub total_skipped: usize,
    pub files_processed: usize,
    pub files_failed: usize,
    pub was_stopped: bool,
    pub entries: Vec<OutcomeEntry>,
}
