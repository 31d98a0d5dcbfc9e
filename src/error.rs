//! Error types for the child-intake library.
//!
//! Four error types, one per failure domain:
//!
//! * [`IntakeError`] — **Fatal for one file or one call**: the document cannot
//!   be opened at all, the configuration is invalid, or a batch is already
//!   running. Inside a batch it ends processing of that file only; the next
//!   file still runs.
//!
//! * [`PageError`] — **Non-fatal**: one page could not be read or rendered.
//!   The page still yields a record (with empty fields), so it is never
//!   surfaced to callers as an `Err` from the document stream.
//!
//! * [`OcrError`] — failures inside the recognition engine. Converted into a
//!   [`PageError`] by text acquisition.
//!
//! * [`StoreError`] — the persistence collaborator rejected or failed a save.
//!   Counted per record by the batch controller; never aborts a batch.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors returned by the library's top-level entry points.
#[derive(Debug, Error)]
pub enum IntakeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the binary, install it system-wide, or\n\
set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Batch errors ──────────────────────────────────────────────────────
    /// `start()` was called while another batch is still running or paused.
    #[error("A batch is already running; stop it or wait for it to finish")]
    AlreadyRunning,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    /// The embedded text layer could not be read.
    #[error("Page {page}: text layer unreadable: {detail}")]
    TextLayerFailed { page: usize, detail: String },

    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The recognition engine failed on the rendered page.
    #[error("Page {page}: recognition failed: {detail}")]
    RecognitionFailed { page: usize, detail: String },
}

/// Errors raised by a recognition engine.
#[derive(Debug, Clone, Error)]
pub enum OcrError {
    /// The engine could not be created (missing language data, bad datapath…).
    #[error("OCR engine initialisation failed: {0}")]
    InitFailed(String),

    /// The engine was created but recognition of one image failed.
    #[error("OCR recognition failed: {0}")]
    RecognitionFailed(String),

    /// The bitmap could not be encoded for the engine.
    #[error("Failed to encode page image: {0}")]
    Encode(String),

    /// No recognition engine was compiled in.
    #[error("No OCR engine available (rebuild with `--features tesseract`)")]
    Unavailable,
}

/// Errors raised by a [`crate::store::RecordStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure (connection refused, timeout, TLS…).
    #[error("Backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a status that is neither success nor duplicate.
    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Local storage I/O failed.
    #[error("Record store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The record could not be serialised.
    #[error("Failed to serialise record: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_a_pdf_display_shows_magic() {
        let e = IntakeError::NotAPdf {
            path: PathBuf::from("scan.png"),
            magic: *b"\x89PNG",
        };
        let msg = e.to_string();
        assert!(msg.contains("scan.png"), "got: {msg}");
    }

    #[test]
    fn page_error_display_includes_page() {
        let e = PageError::RecognitionFailed {
            page: 4,
            detail: "engine crashed".into(),
        };
        assert!(e.to_string().contains("Page 4"));
        assert!(e.to_string().contains("engine crashed"));
    }

    #[test]
    fn store_status_display() {
        let e = StoreError::Status {
            status: 500,
            body: "boom".into(),
        };
        assert!(e.to_string().contains("500"));
        assert!(e.to_string().contains("boom"));
    }

    #[test]
    fn ocr_unavailable_mentions_feature() {
        assert!(OcrError::Unavailable.to_string().contains("tesseract"));
    }
}
