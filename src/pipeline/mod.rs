//! Pipeline stages for form extraction.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested alone and the PDF or OCR backend can be swapped without touching
//! field parsing.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ source ──▶ acquire ─┬──────────────────────────▶ normalize ──▶ fields
//! (path)    (pdfium)   (≥40ch?) └─▶ preprocess ──▶ ocr ─────▶ (cleanup)    (regex table)
//!                                   (binarise)    (tesseract)
//! ```
//!
//! 1. [`input`]      — validate the user-supplied path before pdfium sees it
//! 2. [`source`]     — page access: text layer and rasterisation via pdfium;
//!    blocking, so callers run it in `spawn_blocking`
//! 3. [`acquire`]    — text layer first, OCR fallback for sparse pages
//! 4. [`preprocess`] — grayscale, contrast, two-threshold binarisation
//! 5. [`ocr`]        — lazily-initialised recognition engine handle
//! 6. [`normalize`]  — whitespace cleanup applied once per page
//! 7. [`fields`]     — rule table mapping normalised text to a `ChildRecord`

pub mod acquire;
pub mod fields;
pub mod input;
pub mod normalize;
pub mod ocr;
pub mod preprocess;
pub mod source;
