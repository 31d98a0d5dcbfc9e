//! Page access: text layer and rasterisation via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which keeps
//! thread-local state and is not safe to drive from async contexts. Every
//! method on [`PageSource`] is blocking; callers move them onto Tokio's
//! blocking pool with `tokio::task::spawn_blocking` so worker threads never
//! stall on a 300 DPI render.
//!
//! ## Why reopen per call?
//!
//! A pdfium `PdfDocument` borrows its `Pdfium` binding and cannot cross
//! threads. [`PdfiumDocument`] stores only the path and page count; each
//! call binds, loads, reads one page and drops everything. Loading a form
//! PDF is cheap next to rendering it at 4× scale.
//!
//! ## Why cap pixels as well as scale?
//!
//! Form scans are usually A4, but a stray A0 plan in a batch at scale 4
//! would produce a ~13,000 px bitmap. `max_rendered_pixels` bounds either
//! edge regardless of physical page size.
//!
//! Both traits exist so the batch layer can be driven by in-memory pages in
//! tests; production code only ever uses the pdfium implementations.

use crate::error::{IntakeError, PageError};
use crate::pipeline::input;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Random access to the pages of one opened document. All methods block.
pub trait PageSource: Send + Sync {
    /// File name used in records and outcome entries.
    fn name(&self) -> &str;

    fn page_count(&self) -> usize;

    /// Embedded text of page `index` (0-based). Empty for pure scans.
    fn text_layer(&self, index: usize) -> Result<String, PageError>;

    /// Rasterise page `index` at `scale` × 72 DPI over a white background,
    /// with neither edge exceeding `max_pixels`.
    fn render(&self, index: usize, scale: f32, max_pixels: u32)
        -> Result<DynamicImage, PageError>;
}

/// Opens documents. Blocking.
pub trait DocumentLoader: Send + Sync {
    fn open(&self, path: &Path) -> Result<Arc<dyn PageSource>, IntakeError>;
}

// ── pdfium ───────────────────────────────────────────────────────────────────

/// Bind to a pdfium library: `PDFIUM_LIB_PATH`, then next to the working
/// directory, then the system search path.
pub fn bind_pdfium() -> Result<Pdfium, IntakeError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.trim().is_empty() => Pdfium::bind_to_library(path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| IntakeError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

/// Loader for real PDF files. Paths are validated (existence, `%PDF`
/// magic) before pdfium sees them.
#[derive(Debug, Clone, Default)]
pub struct PdfiumLoader {
    password: Option<String>,
}

impl PdfiumLoader {
    pub fn new(password: Option<String>) -> Self {
        Self { password }
    }
}

impl DocumentLoader for PdfiumLoader {
    fn open(&self, path: &Path) -> Result<Arc<dyn PageSource>, IntakeError> {
        let resolved = input::resolve_local(path)?;
        let doc = PdfiumDocument::open(resolved.path(), self.password.clone())?;
        Ok(Arc::new(doc))
    }
}

/// A PDF on disk whose pages are loaded on demand.
#[derive(Debug, Clone)]
pub struct PdfiumDocument {
    path: PathBuf,
    password: Option<String>,
    name: String,
    page_count: usize,
}

impl PdfiumDocument {
    /// Validate that pdfium can open the file and count its pages.
    pub fn open(path: &Path, password: Option<String>) -> Result<Self, IntakeError> {
        let pdfium = bind_pdfium()?;
        let page_count = {
            let document = load(&pdfium, path, password.as_deref())?;
            let count = document.pages().len() as usize;
            count
        };
        info!("PDF loaded: {} ({} pages)", path.display(), page_count);

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            path: path.to_path_buf(),
            password,
            name,
            page_count,
        })
    }

    fn with_page<T>(
        &self,
        index: usize,
        on_err: fn(usize, String) -> PageError,
        f: impl FnOnce(&PdfPage<'_>) -> Result<T, PageError>,
    ) -> Result<T, PageError> {
        let page_num = index + 1;
        let pdfium = bind_pdfium().map_err(|e| on_err(page_num, e.to_string()))?;
        let document = load(&pdfium, &self.path, self.password.as_deref())
            .map_err(|e| on_err(page_num, e.to_string()))?;
        let pages = document.pages();
        let page = u16::try_from(index)
            .ok()
            .and_then(|i| pages.get(i).ok())
            .ok_or_else(|| {
                on_err(
                    page_num,
                    format!("page out of range (total={})", self.page_count),
                )
            })?;
        f(&page)
    }
}

impl PageSource for PdfiumDocument {
    fn name(&self) -> &str {
        &self.name
    }

    fn page_count(&self) -> usize {
        self.page_count
    }

    fn text_layer(&self, index: usize) -> Result<String, PageError> {
        let on_err = |page, detail| PageError::TextLayerFailed { page, detail };
        self.with_page(index, on_err, |page| {
            let text = page
                .text()
                .map_err(|e| on_err(index + 1, format!("{:?}", e)))?
                .all();
            debug!("Page {} text layer: {} chars", index + 1, text.len());
            Ok(text)
        })
    }

    fn render(
        &self,
        index: usize,
        scale: f32,
        max_pixels: u32,
    ) -> Result<DynamicImage, PageError> {
        let on_err = |page, detail| PageError::RenderFailed { page, detail };
        let max = max_pixels.min(i32::MAX as u32) as i32;
        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(scale)
            .set_maximum_width(max)
            .set_maximum_height(max)
            .set_clear_color(PdfColor::WHITE);

        self.with_page(index, on_err, |page| {
            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| on_err(index + 1, format!("{:?}", e)))?;
            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                index + 1,
                image.width(),
                image.height()
            );
            Ok(image)
        })
    }
}

fn load<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, IntakeError> {
    pdfium.load_pdf_from_file(path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                IntakeError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                IntakeError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        } else {
            IntakeError::CorruptPdf {
                path: path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}
