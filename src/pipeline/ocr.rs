//! Optical character recognition of preprocessed page bitmaps.
//!
//! ## Why one engine per batch?
//!
//! Creating a Tesseract instance loads the language model from disk, which
//! costs far more than recognising a single form page. [`OcrEngine`] is a
//! cheap, cloneable handle around one lazily-created [`Recognizer`]: the
//! first call that actually needs OCR creates it, every later call (for any
//! page of any document that holds a clone) reuses it. Pages with a usable
//! text layer never trigger creation at all.
//!
//! ## Why a Mutex?
//!
//! A Tesseract handle is stateful (`set_image` → `recognize` → `get_text`)
//! and not re-entrant. Recognition runs in `spawn_blocking`, and the mutex
//! serialises pages that might otherwise share the handle concurrently.
//!
//! The recogniser is a trait so tests can count initialisations and calls
//! without a native OCR library installed.

use crate::config::OcrSettings;
use crate::error::OcrError;
use image::GrayImage;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Turns one grayscale bitmap into text.
pub trait Recognizer: Send {
    fn recognize(&mut self, image: &GrayImage) -> Result<String, OcrError>;
}

type Factory = dyn Fn(&OcrSettings) -> Result<Box<dyn Recognizer>, OcrError> + Send + Sync;

/// Shared, lazily-initialised recognition engine.
#[derive(Clone)]
pub struct OcrEngine {
    settings: OcrSettings,
    factory: Arc<Factory>,
    instance: Arc<OnceCell<Mutex<Box<dyn Recognizer>>>>,
}

impl fmt::Debug for OcrEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrEngine")
            .field("settings", &self.settings)
            .field("initialised", &self.is_initialised())
            .finish()
    }
}

impl OcrEngine {
    /// Engine whose recogniser is created by `factory` on first use.
    pub fn with_factory<F>(settings: OcrSettings, factory: F) -> Self
    where
        F: Fn(&OcrSettings) -> Result<Box<dyn Recognizer>, OcrError> + Send + Sync + 'static,
    {
        Self {
            settings,
            factory: Arc::new(factory),
            instance: Arc::new(OnceCell::new()),
        }
    }

    /// Tesseract-backed engine (LSTM only, single-block segmentation).
    #[cfg(feature = "tesseract")]
    pub fn tesseract(settings: OcrSettings) -> Self {
        Self::with_factory(settings, |s| {
            Ok(Box::new(TesseractRecognizer::new(s.clone())?) as Box<dyn Recognizer>)
        })
    }

    /// The best engine compiled into this build.
    ///
    /// Without the `tesseract` feature every recognition fails with
    /// [`OcrError::Unavailable`], so image-only pages yield empty records.
    pub fn from_settings(settings: OcrSettings) -> Self {
        #[cfg(feature = "tesseract")]
        {
            Self::tesseract(settings)
        }
        #[cfg(not(feature = "tesseract"))]
        {
            Self::unavailable(settings)
        }
    }

    /// Engine that never recognises anything.
    pub fn unavailable(settings: OcrSettings) -> Self {
        Self::with_factory(settings, |_| Err(OcrError::Unavailable))
    }

    pub fn settings(&self) -> &OcrSettings {
        &self.settings
    }

    /// Whether the underlying recogniser has been created yet.
    pub fn is_initialised(&self) -> bool {
        self.instance.get().is_some()
    }

    /// Recognise one bitmap on the blocking pool.
    ///
    /// A failed initialisation is not cached: the next call retries, so a
    /// transient failure (e.g. tessdata on a slow mount) does not disable
    /// OCR for the rest of the batch.
    pub async fn recognize(&self, image: GrayImage) -> Result<String, OcrError> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.recognize_blocking(&image))
            .await
            .map_err(|e| OcrError::RecognitionFailed(format!("OCR task panicked: {}", e)))?
    }

    fn recognize_blocking(&self, image: &GrayImage) -> Result<String, OcrError> {
        let cell = self.instance.get_or_try_init(|| {
            info!(
                "Initialising OCR engine (language: {})",
                self.settings.language
            );
            (self.factory)(&self.settings).map(Mutex::new)
        })?;

        let mut recognizer = cell
            .lock()
            .map_err(|_| OcrError::RecognitionFailed("OCR engine lock poisoned".into()))?;

        let text = recognizer.recognize(image)?;
        debug!(
            "Recognised {}x{} bitmap → {} chars",
            image.width(),
            image.height(),
            text.len()
        );
        Ok(text)
    }
}

// ── Tesseract ────────────────────────────────────────────────────────────────

#[cfg(feature = "tesseract")]
pub use self::tess::TesseractRecognizer;

#[cfg(feature = "tesseract")]
mod tess {
    use super::Recognizer;
    use crate::config::OcrSettings;
    use crate::error::OcrError;
    use image::{GrayImage, ImageFormat};
    use std::io::Cursor;
    use tesseract::{OcrEngineMode, PageSegMode, Tesseract};

    /// A configured Tesseract handle.
    ///
    /// The `tesseract` crate's builder methods consume `self`; a failure part
    /// way through a recognition therefore drops the handle, and it is
    /// rebuilt from `settings` on the next page.
    pub struct TesseractRecognizer {
        settings: OcrSettings,
        handle: Option<Tesseract>,
    }

    impl TesseractRecognizer {
        pub fn new(settings: OcrSettings) -> Result<Self, OcrError> {
            let handle = Some(build(&settings)?);
            Ok(Self { settings, handle })
        }
    }

    fn build(settings: &OcrSettings) -> Result<Tesseract, OcrError> {
        let init = |e: &dyn std::fmt::Display| OcrError::InitFailed(e.to_string());

        let mut tess = Tesseract::new_with_oem(
            settings.datapath.as_deref(),
            Some(settings.language.as_str()),
            OcrEngineMode::LstmOnly,
        )
        .map_err(|e| init(&e))?;

        if !settings.char_blacklist.is_empty() {
            tess = tess
                .set_variable("tessedit_char_blacklist", &settings.char_blacklist)
                .map_err(|e| init(&e))?;
        }
        let preserve = if settings.preserve_interword_spaces { "1" } else { "0" };
        tess = tess
            .set_variable("preserve_interword_spaces", preserve)
            .map_err(|e| init(&e))?;

        tess.set_page_seg_mode(PageSegMode::PsmSingleBlock);
        Ok(tess)
    }

    impl Recognizer for TesseractRecognizer {
        fn recognize(&mut self, image: &GrayImage) -> Result<String, OcrError> {
            let mut png = Vec::new();
            image
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                .map_err(|e| OcrError::Encode(e.to_string()))?;

            let tess = match self.handle.take() {
                Some(t) => t,
                None => build(&self.settings)?,
            };

            let mut tess = tess
                .set_image_from_mem(&png)
                .map_err(|e| OcrError::RecognitionFailed(e.to_string()))?
                .recognize()
                .map_err(|e| OcrError::RecognitionFailed(e.to_string()))?;

            let text = tess
                .get_text()
                .map_err(|e| OcrError::RecognitionFailed(e.to_string()))?;

            self.handle = Some(tess);
            Ok(text)
        }
    }
}
