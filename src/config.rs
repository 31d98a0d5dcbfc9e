//! Configuration types for form extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. One struct for every knob means a
//! batch run can be logged, cloned into blocking tasks, and compared against
//! another run without chasing settings through several call sites.

use crate::error::IntakeError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for text acquisition, field extraction and batch runs.
///
/// # Example
/// ```rust
/// use child_intake::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .min_text_chars(40)
///     .render_scale(4.0)
///     .known_centres(["Purnea", "Gaya"])
///     .build()
///     .unwrap();
/// assert_eq!(config.known_centres.len(), 2);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Minimum length (trimmed chars) of a page's text layer before it is
    /// trusted. Shorter pages are treated as scans and sent to OCR. Default: 40.
    ///
    /// Scanned forms often carry a few stray characters in their text layer
    /// (a page number, a producer watermark). 40 characters is well below one
    /// filled-in form line and well above that noise.
    pub min_text_chars: usize,

    /// Page render scale relative to 72 DPI. Range 1.0–8.0. Default: 4.0 (~288 DPI).
    pub render_scale: f32,

    /// Cap on either rendered dimension in pixels. Default: 6000.
    pub max_rendered_pixels: u32,

    /// Bitmap cleanup applied before recognition.
    pub preprocess: PreprocessSettings,

    /// Recognition engine settings.
    pub ocr: OcrSettings,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Facility names accepted as a last-resort `center` value when no
    /// labelled centre is found. Matches are flagged low-confidence.
    /// Default: empty (fallback disabled).
    pub known_centres: Vec<String>,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 40,
            render_scale: 4.0,
            max_rendered_pixels: 6000,
            preprocess: PreprocessSettings::default(),
            ocr: OcrSettings::default(),
            password: None,
            known_centres: Vec::new(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("min_text_chars", &self.min_text_chars)
            .field("render_scale", &self.render_scale)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("preprocess", &self.preprocess)
            .field("ocr", &self.ocr)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("known_centres", &self.known_centres)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn IntakeProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn min_text_chars(mut self, n: usize) -> Self {
        self.config.min_text_chars = n;
        self
    }

    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale.clamp(1.0, 8.0);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn preprocess(mut self, settings: PreprocessSettings) -> Self {
        self.config.preprocess = settings;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr.language = lang.into();
        self
    }

    pub fn tessdata_path(mut self, path: impl Into<String>) -> Self {
        self.config.ocr.datapath = Some(path.into());
        self
    }

    pub fn char_blacklist(mut self, chars: impl Into<String>) -> Self {
        self.config.ocr.char_blacklist = chars.into();
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn known_centres<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.known_centres = names
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| !s.trim().is_empty())
            .collect();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, IntakeError> {
        let c = &self.config;
        if !(1.0..=8.0).contains(&c.render_scale) {
            return Err(IntakeError::InvalidConfig(format!(
                "render scale must be 1.0–8.0, got {}",
                c.render_scale
            )));
        }
        if c.preprocess.lower_threshold >= c.preprocess.upper_threshold {
            return Err(IntakeError::InvalidConfig(format!(
                "binarisation thresholds must satisfy lower < upper, got {} ≥ {}",
                c.preprocess.lower_threshold, c.preprocess.upper_threshold
            )));
        }
        if c.preprocess.contrast <= 0.0 {
            return Err(IntakeError::InvalidConfig(
                "contrast factor must be positive".into(),
            ));
        }
        if c.ocr.language.trim().is_empty() {
            return Err(IntakeError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Nested settings ──────────────────────────────────────────────────────

/// Deterministic bitmap cleanup applied before recognition.
///
/// Grayscale → contrast stretch around 128 → two-threshold binarisation:
/// pixels above `upper_threshold` become white, below `lower_threshold`
/// black, and the band in between keeps its stretched grey value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreprocessSettings {
    /// Contrast multiplier around mid-grey. Default: 1.2.
    pub contrast: f32,
    /// Values below this become black. Default: 60.
    pub lower_threshold: u8,
    /// Values above this become white. Default: 180.
    pub upper_threshold: u8,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            contrast: 1.2,
            lower_threshold: 60,
            upper_threshold: 180,
        }
    }
}

/// Recognition engine settings.
///
/// The engine always runs LSTM-only with single-uniform-block segmentation;
/// the form is one dense block of labelled lines, and the legacy engine does
/// noticeably worse on the handwriting-adjacent print these forms use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrSettings {
    /// Tesseract language code(s), e.g. `"eng"` or `"eng+hin"`. Default: `"eng"`.
    pub language: String,
    /// Directory holding `*.traineddata`. `None` uses the system default.
    pub datapath: Option<String>,
    /// Characters the engine must never emit. Default: `|{}[]<>`.
    pub char_blacklist: String,
    /// Keep runs of spaces between words. Default: true.
    pub preserve_interword_spaces: bool,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            datapath: None,
            char_blacklist: "|{}[]<>".to_string(),
            preserve_interword_spaces: true,
        }
    }
}
