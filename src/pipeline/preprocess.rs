//! Bitmap cleanup before recognition.
//!
//! Scanned forms come back from pdfium as RGBA with a faint paper tint,
//! light pencil strokes and JPEG halos around printed labels. The recogniser
//! does best on near-binary input, but a hard single threshold erases faint
//! handwriting. Two thresholds keep the middle band as grey so the engine
//! still sees weak strokes while the background goes to pure white.
//!
//! Fully deterministic: identical input and settings give identical output.

use crate::config::PreprocessSettings;
use image::{DynamicImage, GrayImage, Luma};

/// ITU-R BT.601 luma weights.
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Convert a rendered page to a cleaned grayscale bitmap.
///
/// Per pixel:
/// 1. composite over white (transparent regions count as paper)
/// 2. luminosity grayscale
/// 3. contrast stretch around 128 by `settings.contrast`
/// 4. `> upper` → 255, `< lower` → 0, otherwise the clamped stretched value
pub fn preprocess(image: &DynamicImage, settings: &PreprocessSettings) -> GrayImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut out = GrayImage::new(width, height);

    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let alpha = a as f32 / 255.0;
        let over_white = |c: u8| c as f32 * alpha + 255.0 * (1.0 - alpha);

        let gray = LUMA_R * over_white(r) + LUMA_G * over_white(g) + LUMA_B * over_white(b);
        out.put_pixel(x, y, Luma([binarise(gray, settings)]));
    }

    out
}

fn binarise(gray: f32, settings: &PreprocessSettings) -> u8 {
    let stretched = (gray - 128.0) * settings.contrast + 128.0;
    if stretched > settings.upper_threshold as f32 {
        255
    } else if stretched < settings.lower_threshold as f32 {
        0
    } else {
        stretched.round().clamp(0.0, 255.0) as u8
    }
}
