//! Pixel-level primitives: decoding, adaptive binarization and region sampling.

mod binarize;
mod region;

pub use binarize::{binarize, sauvola_binarize, SummedAreaTable};
pub use region::{crop, PixelRect, RelativeRegion};

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat};

use crate::error::{ProofshotError, Result};

/// Decode uploaded bytes (JPEG, PNG, GIF or WebP).
pub fn decode(bytes: &[u8]) -> std::result::Result<DynamicImage, String> {
    image::load_from_memory(bytes).map_err(|e| e.to_string())
}

/// MIME type sniffed from magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}

/// Encode a grayscale buffer as PNG, the format handed to the OCR engine.
pub fn encode_png(gray: &GrayImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    DynamicImage::ImageLuma8(gray.clone())
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(|e| ProofshotError::Imaging(format!("PNG encode failed: {e}")))?;
    Ok(out)
}

/// Fraction of pixels strictly darker than `threshold`. Empty images yield 0.
pub fn dark_ratio(gray: &GrayImage, threshold: u8) -> f64 {
    let total = gray.as_raw().len();
    if total == 0 {
        return 0.0;
    }
    let dark = gray.as_raw().iter().filter(|&&p| p < threshold).count();
    dark as f64 / total as f64
}
