//! Sauvola adaptive binarization.
//!
//! Each pixel is compared against a threshold derived from the mean and
//! standard deviation of its surrounding window:
//!
//! ```text
//! T = mean * (1 + k * (std / R - 1))
//! ```
//!
//! Window statistics come from two summed-area tables (values and squared
//! values), so the whole pass is O(W·H) regardless of the window size.
//! Windows are clamped at the image border rather than zero-padded, so the
//! sample count shrinks near edges.

use image::GrayImage;

use crate::config::SauvolaParams;
use crate::error::{ProofshotError, Result};

/// Inclusive prefix sums over a grayscale buffer, with a zero border row and
/// column: entry `(x, y)` holds the sum of all pixels in `[0, x) × [0, y)`.
#[derive(Debug, Clone)]
pub struct SummedAreaTable {
    stride: usize,
    sums: Vec<f64>,
    squares: Vec<f64>,
}

impl SummedAreaTable {
    pub fn build(pixels: &[u8], width: usize, height: usize) -> Self {
        let stride = width + 1;
        let mut sums = vec![0.0; stride * (height + 1)];
        let mut squares = vec![0.0; stride * (height + 1)];

        for y in 1..=height {
            let mut row_sum = 0.0;
            let mut row_sq = 0.0;
            let row = &pixels[(y - 1) * width..y * width];
            for x in 1..=width {
                let g = f64::from(row[x - 1]);
                row_sum += g;
                row_sq += g * g;
                let idx = y * stride + x;
                sums[idx] = sums[idx - stride] + row_sum;
                squares[idx] = squares[idx - stride] + row_sq;
            }
        }

        Self {
            stride,
            sums,
            squares,
        }
    }

    /// Sum and sum of squares over the inclusive pixel rectangle
    /// `[x0, x1] × [y0, y1]` (0-based).
    pub fn window(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> (f64, f64) {
        let s = self.stride;
        let top_left = y0 * s + x0;
        let top_right = y0 * s + x1 + 1;
        let bottom_left = (y1 + 1) * s + x0;
        let bottom_right = (y1 + 1) * s + x1 + 1;
        (
            self.sums[bottom_right] - self.sums[top_right] - self.sums[bottom_left]
                + self.sums[top_left],
            self.squares[bottom_right] - self.squares[top_right] - self.squares[bottom_left]
                + self.squares[top_left],
        )
    }
}

/// Binarize a row-major grayscale buffer. Output values are 0 or 255.
///
/// Fails if `pixels` does not hold exactly `width * height` samples.
pub fn sauvola_binarize(
    pixels: &[u8],
    width: usize,
    height: usize,
    params: &SauvolaParams,
) -> Result<Vec<u8>> {
    let expected = width.checked_mul(height);
    if expected != Some(pixels.len()) {
        return Err(ProofshotError::Imaging(format!(
            "buffer of {} bytes does not match {width}x{height}",
            pixels.len()
        )));
    }
    let mut out = vec![0u8; pixels.len()];
    if width == 0 || height == 0 {
        return Ok(out);
    }

    let table = SummedAreaTable::build(pixels, width, height);
    let r = params.radius() as usize;
    let k = params.k;
    let range = params.dynamic_range;

    for y in 0..height {
        let y0 = y.saturating_sub(r);
        let y1 = (y + r).min(height - 1);
        for x in 0..width {
            let x0 = x.saturating_sub(r);
            let x1 = (x + r).min(width - 1);

            let area = ((x1 - x0 + 1) * (y1 - y0 + 1)) as f64;
            let (sum, sum_sq) = table.window(x0, y0, x1, y1);
            let mean = sum / area;
            let std = (sum_sq / area - mean * mean).max(0.0).sqrt();
            let threshold = mean * (1.0 + k * (std / range - 1.0));

            let idx = y * width + x;
            out[idx] = if f64::from(pixels[idx]) > threshold { 255 } else { 0 };
        }
    }

    Ok(out)
}

/// Binarize an [`image::GrayImage`].
pub fn binarize(gray: &GrayImage, params: &SauvolaParams) -> Result<GrayImage> {
    let (w, h) = gray.dimensions();
    let out = sauvola_binarize(gray.as_raw(), w as usize, h as usize, params)?;
    GrayImage::from_raw(w, h, out)
        .ok_or_else(|| ProofshotError::Imaging(format!("cannot rebuild {w}x{h} image")))
}
