//! Fixed-fraction sub-regions of an image.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::error::{ProofshotError, Result};

/// Rectangle given as fractions of the image size, `[x1, x2) × [y1, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeRegion {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Absolute pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl RelativeRegion {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Resolve to `[floor(W·x1), floor(W·x2)) × [floor(H·y1), floor(H·y2))`,
    /// clamped to the image bounds.
    pub fn to_pixels(&self, width: u32, height: u32) -> PixelRect {
        let scale = |frac: f64, size: u32| -> u32 {
            let v = (f64::from(size) * frac).floor();
            if v <= 0.0 {
                0
            } else {
                (v as u32).min(size)
            }
        };
        let x0 = scale(self.x1, width);
        let x1 = scale(self.x2, width).max(x0);
        let y0 = scale(self.y1, height);
        let y1 = scale(self.y2, height).max(y0);

        PixelRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }

    pub(crate) fn validate(&self, name: &str) -> Result<()> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !(in_unit(self.x1) && in_unit(self.x2) && in_unit(self.y1) && in_unit(self.y2)) {
            return Err(ProofshotError::Config(format!(
                "{name}: fractions must lie in [0, 1]"
            )));
        }
        if self.x1 >= self.x2 || self.y1 >= self.y2 {
            return Err(ProofshotError::Config(format!(
                "{name}: x1 < x2 and y1 < y2 required"
            )));
        }
        Ok(())
    }
}

/// Copy the pixels covered by `region` out of `gray`.
pub fn crop(gray: &GrayImage, region: &RelativeRegion) -> GrayImage {
    let (w, h) = gray.dimensions();
    let rect = region.to_pixels(w, h);
    image::imageops::crop_imm(gray, rect.x, rect.y, rect.width, rect.height).to_image()
}
