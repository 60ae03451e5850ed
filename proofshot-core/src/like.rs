//! Like detection on the `like` screenshot.
//!
//! The icon region is scored by its fraction of dark pixels. A filled heart
//! is dark enough to decide on its own, an outline is light enough to decide
//! on its own, and anything in between falls back to reading the like count
//! next to the icon with digit-only OCR.

use image::GrayImage;
use serde::Serialize;
use tracing::debug;

use crate::bundle::ImageRole;
use crate::config::LikeDetectorConfig;
use crate::error::Result;
use crate::imaging::{crop, dark_ratio, encode_png};
use crate::ocr::{OcrEngine, OcrMode, OcrRequest};

/// Classification of the icon by dark-pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeTier {
    Filled,
    Outline,
    Ambiguous,
}

/// Place `ratio` in one of the three tiers. Both bounds are inclusive.
pub fn classify(ratio: f64, config: &LikeDetectorConfig) -> LikeTier {
    if ratio >= config.filled_min_ratio {
        LikeTier::Filled
    } else if ratio <= config.outline_max_ratio {
        LikeTier::Outline
    } else {
        LikeTier::Ambiguous
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LikeOutcome {
    pub liked: bool,
    pub dark_ratio: f64,
    pub tier: LikeTier,
    /// Count-region OCR text; present only when the fallback ran.
    pub count_text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LikeDetector {
    config: LikeDetectorConfig,
}

impl LikeDetector {
    pub fn new(config: LikeDetectorConfig) -> Self {
        Self { config }
    }

    /// Dark-pixel ratio of the icon region. An empty region scores 0.
    pub fn icon_dark_ratio(&self, gray: &GrayImage) -> f64 {
        let icon = crop(gray, &self.config.icon_region);
        dark_ratio(&icon, self.config.darkness_threshold)
    }

    /// Decide whether the post in `gray` is liked.
    ///
    /// `ocr` is only called for ambiguous icons.
    pub async fn detect(&self, gray: &GrayImage, ocr: &dyn OcrEngine) -> Result<LikeOutcome> {
        let ratio = self.icon_dark_ratio(gray);
        let tier = classify(ratio, &self.config);
        debug!(dark_ratio = ratio, tier = ?tier, "Scored like icon");

        let (liked, count_text) = match tier {
            LikeTier::Filled => (true, None),
            LikeTier::Outline => (false, None),
            LikeTier::Ambiguous => {
                let png = encode_png(&crop(gray, &self.config.count_region))?;
                let lines = ocr
                    .recognize_lines(OcrRequest::new(ImageRole::Like, OcrMode::Digits, &png))
                    .await?;
                let text = lines.join(" ");
                let has_digit = text.chars().any(|c| c.is_ascii_digit());
                debug!(count_text = %text, liked = has_digit, "Read like count");
                (has_digit, Some(text))
            }
        };

        Ok(LikeOutcome {
            liked,
            dark_ratio: ratio,
            tier,
            count_text,
        })
    }
}
