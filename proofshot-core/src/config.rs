//! Verifier configuration.
//!
//! Every threshold used by the decision logic lives here so it can be tuned
//! without touching the pipeline. Values come from [`Default`], a JSON file,
//! or `PROOFSHOT_*` environment variables layered over the defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ProofshotError, Result};
use crate::imaging::RelativeRegion;

/// Parameters of the Sauvola adaptive threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SauvolaParams {
    /// Side of the square window in pixels (odd).
    pub window_size: u32,
    /// Sensitivity constant.
    pub k: f64,
    /// Dynamic range of the standard deviation.
    pub dynamic_range: f64,
}

impl Default for SauvolaParams {
    fn default() -> Self {
        Self {
            window_size: 25,
            k: 0.2,
            dynamic_range: 128.0,
        }
    }
}

impl SauvolaParams {
    /// Half-width of the window.
    pub fn radius(&self) -> u32 {
        self.window_size / 2
    }
}

/// Like-icon detection thresholds and regions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LikeDetectorConfig {
    /// Region holding the like icon.
    pub icon_region: RelativeRegion,
    /// Region right of the icon holding the like count.
    pub count_region: RelativeRegion,
    /// Gray values strictly below this count as dark.
    pub darkness_threshold: u8,
    /// Dark ratio at or above which the icon is considered filled.
    pub filled_min_ratio: f64,
    /// Dark ratio at or below which the icon is considered an outline.
    pub outline_max_ratio: f64,
}

impl Default for LikeDetectorConfig {
    fn default() -> Self {
        Self {
            icon_region: RelativeRegion::new(0.05, 0.47, 0.12, 0.55),
            count_region: RelativeRegion::new(0.14, 0.47, 0.27, 0.55),
            darkness_threshold: 80,
            filled_min_ratio: 0.035,
            outline_max_ratio: 0.020,
        }
    }
}

/// Complete verifier configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub sauvola: SauvolaParams,
    pub like: LikeDetectorConfig,
    /// Refined comment fragments required for verification.
    pub min_comment_texts: usize,
    /// Refined reply fragments required for verification.
    pub min_reply_texts: usize,
    /// Maximum Hamming distance (bits) at which two perceptual hashes match.
    pub hamming_threshold: u32,
    /// Per-call OCR timeout in milliseconds.
    pub ocr_timeout_ms: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            sauvola: SauvolaParams::default(),
            like: LikeDetectorConfig::default(),
            min_comment_texts: 2,
            min_reply_texts: 2,
            hamming_threshold: 6,
            ocr_timeout_ms: 5_000,
        }
    }
}

/// Parse `key` from `lookup`. Unset is `None`; set but unparsable is an error.
fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ProofshotError::Config(format!("{key}: invalid value {raw:?}"))),
    }
}

fn overlay<T, F>(lookup: &F, key: &str, slot: &mut T) -> Result<()>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = parse_var(lookup, key)? {
        *slot = value;
    }
    Ok(())
}

impl VerifierConfig {
    /// Load configuration from environment variables over the defaults.
    ///
    /// A variable that is set but does not parse is a configuration error.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let l = &lookup;

        overlay(l, "PROOFSHOT_WINDOW_SIZE", &mut config.sauvola.window_size)?;
        overlay(l, "PROOFSHOT_SAUVOLA_K", &mut config.sauvola.k)?;
        overlay(l, "PROOFSHOT_SAUVOLA_R", &mut config.sauvola.dynamic_range)?;
        overlay(l, "PROOFSHOT_DARK_THRESHOLD", &mut config.like.darkness_threshold)?;
        overlay(l, "PROOFSHOT_LIKE_FILLED_MIN", &mut config.like.filled_min_ratio)?;
        overlay(l, "PROOFSHOT_LIKE_OUTLINE_MAX", &mut config.like.outline_max_ratio)?;
        overlay(l, "PROOFSHOT_MIN_COMMENTS", &mut config.min_comment_texts)?;
        overlay(l, "PROOFSHOT_MIN_REPLIES", &mut config.min_reply_texts)?;
        overlay(l, "PROOFSHOT_HAMMING_THRESHOLD", &mut config.hamming_threshold)?;
        overlay(l, "PROOFSHOT_OCR_TIMEOUT_MS", &mut config.ocr_timeout_ms)?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ProofshotError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            ProofshotError::Config(format!("Invalid config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_millis(self.ocr_timeout_ms)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.sauvola;
        if s.window_size == 0 || s.window_size % 2 == 0 {
            return Err(ProofshotError::Config(format!(
                "window_size must be odd and positive, got {}",
                s.window_size
            )));
        }
        if !(s.dynamic_range > 0.0) {
            return Err(ProofshotError::Config(
                "dynamic_range must be positive".into(),
            ));
        }
        if !s.k.is_finite() {
            return Err(ProofshotError::Config("k must be finite".into()));
        }

        let like = &self.like;
        if !(like.outline_max_ratio < like.filled_min_ratio) {
            return Err(ProofshotError::Config(format!(
                "outline_max_ratio ({}) must be below filled_min_ratio ({})",
                like.outline_max_ratio, like.filled_min_ratio
            )));
        }
        like.icon_region.validate("icon_region")?;
        like.count_region.validate("count_region")?;

        if self.ocr_timeout_ms == 0 {
            return Err(ProofshotError::Config("ocr_timeout_ms must be non-zero".into()));
        }
        Ok(())
    }
}
