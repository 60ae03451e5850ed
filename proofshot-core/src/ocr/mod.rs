//! Optical character recognition engines.
//!
//! The pipeline never recognizes text itself. It hands binarized PNG bytes to
//! an [`OcrEngine`] and gets ordered text lines back.
//!
//! - **Tesseract** - the `tesseract` command-line tool, run per call
//! - **Scripted** - canned per-role responses for tests
//!
//! ```no_run
//! use proofshot_core::bundle::ImageRole;
//! use proofshot_core::ocr::{OcrEngine, OcrMode, OcrRequest, TesseractConfig, TesseractOcr};
//!
//! # async fn example(png: Vec<u8>) -> proofshot_core::Result<()> {
//! let engine = TesseractOcr::new(TesseractConfig::from_env());
//! let lines = engine
//!     .recognize_lines(OcrRequest::new(ImageRole::Comment1, OcrMode::Text, &png))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod mock;
mod tesseract;

pub use mock::ScriptedOcr;
pub use tesseract::{TesseractConfig, TesseractOcr};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bundle::ImageRole;
use crate::error::Result;

/// Character set the engine is allowed to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrMode {
    /// Free text laid out as a block of lines.
    Text,
    /// A single line restricted to `0-9`.
    Digits,
}

/// One recognition call.
#[derive(Debug, Clone, Copy)]
pub struct OcrRequest<'a> {
    /// Which bundle image the crop came from; used for logging and test scripting.
    pub role: ImageRole,
    pub mode: OcrMode,
    /// Encoded image (PNG).
    pub image: &'a [u8],
}

impl<'a> OcrRequest<'a> {
    pub fn new(role: ImageRole, mode: OcrMode, image: &'a [u8]) -> Self {
        Self { role, mode, image }
    }
}

/// A text-producing recognition service.
///
/// Implementations must be thread-safe; the pipeline calls them from several
/// tasks at once.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize `request.image` and return its lines in reading order.
    ///
    /// Blank lines may be dropped. Engine-level failures are reported as
    /// [`crate::ProofshotError::Ocr`].
    async fn recognize_lines(&self, request: OcrRequest<'_>) -> Result<Vec<String>>;

    /// Short identifier for logs.
    fn engine_id(&self) -> &'static str;
}

/// Split raw engine output into trimmed, non-empty lines.
pub(crate) fn split_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
