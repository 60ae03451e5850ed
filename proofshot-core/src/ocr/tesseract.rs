//! Tesseract command-line OCR engine.
//!
//! Each call spawns `tesseract stdin stdout`, pipes the PNG in and reads plain
//! text back. The child is killed if the call's future is dropped, so an
//! outer timeout does not leak processes.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::{split_lines, OcrEngine, OcrMode, OcrRequest};
use crate::error::{ProofshotError, Result};

const DEFAULT_BINARY: &str = "tesseract";
const DEFAULT_LANGUAGE: &str = "eng";
const DIGIT_WHITELIST: &str = "tessedit_char_whitelist=0123456789";

/// Where to find Tesseract and which model to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TesseractConfig {
    pub binary: PathBuf,
    /// Overrides Tesseract's own tessdata lookup when set.
    pub tessdata_dir: Option<PathBuf>,
    pub language: String,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_BINARY),
            tessdata_dir: None,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl TesseractConfig {
    /// Read `TESSERACT_PATH`, `TESSDATA_PREFIX` and `TESSERACT_LANG`.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            binary: non_empty("TESSERACT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BINARY)),
            tessdata_dir: non_empty("TESSDATA_PREFIX").map(PathBuf::from),
            language: non_empty("TESSERACT_LANG").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        }
    }
}

pub struct TesseractOcr {
    config: TesseractConfig,
}

impl TesseractOcr {
    pub fn new(config: TesseractConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TesseractConfig {
        &self.config
    }

    /// Arguments after the binary name for one call.
    fn args(&self, mode: OcrMode) -> Vec<String> {
        let mut args: Vec<String> = vec!["stdin".into(), "stdout".into()];
        if let Some(dir) = &self.config.tessdata_dir {
            args.push("--tessdata-dir".into());
            args.push(dir.to_string_lossy().into_owned());
        }
        for arg in ["-l", self.config.language.as_str(), "--oem", "3"] {
            args.push(arg.to_string());
        }
        let mode_args: &[&str] = match mode {
            // Uniform block of text
            OcrMode::Text => &["--psm", "6"],
            // Single line, digits only
            OcrMode::Digits => &["--psm", "7", "-c", DIGIT_WHITELIST],
        };
        args.extend(mode_args.iter().map(|arg| arg.to_string()));
        args
    }

    /// Run `tesseract --version` and return its first line.
    pub async fn version(&self) -> Result<String> {
        let output = Command::new(&self.config.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ProofshotError::Ocr(format!(
                    "Failed to run {}: {e}",
                    self.config.binary.display()
                ))
            })?;
        // Older releases print the version banner on stderr
        let text = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(String::from_utf8_lossy(&text)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    #[instrument(level = "debug", skip(self, request), fields(role = %request.role, mode = ?request.mode, bytes = request.image.len()))]
    async fn recognize_lines(&self, request: OcrRequest<'_>) -> Result<Vec<String>> {
        let mut child = Command::new(&self.config.binary)
            .args(self.args(request.mode))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ProofshotError::Ocr(format!(
                    "Failed to spawn {}: {e}",
                    self.config.binary.display()
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(request.image)
                .await
                .map_err(|e| ProofshotError::Ocr(format!("Failed to write image to tesseract: {e}")))?;
            // Closing stdin signals end of input
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ProofshotError::Ocr(format!("Failed to read tesseract output: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProofshotError::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let lines = split_lines(&String::from_utf8_lossy(&output.stdout));
        debug!(lines = lines.len(), "Tesseract recognition complete");
        Ok(lines)
    }

    fn engine_id(&self) -> &'static str {
        "tesseract"
    }
}
