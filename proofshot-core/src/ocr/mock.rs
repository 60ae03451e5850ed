//! Scripted OCR engine for testing.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{OcrEngine, OcrMode, OcrRequest};
use crate::bundle::ImageRole;
use crate::error::{ProofshotError, Result};

#[derive(Debug, Clone, Default)]
struct Script {
    lines: Vec<String>,
    delay: Option<Duration>,
    failure: Option<String>,
}

/// OCR engine that answers from a per-(role, mode) script.
///
/// Unscripted calls return no lines. Every call is counted so tests can
/// assert whether a fallback path ran.
#[derive(Debug, Default)]
pub struct ScriptedOcr {
    scripts: HashMap<(ImageRole, OcrMode), Script>,
    calls: DashMap<(ImageRole, OcrMode), usize>,
}

impl ScriptedOcr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to `(role, mode)` with `lines`.
    pub fn with_lines<I, S>(mut self, role: ImageRole, mode: OcrMode, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scripts.entry((role, mode)).or_default().lines =
            lines.into_iter().map(Into::into).collect();
        self
    }

    /// Sleep before answering `(role, mode)`.
    pub fn with_delay(mut self, role: ImageRole, mode: OcrMode, delay: Duration) -> Self {
        self.scripts.entry((role, mode)).or_default().delay = Some(delay);
        self
    }

    /// Fail every call for `(role, mode)`.
    pub fn with_failure(mut self, role: ImageRole, mode: OcrMode, reason: impl Into<String>) -> Self {
        self.scripts.entry((role, mode)).or_default().failure = Some(reason.into());
        self
    }

    /// Number of calls received for `(role, mode)`.
    pub fn calls(&self, role: ImageRole, mode: OcrMode) -> usize {
        self.calls.get(&(role, mode)).map(|c| *c).unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|entry| *entry.value()).sum()
    }
}

#[async_trait]
impl OcrEngine for ScriptedOcr {
    async fn recognize_lines(&self, request: OcrRequest<'_>) -> Result<Vec<String>> {
        let key = (request.role, request.mode);
        *self.calls.entry(key).or_insert(0) += 1;

        let Some(script) = self.scripts.get(&key) else {
            return Ok(Vec::new());
        };
        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }
        match &script.failure {
            Some(reason) => Err(ProofshotError::Ocr(reason.clone())),
            None => Ok(script.lines.clone()),
        }
    }

    fn engine_id(&self) -> &'static str {
        "scripted"
    }
}
