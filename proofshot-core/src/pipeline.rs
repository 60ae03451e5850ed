//! Bundle verification pipeline.
//!
//! ```text
//! submit
//!   ├─ prepare      decode, grayscale, perceptual + content hash   (5 blocking tasks)
//!   ├─ pre-check    near-duplicate scan against the user's history
//!   ├─ analyze      like detection ┐
//!   │               binarize → OCR ┘ per role, each under a timeout (5 tasks)
//!   ├─ decide       handle selection and verification
//!   └─ insert       atomic re-check and write (verified bundles only)
//! ```
//!
//! Any failed or timed-out role fails the whole submission. Rejections and
//! duplicates are outcomes, not errors.

use std::sync::Arc;
use std::time::Instant;

use image::GrayImage;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::analysis::{decide, AnalysisResult, Shortfall};
use crate::bundle::{Bundle, BundleRecord, BundleSignature, FileRecord, ImageRole};
use crate::config::VerifierConfig;
use crate::dedupe::{DuplicateDetector, DuplicateMatch};
use crate::error::{ProofshotError, Result};
use crate::fingerprint::{content_digest, PerceptualHasher};
use crate::history::{HistoryStore, InsertOutcome};
use crate::imaging::{binarize, decode, encode_png, sniff_mime};
use crate::like::{LikeDetector, LikeOutcome};
use crate::ocr::{OcrEngine, OcrMode, OcrRequest};
use crate::text::extract_handle_texts;

const FALLBACK_MIME: &str = "application/octet-stream";

/// A bundle submitted on behalf of a user for a link.
#[derive(Debug, Clone)]
pub struct Submission {
    pub user_id: String,
    pub link_id: String,
    pub bundle: Bundle,
}

/// What happened to a submission.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// Verified and stored.
    Accepted { record: BundleRecord },
    /// Processed, but a verification condition was not met. Nothing stored.
    Rejected {
        analysis: AnalysisResult,
        shortfalls: Vec<Shortfall>,
    },
    /// The user already submitted this bundle or a near copy. Nothing stored.
    Duplicate { reason: DuplicateMatch },
}

impl SubmissionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// One decoded image with its fingerprint.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub gray: Arc<GrayImage>,
    pub file: FileRecord,
}

/// All five images decoded and fingerprinted, in role order.
#[derive(Debug, Clone)]
pub struct PreparedBundle {
    images: Vec<PreparedImage>,
}

impl PreparedBundle {
    pub fn image(&self, role: ImageRole) -> Option<&PreparedImage> {
        self.images.iter().find(|image| image.file.role == role)
    }

    pub fn files(&self) -> Vec<FileRecord> {
        self.images.iter().map(|image| image.file.clone()).collect()
    }

    pub fn perceptual_hashes(&self) -> Vec<String> {
        self.images
            .iter()
            .map(|image| image.file.perceptual_hash.clone())
            .collect()
    }

    pub fn signature(&self) -> BundleSignature {
        BundleSignature::from_hashes(self.images.iter().map(|i| i.file.perceptual_hash.as_str()))
    }

    fn gray(&self, role: ImageRole) -> Result<Arc<GrayImage>> {
        self.image(role)
            .map(|image| Arc::clone(&image.gray))
            .ok_or(ProofshotError::MissingRole(role))
    }
}

enum RoleOutput {
    Like(LikeOutcome),
    Lines(ImageRole, Vec<String>),
}

/// Attribute an engine error to the role it happened on.
fn on_role(role: ImageRole, err: ProofshotError) -> ProofshotError {
    match err {
        ProofshotError::Ocr(reason) => ProofshotError::OcrFailed { role, reason },
        other => other,
    }
}

/// Composes hashing, OCR, like detection and the history store.
pub struct BundleVerifier {
    config: Arc<VerifierConfig>,
    ocr: Arc<dyn OcrEngine>,
    history: Arc<dyn HistoryStore>,
    hasher: PerceptualHasher,
    like: LikeDetector,
    detector: DuplicateDetector,
}

impl BundleVerifier {
    /// Build a verifier. Fails if `config` does not validate.
    pub fn new(
        config: VerifierConfig,
        ocr: Arc<dyn OcrEngine>,
        history: Arc<dyn HistoryStore>,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            ocr = ocr.engine_id(),
            history = history.backend_name(),
            hamming_threshold = config.hamming_threshold,
            "Bundle verifier ready"
        );
        Ok(Self {
            like: LikeDetector::new(config.like),
            detector: DuplicateDetector::new(config.hamming_threshold),
            hasher: PerceptualHasher::default(),
            config: Arc::new(config),
            ocr,
            history,
        })
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// Decode and fingerprint every image in parallel.
    #[instrument(level = "debug", skip_all, fields(bytes = bundle.total_bytes()))]
    pub async fn prepare(&self, bundle: &Bundle) -> Result<PreparedBundle> {
        let mut tasks = JoinSet::new();
        for (role, image) in bundle.iter() {
            let bytes = image.bytes.clone();
            let declared = image.declared_mime.clone();
            let hasher = self.hasher.clone();
            tasks.spawn_blocking(move || -> Result<PreparedImage> {
                let decoded = decode(&bytes).map_err(|reason| ProofshotError::InvalidImage {
                    role,
                    reason,
                })?;
                let mime_type = sniff_mime(&bytes)
                    .map(str::to_string)
                    .or(declared)
                    .unwrap_or_else(|| FALLBACK_MIME.to_string());
                let file = FileRecord {
                    role,
                    perceptual_hash: hasher.hash_image(&decoded),
                    content_hash: content_digest(&bytes),
                    byte_size: bytes.len() as u64,
                    mime_type,
                };
                Ok(PreparedImage {
                    gray: Arc::new(decoded.to_luma8()),
                    file,
                })
            });
        }

        let mut images = Vec::with_capacity(ImageRole::ALL.len());
        while let Some(joined) = tasks.join_next().await {
            images.push(joined??);
        }
        images.sort_by_key(|image| image.file.role);
        Ok(PreparedBundle { images })
    }

    /// Run like detection and OCR on a prepared bundle and decide.
    #[instrument(level = "debug", skip_all)]
    pub async fn analyze(&self, prepared: &PreparedBundle) -> Result<AnalysisResult> {
        let started = Instant::now();
        let timeout = self.config.ocr_timeout();
        let timeout_ms = self.config.ocr_timeout_ms;
        let mut tasks: JoinSet<Result<RoleOutput>> = JoinSet::new();

        {
            let gray = prepared.gray(ImageRole::Like)?;
            let ocr = Arc::clone(&self.ocr);
            let like = self.like.clone();
            tasks.spawn(async move {
                let outcome = tokio::time::timeout(timeout, like.detect(&gray, ocr.as_ref()))
                    .await
                    .map_err(|_| ProofshotError::OcrTimeout {
                        role: ImageRole::Like,
                        timeout_ms,
                    })?
                    .map_err(|e| on_role(ImageRole::Like, e))?;
                Ok(RoleOutput::Like(outcome))
            });
        }

        for role in ImageRole::ALL.into_iter().filter(|r| *r != ImageRole::Like) {
            let gray = prepared.gray(role)?;
            let ocr = Arc::clone(&self.ocr);
            let sauvola = self.config.sauvola;
            tasks.spawn(async move {
                let png = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
                    encode_png(&binarize(&gray, &sauvola)?)
                })
                .await??;
                let request = OcrRequest::new(role, OcrMode::Text, &png);
                let lines = tokio::time::timeout(timeout, ocr.recognize_lines(request))
                    .await
                    .map_err(|_| ProofshotError::OcrTimeout { role, timeout_ms })?
                    .map_err(|e| on_role(role, e))?;
                debug!(role = %role, lines = lines.len(), "Recognized lines");
                Ok(RoleOutput::Lines(role, lines))
            });
        }

        let mut liked = None;
        let mut lines_by_role: Vec<(ImageRole, Vec<String>)> = Vec::with_capacity(4);
        while let Some(joined) = tasks.join_next().await {
            match joined?? {
                RoleOutput::Like(outcome) => liked = Some(outcome.liked),
                RoleOutput::Lines(role, lines) => lines_by_role.push((role, lines)),
            }
        }
        lines_by_role.sort_by_key(|(role, _)| *role);

        let collect = |pick: fn(&ImageRole) -> bool| -> Vec<String> {
            lines_by_role
                .iter()
                .filter(|(role, _)| pick(role))
                .flat_map(|(_, lines)| lines.iter().cloned())
                .collect()
        };
        let comments = extract_handle_texts(&collect(ImageRole::is_comment));
        let replies = extract_handle_texts(&collect(ImageRole::is_reply));

        let liked = liked.ok_or_else(|| ProofshotError::Task("like detection did not run".into()))?;
        let result = decide(
            liked,
            &comments,
            &replies,
            self.config.min_comment_texts,
            self.config.min_reply_texts,
        );

        info!(
            liked = result.liked(),
            handle = result.user_handle().unwrap_or("-"),
            comments = result.comment_texts().len(),
            replies = result.reply_texts().len(),
            verified = result.verified(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Bundle analyzed"
        );
        Ok(result)
    }

    /// Prepare and analyze without touching history.
    pub async fn analyze_bundle(&self, bundle: &Bundle) -> Result<AnalysisResult> {
        let prepared = self.prepare(bundle).await?;
        self.analyze(&prepared).await
    }

    /// Full submission: duplicate pre-check, analysis, atomic insert.
    #[instrument(skip_all, fields(user_id = %submission.user_id, link_id = %submission.link_id))]
    pub async fn submit(&self, submission: Submission) -> Result<SubmissionOutcome> {
        let started = Instant::now();
        let prepared = self.prepare(&submission.bundle).await?;
        let signature = prepared.signature();

        // Reused bundles are turned away before paying for OCR
        let prior = self.history.prior_hashes(&submission.user_id).await?;
        if let Some(reason) = self
            .detector
            .find_match(&prepared.perceptual_hashes(), &prior)
        {
            warn!(signature = %signature.short(), %reason, "Duplicate submission");
            return Ok(SubmissionOutcome::Duplicate { reason });
        }

        let analysis = self.analyze(&prepared).await?;
        if !analysis.verified() {
            let shortfalls = analysis.shortfalls();
            info!(?shortfalls, "Bundle rejected");
            return Ok(SubmissionOutcome::Rejected {
                analysis,
                shortfalls,
            });
        }

        let record = BundleRecord::new(
            submission.user_id,
            submission.link_id,
            prepared.files(),
            analysis,
        );
        match self
            .history
            .insert_unless_duplicate(&record, &self.detector)
            .await?
        {
            InsertOutcome::Inserted => {
                info!(
                    bundle_id = %record.bundle_id,
                    signature = %signature.short(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Bundle accepted"
                );
                Ok(SubmissionOutcome::Accepted { record })
            }
            InsertOutcome::Duplicate(reason) => {
                warn!(signature = %signature.short(), %reason, "Duplicate detected at insert");
                Ok(SubmissionOutcome::Duplicate { reason })
            }
        }
    }
}
