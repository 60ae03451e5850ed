//! Proofshot Core - engagement-screenshot verification
//!
//! Given five role-tagged screenshots offered as proof that a user liked a
//! post, commented on it and exchanged replies, this crate decides whether the
//! proof holds up and whether the same user already submitted it.
//!
//! # Features
//!
//! - Sauvola adaptive binarization on summed-area tables
//! - Like detection from icon darkness with an OCR like-count fallback
//! - OCR post-processing: handle extraction and boilerplate removal
//! - Blockhash perceptual hashes with hex Hamming-distance duplicate checks
//! - Per-user atomic check-and-insert history (memory or PostgreSQL)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use proofshot_core::{
//!     Bundle, BundleImage, BundleVerifier, ImageRole, MemoryHistoryStore, Submission,
//!     SubmissionOutcome, TesseractConfig, TesseractOcr, VerifierConfig,
//! };
//!
//! # async fn example(files: Vec<(ImageRole, Vec<u8>)>) -> proofshot_core::Result<()> {
//! let verifier = BundleVerifier::new(
//!     VerifierConfig::from_env()?,
//!     Arc::new(TesseractOcr::new(TesseractConfig::from_env())),
//!     Arc::new(MemoryHistoryStore::new()),
//! )?;
//!
//! let bundle = Bundle::from_images(
//!     files.into_iter().map(|(role, bytes)| (role, BundleImage::new(bytes))),
//! )?;
//! let outcome = verifier
//!     .submit(Submission { user_id: "u-42".into(), link_id: "post-7".into(), bundle })
//!     .await?;
//!
//! match outcome {
//!     SubmissionOutcome::Accepted { record } => println!("stored {}", record.bundle_id),
//!     SubmissionOutcome::Rejected { shortfalls, .. } => println!("rejected: {shortfalls:?}"),
//!     SubmissionOutcome::Duplicate { reason } => println!("duplicate: {reason}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod bundle;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod fingerprint;
pub mod history;
pub mod imaging;
pub mod like;
pub mod ocr;
pub mod pipeline;
pub mod text;

// Re-export main types for convenience
pub use analysis::{decide, AnalysisResult, Shortfall};
pub use bundle::{Bundle, BundleImage, BundleRecord, BundleSignature, FileRecord, ImageRole};
pub use config::{LikeDetectorConfig, SauvolaParams, VerifierConfig};
pub use dedupe::{DuplicateDetector, DuplicateMatch, DEFAULT_HAMMING_THRESHOLD};
pub use error::{ErrorKind, ProofshotError, Result};
pub use fingerprint::{content_digest, hex_hamming_distance, PerceptualHasher};
pub use history::{HistoryError, HistoryStore, InsertOutcome, MemoryHistoryStore};
pub use like::{LikeDetector, LikeOutcome, LikeTier};
pub use ocr::{OcrEngine, OcrMode, OcrRequest, ScriptedOcr, TesseractConfig, TesseractOcr};
pub use pipeline::{BundleVerifier, PreparedBundle, Submission, SubmissionOutcome};

#[cfg(feature = "postgres")]
pub use history::PostgresHistoryStore;
