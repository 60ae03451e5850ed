//! Near-duplicate detection over perceptual hashes.
//!
//! A new bundle is a duplicate of a user's history when any of its hashes is
//! within `threshold` bits of any hash the user submitted before, or when its
//! signature matches a stored one exactly.
//!
//! The comparison is a linear scan: O(new × previous) per submission. That is
//! fine for per-user histories of a few hundred bundles. Larger histories
//! should move to a BK-tree keyed on Hamming distance.

use serde::Serialize;
use tracing::warn;

use crate::bundle::BundleSignature;
use crate::fingerprint::hex_hamming_distance;

/// Default maximum Hamming distance for two hashes to count as the same image.
pub const DEFAULT_HAMMING_THRESHOLD: u32 = 6;

/// Why a bundle was judged a duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DuplicateMatch {
    /// The exact set of hashes was already stored for this user.
    SameSignature { signature: BundleSignature },
    /// One new hash is close to one stored hash.
    NearHash {
        candidate: String,
        previous: String,
        distance: u32,
    },
}

impl std::fmt::Display for DuplicateMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SameSignature { signature } => {
                write!(f, "identical bundle {}", signature.short())
            }
            Self::NearHash { distance, .. } => {
                write!(f, "near-identical screenshot (distance {distance})")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateDetector {
    threshold: u32,
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new(DEFAULT_HAMMING_THRESHOLD)
    }
}

impl DuplicateDetector {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// `true` when both hashes are valid hex and within the threshold.
    pub fn is_near(&self, a: &str, b: &str) -> bool {
        hex_hamming_distance(a, b).is_some_and(|d| d <= self.threshold)
    }

    /// First pair (`candidate`, `previous`) within the threshold.
    ///
    /// Hashes that are not valid hex are skipped with a warning, on either
    /// side. A malformed stored hash can only come from a corrupted history
    /// row; a malformed candidate never matches anything.
    pub fn find_match<C, P>(&self, candidates: &[C], previous: &[P]) -> Option<DuplicateMatch>
    where
        C: AsRef<str>,
        P: AsRef<str>,
    {
        let candidates: Vec<&str> = candidates
            .iter()
            .map(AsRef::as_ref)
            .filter(|cand| {
                let valid = is_hex(cand);
                if !valid {
                    warn!(hash = %cand, "Ignoring malformed candidate perceptual hash");
                }
                valid
            })
            .collect();

        for prev in previous.iter().map(AsRef::as_ref) {
            if !is_hex(prev) {
                warn!(hash = %prev, "Skipping malformed stored perceptual hash");
                continue;
            }
            for &cand in &candidates {
                if let Some(distance) = hex_hamming_distance(cand, prev) {
                    if distance <= self.threshold {
                        return Some(DuplicateMatch::NearHash {
                            candidate: cand.to_string(),
                            previous: prev.to_string(),
                            distance,
                        });
                    }
                }
            }
        }
        None
    }
}

fn is_hex(hash: &str) -> bool {
    hash.bytes().all(|b| b.is_ascii_hexdigit())
}
