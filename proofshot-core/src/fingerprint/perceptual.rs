//! Perceptual hashing for screenshots.
//!
//! Visually similar screenshots (re-encoded, recompressed, slightly shifted
//! in hue) produce hashes with a small Hamming distance, which is what the
//! duplicate check relies on.
//!
//! # Algorithm
//!
//! Blockhash over a 16×16 grid, giving a 256-bit hash rendered as 64
//! lowercase hex characters.
//!
//! # Usage
//!
//! ```no_run
//! use proofshot_core::fingerprint::{hex_hamming_distance, PerceptualHasher};
//!
//! let hasher = PerceptualHasher::default();
//! let a = hasher.hash_bytes(&std::fs::read("like.png").unwrap()).unwrap();
//! let b = hasher.hash_bytes(&std::fs::read("like-recompressed.jpg").unwrap()).unwrap();
//! let similar = hex_hamming_distance(&a, &b).is_some_and(|d| d <= 6);
//! ```

use blockhash::{blockhash256, Blockhash256};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Hash size in bytes (256 bits).
pub const PERCEPTUAL_HASH_BYTES: usize = 32;

/// Bit population of every hex digit, indexed by nibble value.
const NIBBLE_POPCOUNT: [u8; 16] = [0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4];

/// Perceptual hash algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// Blockhash on a 16×16 grid.
    #[default]
    Blockhash256,
}

/// Perceptual hasher producing hex-encoded fingerprints.
#[derive(Debug, Clone, Default)]
pub struct PerceptualHasher {
    algorithm: HashAlgorithm,
}

impl PerceptualHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Decode image bytes and hash them.
    pub fn hash_bytes(&self, image_data: &[u8]) -> Result<String, String> {
        let image = image::load_from_memory(image_data)
            .map_err(|e| format!("Failed to decode image: {e}"))?;
        Ok(self.hash_image(&image))
    }

    /// Hash an already decoded image.
    pub fn hash_image(&self, image: &DynamicImage) -> String {
        match self.algorithm {
            HashAlgorithm::Blockhash256 => {
                let hash: Blockhash256 = blockhash256(image);
                let bytes: [u8; PERCEPTUAL_HASH_BYTES] = hash.into();
                hex::encode(bytes)
            }
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

fn nibble(digit: u8) -> Option<u8> {
    (digit as char).to_digit(16).map(|v| v as u8)
}

/// Number of differing bits between two hex-encoded hashes.
///
/// The shorter string is left-padded with zeros first, so `"f"` and `"0f"`
/// are identical. Each digit pair contributes the popcount of the XOR of the
/// two nibbles, looked up in a 16-entry table.
///
/// Returns `None` if either string contains a non-hex character.
pub fn hex_hamming_distance(a: &str, b: &str) -> Option<u32> {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let len = a.len().max(b.len());
    let (pad_a, pad_b) = (len - a.len(), len - b.len());

    let digit = |s: &[u8], pad: usize, i: usize| -> Option<u8> {
        if i < pad {
            Some(0)
        } else {
            nibble(s[i - pad])
        }
    };

    (0..len).try_fold(0u32, |acc, i| {
        let x = digit(a, pad_a, i)? ^ digit(b, pad_b, i)?;
        Some(acc + u32::from(NIBBLE_POPCOUNT[usize::from(x & 0xF)]))
    })
}
