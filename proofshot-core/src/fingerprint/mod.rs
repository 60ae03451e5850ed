//! Image fingerprints: perceptual hashes for near-duplicate detection and
//! content digests for integrity.

pub mod perceptual;

pub use perceptual::*;

use sha3::{Digest, Sha3_256};

/// SHA3-256 of the raw uploaded bytes, hex encoded.
pub fn content_digest(data: &[u8]) -> String {
    hex::encode(Sha3_256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_digest_empty() {
        assert_eq!(
            content_digest(b""),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn test_content_digest_distinguishes_bytes() {
        assert_ne!(content_digest(b"like.png"), content_digest(b"like.pnG"));
        assert_eq!(content_digest(b"abc").len(), 64);
    }
}
