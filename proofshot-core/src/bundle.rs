//! Bundle data model.
//!
//! A bundle is exactly five role-tagged screenshots. Everything derived from a
//! bundle ([`FileRecord`], [`BundleSignature`], [`BundleRecord`]) is computed
//! once at submission time and never mutated afterwards.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::AnalysisResult;
use crate::error::{ProofshotError, Result};

/// Delimiter used to join the sorted perceptual hashes of a bundle.
pub const SIGNATURE_DELIMITER: &str = "|";

/// Purpose of an image within a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageRole {
    Like,
    Comment1,
    Comment2,
    Reply1,
    Reply2,
}

impl ImageRole {
    /// All roles in canonical order.
    pub const ALL: [ImageRole; 5] = [
        ImageRole::Like,
        ImageRole::Comment1,
        ImageRole::Comment2,
        ImageRole::Reply1,
        ImageRole::Reply2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Comment1 => "comment1",
            Self::Comment2 => "comment2",
            Self::Reply1 => "reply1",
            Self::Reply2 => "reply2",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Like => 0,
            Self::Comment1 => 1,
            Self::Comment2 => 2,
            Self::Reply1 => 3,
            Self::Reply2 => 4,
        }
    }

    /// Roles whose screenshots show comment threads.
    pub fn is_comment(&self) -> bool {
        matches!(self, Self::Comment1 | Self::Comment2)
    }

    /// Roles whose screenshots show reply threads.
    pub fn is_reply(&self) -> bool {
        matches!(self, Self::Reply1 | Self::Reply2)
    }
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageRole {
    type Err = ProofshotError;

    fn from_str(s: &str) -> Result<Self> {
        ImageRole::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ProofshotError::Config(format!("Unknown image role: {s}")))
    }
}

/// Raw uploaded bytes for one role.
#[derive(Debug, Clone)]
pub struct BundleImage {
    pub bytes: Vec<u8>,
    /// MIME type declared by the uploader, if any.
    pub declared_mime: Option<String>,
}

impl BundleImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            declared_mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.declared_mime = Some(mime.into());
        self
    }
}

/// Exactly one image per [`ImageRole`].
#[derive(Debug, Clone)]
pub struct Bundle {
    images: [BundleImage; 5],
}

impl Bundle {
    /// Assemble a bundle from role-tagged images.
    ///
    /// Fails with [`ProofshotError::DuplicateRole`] if a role appears twice and
    /// [`ProofshotError::MissingRole`] if any role is absent.
    pub fn from_images<I>(images: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ImageRole, BundleImage)>,
    {
        let mut slots: [Option<BundleImage>; 5] = Default::default();
        for (role, image) in images {
            let slot = &mut slots[role.index()];
            if slot.is_some() {
                return Err(ProofshotError::DuplicateRole(role));
            }
            *slot = Some(image);
        }

        let [like, comment1, comment2, reply1, reply2] = slots;
        Ok(Self {
            images: [
                like.ok_or(ProofshotError::MissingRole(ImageRole::Like))?,
                comment1.ok_or(ProofshotError::MissingRole(ImageRole::Comment1))?,
                comment2.ok_or(ProofshotError::MissingRole(ImageRole::Comment2))?,
                reply1.ok_or(ProofshotError::MissingRole(ImageRole::Reply1))?,
                reply2.ok_or(ProofshotError::MissingRole(ImageRole::Reply2))?,
            ],
        })
    }

    pub fn image(&self, role: ImageRole) -> &BundleImage {
        &self.images[role.index()]
    }

    /// Iterate over `(role, image)` pairs in canonical role order.
    pub fn iter(&self) -> impl Iterator<Item = (ImageRole, &BundleImage)> {
        ImageRole::ALL.into_iter().zip(self.images.iter())
    }

    pub fn total_bytes(&self) -> usize {
        self.images.iter().map(|image| image.bytes.len()).sum()
    }
}

/// Per-image fingerprint computed at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub role: ImageRole,
    /// Perceptual hash, hex encoded.
    pub perceptual_hash: String,
    /// SHA3-256 of the uploaded bytes, hex encoded.
    pub content_hash: String,
    pub byte_size: u64,
    pub mime_type: String,
}

/// Permutation-invariant fingerprint of a bundle: its perceptual hashes
/// sorted lexicographically and joined with [`SIGNATURE_DELIMITER`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundleSignature(String);

impl BundleSignature {
    pub fn from_hashes<I, S>(hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sorted: Vec<String> = hashes
            .into_iter()
            .map(|h| h.as_ref().to_string())
            .collect();
        sorted.sort();
        Self(sorted.join(SIGNATURE_DELIMITER))
    }

    pub fn from_records(records: &[FileRecord]) -> Self {
        Self::from_hashes(records.iter().map(|r| r.perceptual_hash.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(16)
            .map(|(idx, _)| idx)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for BundleSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The record persisted for an accepted bundle.
#[derive(Debug, Clone, Serialize)]
pub struct BundleRecord {
    pub bundle_id: Uuid,
    pub user_id: String,
    pub link_id: String,
    /// Mirrors `analysis.verified()` for fast filtering.
    pub verified: bool,
    pub analysis: AnalysisResult,
    pub signature: BundleSignature,
    /// One record per role, in canonical role order.
    pub files: Vec<FileRecord>,
    pub created_at: DateTime<Utc>,
}

impl BundleRecord {
    pub fn new(
        user_id: impl Into<String>,
        link_id: impl Into<String>,
        files: Vec<FileRecord>,
        analysis: AnalysisResult,
    ) -> Self {
        let signature = BundleSignature::from_records(&files);
        Self {
            bundle_id: Uuid::new_v4(),
            user_id: user_id.into(),
            link_id: link_id.into(),
            verified: analysis.verified(),
            analysis,
            signature,
            files,
            created_at: Utc::now(),
        }
    }

    /// Perceptual hashes in role order.
    pub fn perceptual_hashes(&self) -> Vec<String> {
        self.files
            .iter()
            .map(|file| file.perceptual_hash.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn image(tag: u8) -> BundleImage {
        BundleImage::new(vec![tag; 4])
    }

    #[test]
    fn test_bundle_requires_every_role() {
        let images = vec![
            (ImageRole::Like, image(0)),
            (ImageRole::Comment1, image(1)),
            (ImageRole::Comment2, image(2)),
            (ImageRole::Reply1, image(3)),
        ];
        let err = Bundle::from_images(images).unwrap_err();
        assert!(matches!(err, ProofshotError::MissingRole(ImageRole::Reply2)));
    }

    #[test]
    fn test_bundle_rejects_repeated_role() {
        let images = vec![
            (ImageRole::Like, image(0)),
            (ImageRole::Like, image(9)),
            (ImageRole::Comment1, image(1)),
            (ImageRole::Comment2, image(2)),
            (ImageRole::Reply1, image(3)),
            (ImageRole::Reply2, image(4)),
        ];
        let err = Bundle::from_images(images).unwrap_err();
        assert!(matches!(err, ProofshotError::DuplicateRole(ImageRole::Like)));
    }

    #[test]
    fn test_bundle_accepts_any_order() {
        let images = ImageRole::ALL
            .into_iter()
            .rev()
            .enumerate()
            .map(|(i, role)| (role, image(i as u8)));
        let bundle = Bundle::from_images(images).unwrap();
        assert_eq!(bundle.image(ImageRole::Reply2).bytes, vec![0; 4]);
        assert_eq!(bundle.image(ImageRole::Like).bytes, vec![4; 4]);
        assert_eq!(bundle.total_bytes(), 20);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Reply1".parse::<ImageRole>().unwrap(), ImageRole::Reply1);
        assert_eq!(" like ".parse::<ImageRole>().unwrap(), ImageRole::Like);
        assert!("reply3".parse::<ImageRole>().is_err());
        assert_eq!(
            serde_json::to_string(&ImageRole::Comment2).unwrap(),
            "\"comment2\""
        );
    }

    #[test]
    fn test_signature_sorts_hashes() {
        let sig = BundleSignature::from_hashes(["ff", "0a", "b1", "0a", "c3"]);
        assert_eq!(sig.as_str(), "0a|0a|b1|c3|ff");
    }

    proptest! {
        #[test]
        fn prop_signature_ignores_role_assignment(
            hashes in proptest::collection::vec("[0-9a-f]{64}", 5),
            rotation in 0usize..5,
        ) {
            let mut permuted = hashes.clone();
            permuted.rotate_left(rotation);
            permuted.swap(0, 4);
            prop_assert_eq!(
                BundleSignature::from_hashes(&hashes),
                BundleSignature::from_hashes(&permuted)
            );
        }
    }
}
