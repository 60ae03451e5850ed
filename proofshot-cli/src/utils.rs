//! Common utility functions shared across CLI commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use proofshot_core::{Bundle, BundleImage, ImageRole, VerifierConfig};
use serde::Serialize;
use tracing::{debug, info};

use crate::BundleFiles;

/// Read a file, with the path in the error.
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Read file");
    Ok(bytes)
}

/// MIME type guessed from the file extension, used when sniffing fails.
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .as_deref()
    {
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        Some("png") => Some("image/png"),
        Some("gif") => Some("image/gif"),
        Some("webp") => Some("image/webp"),
        _ => None,
    }
}

impl BundleFiles {
    fn by_role(&self) -> [(ImageRole, &PathBuf); 5] {
        [
            (ImageRole::Like, &self.like),
            (ImageRole::Comment1, &self.comment1),
            (ImageRole::Comment2, &self.comment2),
            (ImageRole::Reply1, &self.reply1),
            (ImageRole::Reply2, &self.reply2),
        ]
    }
}

/// Read all five files into a bundle.
pub fn load_bundle(files: &BundleFiles) -> Result<Bundle> {
    let mut images = Vec::with_capacity(5);
    for (role, path) in files.by_role() {
        let mut image = BundleImage::new(read_file(path)?);
        if let Some(mime) = mime_from_extension(path) {
            image = image.with_mime(mime);
        }
        images.push((role, image));
    }
    let bundle = Bundle::from_images(images)?;
    info!(bytes = bundle.total_bytes(), "Loaded bundle");
    Ok(bundle)
}

/// Configuration from a JSON file if given, else from the environment.
pub fn load_config(path: Option<&Path>) -> Result<VerifierConfig> {
    let config = match path {
        Some(path) => VerifierConfig::from_json_file(path),
        None => VerifierConfig::from_env(),
    };
    config.context("Failed to load configuration")
}

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

/// First 16 characters of a hash for display.
pub fn short_hash(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}
