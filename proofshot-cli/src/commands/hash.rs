//! Hash command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use proofshot_core::imaging::{decode, sniff_mime};
use proofshot_core::{content_digest, PerceptualHasher};
use serde::Serialize;

use crate::exit_codes::SUCCESS;
use crate::utils::{mime_from_extension, print_json, read_file};
use crate::OutputFormat;

#[derive(Debug, Serialize)]
struct FileHashes {
    path: String,
    perceptual_hash: String,
    content_hash: String,
    byte_size: u64,
    mime_type: String,
}

fn hash_file(hasher: &PerceptualHasher, path: PathBuf) -> Result<FileHashes> {
    let bytes = read_file(&path)?;
    let image = decode(&bytes)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("Failed to decode image: {}", path.display()))?;
    let mime_type = sniff_mime(&bytes)
        .or_else(|| mime_from_extension(&path))
        .unwrap_or("application/octet-stream")
        .to_string();

    Ok(FileHashes {
        perceptual_hash: hasher.hash_image(&image),
        content_hash: content_digest(&bytes),
        byte_size: bytes.len() as u64,
        mime_type,
        path: path.display().to_string(),
    })
}

/// Execute the hash command.
pub fn execute(files: Vec<PathBuf>, format: OutputFormat) -> Result<i32> {
    let hasher = PerceptualHasher::default();
    let hashes = files
        .into_iter()
        .map(|path| hash_file(&hasher, path))
        .collect::<Result<Vec<_>>>()?;

    match format {
        OutputFormat::Json => print_json(&hashes)?,
        OutputFormat::Text => {
            for h in &hashes {
                println!("{}  {}", h.perceptual_hash, h.path);
                println!("  sha3-256 {}", h.content_hash);
                println!("  {} bytes, {}", h.byte_size, h.mime_type);
            }
        }
    }
    Ok(SUCCESS)
}
