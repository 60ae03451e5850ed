//! Binarize command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use proofshot_core::imaging::{binarize, decode};
use proofshot_core::{SauvolaParams, VerifierConfig};
use tracing::info;

use crate::exit_codes::SUCCESS;
use crate::utils::read_file;

/// Execute the binarize command.
pub fn execute(
    input: PathBuf,
    output: PathBuf,
    window: u32,
    k: f64,
    range: f64,
    quiet: bool,
) -> Result<i32> {
    let params = SauvolaParams {
        window_size: window,
        k,
        dynamic_range: range,
    };
    VerifierConfig {
        sauvola: params,
        ..Default::default()
    }
    .validate()
    .context("Invalid binarization parameters")?;

    let bytes = read_file(&input)?;
    let gray = decode(&bytes)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("Failed to decode image: {}", input.display()))?
        .to_luma8();

    let binary = binarize(&gray, &params).context("Failed to binarize image")?;
    binary
        .save_with_format(&output, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        width = binary.width(),
        height = binary.height(),
        window,
        "Binarized image"
    );
    if !quiet {
        println!("Wrote {}", output.display());
    }
    Ok(SUCCESS)
}
