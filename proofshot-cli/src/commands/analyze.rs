//! Analyze command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use proofshot_core::MemoryHistoryStore;
use serde_json::json;
use tracing::info;

use super::{build_verifier, print_analysis};
use crate::exit_codes::{SUCCESS, VERIFICATION_FAILED};
use crate::utils::{load_bundle, load_config, print_json};
use crate::{BundleFiles, OutputFormat};

/// Execute the analyze command. Nothing is recorded.
pub async fn execute(
    files: BundleFiles,
    config: Option<PathBuf>,
    format: OutputFormat,
    quiet: bool,
) -> Result<i32> {
    let config = load_config(config.as_deref())?;
    let bundle = load_bundle(&files)?;

    let verifier = build_verifier(config, Arc::new(MemoryHistoryStore::new()))?;
    let analysis = verifier.analyze_bundle(&bundle).await?;
    info!(verified = analysis.verified(), "Analysis complete");

    match format {
        OutputFormat::Json => print_json(&json!({
            "analysis": &analysis,
            "shortfalls": analysis.shortfalls(),
        }))?,
        OutputFormat::Text if !quiet => {
            println!();
            if analysis.verified() {
                println!("{}", "VERIFIED".green().bold());
            } else {
                println!("{}", "NOT VERIFIED".red().bold());
            }
            println!();
            print_analysis(&analysis);
        }
        OutputFormat::Text => {}
    }

    Ok(if analysis.verified() {
        SUCCESS
    } else {
        VERIFICATION_FAILED
    })
}
