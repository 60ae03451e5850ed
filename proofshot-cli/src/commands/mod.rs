//! Subcommand implementations.

pub mod analyze;
pub mod binarize;
pub mod distance;
pub mod hash;
pub mod submit;

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use proofshot_core::{
    AnalysisResult, BundleVerifier, HistoryStore, TesseractConfig, TesseractOcr, VerifierConfig,
};
use tracing::debug;

/// Verifier backed by the Tesseract command-line engine.
pub fn build_verifier(
    config: VerifierConfig,
    history: Arc<dyn HistoryStore>,
) -> Result<BundleVerifier> {
    let tesseract = TesseractConfig::from_env();
    debug!(binary = %tesseract.binary.display(), language = %tesseract.language, "Using Tesseract");
    BundleVerifier::new(config, Arc::new(TesseractOcr::new(tesseract)), history)
        .context("Failed to set up verifier")
}

fn yes_no(value: bool) -> colored::ColoredString {
    if value {
        "yes".green()
    } else {
        "no".red()
    }
}

/// Human-readable analysis summary.
pub fn print_analysis(analysis: &AnalysisResult) {
    println!("   {} {}", "Liked:".dimmed(), yes_no(analysis.liked()));
    println!(
        "   {} {}",
        "Handle:".dimmed(),
        analysis
            .user_handle()
            .map(|h| format!("@{h}"))
            .unwrap_or_else(|| "(none in both comments and replies)".to_string())
    );
    println!("   {} {}", "Comments:".dimmed(), analysis.comment_texts().len());
    for text in analysis.comment_texts() {
        println!("      - {text}");
    }
    println!("   {} {}", "Replies:".dimmed(), analysis.reply_texts().len());
    for text in analysis.reply_texts() {
        println!("      - {text}");
    }
    println!("   {} {}", "Verified:".dimmed(), yes_no(analysis.verified()));
    for shortfall in analysis.shortfalls() {
        println!("   {} {}", "Missing:".dimmed(), shortfall.to_string().yellow());
    }
}
