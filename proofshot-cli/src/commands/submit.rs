//! Submit command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use proofshot_core::history::connect_from_env;
use proofshot_core::{Submission, SubmissionOutcome};
use tracing::info;

use super::{build_verifier, print_analysis};
use crate::exit_codes::{SUCCESS, VERIFICATION_FAILED};
use crate::utils::{load_bundle, load_config, print_json, short_hash};
use crate::{BundleFiles, OutputFormat};

/// Execute the submit command.
pub async fn execute(
    user: String,
    link: String,
    files: BundleFiles,
    config: Option<PathBuf>,
    format: OutputFormat,
    quiet: bool,
) -> Result<i32> {
    let config = load_config(config.as_deref())?;
    let bundle = load_bundle(&files)?;

    let history = connect_from_env()
        .await
        .context("Failed to open submission history")?;
    info!(backend = history.backend_name(), "History store ready");

    let verifier = build_verifier(config, history)?;
    let outcome = verifier
        .submit(Submission {
            user_id: user,
            link_id: link,
            bundle,
        })
        .await?;

    let code = if outcome.is_accepted() {
        SUCCESS
    } else {
        VERIFICATION_FAILED
    };

    match format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Text if !quiet => print_outcome(&outcome),
        OutputFormat::Text => {}
    }
    Ok(code)
}

fn print_outcome(outcome: &SubmissionOutcome) {
    println!();
    match outcome {
        SubmissionOutcome::Accepted { record } => {
            println!("{}", "ACCEPTED".green().bold());
            println!();
            println!("   {} {}", "Bundle:".dimmed(), record.bundle_id);
            println!(
                "   {} {}",
                "Signature:".dimmed(),
                short_hash(record.signature.as_str())
            );
            print_analysis(&record.analysis);
        }
        SubmissionOutcome::Rejected { analysis, .. } => {
            println!("{}", "REJECTED".red().bold());
            println!();
            print_analysis(analysis);
        }
        SubmissionOutcome::Duplicate { reason } => {
            println!("{}", "DUPLICATE".yellow().bold());
            println!();
            println!("   {} {}", "Reason:".dimmed(), reason);
        }
    }
}
