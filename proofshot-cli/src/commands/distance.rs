//! Distance command implementation.

use anyhow::Result;
use colored::Colorize;
use proofshot_core::{hex_hamming_distance, DuplicateDetector};

use crate::exit_codes::{UsageError, SUCCESS};

/// Execute the distance command.
pub fn execute(a: &str, b: &str, threshold: u32, quiet: bool) -> Result<i32> {
    let distance = hex_hamming_distance(a.trim(), b.trim())
        .ok_or_else(|| UsageError("Hashes must be hexadecimal".to_string()))?;
    let near = DuplicateDetector::new(threshold).is_near(a.trim(), b.trim());

    if quiet {
        println!("{distance}");
    } else if near {
        println!("{distance} {}", format!("(near-duplicate, threshold {threshold})").yellow());
    } else {
        println!("{distance} {}", format!("(distinct, threshold {threshold})").green());
    }
    Ok(SUCCESS)
}
