//! Exit codes following sysexits.h conventions.
//!
//! Business outcomes (rejected, duplicate) are returned by commands as codes;
//! failures are classified from the error chain.

use std::fmt;

use proofshot_core::{ErrorKind, ProofshotError};

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments or configuration).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Bundle rejected or flagged as duplicate.
/// Maps to EX_DATAERR from sysexits.h.
pub const VERIFICATION_FAILED: i32 = 65;

/// Cannot open input file, or it is not a readable image.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// OCR engine missing or recognition failed.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const OCR_UNAVAILABLE: i32 = 69;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Invalid command-line value detected after parsing.
#[derive(Debug)]
pub struct UsageError(pub String);

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for UsageError {}

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub fn from_code(code: i32) -> Self {
        Self {
            code,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        Self {
            code: classify(err),
            message: Some(format!("{err:#}")),
        }
    }
}

fn classify_core(err: &ProofshotError) -> i32 {
    match err {
        ProofshotError::Config(_) => USAGE_ERROR,
        ProofshotError::Ocr(_) => OCR_UNAVAILABLE,
        other => match other.kind() {
            ErrorKind::Structural => INPUT_ERROR,
            ErrorKind::Recognition => OCR_UNAVAILABLE,
            ErrorKind::Internal => GENERAL_ERROR,
        },
    }
}

/// Classify by walking the error chain, then by message.
fn classify(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(core) = cause.downcast_ref::<ProofshotError>() {
            return classify_core(core);
        }
        if cause.downcast_ref::<UsageError>().is_some() {
            return USAGE_ERROR;
        }
    }

    let message = format!("{err:#}");
    if message.contains("Failed to read") || message.contains("Failed to decode") {
        INPUT_ERROR
    } else if message.contains("Failed to write") {
        IO_ERROR
    } else {
        GENERAL_ERROR
    }
}
