#![no_main]

//! Fuzz target for OCR text normalization.
//!
//! Run with: cargo +nightly fuzz run fuzz_normalize

use libfuzzer_sys::fuzz_target;
use proofshot_core::text::{clean_text, refine_text};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let refined = refine_text(text);
    // Refining is a fixed point.
    assert_eq!(refine_text(&refined), refined);
    let _ = clean_text(text);
});
