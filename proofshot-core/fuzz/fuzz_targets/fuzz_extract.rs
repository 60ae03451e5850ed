#![no_main]

//! Fuzz target for handle and text extraction over OCR lines.
//!
//! Run with: cargo +nightly fuzz run fuzz_extract

use libfuzzer_sys::fuzz_target;
use proofshot_core::text::extract_handle_texts;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let lines: Vec<&str> = text.lines().collect();
    let texts = extract_handle_texts(&lines);
    for handle in texts.handles() {
        assert!(!handle.is_empty());
        assert!(texts.get(handle).is_some_and(|f| f.iter().all(|s| !s.is_empty())));
    }
});
