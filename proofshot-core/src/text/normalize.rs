//! Normalization passes for OCR text.
//!
//! [`clean_text`] removes OCR debris (stray numbers and single letters) from
//! raw line groups. [`refine_text`] turns a cleaned fragment into the final
//! comment text by cutting UI boilerplate and short trailing tokens.
//! Both are idempotent.

use once_cell::sync::Lazy;
use regex::Regex;

use super::BOILERPLATE_PHRASES;

static ISOLATED_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+\b").expect("Invalid isolated number regex"));

static SINGLE_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z]\b").expect("Invalid single letter regex"));

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

static EDGE_NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\w']+|[^\w']+$").expect("Invalid edge punctuation regex"));

static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w'\s]").expect("Invalid punctuation regex"));

/// Trailing tokens this short are dropped by [`refine_text`].
const MAX_DROPPED_TOKEN_CHARS: usize = 2;

/// Remove isolated numbers and single letters, then collapse whitespace.
pub fn clean_text(text: &str) -> String {
    let text = ISOLATED_NUMBER.replace_all(text, "");
    let text = SINGLE_LETTER.replace_all(&text, "");
    WHITESPACE_RUN.replace_all(&text, " ").trim().to_string()
}

/// Cut boilerplate and punctuation from a cleaned fragment.
///
/// Stripping punctuation can expose a new boilerplate phrase (`re-ply`), so
/// the pass repeats until the text stops changing. Every pass only removes
/// characters, so this terminates.
pub fn refine_text(text: &str) -> String {
    let mut current = refine_once(text);
    loop {
        let next = refine_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn refine_once(text: &str) -> String {
    let trimmed = EDGE_NON_WORD.replace_all(text, "");

    // ASCII lowercasing keeps byte offsets aligned with `trimmed`.
    let lower = trimmed.to_ascii_lowercase();
    let cut = BOILERPLATE_PHRASES
        .iter()
        .filter_map(|phrase| lower.find(phrase))
        .min()
        .unwrap_or(trimmed.len());
    let kept = PUNCTUATION.replace_all(&trimmed[..cut], "");

    let mut tokens: Vec<&str> = kept.split_whitespace().collect();
    while tokens
        .last()
        .is_some_and(|tok| tok.chars().count() <= MAX_DROPPED_TOKEN_CHARS)
    {
        tokens.pop();
    }
    tokens.join(" ")
}
