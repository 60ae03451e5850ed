//! OCR line post-processing: normalization and handle/comment extraction.

mod extract;
mod normalize;

pub use extract::{extract_handle_texts, find_handle, terminator, HandleTexts, Terminator};
pub use normalize::{clean_text, refine_text};

/// UI text that marks the end of user-written content, lowercase.
///
/// Order is irrelevant: truncation uses the earliest match position.
pub const BOILERPLATE_PHRASES: &[&str] = &[
    "adda reply",
    "add a reply",
    "add reply",
    "add a comment",
    "adda comment",
    "add comment",
    "add a reply…",
    "replies",
    "reply",
    "share",
    "download",
    "remix",
];

/// Glyphs OCR tends to hallucinate around handles and bullets.
const JUNK_GLYPHS: &str = "•·●○▶►«»▪–—|>_";

/// Strip junk glyphs, whitespace and light punctuation from both ends.
pub(crate) fn strip_junk(token: &str) -> &str {
    token.trim_matches(|c: char| JUNK_GLYPHS.contains(c) || " \t\n.:,;()[]{}".contains(c))
}
