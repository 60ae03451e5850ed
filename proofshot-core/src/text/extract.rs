//! Group OCR lines into per-handle text fragments.
//!
//! The scan is a two-state machine: *searching* for a handle line, then
//! *collecting* the lines that follow it until a [`Terminator`] shows up.
//! A terminator line is not consumed; it is re-examined while searching, so
//! a handle line both ends one group and starts the next.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::{clean_text, strip_junk, BOILERPLATE_PHRASES};

static HANDLE_INLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@([A-Za-z0-9_.-]{2,})").expect("Invalid handle regex"));

/// Why a collecting run stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// The line carries another `@handle`.
    Handle,
    /// The line is a lone `@` whose name sits on a following line.
    BareAt,
    /// The line starts with UI boilerplate such as "Reply".
    Boilerplate,
}

/// Classify `line` as the end of a comment body, if it is one.
pub fn terminator(line: &str) -> Option<Terminator> {
    if HANDLE_INLINE.is_match(line) {
        return Some(Terminator::Handle);
    }
    let trimmed = line.trim();
    if trimmed == "@" {
        return Some(Terminator::BareAt);
    }
    let lower = trimmed.to_lowercase();
    if BOILERPLATE_PHRASES.iter().any(|p| lower.starts_with(p)) {
        return Some(Terminator::Boilerplate);
    }
    None
}

/// Find a handle starting at line `idx`.
///
/// Returns the bare handle (no `@`) and the index of the line it was read
/// from. That differs from `idx` when OCR split the handle into a lone `@`
/// followed by the name on a later non-blank line.
pub fn find_handle<S: AsRef<str>>(lines: &[S], idx: usize) -> Option<(String, usize)> {
    let line = lines.get(idx)?.as_ref();

    if let Some(caps) = HANDLE_INLINE.captures(line) {
        let name = strip_junk(&caps[1]);
        return (!name.is_empty()).then(|| (name.to_string(), idx));
    }

    if line.trim() != "@" {
        return None;
    }
    let (next_idx, next) = lines
        .iter()
        .enumerate()
        .skip(idx + 1)
        .find(|(_, l)| !AsRef::<str>::as_ref(*l).trim().is_empty())?;
    let first = next.as_ref().split_whitespace().next().unwrap_or("");
    let name = strip_junk(first);
    (!name.is_empty()).then(|| (name.to_string(), next_idx))
}

/// Insertion-ordered mapping from handle to cleaned text fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HandleTexts {
    entries: Vec<(String, Vec<String>)>,
}

impl HandleTexts {
    /// Append a fragment for `handle`, creating the entry on first sight.
    pub fn push(&mut self, handle: &str, fragment: String) {
        match self.entries.iter_mut().find(|(h, _)| h == handle) {
            Some((_, fragments)) => fragments.push(fragment),
            None => self.entries.push((handle.to_string(), vec![fragment])),
        }
    }

    pub fn get(&self, handle: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(h, _)| h == handle)
            .map(|(_, fragments)| fragments.as_slice())
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.get(handle).is_some()
    }

    /// Handles in first-seen order.
    pub fn handles(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(h, _)| h.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn record(&mut self, handle: &str, buffer: &[&str]) {
        let cleaned = clean_text(buffer.join(" ").trim());
        if !cleaned.is_empty() {
            self.push(handle, cleaned);
        }
    }
}

enum ScanState<'a> {
    Searching,
    Collecting { handle: String, buffer: Vec<&'a str> },
}

/// Build the handle → fragments mapping for a sequence of OCR lines.
pub fn extract_handle_texts<S: AsRef<str>>(lines: &[S]) -> HandleTexts {
    let mut texts = HandleTexts::default();
    let mut state = ScanState::Searching;
    let mut i = 0;

    while i < lines.len() {
        state = match state {
            ScanState::Searching => match find_handle(lines, i) {
                Some((handle, at)) => {
                    i = at + 1;
                    ScanState::Collecting {
                        handle,
                        buffer: Vec::new(),
                    }
                }
                None => {
                    i += 1;
                    ScanState::Searching
                }
            },
            ScanState::Collecting { handle, mut buffer } => {
                let line = lines[i].as_ref();
                if terminator(line).is_some() {
                    texts.record(&handle, &buffer);
                    ScanState::Searching
                } else {
                    buffer.push(line);
                    i += 1;
                    ScanState::Collecting { handle, buffer }
                }
            }
        };
    }

    if let ScanState::Collecting { handle, buffer } = state {
        texts.record(&handle, &buffer);
    }
    texts
}
