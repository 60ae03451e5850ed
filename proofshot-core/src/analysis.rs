//! The verification decision.
//!
//! Everything here is pure: given the like signal and the two handle maps,
//! [`decide`] produces an [`AnalysisResult`] whose `verified` flag cannot be
//! set any other way.

use serde::Serialize;

use crate::text::{refine_text, HandleTexts};

/// Outcome of analyzing one bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    liked: bool,
    user_handle: Option<String>,
    comment_texts: Vec<String>,
    reply_texts: Vec<String>,
    verified: bool,
    /// Thresholds in force when the decision was made.
    #[serde(skip)]
    required: (usize, usize),
}

/// One unmet verification condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Shortfall {
    NotLiked,
    NoCommonHandle,
    TooFewComments { found: usize, required: usize },
    TooFewReplies { found: usize, required: usize },
}

impl std::fmt::Display for Shortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotLiked => f.write_str("post is not liked"),
            Self::NoCommonHandle => f.write_str("no handle appears in both comments and replies"),
            Self::TooFewComments { found, required } => {
                write!(f, "found {found} comment(s), need {required}")
            }
            Self::TooFewReplies { found, required } => {
                write!(f, "found {found} reply text(s), need {required}")
            }
        }
    }
}

impl AnalysisResult {
    pub fn liked(&self) -> bool {
        self.liked
    }

    pub fn user_handle(&self) -> Option<&str> {
        self.user_handle.as_deref()
    }

    pub fn comment_texts(&self) -> &[String] {
        &self.comment_texts
    }

    pub fn reply_texts(&self) -> &[String] {
        &self.reply_texts
    }

    pub fn verified(&self) -> bool {
        self.verified
    }

    /// Every condition that kept the bundle from verifying. Empty when verified.
    pub fn shortfalls(&self) -> Vec<Shortfall> {
        let (min_comments, min_replies) = self.required;
        let mut out = Vec::new();
        if !self.liked {
            out.push(Shortfall::NotLiked);
        }
        if self.user_handle.is_none() {
            out.push(Shortfall::NoCommonHandle);
        }
        if self.comment_texts.len() < min_comments {
            out.push(Shortfall::TooFewComments {
                found: self.comment_texts.len(),
                required: min_comments,
            });
        }
        if self.reply_texts.len() < min_replies {
            out.push(Shortfall::TooFewReplies {
                found: self.reply_texts.len(),
                required: min_replies,
            });
        }
        out
    }
}

/// First handle, in comment-map order, that also has reply texts.
pub fn select_handle<'a>(comments: &'a HandleTexts, replies: &HandleTexts) -> Option<&'a str> {
    comments.handles().find(|handle| replies.contains(handle))
}

fn refined(fragments: &[String]) -> Vec<String> {
    fragments
        .iter()
        .map(|fragment| refine_text(fragment))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Combine the like signal with the comment and reply maps.
///
/// Texts are refined before counting; fragments that refine to nothing are
/// dropped from both the count and the result.
pub fn decide(
    liked: bool,
    comments: &HandleTexts,
    replies: &HandleTexts,
    min_comments: usize,
    min_replies: usize,
) -> AnalysisResult {
    let user_handle = select_handle(comments, replies).map(str::to_string);

    let (comment_texts, reply_texts) = match user_handle.as_deref() {
        Some(handle) => (
            refined(comments.get(handle).unwrap_or_default()),
            refined(replies.get(handle).unwrap_or_default()),
        ),
        None => (Vec::new(), Vec::new()),
    };

    let verified = liked
        && user_handle.is_some()
        && comment_texts.len() >= min_comments
        && reply_texts.len() >= min_replies;

    AnalysisResult {
        liked,
        user_handle,
        comment_texts,
        reply_texts,
        verified,
        required: (min_comments, min_replies),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::extract_handle_texts;

    fn maps(comments: &[&str], replies: &[&str]) -> (HandleTexts, HandleTexts) {
        (extract_handle_texts(comments), extract_handle_texts(replies))
    }

    #[test]
    fn test_alice_scenario() {
        let (c, r) = maps(
            &["@alice", "great post", "nice!!", "@bob", "thanks"],
            &["@alice", "welcome", "@carol", "hi"],
        );
        let result = decide(true, &c, &r, 2, 2);

        assert_eq!(result.user_handle(), Some("alice"));
        assert_eq!(result.comment_texts(), ["great post nice"]);
        assert_eq!(result.reply_texts(), ["welcome"]);
        assert!(!result.verified());
        assert_eq!(
            result.shortfalls(),
            vec![
                Shortfall::TooFewComments { found: 1, required: 2 },
                Shortfall::TooFewReplies { found: 1, required: 2 },
            ]
        );
    }

    #[test]
    fn test_verified_when_all_signals_present() {
        let (c, r) = maps(
            &["@alice", "great post", "@alice", "love the colors"],
            &["@alice", "thank you so much", "@alice", "glad you like it"],
        );
        let result = decide(true, &c, &r, 2, 2);
        assert!(result.verified());
        assert!(result.shortfalls().is_empty());
    }

    #[test]
    fn test_not_liked_blocks_verification() {
        let (c, r) = maps(
            &["@alice", "great post", "@alice", "love the colors"],
            &["@alice", "thank you so much", "@alice", "glad you like it"],
        );
        let result = decide(false, &c, &r, 2, 2);
        assert!(!result.verified());
        assert_eq!(result.shortfalls(), vec![Shortfall::NotLiked]);
    }

    #[test]
    fn test_no_common_handle() {
        let (c, r) = maps(&["@alice", "hello there"], &["@bob", "hi back"]);
        let result = decide(true, &c, &r, 0, 0);

        assert_eq!(result.user_handle(), None);
        assert!(result.comment_texts().is_empty());
        assert!(result.reply_texts().is_empty());
        // Zero thresholds still require a shared handle
        assert!(!result.verified());
        assert_eq!(result.shortfalls(), vec![Shortfall::NoCommonHandle]);
    }

    #[test]
    fn test_first_shared_handle_in_comment_order_wins() {
        let (c, r) = maps(
            &["@dave", "first one", "@erin", "second one"],
            &["@erin", "reply to erin", "@dave", "reply to dave"],
        );
        assert_eq!(select_handle(&c, &r), Some("dave"));
    }

    #[test]
    fn test_empty_refined_fragments_do_not_count() {
        let (c, r) = maps(
            &["@alice", "nice work", "@alice", "ok so it"],
            &["@alice", "thanks a lot", "@alice", "yes indeed"],
        );
        let result = decide(true, &c, &r, 2, 2);
        assert_eq!(result.comment_texts(), ["nice work"]);
        assert!(!result.verified());
    }

    #[test]
    fn test_serialized_shape() {
        let (c, r) = maps(&["@alice", "hello there"], &["@alice", "hi back"]);
        let json = serde_json::to_value(decide(true, &c, &r, 1, 1)).unwrap();
        assert_eq!(json["user_handle"], "alice");
        assert_eq!(json["verified"], true);
        assert!(json.get("required").is_none());
    }
}
