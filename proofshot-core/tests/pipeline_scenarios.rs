//! End-to-end submission scenarios with scripted OCR and in-memory history.

use std::sync::Arc;
use std::time::Duration;

use image::{GrayImage, Luma};
use proofshot_core::imaging::encode_png;
use proofshot_core::{
    Bundle, BundleImage, BundleRecord, BundleVerifier, DuplicateMatch, FileRecord,
    HistoryStore, ImageRole, MemoryHistoryStore, OcrMode, ProofshotError, ScriptedOcr, Shortfall,
    Submission, SubmissionOutcome, VerifierConfig,
};

/// 1000x1000 screenshot; `icon_dark` paints the whole like-icon region dark.
fn like_png(icon_dark: bool) -> Vec<u8> {
    let mut img = GrayImage::from_pixel(1000, 1000, Luma([235]));
    if icon_dark {
        for y in 470..550 {
            for x in 50..120 {
                img.put_pixel(x, y, Luma([15]));
            }
        }
    }
    encode_png(&img).unwrap()
}

/// Small striped screenshot; `period` varies the pattern between roles.
fn text_png(period: u32) -> Vec<u8> {
    let img = GrayImage::from_fn(160, 120, |x, _| {
        if (x / period) % 2 == 0 {
            Luma([30])
        } else {
            Luma([225])
        }
    });
    encode_png(&img).unwrap()
}

fn bundle(icon_dark: bool) -> Bundle {
    Bundle::from_images([
        (ImageRole::Like, BundleImage::new(like_png(icon_dark))),
        (ImageRole::Comment1, BundleImage::new(text_png(4))),
        (ImageRole::Comment2, BundleImage::new(text_png(6))),
        (ImageRole::Reply1, BundleImage::new(text_png(9))),
        (ImageRole::Reply2, BundleImage::new(text_png(13))),
    ])
    .unwrap()
}

fn engaged_ocr() -> ScriptedOcr {
    ScriptedOcr::new()
        .with_lines(
            ImageRole::Comment1,
            OcrMode::Text,
            ["Comments 12", "@alice", "great post", "Reply"],
        )
        .with_lines(
            ImageRole::Comment2,
            OcrMode::Text,
            ["@alice", "love the colors", "@bob", "meh"],
        )
        .with_lines(
            ImageRole::Reply1,
            OcrMode::Text,
            ["@", "alice 2h", "thank you so much", "Add a reply..."],
        )
        .with_lines(
            ImageRole::Reply2,
            OcrMode::Text,
            ["@alice", "glad you like it", "Share"],
        )
}

struct Harness {
    verifier: BundleVerifier,
    ocr: Arc<ScriptedOcr>,
    history: Arc<MemoryHistoryStore>,
}

fn harness_with(ocr: ScriptedOcr, config: VerifierConfig) -> Harness {
    let ocr = Arc::new(ocr);
    let history = Arc::new(MemoryHistoryStore::new());
    let verifier = BundleVerifier::new(config, ocr.clone(), history.clone()).unwrap();
    Harness {
        verifier,
        ocr,
        history,
    }
}

fn harness(ocr: ScriptedOcr) -> Harness {
    harness_with(ocr, VerifierConfig::default())
}

fn submission(user: &str, bundle: Bundle) -> Submission {
    Submission {
        user_id: user.to_string(),
        link_id: "post-7".to_string(),
        bundle,
    }
}

#[tokio::test]
async fn test_verified_bundle_is_accepted_and_stored() {
    let h = harness(engaged_ocr());

    let outcome = h.verifier.submit(submission("u1", bundle(true))).await.unwrap();
    let record = match outcome {
        SubmissionOutcome::Accepted { record } => record,
        other => panic!("expected acceptance, got {other:?}"),
    };

    assert!(record.verified);
    assert_eq!(record.user_id, "u1");
    assert_eq!(record.link_id, "post-7");
    assert_eq!(record.files.len(), 5);
    assert_eq!(record.analysis.user_handle(), Some("alice"));
    assert_eq!(
        record.analysis.comment_texts(),
        ["great post", "love the colors"]
    );
    assert_eq!(
        record.analysis.reply_texts(),
        ["thank you so much", "glad you like"]
    );
    assert_eq!(record.signature.as_str().matches('|').count(), 4);

    assert_eq!(h.history.bundle_count("u1").await.unwrap(), 1);
    assert_eq!(h.history.prior_hashes("u1").await.unwrap().len(), 5);
    // Filled icon never needs the count fallback
    assert_eq!(h.ocr.calls(ImageRole::Like, OcrMode::Digits), 0);
}

#[tokio::test]
async fn test_resubmission_is_duplicate_before_ocr() {
    let h = harness(engaged_ocr());

    assert!(h
        .verifier
        .submit(submission("u1", bundle(true)))
        .await
        .unwrap()
        .is_accepted());
    let calls_after_first = h.ocr.total_calls();

    let outcome = h.verifier.submit(submission("u1", bundle(true))).await.unwrap();
    match outcome {
        SubmissionOutcome::Duplicate {
            reason: DuplicateMatch::NearHash { distance, .. },
        } => assert_eq!(distance, 0),
        other => panic!("expected duplicate, got {other:?}"),
    }
    assert_eq!(h.ocr.total_calls(), calls_after_first);
    assert_eq!(h.history.bundle_count("u1").await.unwrap(), 1);
}

#[tokio::test]
async fn test_same_bundle_from_another_user_is_accepted() {
    let h = harness(engaged_ocr());

    for user in ["u1", "u2"] {
        let outcome = h.verifier.submit(submission(user, bundle(true))).await.unwrap();
        assert!(outcome.is_accepted(), "{user}: {outcome:?}");
    }
}

#[tokio::test]
async fn test_near_identical_history_blocks_submission() {
    let h = harness(engaged_ocr());
    let prepared = h.verifier.prepare(&bundle(true)).await.unwrap();

    // Store a bundle whose hashes are each three bits away from the new ones
    let files: Vec<FileRecord> = prepared
        .files()
        .into_iter()
        .map(|mut file| {
            let mut bytes = hex::decode(&file.perceptual_hash).unwrap();
            bytes[0] ^= 0b0000_0111;
            file.perceptual_hash = hex::encode(bytes);
            file
        })
        .collect();
    let analysis = h.verifier.analyze(&prepared).await.unwrap();
    let earlier = BundleRecord::new("u1", "post-1", files, analysis);
    h.history
        .insert_unless_duplicate(&earlier, &Default::default())
        .await
        .unwrap();

    let outcome = h.verifier.submit(submission("u1", bundle(true))).await.unwrap();
    match outcome {
        SubmissionOutcome::Duplicate {
            reason: DuplicateMatch::NearHash { distance, .. },
        } => assert!(distance <= 3),
        other => panic!("expected near duplicate, got {other:?}"),
    }
    assert_eq!(h.history.bundle_count("u1").await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_identical_submissions_accept_once() {
    let h = Arc::new(harness(engaged_ocr()));

    let mut tasks = Vec::new();
    for _ in 0..2 {
        let h = Arc::clone(&h);
        tasks.push(tokio::spawn(async move {
            h.verifier.submit(submission("racer", bundle(true))).await.unwrap()
        }));
    }

    let mut accepted = 0;
    let mut duplicates = 0;
    for task in tasks {
        match task.await.unwrap() {
            SubmissionOutcome::Accepted { .. } => accepted += 1,
            SubmissionOutcome::Duplicate { .. } => duplicates += 1,
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!((accepted, duplicates), (1, 1));
    assert_eq!(h.history.bundle_count("racer").await.unwrap(), 1);
}

#[tokio::test]
async fn test_ocr_timeout_fails_submission() {
    let ocr = engaged_ocr().with_delay(ImageRole::Reply2, OcrMode::Text, Duration::from_secs(10));
    let config = VerifierConfig {
        ocr_timeout_ms: 50,
        ..Default::default()
    };
    let h = harness_with(ocr, config);

    let err = h
        .verifier
        .submit(submission("u1", bundle(true)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProofshotError::OcrTimeout {
            role: ImageRole::Reply2,
            timeout_ms: 50
        }
    ));
    assert!(err.is_retryable());
    assert_eq!(h.history.bundle_count("u1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_thin_thread_is_rejected_with_shortfalls() {
    let ocr = ScriptedOcr::new()
        .with_lines(
            ImageRole::Comment1,
            OcrMode::Text,
            ["@alice", "great post", "nice!!", "@bob", "thanks"],
        )
        .with_lines(
            ImageRole::Reply1,
            OcrMode::Text,
            ["@alice", "welcome", "@carol", "hi"],
        );
    let h = harness(ocr);

    let outcome = h.verifier.submit(submission("u1", bundle(true))).await.unwrap();
    let (analysis, shortfalls) = match outcome {
        SubmissionOutcome::Rejected {
            analysis,
            shortfalls,
        } => (analysis, shortfalls),
        other => panic!("expected rejection, got {other:?}"),
    };

    assert_eq!(analysis.user_handle(), Some("alice"));
    assert_eq!(analysis.comment_texts(), ["great post nice"]);
    assert_eq!(
        shortfalls,
        vec![
            Shortfall::TooFewComments {
                found: 1,
                required: 2
            },
            Shortfall::TooFewReplies {
                found: 1,
                required: 2
            },
        ]
    );
    assert_eq!(h.history.bundle_count("u1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_unliked_post_is_rejected() {
    let h = harness(engaged_ocr());

    let outcome = h.verifier.submit(submission("u1", bundle(false))).await.unwrap();
    match outcome {
        SubmissionOutcome::Rejected { shortfalls, .. } => {
            assert_eq!(shortfalls, vec![Shortfall::NotLiked]);
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_image_is_structural_error() {
    let h = harness(engaged_ocr());
    let bundle = Bundle::from_images([
        (ImageRole::Like, BundleImage::new(like_png(true))),
        (ImageRole::Comment1, BundleImage::new(vec![0x89, b'P', b'N', b'G'])),
        (ImageRole::Comment2, BundleImage::new(text_png(6))),
        (ImageRole::Reply1, BundleImage::new(text_png(9))),
        (ImageRole::Reply2, BundleImage::new(text_png(13))),
    ])
    .unwrap();

    let err = h.verifier.submit(submission("u1", bundle)).await.unwrap_err();
    assert!(matches!(
        err,
        ProofshotError::InvalidImage {
            role: ImageRole::Comment1,
            ..
        }
    ));
    assert!(err.is_client_error());
    assert_eq!(h.ocr.total_calls(), 0);
}

#[test]
fn test_incomplete_bundle_is_rejected_up_front() {
    let err = Bundle::from_images([
        (ImageRole::Like, BundleImage::new(like_png(true))),
        (ImageRole::Comment1, BundleImage::new(text_png(4))),
        (ImageRole::Comment2, BundleImage::new(text_png(6))),
        (ImageRole::Reply1, BundleImage::new(text_png(9))),
    ])
    .unwrap_err();
    assert!(matches!(err, ProofshotError::MissingRole(ImageRole::Reply2)));
    assert!(err.is_client_error());
}
