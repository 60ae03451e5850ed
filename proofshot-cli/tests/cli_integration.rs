//! CLI integration tests for proofshot.
//!
//! These run the real binary. None of them needs a Tesseract install:
//! every bundle-level case fails before recognition starts.

use assert_cmd::Command;
use image::{GrayImage, Luma};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn proofshot() -> Command {
    Command::cargo_bin("proofshot").unwrap()
}

fn write_png(dir: &Path, name: &str, seed: u8) -> PathBuf {
    let path = dir.join(name);
    let img = GrayImage::from_fn(64, 48, |x, y| {
        if (x / 8 + y / 8 + seed as u32) % 2 == 0 {
            Luma([20])
        } else {
            Luma([230])
        }
    });
    img.save(&path).unwrap();
    path
}

fn bundle_args(paths: &[PathBuf; 5]) -> Vec<String> {
    let flags = ["--like", "--comment1", "--comment2", "--reply1", "--reply2"];
    flags
        .iter()
        .zip(paths)
        .flat_map(|(flag, path)| [flag.to_string(), path.display().to_string()])
        .collect()
}

// ============================================================================
// Help and Version
// ============================================================================

#[test]
fn test_help_lists_commands() {
    proofshot()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("submit"))
        .stdout(predicate::str::contains("distance"));
}

#[test]
fn test_help_shows_exit_codes() {
    proofshot()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("65"))
        .stdout(predicate::str::contains("69"));
}

#[test]
fn test_version_displays_name() {
    proofshot()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("proofshot"));
}

#[test]
fn test_analyze_help_shows_bundle_flags() {
    proofshot()
        .args(["analyze", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--comment1"))
        .stdout(predicate::str::contains("--reply2"))
        .stdout(predicate::str::contains("--format"));
}

#[test]
fn test_submit_requires_user() {
    proofshot()
        .args(["submit", "--link", "post-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--user"));
}

// ============================================================================
// Distance
// ============================================================================

#[test]
fn test_distance_counts_differing_bits() {
    proofshot()
        .args(["distance", "ff00", "0f00"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("4"));
}

#[test]
fn test_distance_quiet_prints_number_only() {
    proofshot()
        .args(["--quiet", "distance", "00", "ff"])
        .assert()
        .success()
        .stdout("8\n");
}

#[test]
fn test_distance_reports_near_duplicate() {
    proofshot()
        .args(["distance", "abcd", "abcf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("near-duplicate"));

    proofshot()
        .args(["distance", "--threshold", "2", "0000", "ffff"])
        .assert()
        .success()
        .stdout(predicate::str::contains("distinct"));
}

#[test]
fn test_distance_rejects_non_hex() {
    proofshot()
        .args(["distance", "xyz", "00"])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("hexadecimal"));
}

// ============================================================================
// Hash
// ============================================================================

#[test]
fn test_hash_json_output() {
    let temp = TempDir::new().unwrap();
    let png = write_png(temp.path(), "shot.png", 0);

    let output = proofshot()
        .args(["hash", "--format", "json", png.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entry = &parsed[0];
    assert_eq!(entry["perceptual_hash"].as_str().unwrap().len(), 64);
    assert_eq!(entry["content_hash"].as_str().unwrap().len(), 64);
    assert_eq!(entry["mime_type"], "image/png");
}

#[test]
fn test_hash_same_image_same_phash() {
    let temp = TempDir::new().unwrap();
    let a = write_png(temp.path(), "a.png", 0);
    let b = write_png(temp.path(), "b.png", 0);

    let output = proofshot()
        .args(["hash", "-f", "json", a.to_str().unwrap(), b.to_str().unwrap()])
        .output()
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed[0]["perceptual_hash"], parsed[1]["perceptual_hash"]);
}

#[test]
fn test_hash_garbage_file_is_input_error() {
    let temp = TempDir::new().unwrap();
    let junk = temp.path().join("junk.png");
    fs::write(&junk, b"definitely not an image").unwrap();

    proofshot()
        .args(["hash", junk.to_str().unwrap()])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to decode image"));
}

#[test]
fn test_hash_missing_file_is_input_error() {
    proofshot()
        .args(["hash", "/nonexistent/shot.png"])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read file"));
}

// ============================================================================
// Binarize
// ============================================================================

#[test]
fn test_binarize_writes_png() {
    let temp = TempDir::new().unwrap();
    let input = write_png(temp.path(), "in.png", 1);
    let output = temp.path().join("out.png");

    proofshot()
        .args([
            "binarize",
            "--window",
            "15",
            input.to_str().unwrap(),
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    let written = image::open(&output).unwrap().to_luma8();
    assert_eq!(written.dimensions(), (64, 48));
    assert!(written.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
}

#[test]
fn test_binarize_even_window_is_usage_error() {
    let temp = TempDir::new().unwrap();
    let input = write_png(temp.path(), "in.png", 1);
    let output = temp.path().join("out.png");

    proofshot()
        .args([
            "binarize",
            "--window",
            "24",
            input.to_str().unwrap(),
            output.to_str().unwrap(),
        ])
        .assert()
        .code(64);
    assert!(!output.exists());
}

// ============================================================================
// Analyze / Submit input handling
// ============================================================================

#[test]
fn test_analyze_missing_file() {
    let temp = TempDir::new().unwrap();
    let mut paths: [PathBuf; 5] =
        std::array::from_fn(|i| write_png(temp.path(), &format!("s{i}.png"), i as u8));
    paths[3] = temp.path().join("missing.png");

    proofshot()
        .arg("analyze")
        .args(bundle_args(&paths))
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn test_analyze_undecodable_image() {
    let temp = TempDir::new().unwrap();
    let mut paths: [PathBuf; 5] =
        std::array::from_fn(|i| write_png(temp.path(), &format!("s{i}.png"), i as u8));
    let junk = temp.path().join("comment1.png");
    fs::write(&junk, b"\x89PNG truncated").unwrap();
    paths[1] = junk;

    proofshot()
        .arg("analyze")
        .args(bundle_args(&paths))
        .assert()
        .code(66)
        .stderr(predicate::str::contains("comment1"));
}

#[test]
fn test_analyze_bad_config_is_usage_error() {
    let temp = TempDir::new().unwrap();
    let paths: [PathBuf; 5] =
        std::array::from_fn(|i| write_png(temp.path(), &format!("s{i}.png"), i as u8));
    let config = temp.path().join("config.json");
    fs::write(&config, r#"{"sauvola": {"window_size": 4}}"#).unwrap();

    proofshot()
        .arg("analyze")
        .args(bundle_args(&paths))
        .args(["--config", config.to_str().unwrap()])
        .assert()
        .code(64);
}

#[test]
fn test_analyze_malformed_env_threshold_is_usage_error() {
    let temp = TempDir::new().unwrap();
    let paths: [PathBuf; 5] =
        std::array::from_fn(|i| write_png(temp.path(), &format!("s{i}.png"), i as u8));

    proofshot()
        .env("PROOFSHOT_HAMMING_THRESHOLD", "six")
        .arg("analyze")
        .args(bundle_args(&paths))
        .assert()
        .code(64)
        .stderr(predicate::str::contains("PROOFSHOT_HAMMING_THRESHOLD"));
}

#[test]
fn test_submit_undecodable_image_records_nothing() {
    let temp = TempDir::new().unwrap();
    let mut paths: [PathBuf; 5] =
        std::array::from_fn(|i| write_png(temp.path(), &format!("s{i}.png"), i as u8));
    let junk = temp.path().join("like.png");
    fs::write(&junk, b"GIF89a nope").unwrap();
    paths[0] = junk;

    proofshot()
        .env_remove("DATABASE_URL")
        .args(["submit", "--user", "u1", "--link", "post-1"])
        .args(bundle_args(&paths))
        .assert()
        .code(66);
}
