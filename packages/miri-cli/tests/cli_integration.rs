use assert_cmd::Command;
use predicates::prelude::*;

fn miri() -> Command {
    Command::cargo_bin("miri-stream").unwrap()
}

// =============================================================================
// GENERAL
// =============================================================================

#[test]
fn test_no_args_shows_help() {
    miri()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    miri()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("miri-stream"));
}

// =============================================================================
// INFO SUBCOMMAND
// =============================================================================

#[test]
fn test_info_lists_stream_args() {
    miri()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("CF32"))
        .stdout(predicate::str::contains("bufflen"))
        .stdout(predicate::str::contains("buffers"))
        .stdout(predicate::str::contains("asyncBuffs"));
}

#[test]
fn test_info_json() {
    let output = miri().args(["info", "--json"]).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["native_format"], "CU16");
    assert_eq!(json["default_mtu"], 18432);
    assert_eq!(json["stream_args"][0]["key"], "bufflen");
    assert_eq!(json["stream_args"][0]["value"], "36864");
}

// =============================================================================
// CAPTURE SUBCOMMAND
// =============================================================================

#[test]
fn test_capture_json_summary() {
    let output = miri()
        .args([
            "capture",
            "--elements",
            "5000",
            "--chunk",
            "300",
            "--bufflen",
            "4096",
            "--buffers",
            "8",
            "--pace-us",
            "200",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["elements"], 5000);
    assert_eq!(json["buffer_length"], 4096);
    assert_eq!(json["num_buffers"], 8);
    assert_eq!(json["mtu"], 2048);
    assert!(json["fragmented_reads"].as_u64().unwrap() > 0);
}

#[test]
fn test_capture_invalid_args_fall_back_to_defaults() {
    let output = miri()
        .args([
            "capture",
            "--elements",
            "100",
            "--bufflen",
            "-1",
            "--buffers",
            "many",
            "--pace-us",
            "100",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["buffer_length"], 36864);
    assert_eq!(json["num_buffers"], 15);
}

#[test]
fn test_capture_writes_cf32_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.cf32");

    miri()
        .args([
            "capture",
            "--elements",
            "1024",
            "--chunk",
            "100",
            "--bufflen",
            "1024",
            "--pace-us",
            "100",
            "--output",
        ])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Captured 1024 elements"));

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 1024 * 2 * 4);

    let values: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    assert!(values.iter().all(|v| (-0.5..0.5).contains(v)));
}

#[test]
fn test_capture_rejects_zero_chunk() {
    miri()
        .args(["capture", "--chunk", "0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("--chunk"));
}
