//! Integration tests for the `duetlink` CLI binary.
//!
//! Argument parsing, help output and configuration commands run without a
//! board; the board commands run against a wiremock server.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `duetlink` binary with env isolation.
///
/// Clears all `DUETLINK_*` env vars and points config directories at a
/// throwaway path so tests never touch the user's real configuration.
fn duetlink_cmd(home: &std::path::Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("duetlink");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("DUETLINK_PROFILE")
        .env_remove("DUETLINK_HOST")
        .env_remove("DUETLINK_PASSWORD")
        .env_remove("DUETLINK_OUTPUT")
        .env_remove("DUETLINK_INSECURE")
        .env_remove("DUETLINK_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

async fn board() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rr_connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "err": 0,
            "sessionTimeout": 8000,
            "boardType": "duetwifi102"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rr_download"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rr_disconnect"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;
    server
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run(cmd: assert_cmd::Command) -> std::process::Output {
    let mut cmd = cmd;
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = duetlink_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    duetlink_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("monitor")
            .and(predicate::str::contains("gcode"))
            .and(predicate::str::contains("file-info"))
            .and(predicate::str::contains("machine-config")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    duetlink_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("duetlink"));
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    duetlink_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_status_without_board_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    duetlink_cmd(home.path())
        .arg("status")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No board configured"));
}

#[test]
fn test_unknown_profile_is_not_found() {
    let home = tempfile::tempdir().unwrap();
    duetlink_cmd(home.path())
        .args(["-p", "missing", "status"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("missing"));
}

#[test]
fn test_invalid_output_format() {
    let home = tempfile::tempdir().unwrap();
    let output = duetlink_cmd(home.path())
        .args(["--output", "xml", "status"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("possible values") || text.contains("invalid value"), "{text}");
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_set_then_profiles() {
    let home = tempfile::tempdir().unwrap();
    duetlink_cmd(home.path())
        .args(["-p", "printer", "config", "set", "host", "duet.local"])
        .assert()
        .success();

    duetlink_cmd(home.path())
        .args(["config", "profiles", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("printer"));
}

#[test]
fn test_config_use_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    duetlink_cmd(home.path())
        .args(["config", "use", "nope"])
        .assert()
        .code(4);
}

#[test]
fn test_config_show_without_file() {
    let home = tempfile::tempdir().unwrap();
    duetlink_cmd(home.path()).args(["config", "show"]).assert().success();
}

// ── Board commands ──────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_gcode_prints_reply() {
    let server = board().await;
    Mock::given(method("GET"))
        .and(path("/rr_gcode"))
        .and(query_param("gcode", "G28 X"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "buff": 200 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rr_reply"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Warning: X endstop not hit\n"))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let mut cmd = duetlink_cmd(home.path());
    cmd.args(["--host", &server.uri(), "--color", "never", "gcode", "-U", "--wait", "10", "g28 x"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "Warning: X endstop not hit"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_plain_prints_code() {
    let server = board().await;
    Mock::given(method("GET"))
        .and(path("/rr_status"))
        .and(query_param("type", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "P",
            "seq": 3,
            "name": "Printy"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let mut cmd = duetlink_cmd(home.path());
    cmd.args(["--host", &server.uri(), "-o", "plain", "status"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "P");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wrong_password_exits_with_auth_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rr_connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "err": 1 })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let mut cmd = duetlink_cmd(home.path());
    cmd.args(["--host", &server.uri(), "--password", "wrong", "file-info"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("rejected the password"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_info_json() {
    let server = board().await;
    Mock::given(method("GET"))
        .and(path("/rr_fileinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "err": 0,
            "fileName": "0:/gcodes/cube.gcode",
            "height": 10.0,
            "layerHeight": 0.2,
            "filament": [1200.5]
        })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let mut cmd = duetlink_cmd(home.path());
    cmd.args(["--host", &server.uri(), "-o", "json-compact", "file-info"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["file_name"], "0:/gcodes/cube.gcode");
    assert_eq!(parsed["filament"][0], 1200.5);
}
