//! Integration tests for the `rentflow` CLI binary.
//!
//! Argument parsing, local commands and config handling run without a
//! backend; backend-bound commands run against a wiremock server.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `rentflow` binary with env isolation.
///
/// Clears all `RENTFLOW_*` env vars and points the config file into
/// `config_dir` so tests never touch the user's real configuration.
fn rentflow_cmd(config_dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("rentflow");
    cmd.env("HOME", config_dir)
        .env("XDG_CONFIG_HOME", config_dir)
        .env("RENTFLOW_CONFIG", config_dir.join("config.toml"))
        .env("NO_COLOR", "1")
        .env_remove("RENTFLOW_PROFILE")
        .env_remove("RENTFLOW_URL")
        .env_remove("RENTFLOW_TOKEN")
        .env_remove("RENTFLOW_OUTPUT")
        .env_remove("RENTFLOW_INSECURE")
        .env_remove("RENTFLOW_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// A command pointed at `server`, with a token so no keyring lookup runs.
fn backend_cmd(config_dir: &Path, server: &MockServer) -> assert_cmd::Command {
    let mut cmd = rentflow_cmd(config_dir);
    cmd.args(["--url", &server.uri(), "--token", "test-token"]);
    cmd
}

async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = rentflow_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    rentflow_cmd(dir.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("templates")
            .and(predicate::str::contains("sync"))
            .and(predicate::str::contains("classify")),
    );
}

#[test]
fn test_version_flag() {
    let dir = tempfile::tempdir().unwrap();
    rentflow_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rentflow"));
}

#[test]
fn test_completions_zsh() {
    let dir = tempfile::tempdir().unwrap();
    rentflow_cmd(dir.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Local commands ──────────────────────────────────────────────────

#[test]
fn test_classify_fetch_failure_as_network_error() {
    let dir = tempfile::tempdir().unwrap();
    rentflow_cmd(dir.path())
        .args(["classify", "Failed to fetch", "-o", "json"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("network_error")
                .and(predicate::str::contains("\"retryable\": true")),
        );
}

#[test]
fn test_classify_uses_status() {
    let dir = tempfile::tempdir().unwrap();
    rentflow_cmd(dir.path())
        .args(["classify", "something odd", "--status", "429", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::diff("RATE_LIMIT\n"));
}

#[test]
fn test_bulk_summarize_from_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let body = json!({
        "success": false,
        "updatedCount": 2,
        "failedIds": ["a"],
        "errors": [{ "id": "a", "message": "offline", "code": "NETWORK_ERROR" }]
    });
    rentflow_cmd(dir.path())
        .args(["bulk", "summarize", "-", "-o", "json"])
        .write_stdin(body.to_string())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"failedCount\": 1")
                .and(predicate::str::contains("\"canRetry\": true"))
                .and(predicate::str::contains("Teilweise erfolgreich")),
        );
}

#[test]
fn test_bulk_summarize_rejects_bad_json() {
    let dir = tempfile::tempdir().unwrap();
    rentflow_cmd(dir.path())
        .args(["bulk", "summarize", "-"])
        .write_stdin("not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid JSON"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    let dir = tempfile::tempdir().unwrap();
    rentflow_cmd(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]"));
}

#[test]
fn test_config_path_honors_env() {
    let dir = tempfile::tempdir().unwrap();
    rentflow_cmd(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_then_set_then_show() {
    let dir = tempfile::tempdir().unwrap();
    rentflow_cmd(dir.path())
        .args(["config", "init", "--url", "https://api.example.com"])
        .assert()
        .success();
    rentflow_cmd(dir.path())
        .args(["config", "set", "max_retries", "5"])
        .assert()
        .success();
    rentflow_cmd(dir.path())
        .args(["config", "set-token", "--plaintext", "--value", "s3cret"])
        .assert()
        .success();

    rentflow_cmd(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("https://api.example.com")
                .and(predicate::str::contains("max_retries = 5"))
                .and(predicate::str::contains("****"))
                .and(predicate::str::contains("s3cret").not()),
        );
}

#[test]
fn test_config_set_unknown_key_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = rentflow_cmd(dir.path())
        .args(["config", "set", "colour", "blue"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("unknown config key"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_templates_list_without_backend() {
    let dir = tempfile::tempdir().unwrap();
    rentflow_cmd(dir.path())
        .args(["templates", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No backend configured"));
}

#[test]
fn test_unknown_profile() {
    let dir = tempfile::tempdir().unwrap();
    rentflow_cmd(dir.path())
        .args(["--profile", "prod", "templates", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Profile 'prod' not found"));
}

#[test]
fn test_invalid_output_format() {
    let dir = tempfile::tempdir().unwrap();
    let output = rentflow_cmd(dir.path())
        .args(["--output", "invalid", "templates", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_delete_requires_yes_when_not_interactive() {
    let dir = tempfile::tempdir().unwrap();
    let output = rentflow_cmd(dir.path())
        .args(["--url", "http://127.0.0.1:9", "--token", "t", "templates", "delete", "t-1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("requires confirmation"));
}

// ── Backend-bound commands ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_templates_list_plain() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/templates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "t-1", "titel": "Kündigung", "inhalt": "" },
            { "id": "t-2", "titel": "Mahnung", "inhalt": "" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut cmd = backend_cmd(dir.path(), &server);
    cmd.args(["-o", "plain", "templates", "list"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "t-1\nt-2\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_templates_get_missing_exits_4() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/templates/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "NOT_FOUND",
            "error": "Template not found"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut cmd = backend_cmd(dir.path(), &server);
    cmd.args(["templates", "get", "nope"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("'nope' not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_templates_create_conflict_exits_6() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/templates"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "DUPLICATE_TITLE",
            "error": "duplicate key"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut cmd = backend_cmd(dir.path(), &server);
    cmd.args(["templates", "create", "--title", "Kündigung"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(6), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("existiert bereits"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_health_reports_reachable() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut cmd = backend_cmd(dir.path(), &server);
    cmd.args(["-o", "plain", "health"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "reachable\n");
}

#[test]
fn test_health_unreachable_exits_7() {
    let dir = tempfile::tempdir().unwrap();
    let output = rentflow_cmd(dir.path())
        .args(["--url", "http://127.0.0.1:9", "--token", "t", "health"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sync_replays_operations_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/templates"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "id": "srv-1", "titel": "A" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/templates/t-9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ops = dir.path().join("ops.json");
    std::fs::write(
        &ops,
        json!([
            {
                "id": "00000000-0000-4000-8000-000000000001",
                "type": "create",
                "payload": { "title": "A" }
            },
            {
                "id": "00000000-0000-4000-8000-000000000002",
                "type": "delete",
                "targetId": "t-9"
            }
        ])
        .to_string(),
    )
    .unwrap();

    let mut cmd = backend_cmd(dir.path(), &server);
    cmd.args(["-o", "plain", "sync"]).arg(&ops);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "00000000-0000-4000-8000-000000000001 synced\n\
         00000000-0000-4000-8000-000000000002 synced\n"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sync_reports_unsupported_operations() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ops = dir.path().join("ops.json");
    std::fs::write(
        &ops,
        json!([{ "id": "00000000-0000-4000-8000-000000000003", "type": "archive" }]).to_string(),
    )
    .unwrap();

    let mut cmd = backend_cmd(dir.path(), &server);
    cmd.args(["-o", "plain", "sync"]).arg(&ops);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(1), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("skipped"));
    assert!(combined_output(&output).contains("1 of 1 operations were not synced"));
}
