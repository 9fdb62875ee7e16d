//! End-to-end checks of the `marina` binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::net::TcpListener;

/// A local URL nothing listens on
fn dead_url() -> String {
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    format!("http://127.0.0.1:{port}")
}

fn marina(credentials: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("marina").unwrap();
    cmd.env("MARINA_API_URL", dead_url())
        .env("MARINA_CREDENTIALS_PATH", credentials)
        .env("MARINA_RETRY_ATTEMPTS", "0")
        .env("MARINA_LOGGING", "false")
        .env_remove("MARINA_ENV")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("marina")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("download"))
        .stdout(predicate::str::contains("bookings"));
}

#[test]
fn test_logout_clears_credentials_when_server_unreachable() {
    let dir = tempfile::tempdir().unwrap();
    let credentials = dir.path().join("credentials.json");
    std::fs::write(
        &credentials,
        r#"{"accessToken":"A","refreshToken":"R","expiresAt":null}"#,
    )
    .unwrap();

    marina(&credentials)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out"));

    let stored = std::fs::read_to_string(&credentials).unwrap_or_default();
    assert!(!stored.contains("\"A\""));
}

#[test]
fn test_network_failure_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let credentials = dir.path().join("credentials.json");

    marina(&credentials)
        .arg("whoami")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_invalid_base_url_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let credentials = dir.path().join("credentials.json");

    marina(&credentials)
        .env("MARINA_API_URL", "ftp://example.test")
        .args(["get", "boats"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("base_url"));
}

#[test]
fn test_unparseable_setting_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let credentials = dir.path().join("credentials.json");

    marina(&credentials)
        .env("MARINA_TIMEOUT_SECS", "soon")
        .arg("whoami")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("MARINA_TIMEOUT_SECS"));
}

#[test]
fn test_verbose_reports_session_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let credentials = dir.path().join("credentials.json");

    marina(&credentials)
        .args(["--verbose", "logout"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Session metrics"))
        .stderr(predicate::str::contains("auth.logout"));
}
