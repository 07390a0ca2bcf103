//! Integration tests for the rotauth CLI

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

const SECRET: &str = "cli-tests-signing-secret-0123456789";

fn rotauth() -> Command {
    let mut cmd = Command::cargo_bin("rotauth").unwrap();
    cmd.env_remove("JWT_SECRET")
        .env_remove("ROTAUTH_ISSUER")
        .env_remove("ROTAUTH_AUDIENCE")
        .env_remove("ROTAUTH_TOKEN_LIFETIME_SECS")
        .env_remove("ROTAUTH_RENEWAL_LIFETIME_SECS")
        .env("ROTAUTH_SIGNING_SECRET", SECRET)
        .env("RUST_LOG", "warn");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "{output:?}");
    String::from_utf8(output.stdout).unwrap()
}

fn issue(cmd: &mut Command) -> String {
    let token = stdout_of(cmd.args(["issue", "--email", "jane@example.com", "--name", "Jane"]));
    token.trim().to_string()
}

#[test]
fn test_cli_help() {
    rotauth()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("renewal tokens"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_version_command() {
    rotauth()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("rotauth "));
}

#[test]
fn test_secret_is_64_alphanumeric_chars() {
    let secret = stdout_of(rotauth().arg("secret"));
    let secret = secret.trim();
    assert_eq!(secret.len(), 64);
    assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
}

#[test]
fn test_issue_then_inspect() {
    let token = issue(&mut rotauth());
    assert_eq!(token.split('.').count(), 3);

    let claims: Value = serde_json::from_str(&stdout_of(rotauth().args(["inspect", &token]))).unwrap();
    assert_eq!(claims["email"], "jane@example.com");
    assert_eq!(claims["name"], "Jane");
    assert_eq!(claims["iss"], "rotauth");
    assert_eq!(claims["aud"], "rotauth");
}

#[test]
fn test_inspect_accepts_expired_token() {
    let token = issue(rotauth().env("ROTAUTH_TOKEN_LIFETIME_SECS", "1"));
    std::thread::sleep(std::time::Duration::from_millis(2100));

    rotauth()
        .args(["inspect", &token])
        .assert()
        .success()
        .stdout(predicate::str::contains("jane@example.com"));
}

#[test]
fn test_inspect_rejects_garbage() {
    rotauth()
        .args(["inspect", "not-a-token"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Invalid token"));
}

#[test]
fn test_inspect_rejects_other_secret() {
    let token = issue(&mut rotauth());

    rotauth()
        .env("ROTAUTH_SIGNING_SECRET", "a-completely-different-secret")
        .args(["inspect", &token])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid token"));
}

#[test]
fn test_inspect_rejects_other_audience() {
    let token = issue(&mut rotauth());

    rotauth()
        .env("ROTAUTH_AUDIENCE", "someone-else")
        .args(["inspect", &token])
        .assert()
        .failure();
}

#[test]
fn test_invalid_lifetime_is_a_config_error() {
    rotauth()
        .env("ROTAUTH_TOKEN_LIFETIME_SECS", "soon")
        .args(["issue", "--email", "jane@example.com", "--name", "Jane"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ROTAUTH_TOKEN_LIFETIME_SECS"));
}

#[test]
fn test_renewal_command() {
    let renewal: Value = serde_json::from_str(&stdout_of(rotauth().arg("renewal"))).unwrap();
    let token = renewal["token"].as_str().unwrap();
    assert_eq!(token.len(), 44);
    assert!(renewal["expiration"].as_i64().unwrap() > 0);
}

#[test]
fn test_demo_rejects_replayed_renewal_token() {
    rotauth()
        .arg("demo")
        .assert()
        .success()
        .stdout(predicate::str::contains("replayed refresh:"))
        .stdout(predicate::str::contains("\"succeeded\": true"))
        .stdout(predicate::str::contains("Invalid token"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_secret_is_persisted_without_env() {
    let data = tempfile::TempDir::new().unwrap();
    let run = || {
        let mut cmd = rotauth();
        cmd.env_remove("ROTAUTH_SIGNING_SECRET")
            .env("XDG_DATA_HOME", data.path());
        cmd
    };

    let token = issue(&mut run());
    assert!(data.path().join("rotauth").join("signing-secret").exists());

    run().args(["inspect", &token]).assert().success();
}
