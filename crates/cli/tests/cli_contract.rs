use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;

fn cli(home: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("signdesk-cli");
    cmd.env("SIGNDESK_HOME", home).env_remove("SIGNDESK_LOG");
    cmd
}

fn write_session(home: &Path, base_url: &str) {
    let session = serde_json::json!({
        "version": 1,
        "session": { "credential": "t0k", "email": "owner@example.com", "base_url": base_url }
    });
    fs::create_dir_all(home).expect("home dir should be created");
    fs::write(home.join("session.json"), session.to_string()).expect("session should be written");
}

#[test]
fn version_prints_package_version() {
    let home = tempfile::tempdir().expect("temp dir should be created");

    cli(home.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn config_show_emits_stable_json_contract() {
    let home = tempfile::tempdir().expect("temp dir should be created");
    let output = cli(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&output).expect("stdout should contain valid json");

    insta::assert_json_snapshot!("cli_config_show_defaults", value);
}

#[test]
fn set_base_url_persists_across_runs() {
    let home = tempfile::tempdir().expect("temp dir should be created");

    cli(home.path())
        .args(["config", "set-base-url", "http://127.0.0.1:4000/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://127.0.0.1:4000"));

    let output = cli(home.path()).args(["config", "show"]).assert().success().get_output().stdout.clone();
    let value: Value = serde_json::from_slice(&output).expect("stdout should contain valid json");
    assert_eq!(value["base_url"], "http://127.0.0.1:4000");
    assert_eq!(value["finalize_timeout_secs"], 120);
}

#[test]
fn set_base_url_rejects_non_http_urls() {
    let home = tempfile::tempdir().expect("temp dir should be created");

    cli(home.path())
        .args(["config", "set-base-url", "ftp://files.example"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must start with http"));
}

#[test]
fn plan_prints_one_signed_record_per_mark() {
    let home = tempfile::tempdir().expect("temp dir should be created");
    let output = cli(home.path())
        .args(["plan", "doc-42", "--place", "1:100:120", "--place", "2:15:30:Jane Roe", "--font-size", "20"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&output).expect("stdout should contain valid json");
    let records = value.as_array().expect("plan output should be an array");
    assert_eq!(records.len(), 2);

    assert_eq!(records[0]["documentId"], "doc-42");
    assert_eq!(records[0]["page"], 1);
    assert_eq!(records[0]["status"], "signed");
    assert_eq!(records[0]["text"], "Signature");
    assert_eq!(records[0]["fontSize"], 20);

    assert_eq!(records[1]["page"], 2);
    assert_eq!(records[1]["text"], "Jane Roe");
    assert!(records[1].get("signedBy").is_none());
}

#[test]
fn plan_with_guest_attaches_signer_metadata() {
    let home = tempfile::tempdir().expect("temp dir should be created");
    let output = cli(home.path())
        .args(["plan", "doc-42", "--place", "1:1:1", "--guest"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&output).expect("stdout should contain valid json");
    assert_eq!(value[0]["signedBy"], "guest");
    assert!(value[0]["userAgent"].as_str().is_some_and(|agent| agent.starts_with("signdesk/")));
    assert!(value[0]["timestamp"].is_string());
}

#[test]
fn plan_rejects_marks_beyond_the_page_count() {
    let home = tempfile::tempdir().expect("temp dir should be created");

    cli(home.path())
        .args(["plan", "doc-42", "--place", "3:1:1", "--pages", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("document has 2 pages"));
}

#[test]
fn invalid_placement_is_a_usage_error() {
    let home = tempfile::tempdir().expect("temp dir should be created");

    cli(home.path())
        .args(["plan", "doc-42", "--place", "0:1:1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("page must be a positive integer"));
}

#[test]
fn logout_without_session_is_not_an_error() {
    let home = tempfile::tempdir().expect("temp dir should be created");

    cli(home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("not signed in"));
}

#[test]
fn logout_removes_stored_session() {
    let home = tempfile::tempdir().expect("temp dir should be created");
    write_session(home.path(), "https://signature-server-5olu.onrender.com");

    cli(home.path()).arg("logout").assert().success().stdout(predicate::str::contains("signed out"));
    assert!(!home.path().join("session.json").exists());
}

#[test]
fn owner_commands_require_login() {
    let home = tempfile::tempdir().expect("temp dir should be created");

    cli(home.path())
        .arg("docs")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not signed in"));

    cli(home.path())
        .args(["sign", "doc-42", "--place", "1:10:10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not signed in"));
}

#[test]
fn login_for_another_server_is_not_reused() {
    let home = tempfile::tempdir().expect("temp dir should be created");
    write_session(home.path(), "https://other.example");

    cli(home.path())
        .arg("docs")
        .assert()
        .failure()
        .stderr(predicate::str::contains("login is for https://other.example"));
}

#[test]
fn guest_reports_unreachable_link_as_expired() {
    let home = tempfile::tempdir().expect("temp dir should be created");
    cli(home.path()).args(["config", "set-base-url", "http://127.0.0.1:9"]).assert().success();

    cli(home.path())
        .args(["guest", "tok-123", "--place", "1:10:10"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Invalid or expired link."))
        .stderr(predicate::str::contains("invalid or expired"));
}
