//! Integration tests for the CLI binary.
//!
//! Registered as a [[test]] in the agentic-trust-cli crate so that
//! CARGO_BIN_EXE_atrust is available.

use std::process::Command;

/// Get a Command pointing to the `atrust` binary.
fn atrust_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_atrust"))
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn cli_responds_to_help() {
    let output = atrust_binary()
        .arg("--help")
        .output()
        .expect("failed to execute atrust --help");

    assert!(
        output.status.success(),
        "atrust --help should exit with success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = stdout_of(&output);
    assert!(
        stdout.contains("atrust") || stdout.contains("AgenticTrust") || stdout.contains("Usage"),
        "atrust --help output should contain usage information, got: {stdout}"
    );
}

#[test]
fn cli_responds_to_version() {
    let output = atrust_binary()
        .arg("--version")
        .output()
        .expect("failed to execute atrust --version");

    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(
        stdout.contains("0.1") || stdout.contains("atrust"),
        "atrust --version should contain version info, got: {stdout}"
    );
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = atrust_binary()
        .arg("--nonexistent-flag")
        .output()
        .expect("failed to execute atrust");

    assert!(!output.status.success());
}

#[test]
fn cli_lists_policies() {
    let output = atrust_binary()
        .arg("policies")
        .output()
        .expect("failed to execute atrust policies");

    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("MEDICAL_RECORD"), "got: {stdout}");
    assert!(stdout.contains("CITIZENSHIP"), "got: {stdout}");
}

#[test]
fn cli_brand_check_matches_alias() {
    let output = atrust_binary()
        .args(["brand-check", "chase"])
        .output()
        .expect("failed to execute atrust brand-check");

    assert!(output.status.success());
    assert!(stdout_of(&output).contains("matches well-known brand"));
}

#[test]
fn cli_rejects_unknown_credential_type() {
    let output = atrust_binary()
        .args(["policy", "NOT_A_TYPE"])
        .output()
        .expect("failed to execute atrust policy");

    assert!(!output.status.success());
}

#[test]
fn cli_assess_blocks_self_sovereign_brand_claim() {
    let issuer = r#"{
        "did": "did:web:coinbase-support.example",
        "issuerType": "SELF_SOVEREIGN",
        "domains": ["FINANCIAL"],
        "assurance": "UNVERIFIED",
        "legalName": "Coinbase Support",
        "claimedBrandName": "Coinbase",
        "createdAt": "2026-01-01T00:00:00Z"
    }"#;
    let output = atrust_binary()
        .args(["--json", "assess", "--issuer", issuer, "--credential-type", "KYC_LEVEL_1"])
        .output()
        .expect("failed to execute atrust assess");

    assert_eq!(output.status.code(), Some(2));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("CRITICAL"), "got: {stdout}");
}

#[test]
fn cli_issuer_add_show_list() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = dir.path().to_str().expect("utf-8 path");
    let issuer = r#"{
        "did": "did:web:clinic.example",
        "issuerType": "INSTITUTION",
        "domains": ["MEDICAL"],
        "assurance": "REGULATED_ENTITY",
        "legalName": "Example Clinic",
        "createdAt": "2026-01-01T00:00:00Z"
    }"#;

    let add = atrust_binary()
        .args(["issuer", "add", issuer, "--store", store])
        .output()
        .expect("failed to execute atrust issuer add");
    assert!(
        add.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&add.stderr)
    );

    let show = atrust_binary()
        .args(["issuer", "show", "did:web:clinic.example", "--store", store])
        .output()
        .expect("failed to execute atrust issuer show");
    assert!(show.status.success());
    assert!(stdout_of(&show).contains("Example Clinic"));

    let list = atrust_binary()
        .args(["issuer", "list", "--store", store, "--eligible-for", "MEDICAL_RECORD"])
        .output()
        .expect("failed to execute atrust issuer list");
    assert!(list.status.success());
    assert!(stdout_of(&list).contains("did:web:clinic.example"));

    let missing = atrust_binary()
        .args(["issuer", "show", "did:web:nobody.example", "--store", store])
        .output()
        .expect("failed to execute atrust issuer show");
    assert!(!missing.status.success());
}
