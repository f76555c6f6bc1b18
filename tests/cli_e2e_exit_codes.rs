//! End-to-end tests for CLI exit codes.
//!
//! - 0: success
//! - 1: general error
//! - 2: invalid command-line usage
//! - 3: resolution failed, nothing modified
//! - 4: validation failed, nothing modified
//! - 5: update conflicts

#[allow(dead_code)]
mod common;
use common::prelude::*;

#[test]
fn test_exit_code_success() {
    let mut cmd = cargo_bin_cmd!("project-kit");
    cmd.arg("--version").assert().code(0);
}

#[test]
fn test_exit_code_unknown_subcommand() {
    let mut cmd = cargo_bin_cmd!("project-kit");
    cmd.arg("frobnicate").assert().code(2);
}

#[test]
fn test_exit_code_invalid_mode() {
    let fixture = TestFixture::new().with_revision("v1", &[]);
    fixture
        .command()
        .args(["init", "--source", "template", "--mode", "lenient"])
        .assert()
        .code(2);
}

#[test]
fn test_exit_code_general_error() {
    let fixture = TestFixture::new();
    fixture.command().arg("status").assert().code(1);
}

#[test]
fn test_exit_code_resolution() {
    let fixture = TestFixture::new().with_revision("v1", &[]);
    fixture.init(&[]).assert().success();
    // Unknown names are catalog errors, not resolution failures.
    fixture
        .command()
        .args(["add", "billing"])
        .assert()
        .code(1);
    fixture
        .command()
        .args(["add", "auth", "--mode", "strict"])
        .assert()
        .code(3);
}

#[test]
fn test_exit_code_validation() {
    let fixture = TestFixture::new()
        .with_revision("v1", &[("components/redis/.project-kit.yaml", "hijack: true\n")]);
    fixture.init(&[]).assert().success();
    let manifest = fixture.read(".project-kit.yaml");

    fixture
        .command()
        .args(["add", "redis"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Validation failure"));

    assert_eq!(fixture.read(".project-kit.yaml"), manifest);
    fixture
        .project("app/cache")
        .assert(predicate::path::missing());
}

#[test]
fn test_exit_code_conflicts() {
    let fixture = TestFixture::new()
        .with_revision("v1", &[])
        .with_revision("v2", &[("components/core/app/main.py", "app = 'v2'\n")]);
    fixture.init(&[]).assert().success();
    fixture.project("app/main.py").write_str("app = 'mine'\n").unwrap();

    fixture.command().arg("update").assert().code(5);
    fixture
        .command()
        .args(["update", "--dry-run"])
        .assert()
        .code(5);
}
