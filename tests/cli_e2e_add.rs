//! End-to-end tests for the `project-kit add` command.

#[allow(dead_code)]
mod common;
use common::prelude::*;

fn initialised() -> TestFixture {
    let fixture = TestFixture::new().with_revision("v1", &[]);
    fixture.init(&[]).assert().success();
    fixture
}

#[test]
fn test_add_help() {
    let mut cmd = cargo_bin_cmd!("project-kit");
    cmd.arg("add")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Enable components or services"))
        .stdout(predicate::str::contains("--mode"));
}

#[test]
fn test_add_requires_units() {
    let fixture = initialised();
    fixture.command().arg("add").assert().code(2);
}

#[test]
fn test_add_component_updates_shared_files() {
    let fixture = initialised();

    fixture
        .command()
        .args(["add", "database"])
        .assert()
        .success()
        .stdout(predicate::str::contains("app/db/session.py"))
        .stdout(predicate::str::contains("requirements.txt"));

    fixture
        .project("app/db/session.py")
        .assert(predicate::str::contains("postgresql://localhost/demo"));
    fixture
        .project("requirements.txt")
        .assert(predicate::str::contains("sqlalchemy"))
        .assert(predicate::str::contains("psycopg"));
    fixture
        .project("docker-compose.yml")
        .assert(predicate::str::contains("postgres:16"));
}

#[test]
fn test_add_twice_is_a_noop() {
    let fixture = initialised();
    fixture.command().args(["add", "redis"]).assert().success();
    let manifest = fixture.read(".project-kit.yaml");

    fixture
        .command()
        .args(["add", "redis"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to do"));

    assert_eq!(fixture.read(".project-kit.yaml"), manifest);
}

#[test]
fn test_add_strict_missing_dependency() {
    let fixture = initialised();

    fixture
        .command()
        .args(["add", "worker", "--mode", "strict"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("'worker' requires 'redis'"));

    fixture
        .project("app/worker")
        .assert(predicate::path::missing());
}

#[test]
fn test_add_auto_enables_dependencies() {
    let fixture = initialised();

    fixture
        .command()
        .args(["add", "worker", "--mode", "auto", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Enabled as dependencies: redis"));

    fixture
        .project("app/worker/tasks.py")
        .assert(predicate::path::exists());
    fixture
        .project(".project-kit.yaml")
        .assert(predicate::str::contains("redis"));
}

#[test]
fn test_add_conflicting_component() {
    let fixture = initialised();
    fixture.command().args(["add", "scheduler"]).assert().success();

    fixture
        .command()
        .args(["add", "cron"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("conflicts with"));

    fixture.project("app/cron").assert(predicate::path::missing());
}

#[test]
fn test_add_switches_variant() {
    let fixture = initialised();
    fixture.command().args(["add", "database"]).assert().success();

    fixture
        .command()
        .args(["add", "database:sqlite"])
        .assert()
        .success()
        .stdout(predicate::str::contains("overwrite"));

    fixture
        .project("app/db/session.py")
        .assert(predicate::str::contains("sqlite"));
    fixture
        .project("requirements.txt")
        .assert(predicate::str::contains("psycopg").not());
}

#[test]
fn test_add_force_keeps_backup() {
    let fixture = initialised();
    fixture
        .project("app/cache/client.py")
        .write_str("# mine\n")
        .unwrap();

    fixture
        .command()
        .args(["add", "redis"])
        .assert()
        .success()
        .stdout(predicate::str::contains("skip_existing"));
    fixture.project("app/cache/client.py").assert("# mine\n");

    fixture.command().args(["remove", "redis"]).assert().success();
    fixture
        .project("app/cache/client.py")
        .write_str("# mine\n")
        .unwrap();
    fixture
        .command()
        .args(["add", "redis", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("backup_and_overwrite"));

    fixture
        .project("app/cache/client.py.backup")
        .assert("# mine\n");
    fixture
        .project("app/cache/client.py")
        .assert("REDIS = 'redis://'\n");
}

#[test]
fn test_add_dry_run() {
    let fixture = initialised();

    fixture
        .command()
        .args(["add", "redis", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[DRY-RUN]"));

    fixture
        .project("app/cache")
        .assert(predicate::path::missing());
    fixture
        .project(".project-kit.yaml")
        .assert(predicate::str::contains("redis").not());
}

#[test]
fn test_add_outside_project() {
    let fixture = TestFixture::new().with_revision("v1", &[]);

    fixture
        .command()
        .args(["add", "redis"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Project manifest not found"));
}
