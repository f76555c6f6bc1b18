//! Library-level tests of whole command sequences against a local template.

#[allow(dead_code)]
mod common;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use project_kit::engine::reconcile::ConflictKind;
use project_kit::engine::{project_files, OperationKind};
use project_kit::error::{Error, ResolutionError};
use project_kit::manifest::ProjectManifest;
use project_kit::orchestrator::{ChangeOptions, InitOptions, Session, UpdateOptions};
use project_kit::resolver::Mode;
use project_kit::source::LocalSource;
use tempfile::TempDir;

struct Workspace {
    template: TempDir,
    project: TempDir,
}

impl Workspace {
    fn new(revisions: &[(&str, &[(&str, &str)])]) -> Self {
        let template = TempDir::new().unwrap();
        for (revision, overrides) in revisions {
            common::write_revision(template.path(), revision, overrides);
        }
        Self {
            template,
            project: TempDir::new().unwrap(),
        }
    }

    fn session(&self) -> Session {
        Session::new(
            self.project.path(),
            Box::new(LocalSource::new(self.template.path())),
        )
        .unwrap()
    }

    fn root(&self) -> &Path {
        self.project.path()
    }

    fn init(&self, units: &[&str]) {
        self.session()
            .init(&InitOptions {
                source: self.template.path().display().to_string(),
                revision: Some("v1".to_string()),
                units: units.iter().map(|u| u.to_string()).collect(),
                variables: BTreeMap::from([("project_name".to_string(), "demo".to_string())]),
                mode: Mode::Auto,
                force: false,
                frozen: false,
            })
            .unwrap();
    }

    fn read(&self, path: &str) -> String {
        fs::read_to_string(self.root().join(path)).unwrap()
    }

    fn write(&self, path: &str, content: &str) {
        let target = self.root().join(path);
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(target, content).unwrap();
    }

    fn manifest_text(&self) -> String {
        fs::read_to_string(ProjectManifest::path(self.root())).unwrap()
    }
}

fn change(mode: Mode) -> ChangeOptions {
    ChangeOptions {
        mode,
        force: false,
        dry_run: false,
    }
}

fn units(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_repeated_add_changes_nothing() {
    let ws = Workspace::new(&[("v1", &[])]);
    ws.init(&[]);
    let session = ws.session();

    session
        .add(&units(&["worker"]), &change(Mode::Auto))
        .unwrap();
    let manifest = ws.manifest_text();
    let requirements = ws.read("requirements.txt");

    let again = session
        .add(&units(&["worker"]), &change(Mode::Auto))
        .unwrap();
    assert!(again.operations.is_empty());
    assert!(again.resolution.is_noop());
    assert_eq!(ws.manifest_text(), manifest);
    assert_eq!(ws.read("requirements.txt"), requirements);
}

#[test]
fn test_strict_mode_reports_what_auto_mode_adds() {
    let ws = Workspace::new(&[("v1", &[])]);
    ws.init(&[]);
    let session = ws.session();

    let err = session
        .add(&units(&["worker"]), &change(Mode::Strict))
        .unwrap_err();
    match err {
        Error::Resolution { errors } => assert_eq!(
            errors,
            vec![ResolutionError::MissingDependency {
                component: "worker".to_string(),
                missing: "redis".to_string(),
            }]
        ),
        other => panic!("unexpected error: {other}"),
    }

    let report = session
        .add(&units(&["worker"]), &change(Mode::Auto))
        .unwrap();
    assert_eq!(report.resolution.implied, vec!["redis".to_string()]);
    assert!(ws.root().join("app/cache/client.py").exists());
    assert!(ws.root().join("app/worker/tasks.py").exists());
    assert!(ws.read("requirements.txt").contains("redis"));
}

#[test]
fn test_existing_user_file_is_never_clobbered() {
    let ws = Workspace::new(&[("v1", &[])]);
    ws.init(&[]);
    ws.write("app/cache/client.py", "# mine\n");

    let report = ws
        .session()
        .add(&units(&["redis"]), &change(Mode::Auto))
        .unwrap();
    let skipped = report
        .operations
        .iter()
        .find(|op| op.path == Path::new("app/cache/client.py"))
        .unwrap();
    assert_eq!(skipped.kind, OperationKind::SkipExisting);
    assert_eq!(ws.read("app/cache/client.py"), "# mine\n");
}

#[test]
fn test_force_keeps_a_backup() {
    let ws = Workspace::new(&[("v1", &[])]);
    ws.init(&[]);
    ws.write("app/cache/client.py", "# mine\n");

    ws.session()
        .add(
            &units(&["redis"]),
            &ChangeOptions {
                mode: Mode::Auto,
                force: true,
                dry_run: false,
            },
        )
        .unwrap();
    assert_eq!(ws.read("app/cache/client.py"), "REDIS = 'redis://'\n");
    assert_eq!(ws.read("app/cache/client.py.backup"), "# mine\n");
}

#[test]
fn test_add_then_remove_round_trip() {
    let ws = Workspace::new(&[("v1", &[])]);
    ws.init(&[]);
    let files_before = project_files(ws.root()).unwrap();
    let requirements_before = ws.read("requirements.txt");
    let session = ws.session();

    session.add(&units(&["redis"]), &change(Mode::Auto)).unwrap();
    session
        .remove(&units(&["redis"]), &change(Mode::Auto))
        .unwrap();

    assert_eq!(project_files(ws.root()).unwrap(), files_before);
    assert_eq!(ws.read("requirements.txt"), requirements_before);
    assert!(!ws.root().join("app/cache").exists());
}

#[test]
fn test_remove_with_dependents_is_refused() {
    let ws = Workspace::new(&[("v1", &[])]);
    ws.init(&["worker"]);
    let manifest = ws.manifest_text();

    let err = ws
        .session()
        .remove(&units(&["redis"]), &change(Mode::Auto))
        .unwrap_err();
    match err {
        Error::Resolution { errors } => assert_eq!(
            errors,
            vec![ResolutionError::DependentsStillPresent {
                component: "redis".to_string(),
                dependents: vec!["worker".to_string()],
            }]
        ),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(ws.manifest_text(), manifest);
    assert!(ws.root().join("app/cache/client.py").exists());
}

#[test]
fn test_conflicting_components_are_rejected() {
    let ws = Workspace::new(&[("v1", &[])]);
    ws.init(&["scheduler"]);

    let err = ws
        .session()
        .add(&units(&["cron"]), &change(Mode::Auto))
        .unwrap_err();
    assert!(matches!(err, Error::Resolution { .. }));
    assert!(!ws.root().join("app/cron").exists());
}

#[test]
fn test_invalid_plan_writes_nothing() {
    let ws = Workspace::new(&[("v1", &[("components/redis/.project-kit.yaml", "hijack: true\n")])]);
    ws.init(&[]);
    let manifest = ws.manifest_text();

    let err = ws
        .session()
        .add(&units(&["redis"]), &change(Mode::Auto))
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(ws.manifest_text(), manifest);
    assert!(!ws.root().join("app/cache/client.py").exists());
    assert!(!ws.read("requirements.txt").contains("redis"));
}

#[test]
fn test_update_reports_conflict_and_keeps_revision() {
    let ws = Workspace::new(&[
        ("v1", &[]),
        ("v2", &[("components/core/app/main.py", "app = 'B'\n")]),
    ]);
    ws.init(&[]);
    ws.write("app/main.py", "app = 'C'\n");

    let report = ws.session().update(&UpdateOptions::default()).unwrap();
    assert!(!report.advanced);
    assert_eq!(report.conflicts.len(), 1);
    let conflict = &report.conflicts[0];
    assert_eq!(conflict.path, Path::new("app/main.py"));
    assert_eq!(conflict.kind, ConflictKind::BothModified);
    assert_eq!(conflict.base.as_deref(), Some(&b"app = 'demo'\n"[..]));
    assert_eq!(conflict.project.as_deref(), Some(&b"app = 'C'\n"[..]));
    assert_eq!(conflict.target.as_deref(), Some(&b"app = 'B'\n"[..]));

    assert_eq!(ws.read("app/main.py"), "app = 'C'\n");
    assert_eq!(
        ProjectManifest::load(ws.root()).unwrap().template_revision,
        "v1"
    );
    assert!(matches!(
        report.into_result().unwrap_err(),
        Error::Conflicts { .. }
    ));
}

#[test]
fn test_update_applies_upstream_changes_and_keeps_local_ones() {
    let ws = Workspace::new(&[
        ("v1", &[]),
        (
            "v2",
            &[
                ("components/core/app/main.py", "app = 'v2 ${project_name}'\n"),
                ("components/core/app/__init__.py", "VERSION = 2\n"),
            ],
        ),
    ]);
    ws.init(&[]);
    ws.write("app/__init__.py", "# local\n");

    let report = ws.session().update(&UpdateOptions::default()).unwrap();
    // __init__.py changed on both sides.
    assert_eq!(report.conflicts.len(), 1);

    ws.write("app/__init__.py", "VERSION = 2\n");
    let report = ws.session().update(&UpdateOptions::default()).unwrap();
    assert!(report.advanced);
    assert_eq!(ws.read("app/main.py"), "app = 'v2 demo'\n");
    assert_eq!(
        ProjectManifest::load(ws.root()).unwrap().template_revision,
        "v2"
    );
}
