//! Shared test utilities for integration and E2E tests.
//!
//! Provides a template with two revisions and a fixture holding a template
//! directory plus a project directory side by side.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_revision("v1", &[]);
//!     fixture.init(&[]).assert().success();
//! }
//! ```

use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
#[allow(unused_imports)]
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::template;
    pub use super::TestFixture;
}

/// Template content used across the tests.
#[allow(dead_code)]
pub mod template {
    pub const CATALOG: &str = r##"
shared_files:
  - path: requirements.txt
    format: lines
    header: "# dependencies for ${project_name}"
  - path: docker-compose.yml
    format: yaml
components:
  - name: core
    description: Application skeleton
    removable: false
    owned_paths: ["app/main.py", "app/__init__.py"]
    fragments:
      requirements.txt: "fastapi\n"
      docker-compose.yml: |
        services:
          app:
            build: .
  - name: database
    description: Relational database
    variants: [postgres, sqlite]
    default_variant: postgres
    dependencies: [core]
    owned_paths: ["app/db/**"]
    data_paths: ["data/**"]
    fragments:
      requirements.txt: "sqlalchemy\n"
    variant_fragments:
      postgres:
        requirements.txt: "psycopg\n"
        docker-compose.yml: |
          services:
            db:
              image: postgres:16
  - name: redis
    dependencies: [core]
    owned_paths: ["app/cache/**"]
    fragments:
      requirements.txt: "redis\n"
  - name: worker
    dependencies: [redis]
    owned_paths: ["app/worker/**"]
  - name: scheduler
    dependencies: [core]
    conflicts: [cron]
    owned_paths: ["app/scheduler/**"]
    data_paths: ["app/scheduler/state/**"]
  - name: cron
    dependencies: [core]
    conflicts: [scheduler]
    owned_paths: ["app/cron/**"]
services:
  - name: auth
    requires: [database]
    owned_paths: ["app/services/auth/**"]
    fragments:
      requirements.txt: "passlib\n"
"##;

    /// Files of one revision, relative to the revision directory.
    pub const FILES: &[(&str, &str)] = &[
        ("components/core/app/main.py", "app = '${project_name}'\n"),
        ("components/core/app/__init__.py", ""),
        ("components/database/app/db/__init__.py", ""),
        (
            "components/database@postgres/app/db/session.py",
            "URL = 'postgresql://localhost/${project_name}'\n",
        ),
        (
            "components/database@sqlite/app/db/session.py",
            "URL = 'sqlite:///data/${project_name}.db'\n",
        ),
        ("components/redis/app/cache/client.py", "REDIS = 'redis://'\n"),
        ("components/worker/app/worker/tasks.py", "TASKS = []\n"),
        ("components/scheduler/app/scheduler/jobs.py", "JOBS = []\n"),
        ("components/cron/app/cron/crontab", "* * * * * true\n"),
        ("services/auth/app/services/auth/routes.py", "ROUTES = []\n"),
    ];
}

/// Write one template revision into `dir/<revision>`, with `overrides`
/// replacing or adding files.
pub fn write_revision(dir: &Path, revision: &str, overrides: &[(&str, &str)]) {
    let root = dir.join(revision);
    let write = |relative: &str, content: &str| {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().expect("file has a parent"))
            .expect("Failed to create template directory");
        std::fs::write(path, content).expect("Failed to write template file");
    };
    write("kit.yaml", template::CATALOG);
    for (path, content) in template::FILES {
        write(path, content);
    }
    for (path, content) in overrides {
        write(path, content);
    }
}

/// A temporary directory holding `template/` and `project/`.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new fixture with an empty template directory.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("template")
            .create_dir_all()
            .expect("Failed to create template directory");
        Self { temp_dir }
    }

    /// Add a template revision.
    pub fn with_revision(self, revision: &str, overrides: &[(&str, &str)]) -> Self {
        write_revision(&self.template_path(), revision, overrides);
        self
    }

    /// Add a file to the project directory.
    #[allow(dead_code)]
    pub fn with_project_file(self, path: &str, content: &str) -> Self {
        self.project(path)
            .write_str(content)
            .expect("Failed to write project file");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn template_path(&self) -> PathBuf {
        self.temp_dir.path().join("template")
    }

    pub fn project_path(&self) -> PathBuf {
        self.temp_dir.path().join("project")
    }

    /// A path inside the project.
    pub fn project(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child("project").child(path)
    }

    /// Read a project file.
    #[allow(dead_code)]
    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.project_path().join(path)).expect("Failed to read file")
    }

    /// A command running in the fixture directory against `project/`, with
    /// plain output and an isolated cache.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("project-kit");
        cmd.current_dir(self.path())
            .env_remove("PROJECT_KIT_SOURCE")
            .env_remove("RUST_LOG")
            .env("PROJECT_KIT_CACHE", self.path().join("cache"))
            .env("NO_COLOR", "1")
            .arg("-C")
            .arg(self.project_path());
        cmd
    }

    /// `init` from revision `v1` with the given extra units, in auto mode.
    pub fn init(&self, units: &[&str]) -> assert_cmd::Command {
        let mut cmd = self.command();
        cmd.args(["init", "--source", "template", "--revision", "v1"])
            .args(["--var", "project_name=demo", "--mode", "auto", "--yes"])
            .args(units);
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
