//! Fixtures shared by the unit tests.

use std::collections::BTreeMap;
use std::path::Path;

use crate::catalog::Catalog;
use crate::filesystem::MemoryFS;
use crate::manifest::{EngineKind, ProjectManifest};
use crate::snapshot::TemplateSnapshot;

pub(crate) const SAMPLE_CATALOG: &str = r##"
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
  - name: billing
    requires: ["database:postgres", worker]
    owned_paths: ["app/services/billing/**"]
"##;

pub(crate) fn sample_catalog() -> Catalog {
    Catalog::parse(SAMPLE_CATALOG).unwrap()
}

/// Template tree matching [`SAMPLE_CATALOG`].
pub(crate) fn sample_files() -> MemoryFS {
    let mut fs = MemoryFS::new();
    let files = [
        ("kit.yaml", SAMPLE_CATALOG),
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
        (
            "services/billing/app/services/billing/invoices.py",
            "INVOICES = []\n",
        ),
    ];
    for (path, content) in files {
        fs.add_file_string(path, content).unwrap();
    }
    fs
}

pub(crate) fn sample_snapshot(revision: &str) -> TemplateSnapshot {
    TemplateSnapshot::from_files(revision, sample_files()).unwrap()
}

pub(crate) fn sample_manifest() -> ProjectManifest {
    let mut variables = BTreeMap::new();
    variables.insert("project_name".to_string(), "demo".to_string());
    ProjectManifest {
        engine_kind: EngineKind::Mutable,
        template_source: "../template".to_string(),
        template_revision: "v1".to_string(),
        enabled_components: BTreeMap::from([("core".to_string(), None)]),
        enabled_services: Default::default(),
        variables,
        shared_files: Default::default(),
    }
}

pub(crate) fn read(root: &Path, relative: &str) -> String {
    std::fs::read_to_string(root.join(relative)).unwrap()
}
