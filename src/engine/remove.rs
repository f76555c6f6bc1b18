//! Removing the files of disabled units.
//!
//! Candidates for deletion are the files a removed unit renders plus the
//! files on disk matching its owned paths. A candidate survives when it is
//! data, belongs to a unit that stays enabled, is a shared file or a backup.
//! When a unit only switches variant, files matched by its owned paths stay
//! and only the old variant's rendered files are candidates.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::{project_files, stage, FileOperation, OperationKind, OperationSource, Plan};
use crate::catalog::{Catalog, UnitRef};
use crate::error::Result;
use crate::filesystem::MemoryFS;
use crate::path::{ancestor_dirs, display_path, is_backup_path, matches_any};

/// Plan deleting the files of `removed` units.
///
/// `removed` and `remaining` map each unit to its rendered files.
pub fn plan_remove(
    root: &Path,
    catalog: &Catalog,
    removed: &BTreeMap<UnitRef, MemoryFS>,
    remaining: &BTreeMap<UnitRef, MemoryFS>,
) -> Result<Plan> {
    let on_disk = project_files(root)?;
    let remaining_names: BTreeSet<&str> = remaining.keys().map(UnitRef::name).collect();

    let mut deleted: BTreeSet<PathBuf> = BTreeSet::new();
    for (unit, rendered) in removed {
        let owned = catalog.owned_paths(unit);
        let data = catalog.data_paths(unit);
        let switching_variant = remaining_names.contains(unit.name());

        let mut candidates: BTreeSet<PathBuf> = rendered.list_files().into_iter().collect();
        if !switching_variant {
            candidates.extend(
                on_disk
                    .iter()
                    .filter(|path| matches_any(owned, path))
                    .cloned(),
            );
        }

        for path in candidates {
            if matches_any(data, &path) {
                log::debug!("Keeping data file {}", display_path(&path));
                continue;
            }
            if is_backup_path(&path) || catalog.is_shared_path(&display_path(&path)) {
                continue;
            }
            if let Some(owner) = claimed_by(catalog, remaining, unit, &path) {
                log::debug!("Keeping {}; still used by '{}'", display_path(&path), owner);
                continue;
            }
            if !root.join(&path).is_file() {
                continue;
            }
            deleted.insert(path);
        }
    }

    let mut plan = Plan::new();
    for path in &deleted {
        plan.record(
            path.clone(),
            OperationKind::Delete,
            OperationSource::ComponentOwned,
        );
    }
    plan.extend(plan_prune(root, &deleted)?);
    Ok(plan)
}

/// Plan deleting the directories `deleted` files leave empty, deepest first.
///
/// Pruning walks up from each file and stops at the first ancestor that
/// still holds something. The project root is never pruned.
pub(crate) fn plan_prune(root: &Path, deleted: &BTreeSet<PathBuf>) -> Result<Plan> {
    let mut candidates: BTreeSet<PathBuf> = BTreeSet::new();
    for path in deleted {
        candidates.extend(ancestor_dirs(path));
    }

    // Deepest first, so a parent is judged after its children.
    let mut ordered: Vec<PathBuf> = candidates.into_iter().collect();
    ordered.sort_by(|a, b| {
        b.components()
            .count()
            .cmp(&a.components().count())
            .then_with(|| a.cmp(b))
    });

    let mut pruned: BTreeSet<PathBuf> = BTreeSet::new();
    let mut plan = Plan::new();
    for dir in ordered {
        let entries = match std::fs::read_dir(root.join(&dir)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        let mut empty = true;
        for entry in entries {
            let child = dir.join(entry?.file_name());
            if !deleted.contains(&child) && !pruned.contains(&child) {
                empty = false;
                break;
            }
        }
        if empty {
            plan.record(
                dir.clone(),
                OperationKind::DeleteIfEmptyDir,
                OperationSource::ComponentOwned,
            );
            pruned.insert(dir);
        }
    }
    Ok(plan)
}

/// Name of a still-enabled unit that renders or owns `path`.
fn claimed_by<'a>(
    catalog: &Catalog,
    remaining: &'a BTreeMap<UnitRef, MemoryFS>,
    removed: &UnitRef,
    path: &Path,
) -> Option<&'a UnitRef> {
    remaining.iter().find_map(|(unit, rendered)| {
        let owns = unit.name() != removed.name() && matches_any(catalog.owned_paths(unit), path);
        (rendered.exists(path) || owns).then_some(unit)
    })
}

/// Plan and commit a removal in one step.
pub fn remove(
    root: &Path,
    catalog: &Catalog,
    removed: &BTreeMap<UnitRef, MemoryFS>,
    remaining: &BTreeMap<UnitRef, MemoryFS>,
) -> Result<Vec<FileOperation>> {
    let plan = plan_remove(root, catalog, removed, remaining)?;
    stage::commit(root, &plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ComponentRef;
    use crate::render::{render_unit, VariableRenderer, Variables};
    use crate::test_support::{sample_catalog, sample_snapshot};
    use std::fs;
    use tempfile::TempDir;

    fn unit(reference: &str) -> UnitRef {
        UnitRef::Component(reference.parse::<ComponentRef>().unwrap())
    }

    fn rendered(units: &[UnitRef]) -> BTreeMap<UnitRef, MemoryFS> {
        let snapshot = sample_snapshot("v1");
        let renderer = VariableRenderer::new().unwrap();
        let vars = Variables::from([("project_name".to_string(), "demo".to_string())]);
        units
            .iter()
            .map(|u| (u.clone(), render_unit(&renderer, &snapshot, u, &vars).unwrap()))
            .collect()
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn paths(ops: &[FileOperation], kind: OperationKind) -> Vec<String> {
        ops.iter()
            .filter(|op| op.kind == kind)
            .map(|op| display_path(&op.path))
            .collect()
    }

    #[test]
    fn test_remove_deletes_owned_files_and_empty_dirs() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "app/main.py", "");
        write(temp.path(), "app/scheduler/jobs.py", "JOBS = []\n");
        write(temp.path(), "app/scheduler/extra.py", "mine\n");

        let ops = remove(
            temp.path(),
            &sample_catalog(),
            &rendered(&[unit("scheduler")]),
            &rendered(&[unit("core")]),
        )
        .unwrap();

        assert_eq!(
            paths(&ops, OperationKind::Delete),
            vec!["app/scheduler/extra.py", "app/scheduler/jobs.py"]
        );
        assert_eq!(
            paths(&ops, OperationKind::DeleteIfEmptyDir),
            vec!["app/scheduler"]
        );
        assert!(!temp.path().join("app/scheduler").exists());
        assert!(temp.path().join("app/main.py").exists());
    }

    #[test]
    fn test_remove_keeps_data_paths() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "app/scheduler/jobs.py", "JOBS = []\n");
        write(temp.path(), "app/scheduler/state/last_run", "42\n");

        let ops = remove(
            temp.path(),
            &sample_catalog(),
            &rendered(&[unit("scheduler")]),
            &rendered(&[unit("core")]),
        )
        .unwrap();

        assert_eq!(
            paths(&ops, OperationKind::Delete),
            vec!["app/scheduler/jobs.py"]
        );
        assert!(paths(&ops, OperationKind::DeleteIfEmptyDir).is_empty());
        assert!(temp.path().join("app/scheduler/state/last_run").exists());
    }

    #[test]
    fn test_remove_skips_backups_and_missing_files() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "app/cache/client.py.backup", "old\n");
        write(temp.path(), "app/cache/client.py.backup.1", "older\n");

        let plan = plan_remove(
            temp.path(),
            &sample_catalog(),
            &rendered(&[unit("redis")]),
            &rendered(&[unit("core")]),
        )
        .unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_variant_switch_only_removes_old_rendering() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "app/db/__init__.py", "");
        write(temp.path(), "app/db/session.py", "URL = 'postgresql://localhost/demo'\n");
        write(temp.path(), "app/db/models.py", "mine\n");

        // Both variants render session.py; nothing of the old side is stale.
        let plan = plan_remove(
            temp.path(),
            &sample_catalog(),
            &rendered(&[unit("database:postgres")]),
            &rendered(&[unit("core"), unit("database:sqlite")]),
        )
        .unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_prune_stops_at_non_empty_ancestor() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a/b/c/file.txt", "x");
        write(temp.path(), "a/keep.txt", "y");

        let deleted = BTreeSet::from([PathBuf::from("a/b/c/file.txt")]);
        let plan = plan_prune(temp.path(), &deleted).unwrap();
        let dirs: Vec<String> = plan
            .operations()
            .iter()
            .map(|op| display_path(&op.path))
            .collect();
        assert_eq!(dirs, vec!["a/b/c", "a/b"]);
    }
}
