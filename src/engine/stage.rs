//! Validating, staging and committing a plan.
//!
//! ## Process
//!
//! 1.  **Validate**: every path must be a plain relative path that stays inside
//!     the project root once symlinks are resolved, must not be a symlink
//!     itself, and must not be reserved (the manifest, staging directories).
//!     No path may be written or deleted twice. Every `backup_and_overwrite`
//!     gets a backup name that is free on disk and in the plan
//!     (`<path>.backup`, then `<path>.backup.1`, ...). Any failure rejects the
//!     plan before the first mutation.
//!
//! 2.  **Stage**: the content of every write is written into a temporary
//!     directory created inside the project root, so the final moves are
//!     renames on the same filesystem.
//!
//! 3.  **Commit**: backups are copied first, then deletes run, then empty
//!     directories are pruned, then staged files are renamed into place.
//!     Permissions are applied on Unix.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use super::{FileOperation, OperationKind, Plan, PlannedOp};
use crate::defaults::{MANIFEST_FILENAME, STAGING_PREFIX};
use crate::error::{Error, Result};
use crate::path::{backup_path, check_within_root, display_path};

/// Upper bound on numbered backups of one path.
const MAX_BACKUP_ATTEMPTS: usize = 1000;

/// Planned path -> where its previous content is copied.
type Backups = BTreeMap<PathBuf, PathBuf>;

/// Check every operation of a plan without touching the disk.
pub fn validate(root: &Path, plan: &Plan) -> Result<()> {
    check_plan(root, plan).map(|_| ())
}

fn check_plan(root: &Path, plan: &Plan) -> Result<Backups> {
    let mut files: BTreeSet<PathBuf> = BTreeSet::new();
    let mut dirs: BTreeSet<PathBuf> = BTreeSet::new();
    let mut overwritten: Vec<PathBuf> = Vec::new();

    for planned in plan.iter() {
        let operation = &planned.operation;
        let path = &operation.path;
        check_within_root(root, path)?;
        check_not_reserved(path)?;

        if operation.kind.writes() && planned.content.is_none() {
            return Err(invalid(path, "write planned without content"));
        }

        match operation.kind {
            OperationKind::SkipExisting => {}
            OperationKind::DeleteIfEmptyDir => {
                if !dirs.insert(path.clone()) {
                    return Err(invalid(path, "directory planned more than once"));
                }
            }
            kind => {
                if !files.insert(path.clone()) {
                    return Err(invalid(path, "path is planned more than once"));
                }
                if kind == OperationKind::BackupAndOverwrite {
                    overwritten.push(path.clone());
                }
            }
        }
    }

    let mut backups = Backups::new();
    for path in overwritten {
        let backup = free_backup_path(root, &path, &files)?;
        files.insert(backup.clone());
        backups.insert(path, backup);
    }
    Ok(backups)
}

/// First backup name for `path` that nothing occupies on disk and no other
/// operation of the plan uses.
fn free_backup_path(root: &Path, path: &Path, planned: &BTreeSet<PathBuf>) -> Result<PathBuf> {
    for attempt in 0..MAX_BACKUP_ATTEMPTS {
        let candidate = backup_path(path, attempt);
        if planned.contains(&candidate) {
            continue;
        }
        check_within_root(root, &candidate)?;
        match fs::symlink_metadata(root.join(&candidate)) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(candidate),
            Err(e) => return Err(e.into()),
            Ok(_) => continue,
        }
    }
    Err(invalid(path, "no free backup name left"))
}

/// Validate and apply a plan, all or nothing.
///
/// Returns the committed operation records (including `skip_existing`
/// entries, which touch nothing).
pub fn commit(root: &Path, plan: &Plan) -> Result<Vec<FileOperation>> {
    let backups = check_plan(root, plan)?;
    if !plan.mutates() {
        return Ok(plan.operations());
    }

    let writes: Vec<&PlannedOp> = plan
        .iter()
        .filter(|op| op.operation.kind.writes())
        .collect();

    let staging = if writes.is_empty() {
        None
    } else {
        Some(stage(root, &writes)?)
    };

    for (relative, backup) in &backups {
        back_up(root, relative, backup)?;
    }
    for planned in plan.iter() {
        if planned.operation.kind == OperationKind::Delete {
            delete_file(root, &planned.operation.path)?;
        }
    }
    for planned in plan.iter() {
        if planned.operation.kind == OperationKind::DeleteIfEmptyDir {
            prune_dir(root, &planned.operation.path)?;
        }
    }
    if let Some(staging) = &staging {
        for (index, planned) in writes.iter().enumerate() {
            move_into_place(root, staging.path(), index, planned)?;
        }
    }

    Ok(plan.operations())
}

fn stage(root: &Path, writes: &[&PlannedOp]) -> Result<tempfile::TempDir> {
    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(root)
        .map_err(|e| Error::Filesystem {
            message: format!("Failed to create staging directory in '{}': {}", root.display(), e),
        })?;

    for (index, planned) in writes.iter().enumerate() {
        let Some(file) = &planned.content else {
            continue;
        };
        let staged = staging.path().join(index.to_string());
        fs::write(&staged, &file.content).map_err(|e| Error::Filesystem {
            message: format!(
                "Failed to stage '{}': {}",
                display_path(&planned.operation.path),
                e
            ),
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&staged, fs::Permissions::from_mode(file.permissions)).map_err(
                |e| Error::Filesystem {
                    message: format!(
                        "Failed to set permissions on '{}': {}",
                        display_path(&planned.operation.path),
                        e
                    ),
                },
            )?;
        }
    }

    log::debug!(
        "Staged {} file(s) in {}",
        writes.len(),
        staging.path().display()
    );
    Ok(staging)
}

fn move_into_place(root: &Path, staging: &Path, index: usize, planned: &PlannedOp) -> Result<()> {
    let relative = &planned.operation.path;
    let target = root.join(relative);

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::Filesystem {
            message: format!("Failed to create directory '{}': {}", parent.display(), e),
        })?;
    }

    fs::rename(staging.join(index.to_string()), &target).map_err(|e| Error::Filesystem {
        message: format!("Failed to write '{}': {}", display_path(relative), e),
    })?;
    log::info!("{} {}", planned.operation.kind, display_path(relative));
    Ok(())
}

fn back_up(root: &Path, relative: &Path, backup: &Path) -> Result<()> {
    let target = root.join(relative);
    if !target.is_file() {
        return Ok(());
    }
    fs::copy(&target, root.join(backup)).map_err(|e| Error::Filesystem {
        message: format!("Failed to back up '{}': {}", display_path(relative), e),
    })?;
    log::info!("backup {} -> {}", display_path(relative), display_path(backup));
    Ok(())
}

fn delete_file(root: &Path, relative: &Path) -> Result<()> {
    match fs::remove_file(root.join(relative)) {
        Ok(()) => {
            log::info!("delete {}", display_path(relative));
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Filesystem {
            message: format!("Failed to delete '{}': {}", display_path(relative), e),
        }),
    }
}

fn prune_dir(root: &Path, relative: &Path) -> Result<()> {
    let dir = root.join(relative);
    let empty = match fs::read_dir(&dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if empty {
        fs::remove_dir(&dir)?;
        log::info!("delete_if_empty_dir {}", display_path(relative));
    } else {
        log::debug!("{} is not empty; kept", display_path(relative));
    }
    Ok(())
}

fn check_not_reserved(path: &Path) -> Result<()> {
    if path == Path::new(MANIFEST_FILENAME) {
        return Err(invalid(path, "the manifest is managed separately"));
    }
    let staging = path
        .components()
        .next()
        .map(|c| c.as_os_str().to_string_lossy().starts_with(STAGING_PREFIX))
        .unwrap_or(false);
    if staging {
        return Err(invalid(path, "path is inside a staging directory"));
    }
    Ok(())
}

fn invalid(path: &Path, message: &str) -> Error {
    Error::Validation {
        path: display_path(path),
        message: message.to_string(),
    }
}
