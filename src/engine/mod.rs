//! # File-Tree Merge Engine
//!
//! Everything that changes files in a project goes through this module. Each
//! command is split into a pure planning step and a commit step:
//!
//! 1. **Plan**: [`apply::plan_apply`], [`remove::plan_remove`],
//!    [`shared::plan_regenerate`] and [`reconcile::reconcile`] compare what
//!    should be on disk with what is there and produce a [`Plan`]: a list of
//!    [`FileOperation`]s together with the content each write needs. Planning
//!    reads the project but never modifies it.
//!
//! 2. **Commit**: [`stage::commit`] validates every operation of the combined
//!    plan, stages all new content in a temporary directory inside the project
//!    root and only then moves it into place. A single invalid operation
//!    rejects the whole plan before anything is touched.
//!
//! ## Operation kinds
//!
//! | kind | meaning |
//! |---|---|
//! | `create` | path absent, write it |
//! | `overwrite` | replace content known to be engine-generated |
//! | `skip_existing` | path holds user content; left untouched |
//! | `backup_and_overwrite` | keep the old content in `<path>.backup`, then write |
//! | `delete` | remove a file |
//! | `delete_if_empty_dir` | remove a directory if nothing is left in it |

pub mod apply;
pub mod reconcile;
pub mod remove;
pub mod shared;
pub mod stage;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::defaults::{MANIFEST_FILENAME, STAGING_PREFIX};
use crate::error::{Error, Result};
use crate::filesystem::File;

/// What a planned operation does to its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationKind {
    Create,
    Overwrite,
    SkipExisting,
    BackupAndOverwrite,
    Delete,
    DeleteIfEmptyDir,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Overwrite => "overwrite",
            OperationKind::SkipExisting => "skip_existing",
            OperationKind::BackupAndOverwrite => "backup_and_overwrite",
            OperationKind::Delete => "delete",
            OperationKind::DeleteIfEmptyDir => "delete_if_empty_dir",
        }
    }

    /// Whether the operation writes new content to its path.
    pub fn writes(&self) -> bool {
        matches!(
            self,
            OperationKind::Create | OperationKind::Overwrite | OperationKind::BackupAndOverwrite
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an operation was planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationSource {
    /// A file owned by a component or service.
    ComponentOwned,
    /// A shared file derived from the whole enabled set.
    SharedRegenerated,
}

/// One file-level action of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOperation {
    /// Path relative to the project root.
    pub path: PathBuf,
    pub kind: OperationKind,
    pub source: OperationSource,
}

/// A file operation plus the content it writes, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOp {
    pub operation: FileOperation,
    pub content: Option<File>,
}

/// The not-yet-committed operations of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    ops: Vec<PlannedOp>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan a write (`create`, `overwrite` or `backup_and_overwrite`).
    pub fn write(&mut self, path: PathBuf, kind: OperationKind, source: OperationSource, file: File) {
        self.ops.push(PlannedOp {
            operation: FileOperation { path, kind, source },
            content: Some(file),
        });
    }

    /// Plan an operation that carries no content.
    pub fn record(&mut self, path: PathBuf, kind: OperationKind, source: OperationSource) {
        self.ops.push(PlannedOp {
            operation: FileOperation { path, kind, source },
            content: None,
        });
    }

    pub fn extend(&mut self, other: Plan) {
        self.ops.extend(other.ops);
    }

    /// Keep only the operations `keep` accepts.
    pub fn retain(&mut self, mut keep: impl FnMut(&FileOperation) -> bool) {
        self.ops.retain(|op| keep(&op.operation));
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlannedOp> {
        self.ops.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// The operation records, in plan order.
    pub fn operations(&self) -> Vec<FileOperation> {
        self.ops.iter().map(|op| op.operation.clone()).collect()
    }

    /// Whether committing would change anything on disk.
    pub fn mutates(&self) -> bool {
        self.ops
            .iter()
            .any(|op| op.operation.kind != OperationKind::SkipExisting)
    }
}

/// Content currently at `relative`, or `None` when nothing is there.
///
/// Directories and symbolic links at the path are rejected.
pub(crate) fn read_existing(root: &Path, relative: &Path) -> Result<Option<Vec<u8>>> {
    crate::path::validate_relative(relative)?;
    let full = root.join(relative);
    let meta = match std::fs::symlink_metadata(&full) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        // A file where a parent directory is expected.
        Err(e) if e.kind() == std::io::ErrorKind::NotADirectory => {
            return Err(Error::Validation {
                path: crate::path::display_path(relative),
                message: "a parent of this path is not a directory".to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    };
    if meta.file_type().is_symlink() {
        return Err(Error::Validation {
            path: crate::path::display_path(relative),
            message: "target is a symbolic link".to_string(),
        });
    }
    if meta.is_dir() {
        return Err(Error::Validation {
            path: crate::path::display_path(relative),
            message: "a directory exists at this path".to_string(),
        });
    }
    Ok(Some(std::fs::read(full)?))
}

/// Every regular file of the project, relative to the root, in path order.
///
/// The manifest, `.git` and staging directories are not part of the project
/// content.
pub fn project_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !root.is_dir() {
        return Ok(files);
    }
    for entry in walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            e.depth() == 0 || !(name == ".git" || name.starts_with(STAGING_PREFIX))
        })
    {
        let entry = entry.map_err(|e| Error::Filesystem {
            message: format!("Failed to walk '{}': {}", root.display(), e),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| Error::Path {
                message: format!("Failed to make path relative: {}", entry.path().display()),
            })?
            .to_path_buf();
        if relative != Path::new(MANIFEST_FILENAME) {
            files.push(relative);
        }
    }
    Ok(files)
}
