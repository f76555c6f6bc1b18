//! Applying rendered unit files to a project.

use std::path::Path;

use super::{read_existing, stage, FileOperation, OperationKind, OperationSource, Plan};
use crate::error::Result;
use crate::filesystem::MemoryFS;
use crate::path::display_path;

/// Decide how new content reaches a path.
///
/// `None` means nothing to do (identical content). `engine_generated` marks
/// existing content the engine itself wrote earlier.
pub fn decide(
    existing: Option<&[u8]>,
    new: &[u8],
    engine_generated: bool,
    force: bool,
) -> Option<OperationKind> {
    match existing {
        None => Some(OperationKind::Create),
        Some(current) if current == new => None,
        Some(_) if engine_generated => Some(OperationKind::Overwrite),
        Some(_) if force => Some(OperationKind::BackupAndOverwrite),
        Some(_) => Some(OperationKind::SkipExisting),
    }
}

/// Plan writing `rendered` into the project.
///
/// `previous` holds what the engine rendered for the same units before (the
/// old variant on a variant switch); disk content equal to it is replaced
/// without a backup.
pub fn plan_apply(
    root: &Path,
    rendered: &MemoryFS,
    previous: &MemoryFS,
    force: bool,
) -> Result<Plan> {
    let mut plan = Plan::new();

    for (path, file) in rendered.files() {
        let existing = read_existing(root, path)?;
        let engine_generated = match (&existing, previous.get_file(path)) {
            (Some(current), Some(old)) => *current == old.content,
            _ => false,
        };

        match decide(existing.as_deref(), &file.content, engine_generated, force) {
            None => log::debug!("{} is up to date", display_path(path)),
            Some(OperationKind::SkipExisting) => {
                log::warn!(
                    "{} exists with different content; keeping it (use --force to overwrite with a backup)",
                    display_path(path)
                );
                plan.record(
                    path.clone(),
                    OperationKind::SkipExisting,
                    OperationSource::ComponentOwned,
                );
            }
            Some(kind) => plan.write(
                path.clone(),
                kind,
                OperationSource::ComponentOwned,
                file.clone(),
            ),
        }
    }

    Ok(plan)
}

/// Plan and commit `rendered` in one step.
pub fn apply(
    root: &Path,
    rendered: &MemoryFS,
    previous: &MemoryFS,
    force: bool,
) -> Result<Vec<FileOperation>> {
    let plan = plan_apply(root, rendered, previous, force)?;
    stage::commit(root, &plan)
}
