//! # Three-Way Reconciliation
//!
//! `update` moves a project from the template revision it was generated from
//! (the base) to a newer one (the target) without losing local edits. Both
//! snapshots are rendered for the project's enabled set, shared files
//! included, and each path of either rendering is compared three ways:
//!
//! | project vs base | base vs target | outcome |
//! |---|---|---|
//! | equal | equal | unchanged |
//! | equal | differ | auto-update (overwrite, or delete when the target dropped the path) |
//! | differ | equal | keep the local version |
//! | differ, project == target | differ | already up to date |
//! | differ | differ | conflict: both modified |
//! | missing | equal | deletion respected |
//! | missing | differ | conflict: deleted locally |
//! | new in target, missing on disk | - | auto-update (create) |
//! | new in target, on disk differs | - | conflict: both added |
//!
//! There is no line-level merging: any path where both sides moved is a
//! conflict, and conflicts are reported with all three contents, never
//! resolved automatically.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use super::remove::plan_prune;
use super::shared::render_shared;
use super::{read_existing, OperationKind, OperationSource, Plan};
use crate::error::Result;
use crate::filesystem::{File, MemoryFS};
use crate::path::display_path;
use crate::render::{render_units, Renderer, Variables};
use crate::snapshot::TemplateSnapshot;

/// Why a path could not be updated automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Changed locally and upstream.
    BothModified,
    /// Deleted locally, changed upstream.
    DeletedLocally,
    /// New upstream, but a different file already exists locally.
    BothAdded,
    /// Dropped upstream, but changed locally.
    RemovedUpstreamModifiedLocally,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictKind::BothModified => "both modified",
            ConflictKind::DeletedLocally => "deleted locally, changed upstream",
            ConflictKind::BothAdded => "both added",
            ConflictKind::RemovedUpstreamModifiedLocally => "removed upstream, modified locally",
        })
    }
}

/// Reconciliation outcome of one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Neither side changed.
    Unchanged,
    /// Only the project changed; the local version stays.
    KeptLocal,
    /// The project already matches the target.
    UpToDate,
    /// The user deleted a file the template did not change.
    DeletionRespected,
    AutoUpdate(OperationKind),
    Conflict(ConflictKind),
}

/// One reconciled path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub outcome: Outcome,
}

/// A path with divergent changes, with the content of each side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub path: PathBuf,
    pub kind: ConflictKind,
    pub base: Option<Vec<u8>>,
    pub project: Option<Vec<u8>>,
    pub target: Option<Vec<u8>>,
}

/// Result of comparing base, project and target.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Every path of the base or target rendering, in path order.
    pub entries: Vec<Entry>,
    /// Automatic updates, ready to commit.
    pub patches: Plan,
    pub conflicts: Vec<Conflict>,
}

impl Reconciliation {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Render everything a snapshot produces for an enabled set: unit files and
/// shared files.
pub fn render_project(
    renderer: &dyn Renderer,
    snapshot: &TemplateSnapshot,
    components: &BTreeMap<String, Option<String>>,
    services: &BTreeSet<String>,
    variables: &Variables,
) -> Result<MemoryFS> {
    let mut project = MemoryFS::new();
    for files in render_units(renderer, snapshot, components, services, variables)?.values() {
        project.merge(files);
    }
    let shared = render_shared(&snapshot.catalog, renderer, components, services, variables)?;
    for (path, content) in shared {
        if let Some(content) = content {
            project.add_file_string(&path, &content)?;
        }
    }
    Ok(project)
}

/// Compare the rendered `base` and `target` with the project on disk.
///
/// Reads the project but never modifies it.
/// `shared` lists the shared file paths, so their patches are tagged as
/// regenerated.
pub fn reconcile(
    root: &Path,
    base: &MemoryFS,
    target: &MemoryFS,
    shared: &BTreeSet<String>,
) -> Result<Reconciliation> {
    let paths: BTreeSet<PathBuf> = base
        .list_files()
        .into_iter()
        .chain(target.list_files())
        .collect();

    let mut result = Reconciliation::default();
    let mut deleted: BTreeSet<PathBuf> = BTreeSet::new();

    for path in paths {
        let base_file = base.get_file(&path);
        let target_file = target.get_file(&path);
        let project = read_existing(root, &path)?;

        let outcome = classify(
            base_file.map(|f| f.content.as_slice()),
            project.as_deref(),
            target_file.map(|f| f.content.as_slice()),
        );
        log::debug!("{}: {:?}", display_path(&path), outcome);

        let source = if shared.contains(&display_path(&path)) {
            OperationSource::SharedRegenerated
        } else {
            OperationSource::ComponentOwned
        };
        match outcome {
            Outcome::AutoUpdate(OperationKind::Delete) => {
                result
                    .patches
                    .record(path.clone(), OperationKind::Delete, source);
                deleted.insert(path.clone());
            }
            Outcome::AutoUpdate(kind) => {
                if let Some(file) = target_file {
                    result.patches.write(path.clone(), kind, source, file.clone());
                }
            }
            Outcome::Conflict(kind) => result.conflicts.push(Conflict {
                path: path.clone(),
                kind,
                base: base_file.map(|f| f.content.clone()),
                project: project.clone(),
                target: target_file.map(|f| f.content.clone()),
            }),
            _ => {}
        }
        result.entries.push(Entry { path, outcome });
    }

    result.patches.extend(plan_prune(root, &deleted)?);
    Ok(result)
}

/// The reconcile table for one path.
fn classify(base: Option<&[u8]>, project: Option<&[u8]>, target: Option<&[u8]>) -> Outcome {
    match (base, project, target) {
        (Some(b), Some(p), Some(t)) => {
            if p == b {
                if b == t {
                    Outcome::Unchanged
                } else {
                    Outcome::AutoUpdate(OperationKind::Overwrite)
                }
            } else if b == t {
                Outcome::KeptLocal
            } else if p == t {
                Outcome::UpToDate
            } else {
                Outcome::Conflict(ConflictKind::BothModified)
            }
        }
        (Some(b), None, Some(t)) => {
            if b == t {
                Outcome::DeletionRespected
            } else {
                Outcome::Conflict(ConflictKind::DeletedLocally)
            }
        }
        (Some(b), Some(p), None) => {
            if p == b {
                Outcome::AutoUpdate(OperationKind::Delete)
            } else {
                Outcome::Conflict(ConflictKind::RemovedUpstreamModifiedLocally)
            }
        }
        (Some(_), None, None) => Outcome::DeletionRespected,
        (None, None, Some(_)) => Outcome::AutoUpdate(OperationKind::Create),
        (None, Some(p), Some(t)) => {
            if p == t {
                Outcome::UpToDate
            } else {
                Outcome::Conflict(ConflictKind::BothAdded)
            }
        }
        // Paths come from base or target, so one of them is present.
        (None, _, None) => Outcome::Unchanged,
    }
}
