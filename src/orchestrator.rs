//! # Command Orchestration
//!
//! Every mutating command follows the same sequence:
//!
//! 1. read the manifest (and refuse frozen projects),
//! 2. fetch the template snapshot and resolve the requested change,
//! 3. plan file operations for added units, removed units and shared files,
//! 4. commit the combined plan all or nothing,
//! 5. write the manifest.
//!
//! Steps 1 to 3 produce a [`PreparedChange`] without touching the project,
//! which is what `--dry-run` reports and what the CLI shows before asking
//! for confirmation. [`Session::commit`] runs steps 4 and 5.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::catalog::{Catalog, ComponentRef, UnitRef};
use crate::engine::apply::plan_apply;
use crate::engine::reconcile::{self, render_project, Conflict, Entry};
use crate::engine::remove::plan_remove;
use crate::engine::shared::plan_regenerate;
use crate::engine::{read_existing, stage, FileOperation, OperationSource, Plan};
use crate::error::{Error, Result};
use crate::filesystem::{content_digest, MemoryFS};
use crate::manifest::{EngineKind, ProjectManifest};
use crate::path::display_path;
use crate::render::{render_units, Renderer, VariableRenderer, Variables};
use crate::resolver::{resolve, Mode, Resolution};
use crate::snapshot::TemplateSnapshot;
use crate::source::{self, TemplateSource};

/// Options for `init`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Source spec stored in the manifest.
    pub source: String,
    /// Revision to start from; the latest when `None`.
    pub revision: Option<String>,
    /// Components and services to enable besides the core.
    pub units: Vec<String>,
    pub variables: Variables,
    pub mode: Mode,
    pub force: bool,
    /// Generate a project that rejects later mutation.
    pub frozen: bool,
}

/// Options for `add` and `remove`.
#[derive(Debug, Clone, Copy)]
pub struct ChangeOptions {
    pub mode: Mode,
    pub force: bool,
    pub dry_run: bool,
}

/// Options for `update`.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Target revision; the latest when `None`.
    pub to_revision: Option<String>,
    pub dry_run: bool,
    /// Apply the non-conflicting patches even when conflicts exist.
    pub force: bool,
}

/// A resolved and planned change, not yet committed.
#[derive(Debug, Clone)]
pub struct PreparedChange {
    pub resolution: Resolution,
    plan: Plan,
    manifest: ProjectManifest,
    save_manifest: bool,
}

impl PreparedChange {
    /// The planned file operations.
    pub fn operations(&self) -> Vec<FileOperation> {
        self.plan.operations()
    }

    /// The manifest as it will be written.
    pub fn manifest(&self) -> &ProjectManifest {
        &self.manifest
    }
}

/// Outcome of `init`, `add` or `remove`.
#[derive(Debug, Clone)]
pub struct CommandReport {
    pub resolution: Resolution,
    pub operations: Vec<FileOperation>,
    pub dry_run: bool,
}

/// Outcome of `update`.
#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub from: String,
    pub to: String,
    pub entries: Vec<Entry>,
    /// Operations committed, or planned on a dry run.
    pub operations: Vec<FileOperation>,
    pub conflicts: Vec<Conflict>,
    /// Whether the manifest now records the target revision.
    pub advanced: bool,
    pub dry_run: bool,
    pub warnings: Vec<String>,
}

impl UpdateReport {
    /// Turn unresolved conflicts into [`Error::Conflicts`].
    pub fn into_result(self) -> Result<Self> {
        if self.conflicts.is_empty() {
            Ok(self)
        } else {
            Err(Error::Conflicts {
                paths: self
                    .conflicts
                    .iter()
                    .map(|c| display_path(&c.path))
                    .collect(),
            })
        }
    }
}

/// Drift between a project and its recorded template revision.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub manifest: ProjectManifest,
    pub source: String,
    /// Generated files whose content differs from the rendering.
    pub modified: Vec<PathBuf>,
    /// Generated files that are gone from disk.
    pub missing: Vec<PathBuf>,
}

/// A project root together with the template source and renderer used to
/// mutate it.
pub struct Session {
    root: PathBuf,
    source: Box<dyn TemplateSource>,
    renderer: Box<dyn Renderer>,
}

impl Session {
    /// A session with the default `${var}` renderer.
    pub fn new(root: impl Into<PathBuf>, source: Box<dyn TemplateSource>) -> Result<Self> {
        Ok(Self::with_renderer(
            root,
            source,
            Box::new(VariableRenderer::new()?),
        ))
    }

    pub fn with_renderer(
        root: impl Into<PathBuf>,
        source: Box<dyn TemplateSource>,
        renderer: Box<dyn Renderer>,
    ) -> Self {
        Self {
            root: root.into(),
            source,
            renderer,
        }
    }

    /// Open the session of an existing project, using the source recorded in
    /// its manifest.
    pub fn for_project(root: impl Into<PathBuf>, cache_root: &Path) -> Result<Self> {
        let root = root.into();
        let manifest = ProjectManifest::load(&root)?;
        let source = source::open(&manifest.template_source, &root, cache_root);
        Self::new(root, source)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source(&self) -> &dyn TemplateSource {
        self.source.as_ref()
    }

    /// Resolve and plan the generation of a new project.
    pub fn prepare_init(&self, options: &InitOptions) -> Result<PreparedChange> {
        if ProjectManifest::exists(&self.root) {
            return Err(Error::Manifest {
                path: ProjectManifest::path(&self.root).display().to_string(),
                message: "project is already initialised".to_string(),
            });
        }

        let snapshot = self.source.fetch(options.revision.as_deref())?;
        log::info!(
            "Generating project from {} at {}",
            self.source.describe(),
            snapshot.revision
        );

        let mut variables = options.variables.clone();
        if !variables.contains_key("project_name") {
            let name = self
                .root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "project".to_string());
            variables.insert("project_name".to_string(), name);
        }

        let manifest = ProjectManifest {
            engine_kind: if options.frozen {
                EngineKind::Frozen
            } else {
                EngineKind::Mutable
            },
            template_source: options.source.clone(),
            template_revision: snapshot.revision.clone(),
            enabled_components: BTreeMap::new(),
            enabled_services: BTreeSet::new(),
            variables,
            shared_files: BTreeMap::new(),
        };

        let mut additions: Vec<UnitRef> = snapshot
            .catalog
            .components()
            .filter(|c| !c.removable)
            .map(|c| UnitRef::Component(ComponentRef::new(c.name.clone())))
            .collect();
        for input in &options.units {
            let unit = snapshot.catalog.parse_ref(input)?;
            if !additions.contains(&unit) {
                additions.push(unit);
            }
        }

        let resolution =
            resolve(&snapshot.catalog, &manifest, &additions, &[], options.mode)?.into_result()?;
        self.plan_change(&snapshot, manifest, resolution, options.force, true)
    }

    /// Generate a new project.
    pub fn init(&self, options: &InitOptions) -> Result<CommandReport> {
        let change = self.prepare_init(options)?;
        self.commit(change)
    }

    /// Resolve and plan enabling units.
    pub fn prepare_add(&self, refs: &[String], options: &ChangeOptions) -> Result<PreparedChange> {
        let (manifest, snapshot) = self.open_project()?;
        let additions = parse_refs(&snapshot.catalog, refs)?;
        let resolution =
            resolve(&snapshot.catalog, &manifest, &additions, &[], options.mode)?.into_result()?;
        self.plan_change(&snapshot, manifest, resolution, options.force, false)
    }

    /// Enable units (and, in auto mode, what they require).
    pub fn add(&self, refs: &[String], options: &ChangeOptions) -> Result<CommandReport> {
        let change = self.prepare_add(refs, options)?;
        self.finish(change, options.dry_run)
    }

    /// Resolve and plan disabling units.
    pub fn prepare_remove(
        &self,
        refs: &[String],
        options: &ChangeOptions,
    ) -> Result<PreparedChange> {
        let (manifest, snapshot) = self.open_project()?;
        let removals = parse_refs(&snapshot.catalog, refs)?;
        let resolution =
            resolve(&snapshot.catalog, &manifest, &[], &removals, options.mode)?.into_result()?;
        self.plan_change(&snapshot, manifest, resolution, options.force, false)
    }

    /// Disable units and delete the files they own.
    pub fn remove(&self, refs: &[String], options: &ChangeOptions) -> Result<CommandReport> {
        let change = self.prepare_remove(refs, options)?;
        self.finish(change, options.dry_run)
    }

    /// Report a prepared change without committing it.
    ///
    /// The plan is still validated against the project root when it exists.
    pub fn preview(&self, change: PreparedChange) -> Result<CommandReport> {
        if self.root.is_dir() {
            stage::validate(&self.root, &change.plan)?;
        }
        Ok(CommandReport {
            operations: change.plan.operations(),
            resolution: change.resolution,
            dry_run: true,
        })
    }

    /// Commit a prepared change, then write the manifest.
    pub fn commit(&self, change: PreparedChange) -> Result<CommandReport> {
        std::fs::create_dir_all(&self.root).map_err(|e| Error::Filesystem {
            message: format!(
                "Failed to create project root '{}': {}",
                self.root.display(),
                e
            ),
        })?;
        let operations = stage::commit(&self.root, &change.plan)?;
        if change.save_manifest {
            change.manifest.save(&self.root)?;
        }
        Ok(CommandReport {
            resolution: change.resolution,
            operations,
            dry_run: false,
        })
    }

    fn finish(&self, change: PreparedChange, dry_run: bool) -> Result<CommandReport> {
        if dry_run {
            self.preview(change)
        } else {
            self.commit(change)
        }
    }

    /// Move the project to a newer template revision.
    pub fn update(&self, options: &UpdateOptions) -> Result<UpdateReport> {
        let manifest = ProjectManifest::load(&self.root)?;
        manifest.ensure_mutable(&self.root)?;

        let base = self.source.fetch(Some(&manifest.template_revision))?;
        if base.revision != manifest.template_revision {
            return Err(Error::TemplateSource {
                source_spec: self.source.describe(),
                message: format!(
                    "revision '{}' the project was generated from is no longer available",
                    manifest.template_revision
                ),
            });
        }
        let target = self.source.fetch(options.to_revision.as_deref())?;

        let mut report = UpdateReport {
            from: base.revision.clone(),
            to: target.revision.clone(),
            entries: Vec::new(),
            operations: Vec::new(),
            conflicts: Vec::new(),
            advanced: false,
            dry_run: options.dry_run,
            warnings: Vec::new(),
        };
        if target.revision == base.revision {
            log::info!("Already at {}", base.revision);
            return Ok(report);
        }

        let (components, services) =
            carry_over(&manifest, &target.catalog, &mut report.warnings)?;
        let (components, services) = close_over_target(
            &target.catalog,
            &manifest,
            components,
            services,
            &mut report.warnings,
        )?;
        let variables = &manifest.variables;
        let renderer = self.renderer.as_ref();
        let base_files = render_project(
            renderer,
            &base,
            &manifest.enabled_components,
            &manifest.enabled_services,
            variables,
        )?;
        let target_files = render_project(renderer, &target, &components, &services, variables)?;

        let shared: BTreeSet<String> = base
            .catalog
            .shared_files()
            .chain(target.catalog.shared_files())
            .map(|s| s.path.clone())
            .collect();
        let reconciliation = reconcile::reconcile(&self.root, &base_files, &target_files, &shared)?;

        report.entries = reconciliation.entries;
        report.conflicts = reconciliation.conflicts;
        let has_conflicts = !report.conflicts.is_empty();
        let mut patches = reconciliation.patches;

        if options.dry_run {
            stage::validate(&self.root, &patches)?;
            report.operations = patches.operations();
            return Ok(report);
        }
        if has_conflicts && !options.force {
            log::warn!(
                "{} conflict(s); nothing was changed",
                report.conflicts.len()
            );
            return Ok(report);
        }

        if has_conflicts {
            // Shared files stay at the recorded revision until it advances,
            // so their recorded digests keep matching.
            let mut held_back = Vec::new();
            patches.retain(|op| {
                let is_shared = op.source == OperationSource::SharedRegenerated;
                if is_shared {
                    held_back.push(display_path(&op.path));
                }
                !is_shared
            });
            for path in held_back {
                report
                    .warnings
                    .push(format!("held back shared file '{}' until the update completes", path));
            }
        }
        report.operations = stage::commit(&self.root, &patches)?;
        if has_conflicts {
            report.warnings.push(format!(
                "applied non-conflicting changes; still at {} until {} conflict(s) are resolved",
                base.revision,
                report.conflicts.len()
            ));
            return Ok(report);
        }

        let mut updated = manifest.clone();
        updated.template_revision = target.revision.clone();
        updated.enabled_components = components;
        updated.enabled_services = services;
        updated.shared_files =
            shared_digests(&self.root, &target.catalog, &target_files, &manifest.shared_files)?;
        updated.save(&self.root)?;
        report.advanced = true;
        log::info!("Updated {} -> {}", report.from, report.to);
        Ok(report)
    }

    /// Compare the project with its rendering at the recorded revision.
    pub fn status(&self) -> Result<StatusReport> {
        let manifest = ProjectManifest::load(&self.root)?;
        let snapshot = self.source.fetch(Some(&manifest.template_revision))?;
        let rendered = render_project(
            self.renderer.as_ref(),
            &snapshot,
            &manifest.enabled_components,
            &manifest.enabled_services,
            &manifest.variables,
        )?;

        let mut modified = Vec::new();
        let mut missing = Vec::new();
        for (path, file) in rendered.files() {
            match read_existing(&self.root, path)? {
                None => missing.push(path.clone()),
                Some(content) if content != file.content => modified.push(path.clone()),
                Some(_) => {}
            }
        }

        Ok(StatusReport {
            source: self.source.describe(),
            manifest,
            modified,
            missing,
        })
    }

    fn open_project(&self) -> Result<(ProjectManifest, TemplateSnapshot)> {
        let manifest = ProjectManifest::load(&self.root)?;
        manifest.ensure_mutable(&self.root)?;
        let snapshot = self.source.fetch(Some(&manifest.template_revision))?;
        Ok((manifest, snapshot))
    }

    /// Plan the file operations that take the project from `manifest` to the
    /// resolved target set.
    fn plan_change(
        &self,
        snapshot: &TemplateSnapshot,
        manifest: ProjectManifest,
        resolution: Resolution,
        force: bool,
        always_save: bool,
    ) -> Result<PreparedChange> {
        let catalog = &snapshot.catalog;
        let renderer = self.renderer.as_ref();
        let variables = &manifest.variables;

        let before = render_units(
            renderer,
            snapshot,
            &manifest.enabled_components,
            &manifest.enabled_services,
            variables,
        )?;
        let after = render_units(
            renderer,
            snapshot,
            &resolution.target_components,
            &resolution.target_services,
            variables,
        )?;

        let mut added = MemoryFS::new();
        let mut previous = MemoryFS::new();
        for reference in &resolution.additions {
            if let Some(files) = after.get(&UnitRef::Component(reference.clone())) {
                added.merge(files);
            }
            // A variant switch replaces what the old variant rendered.
            if let Some(old_variant) = manifest.enabled_components.get(&reference.name) {
                let old = UnitRef::Component(ComponentRef {
                    name: reference.name.clone(),
                    variant: old_variant.clone(),
                });
                if let Some(files) = before.get(&old) {
                    previous.merge(files);
                }
            }
        }
        for name in &resolution.service_additions {
            if let Some(files) = after.get(&UnitRef::Service(name.clone())) {
                added.merge(files);
            }
        }

        let removed: BTreeMap<UnitRef, MemoryFS> = resolution
            .removals
            .iter()
            .map(|r| UnitRef::Component(r.clone()))
            .chain(resolution.service_removals.iter().cloned().map(UnitRef::Service))
            .filter_map(|unit| before.get(&unit).map(|files| (unit, files.clone())))
            .collect();

        let mut plan = plan_apply(&self.root, &added, &previous, force)?;
        plan.extend(plan_remove(&self.root, catalog, &removed, &after)?);
        let shared = plan_regenerate(
            &self.root,
            catalog,
            renderer,
            &resolution.target_components,
            &resolution.target_services,
            variables,
            &manifest.shared_files,
            force,
        )?;
        plan.extend(shared.plan);

        let mut updated = manifest.clone();
        updated.enabled_components = resolution.target_components.clone();
        updated.enabled_services = resolution.target_services.clone();
        updated.shared_files = shared.digests;
        let save_manifest = always_save || updated != manifest;

        log::debug!(
            "Planned {} operation(s); manifest {}",
            plan.len(),
            if save_manifest { "changes" } else { "unchanged" }
        );
        Ok(PreparedChange {
            resolution,
            plan,
            manifest: updated,
            save_manifest,
        })
    }
}

fn parse_refs(catalog: &Catalog, refs: &[String]) -> Result<Vec<UnitRef>> {
    refs.iter().map(|r| catalog.parse_ref(r)).collect()
}

/// The enabled set to carry into a target catalog. Units the target no
/// longer knows are dropped; variants it no longer offers fall back to the
/// default.
fn carry_over(
    manifest: &ProjectManifest,
    target: &Catalog,
    warnings: &mut Vec<String>,
) -> Result<(BTreeMap<String, Option<String>>, BTreeSet<String>)> {
    let mut components = BTreeMap::new();
    for (name, variant) in &manifest.enabled_components {
        let Some(component) = target.component(name) else {
            let message = format!("'{}' is no longer in the template; dropping it", name);
            log::warn!("{}", message);
            warnings.push(message);
            continue;
        };
        let variant = match variant {
            Some(v) if !component.variants.contains(v) => {
                let fallback = component.resolve_variant(None)?;
                let message = format!(
                    "'{}:{}' is no longer offered; using '{}'",
                    name,
                    v,
                    fallback.as_deref().unwrap_or("no variant")
                );
                log::warn!("{}", message);
                warnings.push(message);
                fallback
            }
            other => other.clone(),
        };
        components.insert(name.clone(), variant);
    }

    let mut services = BTreeSet::new();
    for name in &manifest.enabled_services {
        if target.service(name).is_some() {
            services.insert(name.clone());
        } else {
            let message = format!("service '{}' is no longer in the template; dropping it", name);
            log::warn!("{}", message);
            warnings.push(message);
        }
    }
    Ok((components, services))
}

/// Close a carried-over set under the target catalog: dependencies added
/// upstream and new non-removable components are enabled, and conflicts the
/// target introduces fail the update before anything is written.
fn close_over_target(
    catalog: &Catalog,
    manifest: &ProjectManifest,
    components: BTreeMap<String, Option<String>>,
    services: BTreeSet<String>,
    warnings: &mut Vec<String>,
) -> Result<(BTreeMap<String, Option<String>>, BTreeSet<String>)> {
    let mut carried = manifest.clone();
    carried.enabled_components = components;
    carried.enabled_services = services;

    let core: Vec<UnitRef> = catalog
        .components()
        .filter(|c| !c.removable && !carried.enabled_components.contains_key(&c.name))
        .map(|c| UnitRef::Component(ComponentRef::new(c.name.clone())))
        .collect();
    let resolution = resolve(catalog, &carried, &core, &[], Mode::Auto)?.into_result()?;

    for added in &resolution.additions {
        let message = format!("'{}' is now required by the template; enabling it", added);
        log::warn!("{}", message);
        warnings.push(message);
    }
    Ok((resolution.target_components, resolution.target_services))
}

/// Digests of shared files that match the target rendering after an update.
/// Files left as the user edited them keep their previous digest.
fn shared_digests(
    root: &Path,
    catalog: &Catalog,
    rendered: &MemoryFS,
    recorded: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    let mut digests = BTreeMap::new();
    for shared in catalog.shared_files() {
        let Some(expected) = rendered.get_file(&shared.path) else {
            continue;
        };
        match read_existing(root, Path::new(&shared.path))? {
            Some(content) if content == expected.content => {
                digests.insert(shared.path.clone(), content_digest(&content));
            }
            _ => {
                if let Some(previous) = recorded.get(&shared.path) {
                    digests.insert(shared.path.clone(), previous.clone());
                }
            }
        }
    }
    Ok(digests)
}
