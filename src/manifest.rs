//! # Project Manifest
//!
//! The manifest (`.project-kit.yaml`) is the persisted state of one managed
//! project: which template it was generated from, at which revision, which
//! components and services are enabled, the variables used for rendering, and
//! the digests of the shared files the engine last wrote.
//!
//! The manifest is read before every mutating command and rewritten at the end
//! of every successful one. Writing goes through a temporary file in the
//! project root followed by a rename, so a crash never leaves a half-written
//! manifest behind.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::catalog::{ComponentRef, UnitRef};
use crate::defaults::MANIFEST_FILENAME;
use crate::error::{Error, Result};

const HEADER: &str = "# Managed by project-kit. Edit with 'project-kit add/remove/update'.\n";

/// Whether a generated project supports later mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Mutable,
    Frozen,
}

/// Persisted state of a managed project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectManifest {
    #[serde(default)]
    pub engine_kind: EngineKind,
    /// Directory path or git URL snapshots are fetched from.
    pub template_source: String,
    /// Opaque revision id of the snapshot the project currently matches.
    pub template_revision: String,
    /// Enabled component name to its variant, if the component has variants.
    #[serde(default)]
    pub enabled_components: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub enabled_services: BTreeSet<String>,
    /// Render context.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    /// Shared file path to the blake3 digest of the content last written.
    #[serde(default)]
    pub shared_files: BTreeMap<String, String>,
}

impl ProjectManifest {
    /// Path of the manifest inside a project root.
    pub fn path(root: &Path) -> PathBuf {
        root.join(MANIFEST_FILENAME)
    }

    pub fn exists(root: &Path) -> bool {
        Self::path(root).is_file()
    }

    /// Parse a manifest document.
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::Manifest {
            path: origin.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Read the manifest of the project at `root`.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path(root);
        let content = std::fs::read_to_string(&path).map_err(|e| Error::Manifest {
            path: path.display().to_string(),
            message: if e.kind() == std::io::ErrorKind::NotFound {
                "no manifest found; run 'project-kit init' first".to_string()
            } else {
                e.to_string()
            },
        })?;
        let manifest = Self::parse(&content, &path)?;
        log::debug!(
            "Loaded manifest from {} ({} components, {} services)",
            path.display(),
            manifest.enabled_components.len(),
            manifest.enabled_services.len()
        );
        Ok(manifest)
    }

    /// Serialize with the header comment.
    pub fn to_yaml(&self) -> Result<String> {
        let body = serde_yaml::to_string(self)?;
        Ok(format!("{}{}", HEADER, body))
    }

    /// Atomically replace the manifest of the project at `root`.
    pub fn save(&self, root: &Path) -> Result<()> {
        let path = Self::path(root);
        let content = self.to_yaml()?;

        let mut temp = tempfile::NamedTempFile::new_in(root)?;
        temp.write_all(content.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| Error::Manifest {
            path: path.display().to_string(),
            message: format!("cannot replace manifest: {}", e.error),
        })?;

        log::debug!("Wrote manifest to {}", path.display());
        Ok(())
    }

    /// Fail unless the project can be mutated.
    pub fn ensure_mutable(&self, root: &Path) -> Result<()> {
        match self.engine_kind {
            EngineKind::Mutable => Ok(()),
            EngineKind::Frozen => Err(Error::FrozenProject {
                root: root.display().to_string(),
            }),
        }
    }

    pub fn is_enabled(&self, unit: &UnitRef) -> bool {
        match unit {
            UnitRef::Component(r) => self.enabled_components.contains_key(&r.name),
            UnitRef::Service(name) => self.enabled_services.contains(name),
        }
    }

    /// Enabled components as references, in name order.
    pub fn component_refs(&self) -> Vec<ComponentRef> {
        self.enabled_components
            .iter()
            .map(|(name, variant)| ComponentRef {
                name: name.clone(),
                variant: variant.clone(),
            })
            .collect()
    }
}
