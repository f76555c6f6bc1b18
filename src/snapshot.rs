//! Template snapshots: one revision of a template held in memory.
//!
//! A snapshot is laid out as:
//!
//! ```text
//! kit.yaml                         catalog
//! components/<name>/...            files of a component
//! components/<name>@<variant>/...  overlay for one variant
//! services/<name>/...              files of a service
//! ```

use std::path::Path;

use crate::catalog::Catalog;
use crate::defaults::CATALOG_FILENAME;
use crate::error::{Error, Result};
use crate::filesystem::MemoryFS;

/// One revision of a template: its catalog plus its file tree.
#[derive(Debug, Clone)]
pub struct TemplateSnapshot {
    pub revision: String,
    pub catalog: Catalog,
    pub files: MemoryFS,
}

impl TemplateSnapshot {
    /// Build a snapshot from an in-memory tree containing a `kit.yaml`.
    pub fn from_files(revision: impl Into<String>, files: MemoryFS) -> Result<Self> {
        let revision = revision.into();
        let catalog_text = files
            .get_file(CATALOG_FILENAME)
            .ok_or_else(|| Error::Catalog {
                message: format!("snapshot '{}' has no {}", revision, CATALOG_FILENAME),
                hint: Some("the template root must contain the component catalog".to_string()),
            })?
            .as_str()
            .ok_or_else(|| Error::catalog(format!("{} is not valid UTF-8", CATALOG_FILENAME)))?;
        let catalog = Catalog::parse(catalog_text)?;

        Ok(Self {
            revision,
            catalog,
            files,
        })
    }

    /// Load a snapshot from a directory.
    ///
    /// Without an explicit revision the content digest is used.
    pub fn load_dir(path: &Path, revision: Option<&str>) -> Result<Self> {
        let files = MemoryFS::load_dir(path, &[".git"])?;
        let revision = match revision {
            Some(r) => r.to_string(),
            None => files.digest(),
        };
        log::debug!(
            "Loaded snapshot {} from {} ({} files)",
            revision,
            path.display(),
            files.len()
        );
        Self::from_files(revision, files)
    }

    /// Content digest of the whole snapshot.
    pub fn digest(&self) -> String {
        self.files.digest()
    }

    /// Unrendered files of a component, with the variant overlay applied.
    pub fn component_files(&self, name: &str, variant: Option<&str>) -> MemoryFS {
        let mut files = self.files.subtree(format!("components/{}", name));
        if let Some(variant) = variant {
            files.merge(&self.files.subtree(format!("components/{}@{}", name, variant)));
        }
        files
    }

    /// Unrendered files of a service.
    pub fn service_files(&self, name: &str) -> MemoryFS {
        self.files.subtree(format!("services/{}", name))
    }
}
