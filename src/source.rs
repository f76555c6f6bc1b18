//! # Template Sources
//!
//! Fetching a template at a revision is the only network-facing operation of
//! the engine, and it sits behind the [`TemplateSource`] trait.
//!
//! Two implementations are provided:
//!
//! - **[`LocalSource`]**: a directory on disk. Either the directory itself is
//!   a snapshot (it contains `kit.yaml`; its revision is the content digest),
//!   or it holds one subdirectory per revision (`v1.0.0/`, `v1.1.0/`, ...).
//! - **[`GitSource`]**: a git repository. Revisions are refs; the latest
//!   revision is the highest semver tag, falling back to `main`. Clones are
//!   shallow and kept under the cache root.
//!
//! Git access goes through the [`GitOperations`] trait so tests can replace
//! the system `git` binary.

use std::path::{Path, PathBuf};

use crate::defaults::CATALOG_FILENAME;
use crate::error::{Error, Result};
use crate::snapshot::TemplateSnapshot;
use crate::version;

/// Provides template snapshots by revision.
pub trait TemplateSource {
    /// Fetch a snapshot. `None` asks for the latest revision.
    fn fetch(&self, revision: Option<&str>) -> Result<TemplateSnapshot>;

    /// Human-readable location, for messages.
    fn describe(&self) -> String;
}

/// A template directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::TemplateSource {
            source_spec: self.root.display().to_string(),
            message: message.into(),
        }
    }

    /// Revision subdirectories, in name order.
    pub fn revisions(&self) -> Result<Vec<String>> {
        let mut revisions = Vec::new();
        for entry in std::fs::read_dir(&self.root)
            .map_err(|e| self.error(format!("cannot read directory: {}", e)))?
        {
            let entry = entry?;
            if entry.path().join(CATALOG_FILENAME).is_file() {
                revisions.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        revisions.sort();
        Ok(revisions)
    }
}

impl TemplateSource for LocalSource {
    fn fetch(&self, revision: Option<&str>) -> Result<TemplateSnapshot> {
        if self.root.join(CATALOG_FILENAME).is_file() {
            let snapshot = TemplateSnapshot::load_dir(&self.root, None)?;
            if let Some(requested) = revision {
                if requested != snapshot.revision {
                    log::warn!(
                        "{} only holds its current content; revision '{}' is not available, using '{}'",
                        self.root.display(),
                        requested,
                        snapshot.revision
                    );
                }
            }
            return Ok(snapshot);
        }

        let revisions = self.revisions()?;
        let chosen = match revision {
            Some(requested) if revisions.iter().any(|r| r == requested) => requested.to_string(),
            Some(requested) => {
                return Err(self.error(format!(
                    "revision '{}' not found (available: {})",
                    requested,
                    if revisions.is_empty() {
                        "none".to_string()
                    } else {
                        revisions.join(", ")
                    }
                )))
            }
            None => version::latest_revision(&revisions).ok_or_else(|| {
                self.error(format!(
                    "no {} found in the directory or its revision subdirectories",
                    CATALOG_FILENAME
                ))
            })?,
        };

        TemplateSnapshot::load_dir(&self.root.join(&chosen), Some(&chosen))
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// A trait that defines the interface for Git operations.
///
/// This allows for mocking Git operations in tests.
pub trait GitOperations {
    /// Clones a Git repository at `ref_name` into `target_dir`.
    fn clone_shallow(&self, url: &str, ref_name: &str, target_dir: &Path) -> Result<()>;

    /// Lists all tags of a remote Git repository.
    fn list_tags(&self, url: &str) -> Result<Vec<String>>;
}

/// Git operations backed by the system `git` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

impl GitOperations for SystemGit {
    fn clone_shallow(&self, url: &str, ref_name: &str, target_dir: &Path) -> Result<()> {
        crate::git::clone_shallow(url, ref_name, target_dir)
    }

    fn list_tags(&self, url: &str) -> Result<Vec<String>> {
        crate::git::list_tags(url)
    }
}

/// Branch used when a repository has no semver tag.
pub const DEFAULT_BRANCH: &str = "main";

/// A template kept in a git repository.
pub struct GitSource<G: GitOperations = SystemGit> {
    url: String,
    cache_root: PathBuf,
    git: G,
}

impl GitSource<SystemGit> {
    pub fn new(url: impl Into<String>, cache_root: impl Into<PathBuf>) -> Self {
        Self::with_operations(url, cache_root, SystemGit)
    }
}

impl<G: GitOperations> GitSource<G> {
    pub fn with_operations(url: impl Into<String>, cache_root: impl Into<PathBuf>, git: G) -> Self {
        Self {
            url: url.into(),
            cache_root: cache_root.into(),
            git,
        }
    }

    /// The ref to check out for a request.
    pub fn resolve_ref(&self, revision: Option<&str>) -> Result<String> {
        if let Some(revision) = revision {
            return Ok(revision.to_string());
        }
        let tags = self.git.list_tags(&self.url)?;
        Ok(match version::find_latest_version(&tags) {
            Some((tag, _)) => tag,
            None => {
                log::info!(
                    "{} has no semver tags; using '{}'",
                    self.url,
                    DEFAULT_BRANCH
                );
                DEFAULT_BRANCH.to_string()
            }
        })
    }
}

impl<G: GitOperations> TemplateSource for GitSource<G> {
    fn fetch(&self, revision: Option<&str>) -> Result<TemplateSnapshot> {
        let ref_name = self.resolve_ref(revision)?;
        let cache_path = crate::git::url_to_cache_path(&self.cache_root, &self.url, &ref_name);

        // Tags are immutable; branches are cloned fresh every time.
        let cached = version::extract_semver(&ref_name).is_some()
            && cache_path.join(CATALOG_FILENAME).is_file();
        if cached {
            log::debug!("Using cached clone {}", cache_path.display());
        } else {
            self.git.clone_shallow(&self.url, &ref_name, &cache_path)?;
        }

        TemplateSnapshot::load_dir(&cache_path, Some(&ref_name))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Whether a source spec names a git repository rather than a directory.
pub fn is_git_spec(spec: &str) -> bool {
    if spec.starts_with("git@") {
        return true;
    }
    match url::Url::parse(spec) {
        Ok(url) => matches!(url.scheme(), "http" | "https" | "ssh" | "git" | "file"),
        Err(_) => false,
    }
}

/// Form of a source spec to store in a manifest: git specs as given, local
/// directories as absolute paths so the project can move independently of
/// the current directory.
pub fn normalize_spec(spec: &str, cwd: &Path) -> Result<String> {
    if is_git_spec(spec) {
        return Ok(spec.to_string());
    }
    let path = cwd.join(spec);
    let canonical = path.canonicalize().map_err(|e| Error::TemplateSource {
        source_spec: spec.to_string(),
        message: format!("cannot resolve directory: {}", e),
    })?;
    Ok(canonical.display().to_string())
}

/// Open the source named by `spec`.
///
/// Relative directory paths are resolved against `base_dir`.
pub fn open(spec: &str, base_dir: &Path, cache_root: &Path) -> Box<dyn TemplateSource> {
    if is_git_spec(spec) {
        Box::new(GitSource::new(spec, cache_root))
    } else {
        Box::new(LocalSource::new(base_dir.join(spec)))
    }
}
