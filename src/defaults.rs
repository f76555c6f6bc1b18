//! Default values for project-kit.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Name of the manifest file at the root of every managed project.
pub const MANIFEST_FILENAME: &str = ".project-kit.yaml";

/// Name of the catalog file at the root of every template snapshot.
pub const CATALOG_FILENAME: &str = "kit.yaml";

/// Suffix appended to a file's path when its previous content is kept aside
/// before an overwrite.
pub const BACKUP_SUFFIX: &str = ".backup";

/// Prefix of the staging directory created inside the project root while a
/// plan is committed.
pub const STAGING_PREFIX: &str = ".project-kit-staging-";

/// Returns the default cache root directory for cloned templates.
///
/// Uses the platform-appropriate cache directory:
/// - Linux: `~/.cache/project-kit` (XDG Base Directory)
/// - macOS: `~/Library/Caches/project-kit`
/// - Windows: `{FOLDERID_LocalAppData}\project-kit`
///
/// Falls back to `.project-kit-cache` in the current directory if the
/// platform cache directory cannot be determined.
///
/// This can be overridden by the `--cache-root` CLI flag or the
/// `PROJECT_KIT_CACHE` environment variable.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".project-kit-cache"))
        .join("project-kit")
}
