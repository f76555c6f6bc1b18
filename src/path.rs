//! Path utilities: glob matching and project-root safety checks.

use crate::defaults::BACKUP_SUFFIX;
use crate::error::{Error, Result};
use glob::Pattern;
use std::path::{Component, Path, PathBuf};

/// Match a path against a glob pattern
pub fn glob_match(pattern: &str, path: &str) -> Result<bool> {
    let pattern = Pattern::new(pattern)?;
    Ok(pattern.matches(path))
}

/// Whether `path` matches any of `patterns`.
///
/// Invalid patterns never match; the catalog rejects them at load time.
pub fn matches_any(patterns: &[String], path: &Path) -> bool {
    let Some(path) = path.to_str() else {
        return false;
    };
    patterns.iter().any(|p| {
        Pattern::new(p)
            .map(|pattern| pattern.matches(path))
            .unwrap_or(false)
    })
}

/// Check that a planned path is a plain relative path inside the project.
///
/// Rejects absolute paths, drive prefixes, `..` components and empty paths.
/// `.` components are tolerated.
pub fn validate_relative(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(validation(path, "empty path"));
    }
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(validation(path, "path escapes the project root ('..')"));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(validation(path, "absolute paths are not allowed"));
            }
        }
    }
    Ok(())
}

/// Check that writing to `root.join(relative)` cannot leave `root` through a
/// symlink.
///
/// Every existing ancestor between the root and the target is resolved and
/// must stay below the canonical root. The target itself must not be a
/// symlink.
pub fn check_within_root(root: &Path, relative: &Path) -> Result<()> {
    validate_relative(relative)?;
    let canonical_root = root.canonicalize().map_err(|e| Error::Path {
        message: format!("Cannot resolve project root '{}': {}", root.display(), e),
    })?;

    let target = root.join(relative);
    if let Ok(meta) = std::fs::symlink_metadata(&target) {
        if meta.file_type().is_symlink() {
            return Err(validation(relative, "target is a symbolic link"));
        }
    }

    let mut current = root.to_path_buf();
    let components: Vec<_> = relative.components().collect();
    let parent_count = components.len().saturating_sub(1);
    for component in components.iter().take(parent_count) {
        current.push(component);
        match current.canonicalize() {
            Ok(resolved) => {
                if !resolved.starts_with(&canonical_root) {
                    return Err(validation(
                        relative,
                        &format!("'{}' resolves outside the project root", current.display()),
                    ));
                }
                if !resolved.is_dir() {
                    return Err(validation(
                        relative,
                        &format!("'{}' exists and is not a directory", current.display()),
                    ));
                }
            }
            // Not created yet; nothing below it can exist either.
            Err(_) => break,
        }
    }
    Ok(())
}

/// Sibling path that keeps the previous content of `path`: `<path>.backup`
/// on the first attempt, then `<path>.backup.1`, `<path>.backup.2`, ...
pub fn backup_path(path: &Path, attempt: usize) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    if attempt > 0 {
        name.push(format!(".{}", attempt));
    }
    PathBuf::from(name)
}

/// Whether `path` has the shape of a path returned by [`backup_path`].
pub fn is_backup_path(path: &Path) -> bool {
    let Some(name) = path.to_str() else {
        return false;
    };
    if name.ends_with(BACKUP_SUFFIX) {
        return true;
    }
    match name.rsplit_once('.') {
        Some((stem, attempt)) => {
            stem.ends_with(BACKUP_SUFFIX)
                && !attempt.is_empty()
                && attempt.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// Ancestor directories of a relative path, deepest first, excluding the
/// project root itself.
pub fn ancestor_dirs(path: &Path) -> Vec<PathBuf> {
    path.ancestors()
        .skip(1)
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .collect()
}

/// Render a path with forward slashes for reports and manifest keys.
pub fn display_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn validation(path: &Path, message: &str) -> Error {
    Error::Validation {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}
