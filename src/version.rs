//! # Revision Ordering
//!
//! Template revisions are opaque ids, but most templates name them after
//! semantic versions (`v1.2.0`, `1.3.0`). This module picks the "latest"
//! revision out of a list of names, used both for git tags and for the
//! revision directories of a local template source.
//!
//! Names that parse as semver (with or without a leading `v`, optionally
//! under `refs/tags/`) are ordered by version. When no name is a semantic
//! version the caller decides the fallback.

use semver::Version;

/// Extract the semantic version from a tag or revision name.
pub fn extract_semver(name: &str) -> Option<Version> {
    let tag = name.strip_prefix("refs/tags/").unwrap_or(name);
    let version = tag.strip_prefix('v').unwrap_or(tag);
    Version::parse(version).ok()
}

/// Highest semantic version among `names`, if any.
pub fn find_latest_version(names: &[String]) -> Option<(String, Version)> {
    let mut latest: Option<(String, Version)> = None;

    for name in names {
        let Some(version) = extract_semver(name) else {
            continue;
        };
        let newer = match &latest {
            Some((_, current)) => version > *current,
            None => true,
        };
        if newer {
            latest = Some((name.clone(), version));
        }
    }

    latest
}

/// Latest revision: the highest semver name, else the lexically last one.
pub fn latest_revision(names: &[String]) -> Option<String> {
    find_latest_version(names)
        .map(|(name, _)| name)
        .or_else(|| names.iter().max().cloned())
}
