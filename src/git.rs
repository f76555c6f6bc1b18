//! Thin wrappers around the system `git` command.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};

/// Shallow-clone `url` at `ref_name` into `target_dir`.
///
/// The clone lands in a sibling `.partial` directory first and is renamed
/// into place once complete, so an interrupted clone never looks like a
/// cached snapshot. Authentication is whatever the system `git` is
/// configured with (ssh-agent, credential helpers).
pub fn clone_shallow(url: &str, ref_name: &str, target_dir: &Path) -> Result<()> {
    let clone_error = |message: String| Error::GitClone {
        url: url.to_string(),
        r#ref: ref_name.to_string(),
        message,
    };

    let mut partial = target_dir.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);
    for stale in [target_dir, partial.as_path()] {
        if stale.exists() {
            fs::remove_dir_all(stale)?;
        }
    }
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    log::debug!("git clone --depth=1 --branch {} {}", ref_name, url);
    let output = Command::new("git")
        .args(["clone", "--quiet", "--depth=1", "--branch", ref_name, url])
        .arg(&partial)
        .output()
        .map_err(|e| clone_error(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let _ = fs::remove_dir_all(&partial);
        let denied = ["Authentication failed", "Permission denied", "Could not read from remote"]
            .iter()
            .any(|marker| stderr.contains(marker));
        return Err(clone_error(if denied {
            format!("access denied; check the git credentials for this host ({})", stderr)
        } else {
            stderr
        }));
    }

    fs::rename(&partial, target_dir)?;
    Ok(())
}

/// List all tags from a remote repository
pub fn list_tags(url: &str) -> Result<Vec<String>> {
    let output = Command::new("git")
        .args(["ls-remote", "--tags", url])
        .output()
        .map_err(|e| Error::GitCommand {
            command: "ls-remote --tags".to_string(),
            url: url.to_string(),
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(Error::GitCommand {
            command: "ls-remote --tags".to_string(),
            url: url.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(parse_ls_remote_tags(&String::from_utf8_lossy(&output.stdout)))
}

/// Extract tag names from `git ls-remote --tags` output.
///
/// Lines look like `<hash>\trefs/tags/<tag>`; peeled entries (`^{}`) are
/// skipped.
pub fn parse_ls_remote_tags(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| {
            let (_, ref_name) = line.split_once('\t')?;
            let tag = ref_name.strip_prefix("refs/tags/")?;
            if tag.ends_with("^{}") {
                None
            } else {
                Some(tag.to_string())
            }
        })
        .collect()
}

/// Cache directory for a clone of `url` at `ref_name`.
pub fn url_to_cache_path(cache_root: &Path, url: &str, ref_name: &str) -> PathBuf {
    let url_hash = blake3::hash(url.as_bytes()).to_hex();
    let safe_ref = ref_name.replace('/', "-");
    cache_root.join(format!("{}-{}", &url_hash[..16], safe_ref))
}
