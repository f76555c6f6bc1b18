//! In-memory file trees.
//!
//! Template snapshots, rendered components and reconciliation inputs are all
//! held as a [`MemoryFS`]: a map from project-relative path to file content.
//! Paths are kept in a `BTreeMap` so iteration order, and therefore every plan
//! built from a tree, is deterministic.

use crate::error::{Error, Result};
use glob::Pattern;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Represents a file with content and metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// File content as bytes
    pub content: Vec<u8>,
    /// Unix permission bits (simplified as u32)
    pub permissions: u32,
}

impl File {
    /// Create a new file with content
    pub fn new(content: Vec<u8>) -> Self {
        Self {
            content,
            permissions: 0o644,
        }
    }

    /// Create a new file from string content
    pub fn from_string(content: &str) -> Self {
        Self::new(content.as_bytes().to_vec())
    }

    /// Content as UTF-8, if it is valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// In-memory filesystem keyed by relative path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryFS {
    files: BTreeMap<PathBuf, File>,
}

impl MemoryFS {
    /// Create a new empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every regular file below `root`.
    ///
    /// Directories whose name is listed in `skip_dirs` are not descended
    /// into. Paths are stored relative to `root`.
    pub fn load_dir(root: &Path, skip_dirs: &[&str]) -> Result<Self> {
        let mut fs = MemoryFS::new();

        for entry in walkdir::WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !(e.file_type().is_dir()
                        && skip_dirs.contains(&e.file_name().to_str().unwrap_or("")))
            })
        {
            let entry = entry.map_err(|e| Error::Filesystem {
                message: format!("Failed to walk '{}': {}", root.display(), e),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|_| Error::Path {
                    message: format!("Failed to make path relative: {}", entry.path().display()),
                })?
                .to_path_buf();
            let content = std::fs::read(entry.path())?;
            let mut file = File::new(content);
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                file.permissions = entry.metadata().map(|m| m.permissions().mode() & 0o777).unwrap_or(0o644);
            }
            fs.files.insert(relative, file);
        }

        Ok(fs)
    }

    /// Add or update a file
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P, file: File) -> Result<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::Filesystem {
                message: "Cannot add a file with an empty path".to_string(),
            });
        }
        self.files.insert(path.to_path_buf(), file);
        Ok(())
    }

    /// Add a file with content
    pub fn add_file_content<P: AsRef<Path>>(&mut self, path: P, content: Vec<u8>) -> Result<()> {
        self.add_file(path, File::new(content))
    }

    /// Add a file with string content
    pub fn add_file_string<P: AsRef<Path>>(&mut self, path: P, content: &str) -> Result<()> {
        self.add_file(path, File::from_string(content))
    }

    /// Get a file by path
    pub fn get_file<P: AsRef<Path>>(&self, path: P) -> Option<&File> {
        self.files.get(path.as_ref())
    }

    /// Remove a file
    pub fn remove_file<P: AsRef<Path>>(&mut self, path: P) -> Option<File> {
        self.files.remove(path.as_ref())
    }

    /// Check if a file exists
    pub fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.files.contains_key(path.as_ref())
    }

    /// List all files in path order
    pub fn list_files(&self) -> Vec<PathBuf> {
        self.files.keys().cloned().collect()
    }

    /// List files matching a glob pattern
    pub fn list_files_glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = Pattern::new(pattern)?;
        Ok(self
            .files
            .keys()
            .filter(|path| path.to_str().map(|s| pattern.matches(s)).unwrap_or(false))
            .cloned()
            .collect())
    }

    /// Extract the files below `prefix` as a new tree rooted at `prefix`.
    pub fn subtree<P: AsRef<Path>>(&self, prefix: P) -> MemoryFS {
        let prefix = prefix.as_ref();
        let files = self
            .files
            .iter()
            .filter_map(|(path, file)| {
                let relative = path.strip_prefix(prefix).ok()?;
                if relative.as_os_str().is_empty() {
                    None
                } else {
                    Some((relative.to_path_buf(), file.clone()))
                }
            })
            .collect();
        MemoryFS { files }
    }

    /// Get the number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if filesystem is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Merge another filesystem into this one (last-write-wins)
    pub fn merge(&mut self, other: &MemoryFS) {
        for (path, file) in &other.files {
            self.files.insert(path.clone(), file.clone());
        }
    }

    /// Iterate over all files as (path, file) pairs in path order
    pub fn files(&self) -> impl Iterator<Item = (&PathBuf, &File)> {
        self.files.iter()
    }

    /// Content digest over every path and file content.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (path, file) in &self.files {
            hasher.update(path.to_string_lossy().as_bytes());
            hasher.update(&[0]);
            hasher.update(&(file.content.len() as u64).to_le_bytes());
            hasher.update(&file.content);
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Hex blake3 digest of a byte slice.
pub fn content_digest(content: &[u8]) -> String {
    blake3::hash(content).to_hex().to_string()
}
