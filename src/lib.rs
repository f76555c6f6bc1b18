//! # Project Kit Library
//!
//! This library provides the core of the `project-kit` command-line tool: a
//! component-aware mutation engine for projects generated from a template.
//! After generation, infrastructure components and business services can be
//! added or removed, and the project can be moved to a newer template
//! revision, without clobbering the user's own edits.
//!
//! ## Quick Example
//!
//! ```
//! use project_kit::catalog::Catalog;
//! use project_kit::manifest::ProjectManifest;
//! use project_kit::resolver::{resolve, Mode};
//!
//! let catalog = Catalog::parse(r#"
//! components:
//!   - name: core
//!     removable: false
//!   - name: redis
//!     dependencies: [core]
//!   - name: worker
//!     dependencies: [redis]
//! "#).unwrap();
//!
//! let mut manifest = ProjectManifest::default();
//! manifest.enabled_components.insert("core".to_string(), None);
//!
//! let worker = catalog.parse_ref("worker").unwrap();
//! let resolution = resolve(&catalog, &manifest, &[worker], &[], Mode::Auto).unwrap();
//! assert!(resolution.is_ok());
//! assert_eq!(resolution.implied, vec!["redis".to_string()]);
//! ```
//!
//! ## Core Concepts
//!
//! - **Catalog (`catalog`)**: the registry a template ships in `kit.yaml`:
//!   components (with variants, dependencies, conflicts and owned paths),
//!   services and shared files.
//! - **Manifest (`manifest`)**: the persisted state of one project.
//! - **Resolver (`resolver`)**: turns a requested delta into a target enabled
//!   set, in strict or auto mode.
//! - **Engine (`engine`)**: plans and commits file operations: applying unit
//!   files, removing them, regenerating shared files and reconciling an
//!   update, all or nothing.
//! - **Sources (`source`, `snapshot`, `git`)**: fetch template revisions from
//!   a directory or a git repository.
//! - **Orchestrator (`orchestrator`)**: the commands, built from the above.

pub mod catalog;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod filesystem;
pub mod git;
pub mod manifest;
pub mod merge;
pub mod orchestrator;
pub mod output;
pub mod path;
pub mod render;
pub mod resolver;
pub mod snapshot;
pub mod source;
pub mod suggestions;
pub mod version;

#[cfg(test)]
mod resolver_proptest;
#[cfg(test)]
mod test_support;
