//! # Error Handling
//!
//! This module defines the centralized error handling for `project-kit`. It
//! uses `thiserror` to build a single `Error` enum covering every anticipated
//! failure mode, with enough context in each variant for a useful message.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Variants are grouped by the stage that raises
//!   them: catalog loading, dependency resolution, plan validation,
//!   reconciliation, manifest persistence, template fetching and rendering,
//!   plus wrappers for the libraries the crate builds on.
//!
//! - **`ResolutionError`**: A single dependency problem found by the resolver.
//!   The resolver collects every problem it finds instead of stopping at the
//!   first one, so `Error::Resolution` carries a list.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Errors raised by resolution and validation always happen before any file
//! is touched. `Error::exit_code` maps each variant onto the process exit
//! codes defined in [`crate::exit_codes`].

use thiserror::Error;

use crate::exit_codes;

/// A dependency problem detected while resolving a requested change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// Strict mode: a requested unit needs a component that is neither enabled
    /// nor part of the request.
    #[error("'{component}' requires '{missing}', which is not enabled and was not requested")]
    MissingDependency { component: String, missing: String },

    /// Two mutually exclusive components would both be enabled.
    #[error("'{first}' conflicts with '{second}'")]
    ConflictingComponents { first: String, second: String },

    /// A removal is blocked by enabled units that still depend on it.
    #[error("cannot remove '{component}': still required by {}", dependents.join(", "))]
    DependentsStillPresent {
        component: String,
        dependents: Vec<String>,
    },

    /// The catalog marks the component as part of the project core.
    #[error("'{component}' is a core component and cannot be removed")]
    NotRemovable { component: String },

    /// A dependency pins a variant other than the one that is enabled.
    #[error("'{component}' requires '{dependency}:{required}', but '{dependency}:{enabled}' is enabled")]
    IncompatibleVariant {
        component: String,
        dependency: String,
        required: String,
        enabled: String,
    },
}

/// Main error type for project-kit operations
#[derive(Error, Debug)]
pub enum Error {
    /// The catalog could not be parsed, is inconsistent, or a requested name
    /// is not in it.
    #[error("Catalog error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Catalog {
        message: String,
        /// Optional hint for how to fix the problem
        hint: Option<String>,
    },

    /// The component dependency graph declared by the catalog has a cycle.
    #[error("Cycle detected in component dependencies: {cycle}")]
    CycleDetected { cycle: String },

    /// The requested change cannot be resolved. Nothing was modified.
    #[error("Resolution failed:{}", errors.iter().map(|e| format!("\n  - {}", e)).collect::<String>())]
    Resolution { errors: Vec<ResolutionError> },

    /// A planned file operation is unsafe. The whole plan was rejected before
    /// any mutation.
    #[error("Validation failure for '{path}': {message}")]
    Validation { path: String, message: String },

    /// Update found paths changed both locally and upstream.
    #[error("Update stopped: {} path(s) need manual resolution: {}", paths.len(), paths.join(", "))]
    Conflicts { paths: Vec<String> },

    /// The project was generated in a mode that does not support mutation.
    #[error("Project at {root} is frozen and cannot be modified")]
    FrozenProject { root: String },

    /// The project manifest is missing, unreadable or inconsistent.
    #[error("Manifest error ({path}): {message}")]
    Manifest { path: String, message: String },

    /// Rendering a template failed.
    ///
    /// May include the name of the problematic variable when applicable.
    #[error("Template processing error: {message}{}", variable.as_ref().map(|v| format!(" (variable: {})", v)).unwrap_or_default())]
    Template {
        message: String,
        /// The template variable that caused the error, if applicable
        variable: Option<String>,
    },

    /// A template snapshot could not be fetched.
    #[error("Template source error for {source_spec}: {message}")]
    TemplateSource {
        source_spec: String,
        message: String,
    },

    /// An error occurred while cloning a Git repository.
    #[error("Git clone error for {url}@{r#ref}: {message}")]
    GitClone {
        url: String,
        r#ref: String,
        message: String,
    },

    /// An error occurred while executing a Git command.
    #[error("Git command failed for {url}: {command} - {stderr}")]
    GitCommand {
        command: String,
        url: String,
        stderr: String,
    },

    /// An error occurred with an in-memory filesystem operation.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An error occurred with a path-related operation.
    #[error("Path operation error: {message}")]
    Path { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML error, wrapped from `serde_yaml::Error`.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A TOML parsing error.
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

impl Error {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Resolution { .. } => exit_codes::RESOLUTION_FAILED,
            Error::Validation { .. } => exit_codes::VALIDATION_FAILED,
            Error::Conflicts { .. } => exit_codes::CONFLICTS,
            _ => exit_codes::ERROR,
        }
    }

    /// Shorthand for a catalog error without a hint.
    pub(crate) fn catalog(message: impl Into<String>) -> Self {
        Error::Catalog {
            message: message.into(),
            hint: None,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
