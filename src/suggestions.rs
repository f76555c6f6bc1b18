//! # Error Suggestions
//!
//! Helper functions for error messages that say what went wrong AND how to
//! fix it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use project_kit::suggestions;
//!
//! // Instead of:
//! anyhow::bail!("Manifest not found: {}", path.display());
//!
//! // Use:
//! return Err(suggestions::manifest_not_found(path));
//! ```

use std::path::Path;

use crate::error::{Error, ResolutionError};

/// Generate an error for a project directory without a manifest.
pub fn manifest_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Project manifest not found: {path}\n\n\
         hint: Run 'project-kit init --source <TEMPLATE>' to start managing this project\n\
         hint: Use -C/--project to point at a different project directory",
        path = path.display()
    )
}

/// Generate an error for `init` without a template source.
pub fn source_not_configured() -> anyhow::Error {
    anyhow::anyhow!(
        "No template source given\n\n\
         hint: Pass --source <DIR|GIT-URL>\n\
         hint: Or set the PROJECT_KIT_SOURCE environment variable"
    )
}

/// Extra hint lines for a failed resolution.
///
/// Strict-mode failures get a pointer to auto mode; blocked removals get a
/// pointer to removing the dependents first.
pub fn resolution_hints(error: &Error) -> Vec<String> {
    let Error::Resolution { errors } = error else {
        return Vec::new();
    };

    let mut hints = Vec::new();
    for problem in errors {
        let hint = match problem {
            ResolutionError::MissingDependency { missing, .. } => format!(
                "hint: Request '{missing}' explicitly, or re-run with --mode auto to add it"
            ),
            ResolutionError::DependentsStillPresent { dependents, .. } => format!(
                "hint: Remove {} first",
                dependents.join(", ")
            ),
            ResolutionError::ConflictingComponents { second, .. } => {
                format!("hint: Remove '{second}' before adding its alternative")
            }
            ResolutionError::NotRemovable { .. } | ResolutionError::IncompatibleVariant { .. } => {
                continue
            }
        };
        if !hints.contains(&hint) {
            hints.push(hint);
        }
    }
    hints
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
pub fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            if distance <= 2 && distance < input.len() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Calculate the Levenshtein edit distance between two strings.
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, a_char) in a_chars.iter().enumerate() {
        let mut current = vec![i + 1; b_chars.len() + 1];
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        previous = current;
    }

    previous[b_chars.len()]
}
