//! Fragment merging for shared files.
//!
//! A shared file is derived from a header plus the fragments contributed by
//! every enabled unit. Each format has its own submodule:
//!
//! - Lines (lines.rs) - line lists such as `requirements.txt` or `.gitignore`
//! - YAML (yaml.rs) - e.g. `docker-compose.yml`
//! - JSON (json.rs) - e.g. `package.json`
//! - TOML (toml.rs) - e.g. `pyproject.toml`
//!
//! Structured formats deep-merge mappings, append sequence items that are not
//! present yet and let later scalars win. Fragments are merged in the order
//! they are given.

pub mod json;
pub mod lines;
pub mod toml;
pub mod yaml;

use crate::catalog::SharedFormat;
use crate::error::Result;

/// One contribution to a shared file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Unit the fragment comes from, for diagnostics.
    pub origin: String,
    pub text: String,
}

/// Combine a header and fragments into the content of a shared file.
///
/// Returns `None` when there is neither a header nor a fragment.
pub fn merge_fragments(
    format: SharedFormat,
    path: &str,
    header: Option<&str>,
    fragments: &[Fragment],
) -> Result<Option<String>> {
    if header.is_none() && fragments.is_empty() {
        return Ok(None);
    }

    let body = match format {
        SharedFormat::Lines => lines::merge(header, fragments),
        SharedFormat::Yaml => prefix(header, yaml::merge(path, fragments)?),
        SharedFormat::Json => prefix(header, json::merge(path, fragments)?),
        SharedFormat::Toml => prefix(header, toml::merge(path, fragments)?),
    };
    Ok(Some(body))
}

fn prefix(header: Option<&str>, body: String) -> String {
    match header {
        Some(header) => ensure_trailing_newline(header.to_string()) + &body,
        None => body,
    }
}

/// Terminate non-empty content with a newline.
pub(crate) fn ensure_trailing_newline(mut content: String) -> String {
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content
}
