//! Line-list merging.

use std::collections::HashSet;

use super::{ensure_trailing_newline, Fragment};

/// Concatenate the header and fragments, dropping repeated non-blank lines.
///
/// Lines are compared after trimming trailing whitespace. Blank lines are
/// kept as they are.
pub fn merge(header: Option<&str>, fragments: &[Fragment]) -> String {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut lines: Vec<&str> = Vec::new();

    if let Some(header) = header {
        for line in header.lines() {
            seen.insert(line.trim_end());
            lines.push(line);
        }
    }
    for fragment in fragments {
        for line in fragment.text.lines() {
            let key = line.trim_end();
            if key.is_empty() || seen.insert(key) {
                lines.push(line);
            }
        }
    }

    ensure_trailing_newline(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(text: &str) -> Fragment {
        Fragment {
            origin: "test".to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_duplicates_dropped_in_order() {
        let merged = merge(
            None,
            &[fragment("fastapi\nredis\n"), fragment("redis\nsqlalchemy\n")],
        );
        assert_eq!(merged, "fastapi\nredis\nsqlalchemy\n");
    }

    #[test]
    fn test_header_comes_first() {
        let merged = merge(Some("# deps"), &[fragment("fastapi")]);
        assert_eq!(merged, "# deps\nfastapi\n");
    }

    #[test]
    fn test_blank_lines_kept() {
        let merged = merge(None, &[fragment("a\n\nb\n"), fragment("\nc\n")]);
        assert_eq!(merged, "a\n\nb\n\nc\n");
    }

    #[test]
    fn test_trailing_whitespace_ignored_for_duplicates() {
        let merged = merge(None, &[fragment("redis  \n"), fragment("redis\n")]);
        assert_eq!(merged, "redis  \n");
    }
}
