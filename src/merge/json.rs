//! JSON fragment merging.

use serde_json::Value as JsonValue;

use super::{ensure_trailing_newline, Fragment};
use crate::error::{Error, Result};

/// Recursively merge `source` into `target`: objects merge by key, arrays
/// append missing items, anything else is replaced.
pub fn merge_json_values(target: &mut JsonValue, source: &JsonValue) {
    match (target, source) {
        (JsonValue::Object(target_map), JsonValue::Object(source_map)) => {
            for (key, value) in source_map {
                match target_map.get_mut(key) {
                    Some(existing) => merge_json_values(existing, value),
                    None => {
                        target_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (JsonValue::Array(target_array), JsonValue::Array(source_array)) => {
            for item in source_array {
                if !target_array.contains(item) {
                    target_array.push(item.clone());
                }
            }
        }
        (target, source) => *target = source.clone(),
    }
}

/// Merge JSON fragments into one pretty-printed document.
pub fn merge(path: &str, fragments: &[Fragment]) -> Result<String> {
    let mut merged = JsonValue::Null;
    for fragment in fragments {
        if fragment.text.trim().is_empty() {
            continue;
        }
        let value: JsonValue = serde_json::from_str(&fragment.text).map_err(|e| Error::Template {
            message: format!(
                "invalid JSON fragment from '{}' for {}: {}",
                fragment.origin, path, e
            ),
            variable: None,
        })?;
        merge_json_values(&mut merged, &value);
    }
    if merged.is_null() {
        return Ok(String::new());
    }
    Ok(ensure_trailing_newline(serde_json::to_string_pretty(&merged)?))
}
