//! TOML fragment merging.

use log::warn;
use toml::Value as TomlValue;

use super::{ensure_trailing_newline, Fragment};
use crate::error::{Error, Result};

/// Recursively merge `source` into `target`.
///
/// Tables merge by key, arrays append items that are not present yet, other
/// values are replaced by the source.
pub fn merge_toml_values(target: &mut TomlValue, source: &TomlValue, path: &str, origin: &str) {
    match (target, source) {
        (TomlValue::Table(target_table), TomlValue::Table(source_table)) => {
            for (key, value) in source_table {
                let new_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                match target_table.get_mut(key) {
                    Some(existing) => merge_toml_values(existing, value, &new_path, origin),
                    None => {
                        target_table.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (TomlValue::Array(target_array), TomlValue::Array(source_array)) => {
            for item in source_array {
                if !target_array.contains(item) {
                    target_array.push(item.clone());
                }
            }
        }
        (target, source) => {
            if target.type_str() != source.type_str() {
                warn!(
                    "{}: type mismatch at '{}': replacing {} with {}",
                    origin,
                    path,
                    get_toml_type_name(target),
                    get_toml_type_name(source)
                );
            }
            *target = source.clone();
        }
    }
}

/// Human-readable type name for diagnostics.
pub fn get_toml_type_name(value: &TomlValue) -> &'static str {
    match value {
        TomlValue::String(_) => "String",
        TomlValue::Integer(_) => "Integer",
        TomlValue::Float(_) => "Float",
        TomlValue::Boolean(_) => "Boolean",
        TomlValue::Datetime(_) => "Datetime",
        TomlValue::Array(_) => "Array",
        TomlValue::Table(_) => "Table",
    }
}

/// Merge TOML fragments into one document.
pub fn merge(path: &str, fragments: &[Fragment]) -> Result<String> {
    let mut merged = TomlValue::Table(toml::Table::new());
    for fragment in fragments {
        let table: toml::Table = fragment.text.parse().map_err(|e: toml::de::Error| Error::Template {
            message: format!(
                "invalid TOML fragment from '{}' for {}: {}",
                fragment.origin, path, e
            ),
            variable: None,
        })?;
        merge_toml_values(&mut merged, &TomlValue::Table(table), "", &fragment.origin);
    }
    Ok(ensure_trailing_newline(toml::to_string(&merged)?))
}
