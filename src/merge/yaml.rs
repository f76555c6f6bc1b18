//! YAML fragment merging.

use log::{debug, warn};
use serde_yaml::Value as YamlValue;

use super::{ensure_trailing_newline, Fragment};
use crate::error::{Error, Result};

/// Recursively merge `source` into `target`.
///
/// - Mappings: keys are merged recursively
/// - Sequences: items not yet present are appended
/// - Scalars and type mismatches: `source` replaces `target`
pub fn merge_yaml_values(target: &mut YamlValue, source: &YamlValue, path: &str, origin: &str) {
    match (target, source) {
        (YamlValue::Mapping(target_map), YamlValue::Mapping(source_map)) => {
            for (key, value) in source_map {
                let key_str = match key {
                    YamlValue::String(s) => s.clone(),
                    _ => format!("{:?}", key),
                };
                let new_path = if path.is_empty() {
                    key_str
                } else {
                    format!("{}.{}", path, key_str)
                };
                match target_map.get_mut(key) {
                    Some(existing) => merge_yaml_values(existing, value, &new_path, origin),
                    None => {
                        target_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (YamlValue::Sequence(target_seq), YamlValue::Sequence(source_seq)) => {
            for item in source_seq {
                if !target_seq.contains(item) {
                    target_seq.push(item.clone());
                }
            }
        }
        (target, source) => {
            if target.is_mapping() || target.is_sequence() || source.is_mapping() || source.is_sequence() {
                warn!(
                    "{}: type mismatch at '{}': replacing {} with {}",
                    origin,
                    path,
                    get_yaml_type_name(target),
                    get_yaml_type_name(source)
                );
            } else if target != source && !target.is_null() {
                debug!("{}: overriding value at '{}'", origin, path);
            }
            *target = source.clone();
        }
    }
}

/// Human-readable type name for diagnostics.
pub fn get_yaml_type_name(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "Null",
        YamlValue::Bool(_) => "Bool",
        YamlValue::Number(_) => "Number",
        YamlValue::String(_) => "String",
        YamlValue::Sequence(_) => "Sequence",
        YamlValue::Mapping(_) => "Mapping",
        YamlValue::Tagged(_) => "Tagged",
    }
}

/// Merge YAML fragments into one document.
pub fn merge(path: &str, fragments: &[Fragment]) -> Result<String> {
    let mut merged = YamlValue::Null;
    for fragment in fragments {
        let value: YamlValue = serde_yaml::from_str(&fragment.text).map_err(|e| Error::Template {
            message: format!(
                "invalid YAML fragment from '{}' for {}: {}",
                fragment.origin, path, e
            ),
            variable: None,
        })?;
        if value.is_null() {
            continue;
        }
        merge_yaml_values(&mut merged, &value, "", &fragment.origin);
    }
    if merged.is_null() {
        return Ok(String::new());
    }
    Ok(ensure_trailing_newline(serde_yaml::to_string(&merged)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(origin: &str, text: &str) -> Fragment {
        Fragment {
            origin: origin.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_mappings_merge_recursively() {
        let merged = merge(
            "docker-compose.yml",
            &[
                fragment("core", "services:\n  app:\n    build: .\n"),
                fragment("redis", "services:\n  redis:\n    image: redis:7\n"),
            ],
        )
        .unwrap();
        let value: YamlValue = serde_yaml::from_str(&merged).unwrap();
        assert!(value["services"]["app"].is_mapping());
        assert_eq!(value["services"]["redis"]["image"], YamlValue::from("redis:7"));
    }

    #[test]
    fn test_sequences_append_unique() {
        let merged = merge(
            "x.yml",
            &[fragment("a", "volumes: [data, logs]\n"), fragment("b", "volumes: [logs, cache]\n")],
        )
        .unwrap();
        let value: YamlValue = serde_yaml::from_str(&merged).unwrap();
        let volumes: Vec<&str> = value["volumes"]
            .as_sequence()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(volumes, vec!["data", "logs", "cache"]);
    }

    #[test]
    fn test_later_scalar_wins() {
        let mut target: YamlValue = serde_yaml::from_str("version: '3'").unwrap();
        let source: YamlValue = serde_yaml::from_str("version: '3.8'").unwrap();
        merge_yaml_values(&mut target, &source, "", "test");
        assert_eq!(target["version"], YamlValue::from("3.8"));
    }

    #[test]
    fn test_invalid_fragment_names_origin() {
        let err = merge("x.yml", &[fragment("redis", "a: [unclosed")]).unwrap_err();
        assert!(err.to_string().contains("'redis'"));
    }

    #[test]
    fn test_empty_fragments_produce_empty_body() {
        assert_eq!(merge("x.yml", &[fragment("a", "")]).unwrap(), "");
    }
}
