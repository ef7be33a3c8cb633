//! YAML configuration loader with environment variable support
//!
//! String values may reference the environment as `${VAR}` or
//! `${VAR:default}`. The expanded YAML is converted to JSON before typed
//! deserialization so serde defaults behave the same for both formats.

use crate::RouterError;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Load and parse a YAML file, expanding environment references
pub fn load_yaml_file<P: AsRef<Path>>(path: P) -> Result<YamlValue, RouterError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        RouterError::Configuration(format!("Failed to read YAML file {:?}: {}", path, e))
    })?;

    let mut value: YamlValue = serde_yaml::from_str(&content).map_err(|e| {
        RouterError::Configuration(format!("Failed to parse YAML file {:?}: {}", path, e))
    })?;

    expand_variables(&mut value, &|name| std::env::var(name).ok());
    Ok(value)
}

/// Load and deserialize a YAML file into a specific type
pub fn load_yaml_config<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, RouterError> {
    let json = into_json(load_yaml_file(path)?)?;

    serde_json::from_value(json).map_err(|e| {
        RouterError::Configuration(format!("Failed to deserialize configuration: {}", e))
    })
}

fn expand_variables(value: &mut YamlValue, lookup: &dyn Fn(&str) -> Option<String>) {
    match value {
        YamlValue::String(s) => {
            if let Some(expanded) = expand_env_in_string(s, lookup) {
                *s = expanded;
            }
        }
        YamlValue::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                expand_variables(v, lookup);
            }
        }
        YamlValue::Sequence(seq) => {
            for item in seq.iter_mut() {
                expand_variables(item, lookup);
            }
        }
        _ => {}
    }
}

fn env_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\$\{([^:}]+)(?::([^}]*))?\}").ok())
        .as_ref()
}

/// Expand `${VAR:default}` references; `None` when the string has none
fn expand_env_in_string(s: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Option<String> {
    if !s.contains("${") {
        return None;
    }

    let expanded = env_pattern()?.replace_all(s, |caps: &regex::Captures<'_>| {
        let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        lookup(&caps[1]).unwrap_or_else(|| default_value.to_string())
    });

    Some(expanded.into_owned())
}

/// Re-read expanded YAML as a JSON tree; non-string map keys are rejected
fn into_json(yaml: YamlValue) -> Result<JsonValue, RouterError> {
    serde_yaml::from_value(yaml).map_err(|e| {
        RouterError::Configuration(format!("Configuration is not valid as JSON: {}", e))
    })
}
