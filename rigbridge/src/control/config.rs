//! Deserialization types for the control mapping document. The document is a
//! JSON or YAML object keyed by control id; each value takes one of the
//! shapes in [`RawMappingEntry`]. Anything else is kept as
//! [`RawMappingEntry::Other`] so a single bad entry never fails the file.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use yaml_merge_keys::merge_keys_serde_yml;

use crate::core::prelude::*;

/// Uses [`IndexMap`] so entries keep the order they were declared in.
pub type MappingFile = IndexMap<String, RawMappingEntry>;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawMappingEntry {
    /// A built-in action name, `RemoveKeys<target>`, or a bare control name.
    Name(String),
    /// `[control_name, modus]`
    Pair(String, String),
    Composite {
        set_prev: Vec<String>,
    },
    Other(serde_yml::Value),
}

pub fn parse_json(json: &str) -> Result<MappingFile, ConfigError> {
    let file = serde_json::from_str(json)?;
    Ok(file)
}

pub fn parse_yaml(yaml: &str) -> Result<MappingFile, ConfigError> {
    let raw: serde_yml::Value = serde_yml::from_str(yaml)?;
    let merged = merge_keys_serde_yml(raw)?;
    let file = serde_yml::from_value(merged)?;
    Ok(file)
}

/// Loads a mapping document, picking the format from the file extension.
pub fn load(path: &Path) -> Result<MappingFile, ConfigError> {
    let content =
        fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    parse_for_path(path, &content)
}

pub fn parse_for_path(
    path: &Path,
    content: &str,
) -> Result<MappingFile, ConfigError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => parse_json(content),
        Some("yaml") | Some("yml") => parse_yaml(content),
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}
