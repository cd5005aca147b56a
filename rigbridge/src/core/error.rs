//! Error types shared across the bridge.
//!
//! Setup-time failures ([`ConfigError`], [`SchedulerError`]) abort whatever
//! was being set up. Steady-state failures ([`TransportError`],
//! [`BackendError`]) are logged by the dispatcher and skipped.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(String),

    #[error("Unsupported mapping file extension: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Invalid mapping entry for `{control_id}`: {reason}")]
    InvalidEntry { control_id: String, reason: String },

    #[error("Unsupported modus `{modus}` for `{control_id}`")]
    UnsupportedModus { control_id: String, modus: String },

    #[error("Unable to watch mapping file: {0}")]
    Watch(String),

    #[error(
        "Composite `{control_id}` references `{reference}` which is not a \
         direct target"
    )]
    UnknownReference {
        control_id: String,
        reference: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(e: serde_yml::Error) -> Self {
        ConfigError::Yaml(e.to_string())
    }
}

impl From<yaml_merge_keys::MergeKeyError> for ConfigError {
    fn from(e: yaml_merge_keys::MergeKeyError) -> Self {
        ConfigError::Yaml(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Unable to bind transport: {0}")]
    Bind(String),

    #[error("Transport read failed: {0}")]
    Read(String),

    #[error("Transport state lock was poisoned")]
    Poisoned,

    #[error("MIDI error: {0}")]
    Midi(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("{argument} must be a positive integer, got {value}")]
    InvalidArgument { argument: &'static str, value: i64 },
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("No active timeline")]
    NoActiveTimeline,

    #[error("No bound control target named `{0}`")]
    NoBoundTarget(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;
