//! Bridge settings file. Every field is optional; command line flags are
//! layered over whatever the file provides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use yaml_merge_keys::merge_keys_serde_yml;

use super::storage;
use crate::control::{DispatcherSettings, StepSizes};
use crate::core::prelude::*;
use crate::io::osc::DEFAULT_OSC_PORT;
use crate::timeline::{ExportTarget, Frame, MemoryTimeline};

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct BridgeSettings {
    pub rate_limit_ms: u64,
    pub fps: f32,
    pub osc: OscSettings,
    pub midi: MidiSettings,
    pub mapping: Option<PathBuf>,
    pub watch_mapping: bool,
    pub export: ExportSettings,
    pub zero_all: Vec<String>,
    pub step_sizes: StepSizes,
    pub timeline: TimelineSettings,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            rate_limit_ms: 50,
            fps: 60.0,
            osc: OscSettings::default(),
            midi: MidiSettings::default(),
            mapping: None,
            watch_mapping: false,
            export: ExportSettings::default(),
            zero_all: vec![],
            step_sizes: StepSizes::default(),
            timeline: TimelineSettings::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct OscSettings {
    pub port: u16,
}

impl Default for OscSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_OSC_PORT,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct MidiSettings {
    pub port: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportSettings {
    pub name: String,
    pub dir: Option<PathBuf>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            name: "file_name_test".to_string(),
            dir: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimelineSettings {
    pub name: String,
    pub start: Frame,
    pub end: Frame,
    pub frame_rate: u32,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            name: "rig".to_string(),
            start: 0,
            end: 240,
            frame_rate: 24,
        }
    }
}

impl BridgeSettings {
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: serde_yml::Value = serde_yml::from_str(yaml)?;
        let merged = merge_keys_serde_yml(raw)?;
        let settings = serde_yml::from_value(merged)?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let settings = Self::parse(&content)?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Falls back to defaults when the default settings file is missing.
    pub fn load_default() -> Result<Self, ConfigError> {
        match storage::default_settings_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("No settings file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn export_target(&self) -> ExportTarget {
        let dir = self
            .export
            .dir
            .clone()
            .unwrap_or_else(storage::default_export_dir);
        ExportTarget::new(&self.export.name, dir)
    }

    pub fn dispatcher_settings(&self) -> DispatcherSettings {
        DispatcherSettings {
            rate_limit: self.rate_limit(),
            step_sizes: self.step_sizes,
            export_target: self.export_target(),
            zero_all: self.zero_all.clone(),
        }
    }

    pub fn open_timeline(&self) -> MemoryTimeline {
        let t = &self.timeline;
        MemoryTimeline::new(&t.name, (t.start, t.end), t.frame_rate)
    }
}
