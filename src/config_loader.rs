/// Settings for the servo tester
///
/// Everything has a built-in default; a YAML file can override any subset.
/// The file is only ever read.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SerialSettings {
    pub baud: u32,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    pub join_timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud: 115200,
            read_timeout_ms: 100,
            write_timeout_ms: 500,
            join_timeout_ms: 800,
        }
    }
}

impl SerialSettings {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PanelSettings {
    pub drain_interval_ms: u64,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self { drain_interval_ms: 50 }
    }
}

impl PanelSettings {
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub serial: SerialSettings,
    pub panel: PanelSettings,
}

pub fn parse_settings(yaml: &str) -> Result<Settings> {
    // An empty document deserializes as null rather than an empty map
    if yaml.trim().is_empty() {
        return Ok(Settings::default());
    }
    let settings: Settings = serde_yaml::from_str(yaml).context("Invalid settings YAML")?;
    Ok(settings)
}

/// Load settings from `path`, or the defaults when no path is given.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        log::debug!(target: "config_loader", "No settings file given; using defaults");
        return Ok(Settings::default());
    };
    let yaml = fs::read_to_string(path).with_context(|| format!("Missing settings file at {:?}", path))?;
    let settings = parse_settings(&yaml).with_context(|| format!("Failed to load {:?}", path))?;
    log::info!(target: "config_loader", "Settings: baud={}, drain={}ms (from {:?})",
               settings.serial.baud, settings.panel.drain_interval_ms, path);
    Ok(settings)
}
