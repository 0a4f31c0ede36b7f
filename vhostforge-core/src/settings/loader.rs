//! Settings loader

use crate::error::{Error, Result};
use crate::settings::Settings;
use std::path::Path;

/// Settings loader for various formats
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings from a file, falling back to defaults if it is absent
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Settings> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("settings file {} absent, using defaults", path.display());
            return Ok(Settings::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Settings(format!("failed to read settings file: {}", e)))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match ext {
            "json" => Self::from_json(&content),
            "toml" | "" => Self::from_toml(&content),
            _ => Err(Error::Settings(format!("unknown settings format: {}", ext))),
        }
    }

    /// Parse JSON settings
    pub fn from_json(content: &str) -> Result<Settings> {
        serde_json::from_str(content).map_err(|e| Error::Settings(format!("invalid JSON: {}", e)))
    }

    /// Parse TOML settings
    pub fn from_toml(content: &str) -> Result<Settings> {
        toml::from_str(content).map_err(|e| Error::Settings(format!("invalid TOML: {}", e)))
    }
}
