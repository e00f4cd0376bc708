//! Engine settings file (TOML)

use std::fs;
use std::path::Path;

use dmxflow_core::EngineSettings;

use crate::error::Result;

/// Read settings, falling back to defaults when the file does not exist
pub fn load_settings(path: &Path) -> Result<EngineSettings> {
    if !path.exists() {
        tracing::info!("No settings at {}, using defaults", path.display());
        return Ok(EngineSettings::default());
    }
    let text = fs::read_to_string(path)?;
    let settings: EngineSettings = toml::from_str(&text)?;
    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Write settings, creating parent directories
pub fn save_settings(settings: &EngineSettings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml::to_string_pretty(settings)?)?;
    Ok(())
}
