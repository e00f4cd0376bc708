//! On-disk show file format.
//!
//! A show file holds the devices, animations and triggers of a show plus
//! version and timestamp metadata. It is written as RON or JSON depending on
//! the file extension. JSON files from older releases are migrated on load.

use crate::error::{IoError, Result};
use crate::migrate::migrate_project;
use chrono::{DateTime, Utc};
use dmxflow_core::{AnimationCollection, Device, Show, TriggerCollection};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Version stamped into saved files (MAJOR.MINOR.PATCH).
///
/// Files with a newer MAJOR are refused; older ones are migrated.
pub const PROJECT_FILE_VERSION: &str = "1.0.0";

/// Maximum accepted show file size (16 MB).
pub const MAX_PROJECT_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Refuse files written by a newer major version
pub fn check_version(found: &str) -> Result<()> {
    let major = |version: &str| -> Option<u64> { version.split('.').next()?.trim().parse().ok() };
    let found_major = major(found).ok_or_else(|| IoError::InvalidVersion(found.to_string()))?;
    let current_major = major(PROJECT_FILE_VERSION)
        .ok_or_else(|| IoError::InvalidVersion(PROJECT_FILE_VERSION.to_string()))?;

    if found_major > current_major {
        return Err(IoError::VersionMismatch {
            expected: PROJECT_FILE_VERSION.to_string(),
            found: found.to_string(),
        });
    }
    Ok(())
}

/// Serialization format, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Ron,
}

impl FileFormat {
    /// `.json` is JSON; `.ron`, `.dmxflow` and no extension are RON
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(FileFormat::Json),
            Some("ron") | Some("dmxflow") | None => Ok(FileFormat::Ron),
            Some(other) => Err(IoError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Top-level structure of a show file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub version: String,
    pub metadata: ProjectMetadata,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub animations: AnimationCollection,
    #[serde(default)]
    pub triggers: TriggerCollection,
}

/// Timestamps of a show file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl ProjectMetadata {
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            modified_at: now,
        }
    }
}

impl ProjectFile {
    /// Snapshot the entities of a show
    pub fn from_show(show: &Show) -> Self {
        Self {
            version: PROJECT_FILE_VERSION.to_string(),
            metadata: ProjectMetadata::now(),
            devices: show.devices().devices().to_vec(),
            animations: show.animations().clone(),
            triggers: show.triggers().clone(),
        }
    }

    /// Rebuild a show; the style document is compiled on the way
    pub fn into_show(self) -> Result<Show> {
        Ok(Show::from_parts(
            self.devices,
            self.animations,
            self.triggers,
        )?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_limit(path, MAX_PROJECT_FILE_SIZE)
    }

    pub(crate) fn load_with_limit(path: &Path, limit: u64) -> Result<Self> {
        let size = std::fs::metadata(path)?.len();
        if size > limit {
            return Err(IoError::FileTooLarge { size, limit });
        }

        let format = FileFormat::from_path(path)?;
        let mut content = String::new();
        File::open(path)?.read_to_string(&mut content)?;

        match format {
            FileFormat::Json => {
                let mut value: serde_json::Value = serde_json::from_str(&content)?;
                migrate_project(&mut value)?;
                Ok(serde_json::from_value(value)?)
            }
            FileFormat::Ron => {
                let file: ProjectFile = ron::from_str(&content)?;
                check_version(&file.version)?;
                Ok(file)
            }
        }
    }

    /// Write to `path`, refreshing `modified_at`
    pub fn save(&mut self, path: &Path) -> Result<()> {
        let format = FileFormat::from_path(path)?;
        self.metadata.modified_at = Utc::now();

        match format {
            FileFormat::Json => {
                let file = File::create(path)?;
                serde_json::to_writer_pretty(file, self)?;
            }
            FileFormat::Ron => {
                let config = ron::ser::PrettyConfig::default();
                let text = ron::ser::to_string_pretty(self, config)?;
                let mut file = File::create(path)?;
                file.write_all(text.as_bytes())?;
            }
        }
        Ok(())
    }
}
