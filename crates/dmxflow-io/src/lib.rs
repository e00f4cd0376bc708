//! DMXFlow I/O - Show files and settings
//!
//! - [`project`] - save and load shows
//! - [`project_format`] - the on-disk show file (JSON or RON)
//! - [`migrate`] - upgrade of legacy JSON show files
//! - [`settings`] - engine settings (TOML)

pub mod error;
pub mod migrate;
pub mod project;
pub mod project_format;
pub mod settings;

pub use error::{IoError, Result};
pub use migrate::{migrate_project, MigrationReport};
pub use project::{load_show, save_show};
pub use project_format::{FileFormat, ProjectFile, ProjectMetadata, PROJECT_FILE_VERSION};
pub use settings::{load_settings, save_settings};
