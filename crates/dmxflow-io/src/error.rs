//! Error types for project and settings files.

/// Result type alias for file operations.
pub type Result<T> = std::result::Result<T, IoError>;

/// Errors while reading or writing show files
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// RON parsing failed
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// RON serialization failed
    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("TOML error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    /// File extension not recognised
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// File exceeds the size limit
    #[error("File too large: {size} bytes (limit {limit})")]
    FileTooLarge {
        /// Actual file size in bytes
        size: u64,
        /// Allowed size in bytes
        limit: u64,
    },

    /// Written by a newer, incompatible version
    #[error("Incompatible project version: expected {expected}, found {found}")]
    VersionMismatch {
        /// Version this build writes
        expected: String,
        /// Version found in the file
        found: String,
    },

    /// Version field is not `MAJOR.MINOR.PATCH`
    #[error("Invalid project version: {0}")]
    InvalidVersion(String),

    /// Legacy data could not be converted
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Stored entities are inconsistent
    #[error(transparent)]
    Core(#[from] dmxflow_core::CoreError),
}
