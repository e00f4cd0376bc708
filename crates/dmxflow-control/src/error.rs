//! Error types for the control crate
use thiserror::Error;

/// Sampling and output errors
#[derive(Error, Debug)]
pub enum ControlError {
    /// Socket or file I/O failure
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid destination address
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Universe outside the Art-Net port-address range
    #[error("Invalid universe: {0} (max 32767)")]
    InvalidUniverse(u16),

    /// The transport refused or dropped a frame
    #[error("Transport error: {0}")]
    TransportError(String),

    /// A frame subscriber failed
    #[error("Subscriber '{name}' failed: {reason}")]
    SubscriberError { name: String, reason: String },

    /// JSON serialization of a sample set failed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Errors from the show model
    #[error(transparent)]
    Core(#[from] dmxflow_core::CoreError),
}

/// Result type for control operations
pub type Result<T> = std::result::Result<T, ControlError>;
