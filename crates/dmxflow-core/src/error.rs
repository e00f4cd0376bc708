//! Error types for the core domain model
use thiserror::Error;

/// Core errors
///
/// Configuration errors (overlapping channels, zero-width style domains,
/// duplicate registrations) are raised while building the type registries
/// and are meant to stop startup. Value errors are raised by the per-control
/// conversions and are treated as recoverable by their callers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A control binding does not fit inside its device type
    #[error("Control '{control}' at channel {start} needs {count} channels but device type '{device_type}' has {total}")]
    ChannelOutOfRange {
        device_type: String,
        control: String,
        start: usize,
        count: usize,
        total: usize,
    },

    /// Two control bindings claim the same channel
    #[error("Controls '{first}' and '{second}' overlap in device type '{device_type}'")]
    OverlappingControls {
        device_type: String,
        first: String,
        second: String,
    },

    /// Default channel bytes do not match the channel count
    #[error("Device type '{device_type}' declares {total} channels but {defaults} default bytes")]
    DefaultsLength {
        device_type: String,
        total: usize,
        defaults: usize,
    },

    /// A style descriptor maps onto an empty range
    #[error("Style descriptor '{descriptor}' of control '{control}' has a zero-width range")]
    ZeroWidthDomain { control: String, descriptor: String },

    /// Registration of an id that already exists
    #[error("Duplicate {kind} id: {id}")]
    Duplicate { kind: &'static str, id: String },

    /// Unknown control type id
    #[error("Unknown control type: {0}")]
    UnknownControlType(String),

    /// Unknown device type key
    #[error("Unknown device type: {0}")]
    UnknownDeviceType(String),

    /// Unknown device id
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The device's type has no such control
    #[error("Device type '{device_type}' has no control '{control}'")]
    ControlNotOnDevice { device_type: String, control: String },

    /// Start channel past the end of the universe
    #[error("Start channel {0} is outside the universe")]
    StartChannel(u16),

    /// A device cannot follow itself
    #[error("Device {0} cannot be linked to itself")]
    SelfLink(String),

    /// Unknown animation name
    #[error("Animation not found: {0}")]
    AnimationNotFound(String),

    /// A value does not have the shape its control expects
    #[error("Control '{control}' cannot take value {value}")]
    ValueMismatch { control: String, value: String },

    /// Too few channel bytes for a control
    #[error("Control '{control}' needs {expected} channel bytes, got {actual}")]
    ChannelCount {
        control: String,
        expected: usize,
        actual: usize,
    },

    /// Keyframe time outside 0..=1
    #[error("Keyframe time {0} is outside 0.0..=1.0")]
    KeyframeTime(f64),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
