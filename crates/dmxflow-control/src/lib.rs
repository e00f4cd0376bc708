//! DMXFlow Control - Renderer, Sampling Loop and DMX Output
//!
//! This crate runs the show:
//! - [`render`] - the style renderer seam and the headless renderer
//! - [`sampling`] - the periodic loop sampling devices back into control values
//! - [`output`] - DMX transports (Art-Net) and the frame output subscriber
//! - [`error`] - error types

/// Error types
pub mod error;
/// DMX transports and output subscriber
pub mod output;
/// Style renderers
pub mod render;
/// Sampling loop
pub mod sampling;

// Re-exports
pub use error::{ControlError, Result};
pub use output::{
    transport_from_settings, ArtNetSender, DmxOutput, DmxTransport, FrameRecorder, NullTransport,
};
pub use render::{HeadlessRenderer, StyleRenderer};
pub use sampling::{
    FrameSubscriber, InputEvent, LoopStats, SampleSet, SampledDevice, SamplingHandle,
    SamplingLoop,
};
