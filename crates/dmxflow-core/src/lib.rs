//! DMXFlow Core - Domain Model and Style Compiler
//!
//! This crate contains everything that runs without I/O:
//! - Control types, device types and their registries
//! - DMX channel conversion and frame composition
//! - Style property compiler, sampler and the generated style document
//! - Keyframe animations, triggers and value propagation between devices
//! - Show state, engine settings and logging configuration

pub mod animation;
pub mod control;
pub mod device;
pub mod dmx;
pub mod error;
pub mod input;
pub mod library;
pub mod logging;
pub mod propagation;
pub mod registry;
pub mod settings;
pub mod show;
pub mod style;
pub mod trigger;

// --- Re-exports grouped by category ---

// Controls & Devices
pub use control::{
    ControlKind, ControlType, ControlValue, ControlValues, PadSpec, PanTilt, Rgb, SliderSpec,
    StyleDescriptor, StyleUnit, ToggleSpec,
};
pub use device::{ControlBinding, Device, DeviceId, DeviceType};
pub use registry::{ControlTypeRegistry, DeviceTypeRegistry};

// DMX
pub use dmx::{
    compose_frame, control_values_to_dmx, create_default_control_values, dmx_to_control_values,
    DmxFrame, DMX_UNIVERSE_SIZE,
};

// Style
pub use style::{
    compile_remap, get_properties, sample_control_values, Expr, SampleOutcome, StyleDocument,
};

// Animation & Triggers
pub use animation::{Animation, AnimationCollection, Keyframe};
pub use input::{InputCatalog, InputControl, InputDevice, InputRegistry};
pub use trigger::{
    compile_trigger, AnimationRef, CopyBinding, Edge, InputCondition, Trigger, TriggerAction,
    TriggerCollection, TriggerId, TriggerInput, TriggerKind, TriggerOutput,
};

// Devices at runtime
pub use library::{DeviceLibrary, DeviceUpdate, LinkSettings};
pub use propagation::propagate;
pub use show::Show;

// Configuration
pub use error::{CoreError, Result};
pub use logging::LogConfig;
pub use settings::{EngineSettings, OutputSettings};
