//! Device types and device instances
//!
//! A [`DeviceType`] is the channel layout of one fixture model: its channel
//! count, the bytes every channel holds by default and the controls bound at
//! channel offsets. A [`Device`] is a patched fixture: a device type placed at
//! a start channel of the universe, with its current control values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::control::{ControlType, ControlValues};
use crate::dmx;
use crate::error::{CoreError, Result};

/// A control placed at a channel offset of a device type
#[derive(Debug, Clone)]
pub struct ControlBinding {
    pub control: Arc<ControlType>,
    /// Offset from the device's start channel
    pub start_channel: usize,
}

impl ControlBinding {
    pub fn new(control: Arc<ControlType>, start_channel: usize) -> Self {
        Self {
            control,
            start_channel,
        }
    }

    /// Control id the binding is stored under in a value record
    pub fn id(&self) -> &str {
        self.control.id()
    }

    /// Channel offsets occupied by the control
    pub fn channel_range(&self) -> Range<usize> {
        self.start_channel..self.start_channel + self.control.channel_count()
    }
}

/// Channel layout of a fixture model
#[derive(Debug, Clone)]
pub struct DeviceType {
    key: String,
    display_name: String,
    total_channels: usize,
    default_channel_bytes: Vec<u8>,
    controls: Vec<ControlBinding>,
}

impl DeviceType {
    /// Build a device type, rejecting layouts where controls overflow the
    /// channel count or overlap each other
    pub fn new(
        key: impl Into<String>,
        display_name: impl Into<String>,
        total_channels: usize,
        default_channel_bytes: Vec<u8>,
        controls: Vec<ControlBinding>,
    ) -> Result<Self> {
        let key = key.into();

        if default_channel_bytes.len() != total_channels {
            return Err(CoreError::DefaultsLength {
                device_type: key,
                total: total_channels,
                defaults: default_channel_bytes.len(),
            });
        }

        for (index, binding) in controls.iter().enumerate() {
            let range = binding.channel_range();
            if range.end > total_channels {
                return Err(CoreError::ChannelOutOfRange {
                    device_type: key,
                    control: binding.id().to_string(),
                    start: binding.start_channel,
                    count: binding.control.channel_count(),
                    total: total_channels,
                });
            }

            for other in &controls[..index] {
                if other.id() == binding.id() {
                    return Err(CoreError::Duplicate {
                        kind: "control binding",
                        id: binding.id().to_string(),
                    });
                }
                let other_range = other.channel_range();
                if range.start < other_range.end && other_range.start < range.end {
                    return Err(CoreError::OverlappingControls {
                        device_type: key,
                        first: other.id().to_string(),
                        second: binding.id().to_string(),
                    });
                }
            }
        }

        Ok(Self {
            key,
            display_name: display_name.into(),
            total_channels,
            default_channel_bytes,
            controls,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn total_channels(&self) -> usize {
        self.total_channels
    }

    pub fn default_channel_bytes(&self) -> &[u8] {
        &self.default_channel_bytes
    }

    pub fn controls(&self) -> &[ControlBinding] {
        &self.controls
    }

    /// Binding of a control id
    pub fn control(&self, id: &str) -> Option<&ControlBinding> {
        self.controls.iter().find(|b| b.id() == id)
    }

    pub fn has_control(&self, id: &str) -> bool {
        self.control(id).is_some()
    }

    pub fn control_ids(&self) -> impl Iterator<Item = &str> {
        self.controls.iter().map(|b| b.id())
    }
}

/// Unique identifier of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(Uuid);

impl DeviceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DeviceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A patched fixture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: DeviceId,
    pub device_type_key: String,
    /// First DMX channel (0-511)
    pub start_channel: u16,
    pub display_name: String,
    #[serde(default)]
    pub control_values: ControlValues,
    /// Source device whose values are copied onto this one
    #[serde(default)]
    pub linked_to_device_id: Option<DeviceId>,
    /// Controls copied from the linked device; all shared controls when `None`
    #[serde(default)]
    pub synced_control_ids: Option<Vec<String>>,
    /// Mirror the pan axis of pad controls copied from the linked device
    #[serde(default)]
    pub mirror_pan: bool,
    #[serde(default)]
    pub order: u32,
}

impl Device {
    /// Create a device with every control at its default value
    pub fn new(device_type: &DeviceType, display_name: impl Into<String>, start_channel: u16) -> Self {
        Self {
            id: DeviceId::new(),
            device_type_key: device_type.key().to_string(),
            start_channel,
            display_name: display_name.into(),
            control_values: dmx::create_default_control_values(device_type),
            linked_to_device_id: None,
            synced_control_ids: None,
            mirror_pan: false,
            order: 0,
        }
    }

    /// Channels occupied in the universe (end exclusive)
    pub fn channel_range(&self, device_type: &DeviceType) -> Range<usize> {
        let start = self.start_channel as usize;
        start..start + device_type.total_channels()
    }
}
