//! Conversion between control value records and DMX channel bytes
//!
//! Per device, [`control_values_to_dmx`] starts from the device type's default
//! bytes and overwrites the channels of every present control. Absent
//! controls keep their defaults; a control is never "zeroed" by being absent.

use std::fmt;

use crate::control::ControlValues;
use crate::device::{Device, DeviceType};
use crate::registry::DeviceTypeRegistry;

/// Channels in one DMX512 universe
pub const DMX_UNIVERSE_SIZE: usize = 512;

/// Encode a device's control values into its channel bytes
///
/// Values that do not fit their control are skipped and leave the default
/// bytes in place.
pub fn control_values_to_dmx(device_type: &DeviceType, values: &ControlValues) -> Vec<u8> {
    let mut bytes = device_type.default_channel_bytes().to_vec();

    for binding in device_type.controls() {
        let Some(value) = values.get(binding.id()) else {
            continue;
        };
        match binding.control.value_to_channels(value) {
            Ok(channels) => {
                let range = binding.channel_range();
                bytes[range].copy_from_slice(&channels);
            }
            Err(e) => {
                tracing::debug!("Skipping control on '{}': {}", device_type.key(), e);
            }
        }
    }

    bytes
}

/// Decode channel bytes into a value for every control of the device type
///
/// A short byte slice decodes the controls it fully covers.
pub fn dmx_to_control_values(device_type: &DeviceType, bytes: &[u8]) -> ControlValues {
    let mut values = ControlValues::new();

    for binding in device_type.controls() {
        let range = binding.channel_range();
        let Some(slice) = bytes.get(range) else {
            tracing::debug!(
                "Channel data too short for '{}' on '{}'",
                binding.id(),
                device_type.key()
            );
            continue;
        };
        match binding.control.channels_to_value(slice) {
            Ok(value) => {
                values.insert(binding.id().to_string(), value);
            }
            Err(e) => tracing::debug!("Cannot decode '{}': {}", binding.id(), e),
        }
    }

    values
}

/// Default value of every control of the device type
pub fn create_default_control_values(device_type: &DeviceType) -> ControlValues {
    device_type
        .controls()
        .iter()
        .map(|binding| (binding.id().to_string(), binding.control.default_value()))
        .collect()
}

/// One universe worth of channel bytes, 0-indexed
#[derive(Clone, PartialEq, Eq)]
pub struct DmxFrame {
    channels: [u8; DMX_UNIVERSE_SIZE],
}

impl DmxFrame {
    /// All channels at zero
    pub fn new() -> Self {
        Self {
            channels: [0; DMX_UNIVERSE_SIZE],
        }
    }

    pub fn as_bytes(&self) -> &[u8; DMX_UNIVERSE_SIZE] {
        &self.channels
    }

    pub fn get(&self, channel: usize) -> Option<u8> {
        self.channels.get(channel).copied()
    }

    pub fn set(&mut self, channel: usize, value: u8) {
        if let Some(slot) = self.channels.get_mut(channel) {
            *slot = value;
        }
    }

    /// Copy bytes starting at `start`; bytes past the end of the universe
    /// are dropped. Returns how many bytes were written.
    pub fn write(&mut self, start: usize, bytes: &[u8]) -> usize {
        if start >= DMX_UNIVERSE_SIZE {
            return 0;
        }
        let len = bytes.len().min(DMX_UNIVERSE_SIZE - start);
        self.channels[start..start + len].copy_from_slice(&bytes[..len]);
        len
    }

    /// Encode one device's values at its start channel
    pub fn write_device(&mut self, device_type: &DeviceType, start: usize, values: &ControlValues) {
        let bytes = control_values_to_dmx(device_type, values);
        let written = self.write(start, &bytes);
        if written < bytes.len() {
            tracing::debug!(
                "Device '{}' at {} truncated to {} of {} channels",
                device_type.key(),
                start,
                written,
                bytes.len()
            );
        }
    }
}

impl Default for DmxFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DmxFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self
            .channels
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        f.debug_struct("DmxFrame")
            .field("channels", &&self.channels[..used])
            .finish()
    }
}

/// Build the universe from stored device values
///
/// Later devices overwrite earlier ones where their channels overlap. Devices
/// of unknown type are skipped.
pub fn compose_frame<'a>(
    devices: impl IntoIterator<Item = &'a Device>,
    device_types: &DeviceTypeRegistry,
) -> DmxFrame {
    let mut frame = DmxFrame::new();
    for device in devices {
        match device_types.get(&device.device_type_key) {
            Some(device_type) => frame.write_device(
                device_type,
                device.start_channel as usize,
                &device.control_values,
            ),
            None => tracing::debug!(
                "Device {} has unknown type '{}'",
                device.id,
                device.device_type_key
            ),
        }
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{ControlValue, PanTilt, Rgb};
    use crate::registry::{device_type, device_types};

    #[test]
    fn test_absent_controls_keep_defaults() {
        let head = device_type("moving-head").unwrap();
        let mut values = ControlValues::new();
        values.insert("dimmer".to_string(), ControlValue::Level(200));

        let bytes = control_values_to_dmx(head, &values);
        assert_eq!(bytes, vec![128, 128, 0, 200, 0, 0, 0, 0, 0, 255]);
    }

    #[test]
    fn test_mismatched_value_is_skipped() {
        let par = device_type("rgb-par").unwrap();
        let mut values = ControlValues::new();
        values.insert("color".to_string(), ControlValue::Level(9));
        assert_eq!(control_values_to_dmx(par, &values), vec![0, 0, 0]);
    }

    #[test]
    fn test_decode_all_controls() {
        let par = device_type("rgbd-par").unwrap();
        let values = dmx_to_control_values(par, &[10, 1, 2, 3, 250]);
        assert_eq!(values["dimmer"], ControlValue::Level(10));
        assert_eq!(values["color"], ControlValue::Color(Rgb::new(1, 2, 3)));
        assert_eq!(values["strobe"], ControlValue::Switch(true));
    }

    #[test]
    fn test_defaults_round_trip() {
        for device_type in device_types().iter() {
            let defaults = create_default_control_values(device_type);
            let bytes = control_values_to_dmx(device_type, &defaults);
            assert_eq!(dmx_to_control_values(device_type, &bytes), defaults);
        }
    }

    #[test]
    fn test_default_pad_is_centered() {
        let head = device_type("moving-head").unwrap();
        let defaults = create_default_control_values(head);
        assert_eq!(defaults["pantilt"], ControlValue::PanTilt(PanTilt::CENTER));
    }

    #[test]
    fn test_frame_write_truncates() {
        let mut frame = DmxFrame::new();
        assert_eq!(frame.write(510, &[1, 2, 3]), 2);
        assert_eq!(frame.get(510), Some(1));
        assert_eq!(frame.get(511), Some(2));
        assert_eq!(frame.write(600, &[1]), 0);
    }

    #[test]
    fn test_compose_frame_places_devices() {
        let par = device_type("rgb-par").unwrap();
        let mut first = Device::new(par, "Left", 0);
        first
            .control_values
            .insert("color".to_string(), ControlValue::Color(Rgb::new(9, 8, 7)));
        let mut second = Device::new(par, "Right", 3);
        second
            .control_values
            .insert("color".to_string(), ControlValue::Color(Rgb::new(1, 2, 3)));

        let frame = compose_frame([&first, &second], device_types());
        assert_eq!(&frame.as_bytes()[..6], &[9, 8, 7, 1, 2, 3]);
        assert_eq!(frame.get(6), Some(0));
    }
}
