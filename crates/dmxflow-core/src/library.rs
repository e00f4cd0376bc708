//! The device collection
//!
//! [`DeviceLibrary`] is the single owner of every patched device. All value
//! writes go through it so that linked devices are updated in the same call.

use serde::{Deserialize, Serialize};

use crate::control::{ControlValue, ControlValues};
use crate::device::{Device, DeviceId};
use crate::dmx::DMX_UNIVERSE_SIZE;
use crate::error::{CoreError, Result};
use crate::propagation::propagate;
use crate::registry::device_types;

/// Metadata changes for [`DeviceLibrary::update_metadata`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceUpdate {
    pub display_name: Option<String>,
    pub start_channel: Option<u16>,
    pub order: Option<u32>,
}

/// Link settings of a follower device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkSettings {
    /// Device to follow; `None` unlinks
    pub source: Option<DeviceId>,
    pub synced_control_ids: Option<Vec<String>>,
    pub mirror_pan: bool,
}

/// Patched devices, kept sorted by display order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceLibrary {
    devices: Vec<Device>,
}

impl DeviceLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored devices, restoring display order
    pub fn from_devices(devices: Vec<Device>) -> Self {
        let mut library = Self { devices };
        library.sort();
        library
    }

    /// Devices in display order
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, id: &DeviceId) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == *id)
    }

    fn get_mut(&mut self, id: &DeviceId) -> Result<&mut Device> {
        self.devices
            .iter_mut()
            .find(|d| d.id == *id)
            .ok_or_else(|| CoreError::DeviceNotFound(id.to_string()))
    }

    /// Create a device with default values after the last occupied channel
    pub fn create_device(
        &mut self,
        device_type_key: &str,
        display_name: impl Into<String>,
    ) -> Result<DeviceId> {
        let device_type = device_types().require(device_type_key)?;
        let start = self.next_start_channel(device_type.total_channels());

        let mut device = Device::new(device_type, display_name, start);
        device.order = self.next_order();
        let id = device.id;

        tracing::info!(
            "Created device '{}' ({}) at channel {}",
            device.display_name,
            device_type_key,
            start
        );
        self.devices.push(device);
        Ok(id)
    }

    /// Add an existing device as is
    pub fn insert(&mut self, device: Device) -> Result<()> {
        if self.get(&device.id).is_some() {
            return Err(CoreError::Duplicate {
                kind: "device",
                id: device.id.to_string(),
            });
        }
        self.devices.push(device);
        self.sort();
        Ok(())
    }

    /// First channel after the highest occupied one
    ///
    /// Wraps to 0 when a device of `channel_count` channels would not fit
    /// before the end of the universe. Wrapping does not look for a free
    /// gap, so the new device may overlap existing ones.
    pub fn next_start_channel(&self, channel_count: usize) -> u16 {
        let registry = device_types();
        let candidate = self
            .devices
            .iter()
            .map(|device| {
                let total = registry
                    .get(&device.device_type_key)
                    .map_or(0, |t| t.total_channels());
                device.start_channel as usize + total
            })
            .max()
            .unwrap_or(0);

        if candidate + channel_count > DMX_UNIVERSE_SIZE {
            0
        } else {
            candidate as u16
        }
    }

    fn next_order(&self) -> u32 {
        self.devices
            .iter()
            .map(|d| d.order + 1)
            .max()
            .unwrap_or(0)
    }

    fn sort(&mut self) {
        self.devices.sort_by_key(|d| d.order);
    }

    /// Remove a device and unlink every device following it
    pub fn remove_device(&mut self, id: &DeviceId) -> Option<Device> {
        let index = self.devices.iter().position(|d| d.id == *id)?;
        let removed = self.devices.remove(index);
        for device in &mut self.devices {
            if device.linked_to_device_id == Some(*id) {
                device.linked_to_device_id = None;
            }
        }
        tracing::info!("Removed device '{}'", removed.display_name);
        Some(removed)
    }

    /// Set or clear (`None`) one control, then update linked devices
    ///
    /// Returns the ids of the linked devices that were written.
    pub fn set_control_value(
        &mut self,
        id: &DeviceId,
        control_id: &str,
        value: Option<ControlValue>,
    ) -> Result<Vec<DeviceId>> {
        let device = self.get_mut(id)?;
        let device_type = device_types().require(&device.device_type_key)?;
        let Some(binding) = device_type.control(control_id) else {
            return Err(CoreError::ControlNotOnDevice {
                device_type: device_type.key().to_string(),
                control: control_id.to_string(),
            });
        };

        match value {
            Some(value) => {
                binding.control.value_to_channels(&value)?;
                device.control_values.insert(control_id.to_string(), value);
            }
            None => {
                device.control_values.remove(control_id);
            }
        }

        Ok(propagate(&mut self.devices, *id, device_types()))
    }

    /// Replace the whole value record, then update linked devices
    ///
    /// Values for controls the device does not have, or of the wrong shape,
    /// are dropped.
    pub fn set_control_values(
        &mut self,
        id: &DeviceId,
        values: ControlValues,
    ) -> Result<Vec<DeviceId>> {
        let device = self.get_mut(id)?;
        let device_type = device_types().require(&device.device_type_key)?;

        device.control_values = values
            .into_iter()
            .filter(|(control_id, value)| {
                let fits = device_type
                    .control(control_id)
                    .is_some_and(|b| b.control.value_to_channels(value).is_ok());
                if !fits {
                    tracing::debug!("Dropping value for '{}' on {}", control_id, device_type.key());
                }
                fits
            })
            .collect();

        Ok(propagate(&mut self.devices, *id, device_types()))
    }

    /// Change what `id` follows and copy the source's values right away
    pub fn link_device(&mut self, id: &DeviceId, link: LinkSettings) -> Result<Vec<DeviceId>> {
        if let Some(source) = link.source {
            if source == *id {
                return Err(CoreError::SelfLink(id.to_string()));
            }
            if self.get(&source).is_none() {
                return Err(CoreError::DeviceNotFound(source.to_string()));
            }
        }

        let device = self.get_mut(id)?;
        device.linked_to_device_id = link.source;
        device.synced_control_ids = link.synced_control_ids;
        device.mirror_pan = link.mirror_pan;

        match link.source {
            Some(source) => Ok(propagate(&mut self.devices, source, device_types())),
            None => Ok(Vec::new()),
        }
    }

    /// Rename, move or reorder a device
    pub fn update_metadata(&mut self, id: &DeviceId, update: DeviceUpdate) -> Result<()> {
        if let Some(start) = update.start_channel {
            if start as usize >= DMX_UNIVERSE_SIZE {
                return Err(CoreError::StartChannel(start));
            }
        }

        let device = self.get_mut(id)?;
        if let Some(name) = update.display_name {
            device.display_name = name;
        }
        if let Some(start) = update.start_channel {
            device.start_channel = start;
        }
        if let Some(order) = update.order {
            device.order = order;
            self.sort();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::PanTilt;

    #[test]
    fn test_auto_assign_after_last_device() {
        let mut library = DeviceLibrary::new();
        let first = library.create_device("rgb-par", "One").unwrap();
        let second = library.create_device("rgb-par", "Two").unwrap();
        assert_eq!(library.get(&first).unwrap().start_channel, 0);
        assert_eq!(library.get(&second).unwrap().start_channel, 3);
    }

    #[test]
    fn test_auto_assign_wraps() {
        let mut library = DeviceLibrary::new();
        let id = library.create_device("moving-head", "Head").unwrap();
        library
            .update_metadata(
                &id,
                DeviceUpdate {
                    start_channel: Some(505),
                    ..Default::default()
                },
            )
            .unwrap();
        let next = library.create_device("rgb-par", "Par").unwrap();
        assert_eq!(library.get(&next).unwrap().start_channel, 0);
    }

    #[test]
    fn test_fits_exactly_at_end() {
        let mut library = DeviceLibrary::new();
        let id = library.create_device("moving-head", "Head").unwrap();
        library
            .update_metadata(
                &id,
                DeviceUpdate {
                    start_channel: Some(499),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(library.next_start_channel(3), 509);
        assert_eq!(library.next_start_channel(4), 0);
    }

    #[test]
    fn test_unknown_type() {
        let mut library = DeviceLibrary::new();
        assert!(matches!(
            library.create_device("laser", "Laser"),
            Err(CoreError::UnknownDeviceType(_))
        ));
    }

    #[test]
    fn test_set_value_validates_and_propagates() {
        let mut library = DeviceLibrary::new();
        let left = library.create_device("moving-head", "Left").unwrap();
        let right = library.create_device("moving-head", "Right").unwrap();
        library
            .link_device(
                &right,
                LinkSettings {
                    source: Some(left),
                    synced_control_ids: None,
                    mirror_pan: true,
                },
            )
            .unwrap();

        let written = library
            .set_control_value(
                &left,
                "pantilt",
                Some(ControlValue::PanTilt(PanTilt::new(200, 10))),
            )
            .unwrap();
        assert_eq!(written, vec![right]);
        assert_eq!(
            library.get(&right).unwrap().control_values["pantilt"],
            ControlValue::PanTilt(PanTilt::new(55, 10))
        );

        assert!(matches!(
            library.set_control_value(&left, "dimmer", Some(ControlValue::Switch(true))),
            Err(CoreError::ValueMismatch { .. })
        ));
        assert!(matches!(
            library.set_control_value(&left, "gobo", Some(ControlValue::Level(1))),
            Err(CoreError::ControlNotOnDevice { .. })
        ));
    }

    #[test]
    fn test_clear_value_deactivates() {
        let mut library = DeviceLibrary::new();
        let id = library.create_device("dimmer", "Dim").unwrap();
        library.set_control_value(&id, "dimmer", None).unwrap();
        assert!(library.get(&id).unwrap().control_values.is_empty());
    }

    #[test]
    fn test_remove_source_clears_links() {
        let mut library = DeviceLibrary::new();
        let source = library.create_device("rgb-par", "Source").unwrap();
        let follower = library.create_device("rgb-par", "Follower").unwrap();
        library
            .link_device(
                &follower,
                LinkSettings {
                    source: Some(source),
                    ..Default::default()
                },
            )
            .unwrap();

        library.remove_device(&source).unwrap();
        assert_eq!(library.get(&follower).unwrap().linked_to_device_id, None);
    }

    #[test]
    fn test_self_link_rejected() {
        let mut library = DeviceLibrary::new();
        let id = library.create_device("rgb-par", "Solo").unwrap();
        let link = LinkSettings {
            source: Some(id),
            ..Default::default()
        };
        assert!(matches!(
            library.link_device(&id, link),
            Err(CoreError::SelfLink(_))
        ));
    }

    #[test]
    fn test_reorder() {
        let mut library = DeviceLibrary::new();
        let a = library.create_device("rgb-par", "A").unwrap();
        let b = library.create_device("rgb-par", "B").unwrap();
        library
            .update_metadata(
                &a,
                DeviceUpdate {
                    order: Some(10),
                    display_name: Some("Last".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let ids: Vec<DeviceId> = library.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![b, a]);
        assert_eq!(library.get(&a).unwrap().display_name, "Last");
    }
}
