//! Copying control values along device links
//!
//! A device linked to a source follows it: whenever the source's values
//! change, the shared controls are copied onto the follower. Followers may be
//! sources themselves, so a write cascades down the link chain. Each device
//! is written at most once per propagation, which also ends link cycles.

use std::collections::{HashSet, VecDeque};

use crate::control::ControlValue;
use crate::device::{Device, DeviceId, DeviceType};
use crate::registry::DeviceTypeRegistry;

/// Copy `source_id`'s values onto every device following it, transitively
///
/// Returns the ids of the devices that were written, in visiting order.
pub fn propagate(
    devices: &mut [Device],
    source_id: DeviceId,
    device_types: &DeviceTypeRegistry,
) -> Vec<DeviceId> {
    let mut visited = HashSet::from([source_id]);
    let mut queue = VecDeque::from([source_id]);
    let mut written = Vec::new();

    while let Some(current) = queue.pop_front() {
        let Some(source) = devices.iter().find(|d| d.id == current).cloned() else {
            continue;
        };
        let Some(source_type) = device_types.get(&source.device_type_key) else {
            continue;
        };

        for follower in devices.iter_mut() {
            if follower.linked_to_device_id != Some(current) || visited.contains(&follower.id) {
                continue;
            }
            let Some(follower_type) = device_types.get(&follower.device_type_key) else {
                tracing::debug!("Linked device {} has an unknown type", follower.id);
                continue;
            };

            copy_linked_values(&source, source_type, follower, follower_type);
            visited.insert(follower.id);
            queue.push_back(follower.id);
            written.push(follower.id);
        }
    }

    if !written.is_empty() {
        tracing::trace!("Propagated {} to {} device(s)", source_id, written.len());
    }
    written
}

/// Copy the shared controls of `source` onto `target`
///
/// Shared controls are the target's synced ids when set, otherwise every
/// control both device types have. A control inactive on the source is made
/// inactive on the target.
pub fn copy_linked_values(
    source: &Device,
    source_type: &DeviceType,
    target: &mut Device,
    target_type: &DeviceType,
) {
    let shared: Vec<String> = match &target.synced_control_ids {
        Some(ids) => ids
            .iter()
            .filter(|id| source_type.has_control(id) && target_type.has_control(id))
            .cloned()
            .collect(),
        None => source_type
            .control_ids()
            .filter(|id| target_type.has_control(id))
            .map(String::from)
            .collect(),
    };

    for id in shared {
        match source.control_values.get(&id) {
            Some(value) => {
                let is_pad = target_type
                    .control(&id)
                    .is_some_and(|binding| binding.control.is_pad());
                let value = match value {
                    ControlValue::PanTilt(position) if is_pad && target.mirror_pan => {
                        ControlValue::PanTilt(position.mirrored())
                    }
                    other => *other,
                };
                target.control_values.insert(id, value);
            }
            None => {
                target.control_values.remove(&id);
            }
        }
    }
}
