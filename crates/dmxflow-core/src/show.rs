//! Show state: every entity plus the style document compiled from them
//!
//! All edits go through [`Show`]. Each successful edit regenerates the style
//! document before returning and bumps [`Show::revision`], so a renderer
//! polling the revision picks the change up on its next tick.

use crate::animation::{Animation, AnimationCollection};
use crate::control::{ControlValue, ControlValues};
use crate::device::{Device, DeviceId};
use crate::dmx::DMX_UNIVERSE_SIZE;
use crate::error::{CoreError, Result};
use crate::input::{InputDevice, InputRegistry};
use crate::library::{DeviceLibrary, DeviceUpdate, LinkSettings};
use crate::style::StyleDocument;
use crate::trigger::{Trigger, TriggerCollection, TriggerId};

#[derive(Debug, Clone, Default)]
pub struct Show {
    devices: DeviceLibrary,
    animations: AnimationCollection,
    triggers: TriggerCollection,
    inputs: InputRegistry,
    document: StyleDocument,
    revision: u64,
}

impl Show {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a show from stored entities
    ///
    /// Fails when a device starts outside the universe.
    pub fn from_parts(
        devices: Vec<Device>,
        animations: AnimationCollection,
        triggers: TriggerCollection,
    ) -> Result<Self> {
        if let Some(device) = devices
            .iter()
            .find(|d| usize::from(d.start_channel) >= DMX_UNIVERSE_SIZE)
        {
            return Err(CoreError::StartChannel(device.start_channel));
        }
        let mut show = Self {
            devices: DeviceLibrary::from_devices(devices),
            animations,
            triggers,
            ..Self::default()
        };
        show.commit();
        Ok(show)
    }

    pub fn devices(&self) -> &DeviceLibrary {
        &self.devices
    }

    pub fn animations(&self) -> &AnimationCollection {
        &self.animations
    }

    pub fn triggers(&self) -> &TriggerCollection {
        &self.triggers
    }

    pub fn inputs(&self) -> &InputRegistry {
        &self.inputs
    }

    /// The compiled style document
    pub fn document(&self) -> &StyleDocument {
        &self.document
    }

    /// Incremented on every regeneration of the document
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn commit(&mut self) {
        self.document = StyleDocument::generate(
            self.devices.devices(),
            &self.animations,
            &self.triggers,
            &self.inputs,
        );
        self.revision += 1;
        tracing::trace!("Style document regenerated (revision {})", self.revision);
    }

    pub fn create_device(
        &mut self,
        device_type_key: &str,
        display_name: impl Into<String>,
    ) -> Result<DeviceId> {
        let id = self.devices.create_device(device_type_key, display_name)?;
        self.commit();
        Ok(id)
    }

    pub fn remove_device(&mut self, id: &DeviceId) -> Option<Device> {
        let removed = self.devices.remove_device(id)?;
        self.commit();
        Some(removed)
    }

    pub fn set_control_value(
        &mut self,
        id: &DeviceId,
        control_id: &str,
        value: Option<ControlValue>,
    ) -> Result<Vec<DeviceId>> {
        let written = self.devices.set_control_value(id, control_id, value)?;
        self.commit();
        Ok(written)
    }

    pub fn set_control_values(
        &mut self,
        id: &DeviceId,
        values: ControlValues,
    ) -> Result<Vec<DeviceId>> {
        let written = self.devices.set_control_values(id, values)?;
        self.commit();
        Ok(written)
    }

    pub fn link_device(&mut self, id: &DeviceId, link: LinkSettings) -> Result<Vec<DeviceId>> {
        let written = self.devices.link_device(id, link)?;
        self.commit();
        Ok(written)
    }

    pub fn update_device(&mut self, id: &DeviceId, update: DeviceUpdate) -> Result<()> {
        self.devices.update_metadata(id, update)?;
        self.commit();
        Ok(())
    }

    pub fn add_animation(&mut self, animation: Animation) -> Result<()> {
        self.animations.insert(animation)?;
        self.commit();
        Ok(())
    }

    /// Replace an animation by name, or add it
    pub fn put_animation(&mut self, animation: Animation) {
        self.animations.upsert(animation);
        self.commit();
    }

    pub fn remove_animation(&mut self, name: &str) -> Option<Animation> {
        let removed = self.animations.remove(name)?;
        self.commit();
        Some(removed)
    }

    pub fn add_trigger(&mut self, trigger: Trigger) -> Result<TriggerId> {
        let id = trigger.id;
        self.triggers.insert(trigger)?;
        self.commit();
        Ok(id)
    }

    /// Replace a trigger by id, or add it
    pub fn put_trigger(&mut self, trigger: Trigger) {
        self.triggers.upsert(trigger);
        self.commit();
    }

    pub fn remove_trigger(&mut self, id: &TriggerId) -> Option<Trigger> {
        let removed = self.triggers.remove(id)?;
        self.commit();
        Some(removed)
    }

    pub fn set_trigger_enabled(&mut self, id: &TriggerId, enabled: bool) -> bool {
        let found = self.triggers.set_enabled(id, enabled);
        if found {
            self.commit();
        }
        found
    }

    /// Input devices change which triggers compile
    pub fn register_input(&mut self, device: InputDevice) {
        self.inputs.register(device);
        self.commit();
    }

    pub fn unregister_input(&mut self, id: &str) -> Option<InputDevice> {
        let removed = self.inputs.unregister(id)?;
        self.commit();
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Keyframe;
    use crate::input::InputControl;
    use crate::trigger::{
        AnimationRef, InputCondition, TriggerAction, TriggerInput, TriggerKind, TriggerOutput,
    };

    #[test]
    fn test_every_edit_regenerates() {
        let mut show = Show::new();
        let id = show.create_device("dimmer", "Front").unwrap();
        let rev = show.revision();
        assert!(show.document().to_string().contains("--dimmer: 0.0%"));

        show.set_control_value(&id, "dimmer", Some(ControlValue::Level(255)))
            .unwrap();
        assert!(show.revision() > rev);
        assert!(show.document().to_string().contains("--dimmer: 100.0%"));
    }

    #[test]
    fn test_failed_edit_keeps_revision() {
        let mut show = Show::new();
        let id = show.create_device("dimmer", "Front").unwrap();
        let rev = show.revision();
        assert!(show
            .set_control_value(&id, "color", Some(ControlValue::Level(1)))
            .is_err());
        assert_eq!(show.revision(), rev);
    }

    #[test]
    fn test_trigger_compiles_once_input_is_known() {
        let mut show = Show::new();
        let id = show.create_device("dimmer", "Front").unwrap();
        let mut anim = Animation::new("blink", "Blink");
        let mut on = ControlValues::new();
        on.insert("dimmer".into(), ControlValue::Level(255));
        anim.add_keyframe(Keyframe::new(0.0, on)).unwrap();
        show.add_animation(anim).unwrap();

        show.add_trigger(Trigger::new(
            TriggerKind::Action,
            TriggerInput {
                device_id: "midi".into(),
                control_id: "pad".into(),
                condition: InputCondition::default(),
            },
            TriggerOutput { device_id: id },
            TriggerAction::Animation(AnimationRef {
                name: "blink".into(),
                duration_ms: 250,
                iterations: None,
            }),
        ))
        .unwrap();
        assert!(show.document().trigger_rules.is_empty());

        show.register_input(
            InputDevice::new("midi", "MIDI").with_control(InputControl::button("pad", "Pad")),
        );
        assert_eq!(show.document().trigger_rules.len(), 1);

        show.remove_animation("blink");
        assert!(show.document().trigger_rules.is_empty());
    }

    #[test]
    fn test_from_parts_rejects_start_outside_universe() {
        let device_type = crate::registry::device_types().require("dimmer").unwrap();
        let inside = Device::new(device_type, "Last", 511);
        let outside = Device::new(device_type, "Beyond", 512);

        let show = Show::from_parts(
            vec![inside],
            AnimationCollection::default(),
            TriggerCollection::default(),
        )
        .unwrap();
        assert_eq!(show.devices().len(), 1);
        assert!(show.document().element_id(&show.devices().devices()[0].id).is_some());

        let result = Show::from_parts(
            vec![outside],
            AnimationCollection::default(),
            TriggerCollection::default(),
        );
        assert!(matches!(result, Err(CoreError::StartChannel(512))));
    }
}
