//! Input devices (MIDI controllers, gamepads, ...) as seen by triggers
//!
//! Discovery and transport of input devices live outside the core. They
//! register what they find here, and push live values into the renderer
//! under the names produced by [`input_value_property`] and
//! [`input_state_attribute`].

use std::collections::BTreeMap;

use crate::control::{StyleDescriptor, StyleUnit};
use crate::style::slugify;

/// State attribute value while a button is held
pub const STATE_PRESSED: &str = "pressed";
/// State attribute value after a button is let go
pub const STATE_RELEASED: &str = "released";

/// Root custom property carrying an input control's value
pub fn input_value_property(device_id: &str, control_id: &str, component: Option<&str>) -> String {
    let mut property = format!("--input-{}-{}", slugify(device_id), slugify(control_id));
    if let Some(component) = component {
        property.push('-');
        property.push_str(&slugify(component));
    }
    property
}

/// Root attribute carrying an input control's discrete state
pub fn input_state_attribute(device_id: &str, control_id: &str) -> String {
    format!("data-input-{}-{}", slugify(device_id), slugify(control_id))
}

/// Lookup of input controls by device and control id
pub trait InputCatalog {
    fn control(&self, device_id: &str, control_id: &str) -> Option<&InputControl>;

    /// Whether the input control exists
    fn has_control(&self, device_id: &str, control_id: &str) -> bool {
        self.control(device_id, control_id).is_some()
    }
}

/// A control on an input device
#[derive(Debug, Clone, PartialEq)]
pub struct InputControl {
    pub id: String,
    pub display_name: String,
    /// One descriptor per component
    pub components: Vec<StyleDescriptor>,
}

impl InputControl {
    /// Continuous control with a single component
    pub fn fader(id: impl Into<String>, display_name: impl Into<String>, max: f64) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            components: vec![StyleDescriptor::scalar(
                "value",
                "",
                (0.0, max),
                StyleUnit::Number,
            )],
        }
    }

    /// Two-axis stick, each axis -1.0..1.0
    pub fn stick(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            components: ["x", "y"]
                .iter()
                .map(|axis| StyleDescriptor::scalar(*axis, "", (-1.0, 1.0), StyleUnit::Number))
                .collect(),
        }
    }

    /// Momentary button, 0.0 released and 1.0 pressed
    pub fn button(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::fader(id, display_name, 1.0)
    }

    pub fn component(&self, component: Option<&str>) -> Option<&StyleDescriptor> {
        match component {
            Some(id) => self.components.iter().find(|d| d.id == id),
            None => self.components.first(),
        }
    }

    /// Descriptor of a component plus the suffix of its value property
    ///
    /// Single-component controls expose their value without a suffix;
    /// multi-component controls expose one property per component.
    pub fn resolve(&self, component: Option<&str>) -> Option<(&StyleDescriptor, Option<&str>)> {
        let descriptor = self.component(component)?;
        let suffix = (self.components.len() > 1).then_some(descriptor.id.as_str());
        Some((descriptor, suffix))
    }
}

/// A connected input device
#[derive(Debug, Clone, PartialEq)]
pub struct InputDevice {
    pub id: String,
    pub display_name: String,
    pub controls: Vec<InputControl>,
}

impl InputDevice {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            controls: Vec::new(),
        }
    }

    pub fn with_control(mut self, control: InputControl) -> Self {
        self.controls.push(control);
        self
    }

    pub fn control(&self, id: &str) -> Option<&InputControl> {
        self.controls.iter().find(|c| c.id == id)
    }
}

/// Input devices currently known, by id
#[derive(Debug, Clone, Default)]
pub struct InputRegistry {
    devices: BTreeMap<String, InputDevice>,
}

impl InputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a device
    pub fn register(&mut self, device: InputDevice) {
        tracing::info!("Input device registered: {}", device.display_name);
        self.devices.insert(device.id.clone(), device);
    }

    pub fn unregister(&mut self, id: &str) -> Option<InputDevice> {
        self.devices.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&InputDevice> {
        self.devices.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputDevice> {
        self.devices.values()
    }
}

impl InputCatalog for InputRegistry {
    fn control(&self, device_id: &str, control_id: &str) -> Option<&InputControl> {
        self.get(device_id)?.control(control_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_names() {
        assert_eq!(
            input_value_property("APC Mini", "Fader 1", None),
            "--input-apc-mini-fader-1"
        );
        assert_eq!(
            input_value_property("pad", "stick", Some("x")),
            "--input-pad-stick-x"
        );
        assert_eq!(input_state_attribute("pad", "A"), "data-input-pad-a");
    }

    #[test]
    fn test_catalog_lookup() {
        let mut inputs = InputRegistry::new();
        inputs.register(
            InputDevice::new("pad", "Gamepad")
                .with_control(InputControl::stick("stick", "Left Stick"))
                .with_control(InputControl::button("a", "A")),
        );

        let stick = inputs.control("pad", "stick").unwrap();
        assert_eq!(stick.component(None).unwrap().id, "x");
        assert_eq!(stick.component(Some("y")).unwrap().domain_min, -1.0);
        assert!(stick.component(Some("z")).is_none());
        assert_eq!(stick.resolve(Some("y")).unwrap().1, Some("y"));

        let button = inputs.control("pad", "a").unwrap();
        assert_eq!(button.resolve(None).unwrap().1, None);
        assert!(inputs.has_control("pad", "a"));
        assert!(!inputs.has_control("nope", "a"));
    }
}
