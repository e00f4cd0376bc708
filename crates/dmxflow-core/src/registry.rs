//! Process-wide control type and device type tables
//!
//! Both tables are built once and never change afterwards. Building them
//! validates every definition, so a broken layout stops the process at
//! startup instead of surfacing while a show is running. Call [`init`] early
//! to get that failure as an error rather than a panic on first lookup.

use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::control::{
    ControlKind, ControlType, PadSpec, PanTilt, Rgb, SliderSpec, StyleUnit, ToggleSpec,
};
use crate::device::{ControlBinding, DeviceType};
use crate::error::{CoreError, Result};

static CONTROL_TYPES: OnceCell<ControlTypeRegistry> = OnceCell::new();
static DEVICE_TYPES: OnceCell<DeviceTypeRegistry> = OnceCell::new();

/// Build and validate the built-in tables
pub fn init() -> Result<()> {
    let controls = CONTROL_TYPES.get_or_try_init(ControlTypeRegistry::builtin)?;
    let devices = DEVICE_TYPES.get_or_try_init(|| DeviceTypeRegistry::builtin(controls))?;
    tracing::info!(
        "Registries ready: {} control types, {} device types",
        controls.len(),
        devices.len()
    );
    Ok(())
}

/// Built-in control types
pub fn control_types() -> &'static ControlTypeRegistry {
    CONTROL_TYPES.get_or_init(|| {
        ControlTypeRegistry::builtin().expect("built-in control types must validate")
    })
}

/// Built-in device types
pub fn device_types() -> &'static DeviceTypeRegistry {
    DEVICE_TYPES.get_or_init(|| {
        DeviceTypeRegistry::builtin(control_types()).expect("built-in device types must validate")
    })
}

/// Look up a built-in device type
pub fn device_type(key: &str) -> Option<&'static DeviceType> {
    device_types().get(key)
}

/// Look up a built-in control type
pub fn control_type(id: &str) -> Option<&'static Arc<ControlType>> {
    control_types().get(id)
}

/// Control types by id
#[derive(Debug, Default)]
pub struct ControlTypeRegistry {
    types: BTreeMap<String, Arc<ControlType>>,
}

impl ControlTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a control type; ids must be unique
    pub fn register(&mut self, control: ControlType) -> Result<Arc<ControlType>> {
        if self.types.contains_key(control.id()) {
            return Err(CoreError::Duplicate {
                kind: "control type",
                id: control.id().to_string(),
            });
        }
        let control = Arc::new(control);
        self.types
            .insert(control.id().to_string(), Arc::clone(&control));
        Ok(control)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<ControlType>> {
        self.types.get(id)
    }

    /// Like [`get`](Self::get) but reports unknown ids
    pub fn require(&self, id: &str) -> Result<Arc<ControlType>> {
        self.get(id)
            .cloned()
            .ok_or_else(|| CoreError::UnknownControlType(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ControlType>> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// The built-in control set
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();

        registry.register(ControlType::new(
            "color",
            "Color",
            ControlKind::Color { default: Rgb::BLACK },
        )?)?;
        registry.register(slider("dimmer", "Dimmer", (0.0, 100.0), StyleUnit::Percent)?)?;
        registry.register(slider("white", "White", (0.0, 100.0), StyleUnit::Percent)?)?;
        registry.register(slider("speed", "Speed", (0.0, 1.0), StyleUnit::Number)?)?;
        registry.register(slider("rotation", "Rotation", (0.0, 360.0), StyleUnit::Degrees)?)?;
        registry.register(ControlType::new(
            "strobe",
            "Strobe",
            ControlKind::Toggle(ToggleSpec {
                property: "--strobe".to_string(),
                on_value: 255,
                off_value: 0,
                on_token: "on".to_string(),
                off_token: "off".to_string(),
                default: false,
            }),
        )?)?;
        registry.register(ControlType::new(
            "pantilt",
            "Pan/Tilt",
            ControlKind::Pad2(pad_spec()),
        )?)?;
        registry.register(ControlType::new(
            "pantilt16",
            "Pan/Tilt (16 bit)",
            ControlKind::Pad2Fine(pad_spec()),
        )?)?;

        Ok(registry)
    }
}

fn slider(id: &str, name: &str, domain: (f64, f64), unit: StyleUnit) -> Result<ControlType> {
    ControlType::new(
        id,
        name,
        ControlKind::Slider(SliderSpec {
            property: format!("--{}", id),
            domain,
            unit,
            default: 0,
        }),
    )
}

fn pad_spec() -> PadSpec {
    PadSpec {
        pan_property: "--pan".to_string(),
        tilt_property: "--tilt".to_string(),
        domain: (-50.0, 50.0),
        unit: StyleUnit::Percent,
        default: PanTilt::CENTER,
    }
}

/// Device types by key
#[derive(Debug, Default)]
pub struct DeviceTypeRegistry {
    types: BTreeMap<String, DeviceType>,
}

impl DeviceTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device type; keys must be unique
    pub fn register(&mut self, device_type: DeviceType) -> Result<()> {
        if self.types.contains_key(device_type.key()) {
            return Err(CoreError::Duplicate {
                kind: "device type",
                id: device_type.key().to_string(),
            });
        }
        self.types
            .insert(device_type.key().to_string(), device_type);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&DeviceType> {
        self.types.get(key)
    }

    pub fn require(&self, key: &str) -> Result<&DeviceType> {
        self.get(key)
            .ok_or_else(|| CoreError::UnknownDeviceType(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceType> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// The built-in fixture library
    pub fn builtin(controls: &ControlTypeRegistry) -> Result<Self> {
        let bind = |id: &str, start: usize| -> Result<ControlBinding> {
            Ok(ControlBinding::new(controls.require(id)?, start))
        };

        let mut registry = Self::new();

        registry.register(DeviceType::new(
            "dimmer",
            "Generic Dimmer",
            1,
            vec![0],
            vec![bind("dimmer", 0)?],
        )?)?;

        registry.register(DeviceType::new(
            "rgb-par",
            "RGB Par",
            3,
            vec![0; 3],
            vec![bind("color", 0)?],
        )?)?;

        registry.register(DeviceType::new(
            "rgbw-par",
            "RGBW Par",
            4,
            vec![0; 4],
            vec![bind("color", 0)?, bind("white", 3)?],
        )?)?;

        registry.register(DeviceType::new(
            "rgbd-par",
            "RGB Par with Dimmer and Strobe",
            5,
            vec![0; 5],
            vec![bind("dimmer", 0)?, bind("color", 1)?, bind("strobe", 4)?],
        )?)?;

        // Channel 9 is the lamp control and has no semantic control bound.
        registry.register(DeviceType::new(
            "moving-head",
            "Moving Head",
            10,
            vec![128, 128, 0, 0, 0, 0, 0, 0, 0, 255],
            vec![
                bind("pantilt", 0)?,
                bind("speed", 2)?,
                bind("dimmer", 3)?,
                bind("color", 4)?,
                bind("strobe", 7)?,
                bind("rotation", 8)?,
            ],
        )?)?;

        registry.register(DeviceType::new(
            "moving-head-16",
            "Moving Head (16 bit)",
            10,
            vec![128, 128, 128, 128, 0, 0, 0, 0, 0, 0],
            vec![
                bind("pantilt16", 0)?,
                bind("speed", 4)?,
                bind("dimmer", 5)?,
                bind("color", 6)?,
                bind("strobe", 9)?,
            ],
        )?)?;

        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_validate() {
        assert!(init().is_ok());
        assert!(control_types().len() >= 8);
        assert!(device_type("rgb-par").is_some());
        assert!(device_type("nope").is_none());
    }

    #[test]
    fn test_duplicate_control_type() {
        let mut registry = ControlTypeRegistry::builtin().unwrap();
        let again = ControlType::new("color", "Color", ControlKind::Color { default: Rgb::BLACK })
            .unwrap();
        assert!(matches!(
            registry.register(again),
            Err(CoreError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_unknown_control_in_device_type() {
        let controls = ControlTypeRegistry::new();
        assert!(matches!(
            DeviceTypeRegistry::builtin(&controls),
            Err(CoreError::UnknownControlType(_))
        ));
    }

    #[test]
    fn test_moving_head_layout() {
        let head = device_type("moving-head").unwrap();
        assert_eq!(head.total_channels(), 10);
        assert_eq!(head.control("color").unwrap().start_channel, 4);
        assert_eq!(head.default_channel_bytes()[9], 255);
    }
}
