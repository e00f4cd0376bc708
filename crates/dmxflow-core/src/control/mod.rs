//! Control types
//!
//! A [`ControlType`] is a pure unit converter for one logical control of a
//! fixture. The behavior is selected by the [`ControlKind`] tag, and every
//! conversion is an exhaustive `match` over it:
//!
//! | kind        | channels | value              |
//! |-------------|----------|--------------------|
//! | color       | 3        | `[r, g, b]`        |
//! | slider      | 1        | `[v]`              |
//! | toggle      | 1        | `[on | off]`       |
//! | pad2        | 2        | `[pan, tilt]`      |
//! | pad2-16bit  | 4        | `[pan hi, pan lo, tilt hi, tilt lo]` |
//!
//! Control types are immutable and shared through the registry.

pub mod descriptor;
pub mod value;

pub use descriptor::{StyleDescriptor, StyleUnit};
pub use value::{ControlValue, ControlValues, PanTilt, Rgb};

use crate::control::value::clamp_byte;
use crate::error::{CoreError, Result};

/// Settings of a single-channel slider
#[derive(Debug, Clone, PartialEq)]
pub struct SliderSpec {
    pub property: String,
    pub domain: (f64, f64),
    pub unit: StyleUnit,
    pub default: u8,
}

/// Settings of an on/off control
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleSpec {
    pub property: String,
    pub on_value: u8,
    pub off_value: u8,
    pub on_token: String,
    pub off_token: String,
    pub default: bool,
}

/// Settings of a two-axis pad
#[derive(Debug, Clone, PartialEq)]
pub struct PadSpec {
    pub pan_property: String,
    pub tilt_property: String,
    pub domain: (f64, f64),
    pub unit: StyleUnit,
    pub default: PanTilt,
}

/// Kind of a control
#[derive(Debug, Clone, PartialEq)]
pub enum ControlKind {
    Color { default: Rgb },
    Slider(SliderSpec),
    Toggle(ToggleSpec),
    Pad2(PadSpec),
    /// Pad with 16-bit coarse/fine channels per axis
    Pad2Fine(PadSpec),
}

impl ControlKind {
    /// Stable name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            ControlKind::Color { .. } => "color",
            ControlKind::Slider(_) => "slider",
            ControlKind::Toggle(_) => "toggle",
            ControlKind::Pad2(_) => "pad2",
            ControlKind::Pad2Fine(_) => "pad2-16bit",
        }
    }
}

/// Converter for one logical control
#[derive(Debug, Clone, PartialEq)]
pub struct ControlType {
    id: String,
    display_name: String,
    kind: ControlKind,
    descriptors: Vec<StyleDescriptor>,
}

impl ControlType {
    /// Build a control type and validate its style metadata
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        kind: ControlKind,
    ) -> Result<Self> {
        let id = id.into();
        let descriptors = build_descriptors(&kind);
        for descriptor in &descriptors {
            descriptor.validate(&id)?;
        }
        Ok(Self {
            id,
            display_name: display_name.into(),
            kind,
            descriptors,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn kind(&self) -> &ControlKind {
        &self.kind
    }

    /// Whether the control is a pan/tilt pad (8 or 16 bit)
    pub fn is_pad(&self) -> bool {
        matches!(self.kind, ControlKind::Pad2(_) | ControlKind::Pad2Fine(_))
    }

    /// Number of DMX channels the control occupies
    pub fn channel_count(&self) -> usize {
        match self.kind {
            ControlKind::Color { .. } => 3,
            ControlKind::Slider(_) | ControlKind::Toggle(_) => 1,
            ControlKind::Pad2(_) => 2,
            ControlKind::Pad2Fine(_) => 4,
        }
    }

    /// Fresh default value
    pub fn default_value(&self) -> ControlValue {
        match &self.kind {
            ControlKind::Color { default } => ControlValue::Color(*default),
            ControlKind::Slider(spec) => ControlValue::Level(spec.default),
            ControlKind::Toggle(spec) => ControlValue::Switch(spec.default),
            ControlKind::Pad2(spec) | ControlKind::Pad2Fine(spec) => {
                ControlValue::PanTilt(spec.default)
            }
        }
    }

    /// Style descriptors, one per independent axis
    pub fn style_metadata(&self) -> &[StyleDescriptor] {
        &self.descriptors
    }

    /// Descriptor by axis id
    pub fn descriptor(&self, axis: &str) -> Option<&StyleDescriptor> {
        self.descriptors.iter().find(|d| d.id == axis)
    }

    /// Encode a value into channel bytes
    pub fn value_to_channels(&self, value: &ControlValue) -> Result<Vec<u8>> {
        match (&self.kind, value) {
            (ControlKind::Color { .. }, ControlValue::Color(c)) => Ok(vec![c.r, c.g, c.b]),
            (ControlKind::Slider(_), ControlValue::Level(v)) => Ok(vec![*v]),
            (ControlKind::Toggle(spec), ControlValue::Switch(on)) => {
                Ok(vec![if *on { spec.on_value } else { spec.off_value }])
            }
            (ControlKind::Pad2(_), ControlValue::PanTilt(p)) => Ok(vec![p.pan, p.tilt]),
            (ControlKind::Pad2Fine(_), ControlValue::PanTilt(p)) => {
                let [pan_hi, pan_lo] = widen(p.pan);
                let [tilt_hi, tilt_lo] = widen(p.tilt);
                Ok(vec![pan_hi, pan_lo, tilt_hi, tilt_lo])
            }
            _ => Err(CoreError::ValueMismatch {
                control: self.id.clone(),
                value: value.to_string(),
            }),
        }
    }

    /// Decode channel bytes into a value
    ///
    /// For 16-bit pads the conversion is lossy by up to one step per axis.
    pub fn channels_to_value(&self, bytes: &[u8]) -> Result<ControlValue> {
        let expected = self.channel_count();
        if bytes.len() < expected {
            return Err(CoreError::ChannelCount {
                control: self.id.clone(),
                expected,
                actual: bytes.len(),
            });
        }
        let value = match &self.kind {
            ControlKind::Color { .. } => {
                ControlValue::Color(Rgb::new(bytes[0], bytes[1], bytes[2]))
            }
            ControlKind::Slider(_) => ControlValue::Level(bytes[0]),
            ControlKind::Toggle(spec) => ControlValue::Switch(is_on(spec, bytes[0])),
            ControlKind::Pad2(_) => ControlValue::PanTilt(PanTilt::new(bytes[0], bytes[1])),
            ControlKind::Pad2Fine(_) => ControlValue::PanTilt(PanTilt::new(
                narrow(bytes[0], bytes[1]),
                narrow(bytes[2], bytes[3]),
            )),
        };
        Ok(value)
    }

    /// Channel byte of one style axis of `value`
    ///
    /// Returns `None` when the value does not have the control's shape.
    pub fn axis_channel(&self, value: &ControlValue, axis: usize) -> Option<u8> {
        match (&self.kind, value) {
            (ControlKind::Color { .. }, ControlValue::Color(c)) => c.component(axis),
            (ControlKind::Slider(_), ControlValue::Level(v)) => Some(*v),
            (ControlKind::Toggle(spec), ControlValue::Switch(on)) => {
                Some(if *on { spec.on_value } else { spec.off_value })
            }
            (ControlKind::Pad2(_) | ControlKind::Pad2Fine(_), ControlValue::PanTilt(p)) => {
                match axis {
                    0 => Some(p.pan),
                    1 => Some(p.tilt),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Write one style axis into a composite value
    ///
    /// A value of the wrong shape is replaced by the default before the axis
    /// is written.
    pub fn set_axis(&self, value: &mut ControlValue, axis: usize, channel: u8) {
        if self.axis_channel(value, axis).is_none() {
            *value = self.default_value();
        }
        match (&self.kind, value) {
            (ControlKind::Color { .. }, ControlValue::Color(c)) => c.set_component(axis, channel),
            (ControlKind::Slider(_), ControlValue::Level(v)) => *v = channel,
            (ControlKind::Toggle(spec), ControlValue::Switch(on)) => *on = is_on(spec, channel),
            (ControlKind::Pad2(_) | ControlKind::Pad2Fine(_), ControlValue::PanTilt(p)) => {
                match axis {
                    0 => p.pan = channel,
                    1 => p.tilt = channel,
                    _ => {}
                }
            }
            _ => {}
        }
    }

    /// Keyword a toggle writes for the given state
    pub fn toggle_token(&self, on: bool) -> Option<&str> {
        match &self.kind {
            ControlKind::Toggle(spec) => Some(if on {
                spec.on_token.as_str()
            } else {
                spec.off_token.as_str()
            }),
            _ => None,
        }
    }

    /// Parse a toggle keyword back into a state
    pub fn toggle_from_token(&self, token: &str) -> Option<bool> {
        match &self.kind {
            ControlKind::Toggle(spec) => {
                let token = token.trim();
                if token == spec.on_token {
                    Some(true)
                } else if token == spec.off_token {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

fn build_descriptors(kind: &ControlKind) -> Vec<StyleDescriptor> {
    match kind {
        ControlKind::Color { .. } => ["r", "g", "b"]
            .iter()
            .enumerate()
            .map(|(slot, id)| StyleDescriptor {
                slot,
                ..StyleDescriptor::scalar(*id, "color", (0.0, 255.0), StyleUnit::Rgb)
            })
            .collect(),
        ControlKind::Slider(spec) => vec![StyleDescriptor::scalar(
            "value",
            spec.property.clone(),
            spec.domain,
            spec.unit,
        )],
        ControlKind::Toggle(spec) => vec![StyleDescriptor {
            channel_min: spec.off_value,
            channel_max: spec.on_value,
            ..StyleDescriptor::scalar("value", spec.property.clone(), (0.0, 1.0), StyleUnit::Token)
        }],
        ControlKind::Pad2(spec) | ControlKind::Pad2Fine(spec) => vec![
            StyleDescriptor::scalar("pan", spec.pan_property.clone(), spec.domain, spec.unit),
            StyleDescriptor::scalar("tilt", spec.tilt_property.clone(), spec.domain, spec.unit),
        ],
    }
}

fn is_on(spec: &ToggleSpec, byte: u8) -> bool {
    let to_on = (byte as i16 - spec.on_value as i16).abs();
    let to_off = (byte as i16 - spec.off_value as i16).abs();
    to_on < to_off
}

/// 8-bit value to 16-bit coarse/fine bytes; 0 maps to 0 and 255 to 65535
fn widen(value: u8) -> [u8; 2] {
    let wide = value as u16 * 257;
    [(wide >> 8) as u8, (wide & 0xFF) as u8]
}

fn narrow(hi: u8, lo: u8) -> u8 {
    let wide = ((hi as u16) << 8) | lo as u16;
    clamp_byte(wide as f64 / 257.0)
}
