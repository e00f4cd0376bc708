//! Control values
//!
//! A control value is the semantic, user-facing state of one control. Values
//! are stored per device in a [`ControlValues`] record keyed by control id; a
//! control counts as active exactly when its id is a key of the record.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Control id -> value record
pub type ControlValues = BTreeMap<String, ControlValue>;

/// RGB color, one byte per component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    #[serde(alias = "red", deserialize_with = "channel_byte")]
    pub r: u8,
    #[serde(alias = "green", deserialize_with = "channel_byte")]
    pub g: u8,
    #[serde(alias = "blue", deserialize_with = "channel_byte")]
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Component by index (0 = red, 1 = green, 2 = blue)
    pub fn component(&self, index: usize) -> Option<u8> {
        match index {
            0 => Some(self.r),
            1 => Some(self.g),
            2 => Some(self.b),
            _ => None,
        }
    }

    pub fn set_component(&mut self, index: usize, value: u8) {
        match index {
            0 => self.r = value,
            1 => self.g = value,
            2 => self.b = value,
            _ => {}
        }
    }
}

/// Two-axis position of a moving head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PanTilt {
    #[serde(alias = "x", deserialize_with = "channel_byte")]
    pub pan: u8,
    #[serde(alias = "y", deserialize_with = "channel_byte")]
    pub tilt: u8,
}

impl PanTilt {
    /// Centered position
    pub const CENTER: PanTilt = PanTilt {
        pan: 128,
        tilt: 128,
    };

    pub fn new(pan: u8, tilt: u8) -> Self {
        Self { pan, tilt }
    }

    /// Mirror the pan axis around the center of the byte range
    pub fn mirrored(self) -> Self {
        Self {
            pan: 255 - self.pan,
            tilt: self.tilt,
        }
    }
}

/// Value of a single control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    /// Toggle state
    Switch(bool),
    /// Slider level (0-255)
    Level(#[serde(deserialize_with = "channel_byte")] u8),
    /// RGB color
    Color(Rgb),
    /// Pan/tilt pad position
    PanTilt(PanTilt),
}

impl ControlValue {
    pub fn as_level(&self) -> Option<u8> {
        match self {
            ControlValue::Level(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_switch(&self) -> Option<bool> {
        match self {
            ControlValue::Switch(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Rgb> {
        match self {
            ControlValue::Color(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_pan_tilt(&self) -> Option<PanTilt> {
        match self {
            ControlValue::PanTilt(v) => Some(*v),
            _ => None,
        }
    }

    /// Interpolate towards `other` by `t` (0.0-1.0), rounding every numeric
    /// component to the nearest channel byte.
    ///
    /// Toggles switch at the midpoint. Values of different shapes do not
    /// interpolate; `self` is returned unchanged.
    pub fn lerp(&self, other: &ControlValue, t: f64) -> ControlValue {
        match (self, other) {
            (ControlValue::Level(a), ControlValue::Level(b)) => {
                ControlValue::Level(lerp_byte(*a, *b, t))
            }
            (ControlValue::Color(a), ControlValue::Color(b)) => ControlValue::Color(Rgb {
                r: lerp_byte(a.r, b.r, t),
                g: lerp_byte(a.g, b.g, t),
                b: lerp_byte(a.b, b.b, t),
            }),
            (ControlValue::PanTilt(a), ControlValue::PanTilt(b)) => {
                ControlValue::PanTilt(PanTilt {
                    pan: lerp_byte(a.pan, b.pan, t),
                    tilt: lerp_byte(a.tilt, b.tilt, t),
                })
            }
            (ControlValue::Switch(a), ControlValue::Switch(b)) => {
                ControlValue::Switch(if t < 0.5 { *a } else { *b })
            }
            _ => *self,
        }
    }
}

impl std::fmt::Display for ControlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlValue::Switch(v) => write!(f, "{}", v),
            ControlValue::Level(v) => write!(f, "{}", v),
            ControlValue::Color(c) => write!(f, "rgb({}, {}, {})", c.r, c.g, c.b),
            ControlValue::PanTilt(p) => write!(f, "pan {} tilt {}", p.pan, p.tilt),
        }
    }
}

fn lerp_byte(a: u8, b: u8, t: f64) -> u8 {
    clamp_byte(a as f64 + (b as f64 - a as f64) * t)
}

/// Round and clamp a number to a channel byte
pub fn clamp_byte(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}

/// Accept any JSON number for a channel byte, rounding and clamping it
fn channel_byte<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(clamp_byte(raw))
}
