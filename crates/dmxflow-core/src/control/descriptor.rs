//! Style metadata of a control
//!
//! A [`StyleDescriptor`] ties one axis of a control (a slider level, the pan
//! axis of a pad, the green component of a color) to a style property and a
//! linear map between the channel byte range and the property's numeric
//! domain. The same descriptor drives the forward compiler, the sampler and
//! the trigger remapper, so all three agree on units and rounding.

use serde::{Deserialize, Serialize};

use crate::control::value::clamp_byte;
use crate::error::{CoreError, Result};

/// Unit of a style property value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleUnit {
    /// Percentage, one decimal (`"37.3%"`)
    Percent,
    /// Unitless number, three decimals (`"0.500"`)
    Number,
    /// Angle, one decimal (`"90.0deg"`)
    Degrees,
    /// Integer color component inside `rgb(...)`
    Rgb,
    /// Discrete keyword (toggles)
    Token,
}

impl StyleUnit {
    /// Suffix appended to numeric literals of this unit
    pub fn suffix(&self) -> &'static str {
        match self {
            StyleUnit::Percent => "%",
            StyleUnit::Degrees => "deg",
            StyleUnit::Number | StyleUnit::Rgb | StyleUnit::Token => "",
        }
    }

    /// Format a numeric style value as a literal of this unit
    pub fn format(&self, value: f64) -> String {
        match self {
            StyleUnit::Percent => format!("{}%", fixed(value, 1)),
            StyleUnit::Number => fixed(value, 3),
            StyleUnit::Degrees => format!("{}deg", fixed(value, 1)),
            StyleUnit::Rgb | StyleUnit::Token => fixed(value, 0),
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, StyleUnit::Token)
    }
}

/// Fixed-point formatting without a negative zero
fn fixed(value: f64, decimals: usize) -> String {
    let scale = 10f64.powi(decimals as i32);
    let mut rounded = (value * scale).round() / scale;
    if rounded == 0.0 {
        rounded = 0.0;
    }
    format!("{:.*}", decimals, rounded)
}

/// One style-exposed axis of a control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDescriptor {
    /// Axis id within the control (`"value"`, `"pan"`, `"g"`, ...)
    pub id: String,
    /// Style property the axis is written to
    pub style_property: String,
    pub domain_min: f64,
    pub domain_max: f64,
    pub unit: StyleUnit,
    pub channel_min: u8,
    pub channel_max: u8,
    /// Index of this axis' numeric token inside the property value
    pub slot: usize,
}

impl StyleDescriptor {
    /// Descriptor of a single-valued custom property
    pub fn scalar(
        id: impl Into<String>,
        style_property: impl Into<String>,
        domain: (f64, f64),
        unit: StyleUnit,
    ) -> Self {
        Self {
            id: id.into(),
            style_property: style_property.into(),
            domain_min: domain.0,
            domain_max: domain.1,
            unit,
            channel_min: 0,
            channel_max: 255,
            slot: 0,
        }
    }

    /// Reject ranges that would divide by zero
    pub fn validate(&self, control: &str) -> Result<()> {
        let domain = self.domain_max - self.domain_min;
        if !domain.is_finite() || domain == 0.0 || self.channel_min == self.channel_max {
            return Err(CoreError::ZeroWidthDomain {
                control: control.to_string(),
                descriptor: self.id.clone(),
            });
        }
        Ok(())
    }

    /// Map a channel byte into the style domain
    pub fn channel_to_style(&self, channel: u8) -> f64 {
        let c_min = self.channel_min as f64;
        let c_max = self.channel_max as f64;
        (channel as f64 - c_min) / (c_max - c_min) * (self.domain_max - self.domain_min)
            + self.domain_min
    }

    /// Map a style value back to the nearest channel byte within the channel range
    pub fn style_to_channel(&self, value: f64) -> u8 {
        let c_min = self.channel_min as f64;
        let c_max = self.channel_max as f64;
        let raw = (value - self.domain_min) / (self.domain_max - self.domain_min) * (c_max - c_min)
            + c_min;
        let low = self.channel_min.min(self.channel_max);
        let high = self.channel_min.max(self.channel_max);
        clamp_byte(raw).clamp(low, high)
    }

    /// Style literal for a channel byte
    pub fn format_channel(&self, channel: u8) -> String {
        self.unit.format(self.channel_to_style(channel))
    }

    /// Same unit and same numeric domain
    pub fn same_domain(&self, other: &StyleDescriptor) -> bool {
        self.unit == other.unit
            && (self.domain_min - other.domain_min).abs() < 1e-9
            && (self.domain_max - other.domain_max).abs() < 1e-9
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn percent() -> StyleDescriptor {
        StyleDescriptor::scalar("value", "--dimmer", (0.0, 100.0), StyleUnit::Percent)
    }

    #[test]
    fn test_unit_formatting() {
        assert_eq!(StyleUnit::Percent.format(37.254), "37.3%");
        assert_eq!(StyleUnit::Number.format(0.5), "0.500");
        assert_eq!(StyleUnit::Degrees.format(90.0), "90.0deg");
        assert_eq!(StyleUnit::Rgb.format(200.0), "200");
        assert_eq!(StyleUnit::Percent.format(-0.04), "0.0%");
    }

    #[test]
    fn test_channel_mapping_round_trip() {
        let d = percent();
        assert_eq!(d.format_channel(128), "50.2%");
        assert_eq!(d.style_to_channel(50.2), 128);
        assert_eq!(d.style_to_channel(100.0), 255);
        assert_eq!(d.style_to_channel(250.0), 255);
        assert_eq!(d.style_to_channel(-3.0), 0);
    }

    #[test]
    fn test_clamp_to_custom_channel_range() {
        let mut d = percent();
        d.channel_min = 10;
        d.channel_max = 200;
        assert_eq!(d.style_to_channel(0.0), 10);
        assert_eq!(d.style_to_channel(100.0), 200);
        assert_eq!(d.style_to_channel(120.0), 200);
    }

    #[test]
    fn test_zero_width_rejected() {
        let d = StyleDescriptor::scalar("value", "--x", (5.0, 5.0), StyleUnit::Number);
        assert!(matches!(
            d.validate("x"),
            Err(CoreError::ZeroWidthDomain { .. })
        ));
        assert!(percent().validate("dimmer").is_ok());
    }
}
