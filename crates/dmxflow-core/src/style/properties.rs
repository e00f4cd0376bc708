//! Control values to style property literals

use std::collections::BTreeMap;

use crate::control::{ControlKind, ControlType, ControlValue, ControlValues, Rgb};
use crate::device::ControlBinding;

/// Format a color the way the style engine computes it
pub fn format_rgb(color: Rgb) -> String {
    format!("rgb({}, {}, {})", color.r, color.g, color.b)
}

/// Style properties of every present control
///
/// Controls without a value are not written, so the style engine falls back
/// to whatever else sets the property. Values of the wrong shape are skipped.
pub fn get_properties(
    values: &ControlValues,
    controls: &[ControlBinding],
) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    for binding in controls {
        if let Some(value) = values.get(binding.id()) {
            properties.extend(control_properties(&binding.control, value));
        }
    }
    properties
}

/// Property/literal pairs for one control value
pub fn control_properties(control: &ControlType, value: &ControlValue) -> Vec<(String, String)> {
    match (control.kind(), value) {
        (ControlKind::Color { .. }, ControlValue::Color(c)) => {
            let property = control
                .style_metadata()
                .first()
                .map_or("color", |d| d.style_property.as_str());
            vec![(property.to_string(), format_rgb(*c))]
        }
        (ControlKind::Toggle(spec), ControlValue::Switch(on)) => {
            let token = if *on { &spec.on_token } else { &spec.off_token };
            vec![(spec.property.clone(), token.clone())]
        }
        (ControlKind::Slider(_), ControlValue::Level(_))
        | (ControlKind::Pad2(_) | ControlKind::Pad2Fine(_), ControlValue::PanTilt(_)) => control
            .style_metadata()
            .iter()
            .enumerate()
            .filter_map(|(axis, descriptor)| {
                let channel = control.axis_channel(value, axis)?;
                Some((
                    descriptor.style_property.clone(),
                    descriptor.format_channel(channel),
                ))
            })
            .collect(),
        _ => {
            tracing::debug!("Value {} does not fit control '{}'", value, control.id());
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::PanTilt;
    use crate::registry::device_type;

    #[test]
    fn test_moving_head_properties() {
        let head = device_type("moving-head").unwrap();
        let mut values = ControlValues::new();
        values.insert("dimmer".to_string(), ControlValue::Level(95));
        values.insert("speed".to_string(), ControlValue::Level(128));
        values.insert("rotation".to_string(), ControlValue::Level(64));
        values.insert("color".to_string(), ControlValue::Color(Rgb::new(12, 200, 40)));
        values.insert("strobe".to_string(), ControlValue::Switch(true));
        values.insert(
            "pantilt".to_string(),
            ControlValue::PanTilt(PanTilt::new(0, 255)),
        );

        let props = get_properties(&values, head.controls());
        assert_eq!(props["--dimmer"], "37.3%");
        assert_eq!(props["--speed"], "0.502");
        assert_eq!(props["--rotation"], "90.4deg");
        assert_eq!(props["color"], "rgb(12, 200, 40)");
        assert_eq!(props["--strobe"], "on");
        assert_eq!(props["--pan"], "-50.0%");
        assert_eq!(props["--tilt"], "50.0%");
    }

    #[test]
    fn test_absent_controls_not_written() {
        let head = device_type("moving-head").unwrap();
        let mut values = ControlValues::new();
        values.insert("dimmer".to_string(), ControlValue::Level(0));

        let props = get_properties(&values, head.controls());
        assert_eq!(props.len(), 1);
        assert_eq!(props["--dimmer"], "0.0%");
    }

    #[test]
    fn test_wrong_shape_skipped() {
        let par = device_type("rgb-par").unwrap();
        let mut values = ControlValues::new();
        values.insert("color".to_string(), ControlValue::Switch(false));
        assert!(get_properties(&values, par.controls()).is_empty());
    }
}
