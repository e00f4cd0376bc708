use dmxflow_core::control::{ControlValue, ControlValues, PanTilt, Rgb};
use dmxflow_core::registry::{control_type, device_type, device_types};
use dmxflow_core::{
    control_values_to_dmx, create_default_control_values, dmx_to_control_values, get_properties,
    sample_control_values,
};
use proptest::prelude::*;

fn moving_head_values() -> impl Strategy<Value = ControlValues> {
    (
        any::<u8>(),
        any::<u8>(),
        any::<u8>(),
        any::<(u8, u8, u8)>(),
        any::<bool>(),
        any::<(u8, u8)>(),
    )
        .prop_map(|(dimmer, speed, rotation, (r, g, b), strobe, (pan, tilt))| {
            let mut values = ControlValues::new();
            values.insert("dimmer".into(), ControlValue::Level(dimmer));
            values.insert("speed".into(), ControlValue::Level(speed));
            values.insert("rotation".into(), ControlValue::Level(rotation));
            values.insert("color".into(), ControlValue::Color(Rgb::new(r, g, b)));
            values.insert("strobe".into(), ControlValue::Switch(strobe));
            values.insert("pantilt".into(), ControlValue::PanTilt(PanTilt::new(pan, tilt)));
            values
        })
}

proptest! {
    #[test]
    fn eight_bit_controls_round_trip_exactly(values in moving_head_values()) {
        let head = device_type("moving-head").unwrap();
        let bytes = control_values_to_dmx(head, &values);
        prop_assert_eq!(dmx_to_control_values(head, &bytes), values);
    }

    #[test]
    fn sixteen_bit_pad_within_one_step(pan in any::<u8>(), tilt in any::<u8>()) {
        let pad = control_type("pantilt16").unwrap();
        let value = ControlValue::PanTilt(PanTilt::new(pan, tilt));
        let bytes = pad.value_to_channels(&value).unwrap();
        let back = pad.channels_to_value(&bytes).unwrap().as_pan_tilt().unwrap();
        prop_assert!((back.pan as i16 - pan as i16).abs() <= 1);
        prop_assert!((back.tilt as i16 - tilt as i16).abs() <= 1);
    }

    #[test]
    fn style_round_trip_within_one_step(values in moving_head_values()) {
        let head = device_type("moving-head").unwrap();
        let props = get_properties(&values, head.controls());
        let outcome = sample_control_values(head.controls(), &ControlValues::new(), |p| {
            props.get(p).cloned()
        });
        prop_assert!(outcome.skipped.is_empty());

        for (id, value) in &values {
            let control = &head.control(id).unwrap().control;
            let sampled = &outcome.values[id];
            for axis in 0..control.style_metadata().len() {
                let a = control.axis_channel(value, axis).unwrap() as i16;
                let b = control.axis_channel(sampled, axis).unwrap() as i16;
                prop_assert!((a - b).abs() <= 1, "{}[{}]: {} vs {}", id, axis, a, b);
            }
        }
    }

    #[test]
    fn arbitrary_bytes_decode_without_panicking(bytes in proptest::collection::vec(any::<u8>(), 0..12)) {
        for device_type in device_types().iter() {
            let values = dmx_to_control_values(device_type, &bytes);
            prop_assert!(values.len() <= device_type.controls().len());
        }
    }
}

#[test]
fn test_defaults_survive_dmx_round_trip() {
    for device_type in device_types().iter() {
        let defaults = create_default_control_values(device_type);
        let bytes = control_values_to_dmx(device_type, &defaults);
        assert_eq!(bytes.len(), device_type.total_channels());
        assert_eq!(dmx_to_control_values(device_type, &bytes), defaults);
    }
}

#[test]
fn test_half_level_round_trips_through_style() {
    let dimmer = device_type("dimmer").unwrap();
    let mut values = ControlValues::new();
    values.insert("dimmer".into(), ControlValue::Level(128));

    let props = get_properties(&values, dimmer.controls());
    assert_eq!(props["--dimmer"], "50.2%");

    let outcome = sample_control_values(dimmer.controls(), &ControlValues::new(), |p| {
        props.get(p).cloned()
    });
    assert_eq!(outcome.values["dimmer"], ControlValue::Level(128));
}
