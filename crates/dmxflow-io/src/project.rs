//! Show I/O - High-level API
//!
//! Saving snapshots a [`Show`] into a [`ProjectFile`]; loading reads the file
//! (migrating legacy JSON), checks the version and rebuilds the show with a
//! freshly compiled style document.

use crate::error::Result;
use crate::project_format::ProjectFile;
use dmxflow_core::Show;
use std::path::Path;

/// Save a show; the format follows the file extension
pub fn save_show(show: &Show, path: &Path) -> Result<()> {
    let mut file = ProjectFile::from_show(show);
    file.save(path)?;
    tracing::info!(
        "Saved show with {} devices to {}",
        show.devices().len(),
        path.display()
    );
    Ok(())
}

/// Load a show written by this or an older release
pub fn load_show(path: &Path) -> Result<Show> {
    let file = ProjectFile::load(path)?;
    let show = file.into_show()?;
    tracing::info!(
        "Loaded show with {} devices from {}",
        show.devices().len(),
        path.display()
    );
    Ok(show)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IoError;
    use crate::project_format::PROJECT_FILE_VERSION;
    use dmxflow_core::{
        Animation, AnimationRef, ControlValue, ControlValues, CoreError, Edge, InputCondition,
        Keyframe, LinkSettings, PanTilt, Rgb, Trigger, TriggerAction, TriggerInput, TriggerKind,
        TriggerOutput,
    };
    use tempfile::tempdir;

    fn sample_show() -> Show {
        let mut show = Show::new();
        let left = show.create_device("dimmer", "Left").unwrap();
        let right = show.create_device("dimmer", "Right").unwrap();
        show.set_control_value(&left, "dimmer", Some(ControlValue::Level(77)))
            .unwrap();
        show.link_device(
            &right,
            LinkSettings {
                source: Some(left),
                synced_control_ids: None,
                mirror_pan: false,
            },
        )
        .unwrap();

        let mut pulse = Animation::new("pulse", "Pulse");
        pulse
            .add_keyframe(Keyframe::new(
                0.5,
                [("dimmer".to_string(), ControlValue::Level(255))].into(),
            ))
            .unwrap();
        show.add_animation(pulse).unwrap();
        show
    }

    #[test]
    fn test_json_roundtrip_rebuilds_document() {
        let show = sample_show();
        let dir = tempdir().unwrap();
        let path = dir.path().join("show.json");

        save_show(&show, &path).unwrap();
        let loaded = load_show(&path).unwrap();

        assert_eq!(loaded.devices().devices(), show.devices().devices());
        assert_eq!(loaded.animations(), show.animations());
        assert_eq!(loaded.document().to_string(), show.document().to_string());
    }

    #[test]
    fn test_ron_roundtrip() {
        let show = sample_show();
        let dir = tempdir().unwrap();
        let path = dir.path().join("show.dmxflow");

        save_show(&show, &path).unwrap();
        let loaded = load_show(&path).unwrap();
        assert_eq!(loaded.devices().devices(), show.devices().devices());
    }

    #[test]
    fn test_unsupported_format() {
        let dir = tempdir().unwrap();
        let result = save_show(&Show::new(), &dir.path().join("show.txt"));
        assert!(matches!(result, Err(IoError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_newer_ron_file_refused() {
        let show = sample_show();
        let dir = tempdir().unwrap();
        let path = dir.path().join("show.ron");

        let mut file = ProjectFile::from_show(&show);
        file.version = "9.0.0".to_string();
        file.save(&path).unwrap();

        match load_show(&path) {
            Err(IoError::VersionMismatch { expected, found }) => {
                assert_eq!(expected, PROJECT_FILE_VERSION);
                assert_eq!(found, "9.0.0");
            }
            other => panic!("expected a version mismatch, got {:?}", other.map(|_| ())),
        }
    }

    /// Color and pan/tilt values, stored both on devices and inside triggers
    fn mixed_show() -> Show {
        let mut show = sample_show();
        let wash = show.create_device("rgb-par", "Wash").unwrap();
        let head = show.create_device("moving-head", "Spot").unwrap();
        show.set_control_value(&wash, "color", Some(ControlValue::Color(Rgb::new(12, 200, 40))))
            .unwrap();
        show.set_control_value(&head, "pantilt", Some(ControlValue::PanTilt(PanTilt::new(30, 220))))
            .unwrap();
        show.set_control_value(&head, "strobe", Some(ControlValue::Switch(true)))
            .unwrap();

        let mut look = ControlValues::new();
        look.insert("color".into(), ControlValue::Color(Rgb::new(255, 0, 128)));
        look.insert("pantilt".into(), ControlValue::PanTilt(PanTilt::new(0, 255)));
        look.insert("strobe".into(), ControlValue::Switch(false));
        show.add_trigger(Trigger::new(
            TriggerKind::Action,
            TriggerInput {
                device_id: "apc".into(),
                control_id: "b1".into(),
                condition: InputCondition::Edge(Edge::Press),
            },
            TriggerOutput { device_id: head },
            TriggerAction::Values { values: look },
        ))
        .unwrap();
        show.add_trigger(Trigger::new(
            TriggerKind::Action,
            TriggerInput {
                device_id: "apc".into(),
                control_id: "b2".into(),
                condition: InputCondition::Edge(Edge::Release),
            },
            TriggerOutput { device_id: wash },
            TriggerAction::Animation(AnimationRef {
                name: "pulse".into(),
                duration_ms: 750,
                iterations: None,
            }),
        ))
        .unwrap();
        show
    }

    #[test]
    fn test_mixed_values_roundtrip_in_both_formats() {
        let show = mixed_show();
        let dir = tempdir().unwrap();

        for name in ["show.ron", "show.json"] {
            let path = dir.path().join(name);
            save_show(&show, &path).unwrap();
            let loaded = load_show(&path).unwrap();

            assert_eq!(loaded.devices().devices(), show.devices().devices(), "{}", name);
            assert_eq!(loaded.triggers(), show.triggers(), "{}", name);
            assert_eq!(loaded.document().to_string(), show.document().to_string(), "{}", name);
        }
    }

    #[test]
    fn test_legacy_string_ids_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.json");
        std::fs::write(
            &path,
            r#"{
                "devices": [
                    { "id": "dev-1", "type": "dimmer", "name": "Left", "address": 0,
                      "values": { "dimmer": 200 } },
                    { "id": "dev-2", "type": "dimmer", "name": "Right", "address": 1,
                      "linkedTo": "dev-1" }
                ],
                "triggers": [
                    { "type": "setValues", "inputDeviceId": "apc", "inputControlId": "b1",
                      "outputDeviceId": "dev-2", "values": { "dimmer": 10 } }
                ]
            }"#,
        )
        .unwrap();

        let show = load_show(&path).unwrap();
        let devices = show.devices().devices();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].control_values["dimmer"], ControlValue::Level(200));
        assert_eq!(devices[1].linked_to_device_id, Some(devices[0].id));

        let trigger = show.triggers().iter().next().unwrap();
        assert_eq!(trigger.output.device_id, devices[1].id);
        assert!(show.document().to_string().contains("#right {"));
    }

    #[test]
    fn test_start_channel_outside_universe_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(
            &path,
            r#"{ "devices": [{ "type": "dimmer", "name": "Far", "address": 600 }] }"#,
        )
        .unwrap();

        assert!(matches!(
            load_show(&path),
            Err(IoError::Core(CoreError::StartChannel(600)))
        ));
    }
}
