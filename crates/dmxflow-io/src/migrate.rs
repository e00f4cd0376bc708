//! Migration of JSON show files written by older releases.
//!
//! Runs on the raw JSON tree before deserialization:
//!
//! - legacy field names are renamed (`name` → `displayName`, `address` →
//!   `startChannel`, `frames` → `keyframes`, ...);
//! - flat legacy triggers with a single `type` of `animation`, `setValues` or
//!   `copyValue` become `{ kind, input, output, action }` records;
//! - records without a UUID `id` get a fresh one; links and trigger outputs
//!   naming a replaced device id are rewritten, devices without an `order`
//!   are appended after the highest existing order;
//! - missing `version` and `metadata` are filled in.
//!
//! Files from a newer major version are refused before anything is touched.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::{IoError, Result};
use crate::project_format::{check_version, ProjectMetadata, PROJECT_FILE_VERSION};

const DEVICE_RENAMES: &[(&str, &str)] = &[
    ("type", "deviceTypeKey"),
    ("deviceType", "deviceTypeKey"),
    ("name", "displayName"),
    ("address", "startChannel"),
    ("values", "controlValues"),
    ("linkedTo", "linkedToDeviceId"),
    ("syncedControls", "syncedControlIds"),
];

/// Replaced legacy device ids
type IdMap = BTreeMap<String, String>;

const ANIMATION_RENAMES: &[(&str, &str)] = &[("frames", "keyframes"), ("controls", "controlIds")];

/// What a migration changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub renamed_fields: usize,
    pub converted_triggers: usize,
    pub dropped_triggers: usize,
    pub assigned_ids: usize,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Bring a show file tree up to the current format in place
pub fn migrate_project(root: &mut Value) -> Result<MigrationReport> {
    let obj = root
        .as_object_mut()
        .ok_or_else(|| IoError::Migration("show file is not a JSON object".into()))?;

    match obj.get("version") {
        Some(Value::String(version)) => check_version(version)?,
        Some(other) => return Err(IoError::InvalidVersion(other.to_string())),
        None => {}
    }

    let mut report = MigrationReport::default();

    let mut device_ids = IdMap::new();
    if let Some(devices) = obj.get_mut("devices").and_then(Value::as_array_mut) {
        migrate_devices(devices, &mut device_ids, &mut report);
    }
    if let Some(animations) = obj.get_mut("animations").and_then(Value::as_array_mut) {
        for animation in animations.iter_mut().filter_map(Value::as_object_mut) {
            report.renamed_fields += rename_keys(animation, ANIMATION_RENAMES);
            if !animation.contains_key("displayName") {
                if let Some(name) = animation.get("name").cloned() {
                    animation.insert("displayName".into(), name);
                }
            }
        }
    }
    if let Some(triggers) = obj.get_mut("triggers").and_then(Value::as_array_mut) {
        migrate_triggers(triggers, &device_ids, &mut report);
    }

    if !obj.contains_key("metadata") {
        obj.insert("metadata".into(), serde_json::to_value(ProjectMetadata::now())?);
    }
    obj.insert("version".into(), Value::String(PROJECT_FILE_VERSION.into()));

    if !report.is_empty() {
        tracing::info!("Migrated legacy show file: {:?}", report);
    }
    Ok(report)
}

/// Move `from` keys to `to` unless `to` is already present
fn rename_keys(obj: &mut Map<String, Value>, renames: &[(&str, &str)]) -> usize {
    let mut renamed = 0;
    for (from, to) in renames {
        if obj.contains_key(*to) {
            continue;
        }
        if let Some(value) = obj.remove(*from) {
            obj.insert((*to).to_string(), value);
            renamed += 1;
        }
    }
    renamed
}

fn is_uuid(value: &Value) -> bool {
    value.as_str().is_some_and(|text| Uuid::parse_str(text).is_ok())
}

/// Give the record a UUID id; returns `(old, new)` when a string id was replaced
fn ensure_id(
    obj: &mut Map<String, Value>,
    report: &mut MigrationReport,
) -> Option<(String, String)> {
    if obj.get("id").is_some_and(is_uuid) {
        return None;
    }
    let fresh = Uuid::new_v4().to_string();
    report.assigned_ids += 1;
    match obj.insert("id".into(), Value::String(fresh.clone())) {
        Some(Value::String(old)) => Some((old, fresh)),
        _ => None,
    }
}

/// Resolve a device reference to a UUID, `None` when it names no device
fn resolve_device_ref(reference: &Value, device_ids: &IdMap) -> Option<Value> {
    if is_uuid(reference) {
        return Some(reference.clone());
    }
    let mapped = device_ids.get(reference.as_str()?)?;
    Some(Value::String(mapped.clone()))
}

fn migrate_devices(devices: &mut [Value], device_ids: &mut IdMap, report: &mut MigrationReport) {
    let mut next_order = devices
        .iter()
        .filter_map(|d| d.get("order").and_then(Value::as_u64))
        .max()
        .map_or(0, |max| max + 1);

    for device in devices.iter_mut().filter_map(Value::as_object_mut) {
        report.renamed_fields += rename_keys(device, DEVICE_RENAMES);
        if let Some((old, fresh)) = ensure_id(device, report) {
            device_ids.insert(old, fresh);
        }
        if !device.get("order").is_some_and(Value::is_u64) {
            device.insert("order".into(), json!(next_order));
            next_order += 1;
        }
    }

    for device in devices.iter_mut().filter_map(Value::as_object_mut) {
        let Some(link) = device.get("linkedToDeviceId").filter(|v| !v.is_null()) else {
            continue;
        };
        let resolved = resolve_device_ref(link, device_ids);
        if resolved.is_none() {
            tracing::warn!("Clearing link to unknown device {}", link);
        }
        device.insert("linkedToDeviceId".into(), resolved.unwrap_or(Value::Null));
    }
}

fn migrate_triggers(triggers: &mut Vec<Value>, device_ids: &IdMap, report: &mut MigrationReport) {
    triggers.retain_mut(|trigger| {
        let Some(obj) = trigger.as_object_mut() else {
            report.dropped_triggers += 1;
            return false;
        };
        if !obj.contains_key("kind") {
            match convert_legacy_trigger(obj) {
                Some(converted) => {
                    *obj = converted;
                    report.converted_triggers += 1;
                }
                None => {
                    let dropped = serde_json::Value::Object(obj.clone());
                    tracing::warn!("Dropping unrecognised legacy trigger: {}", dropped);
                    report.dropped_triggers += 1;
                    return false;
                }
            }
        }
        ensure_id(obj, report);

        let Some(output) = obj.get_mut("output").and_then(Value::as_object_mut) else {
            return true;
        };
        let Some(target) = output.get("deviceId") else {
            return true;
        };
        match resolve_device_ref(target, device_ids) {
            Some(resolved) => {
                output.insert("deviceId".into(), resolved);
                true
            }
            None => {
                let target = target.to_string();
                tracing::warn!("Dropping trigger for unknown device {}", target);
                report.dropped_triggers += 1;
                false
            }
        }
    });
}

fn take_string(obj: &mut Map<String, Value>, key: &str) -> Option<String> {
    match obj.remove(key)? {
        Value::String(text) => Some(text),
        _ => None,
    }
}

/// Rebuild a flat legacy trigger, `None` when its type is unknown
fn convert_legacy_trigger(legacy: &mut Map<String, Value>) -> Option<Map<String, Value>> {
    let legacy_type = take_string(legacy, "type")?;
    let input_device = take_string(legacy, "inputDeviceId")?;
    let input_control = take_string(legacy, "inputControlId")?;
    let output_device = legacy.remove("outputDeviceId")?;

    let condition = match take_string(legacy, "inputState").as_deref() {
        None | Some("pressed") | Some("press") => json!({ "edge": "press" }),
        Some("released") | Some("release") => json!({ "edge": "release" }),
        Some(other) => json!({ "value": other }),
    };

    let (kind, action) = match legacy_type.as_str() {
        "animation" => {
            let mut action = json!({
                "type": "animation",
                "name": take_string(legacy, "animationName")?,
            });
            if let Some(duration) = legacy.remove("duration") {
                action["durationMs"] = duration;
            }
            if let Some(iterations) = legacy.remove("iterations") {
                action["iterations"] = iterations;
            }
            ("action", action)
        }
        "setValues" => (
            "action",
            json!({
                "type": "values",
                "values": legacy.remove("values").unwrap_or_else(|| json!({})),
            }),
        ),
        "copyValue" => {
            let source = take_string(legacy, "sourceControlId")
                .unwrap_or_else(|| input_control.clone());
            (
                "value",
                json!({
                    "type": "copy",
                    "sourceControlId": source,
                    "sourceComponentId": legacy.remove("sourceComponentId").unwrap_or(Value::Null),
                    "targetControlId": take_string(legacy, "targetControlId")?,
                    "targetComponentId": legacy.remove("targetComponentId").unwrap_or(Value::Null),
                    "invert": legacy.remove("invert").unwrap_or(Value::Bool(false)),
                }),
            )
        }
        _ => return None,
    };

    let mut converted = Map::new();
    if let Some(id) = legacy.remove("id") {
        converted.insert("id".into(), id);
    }
    converted.insert(
        "enabled".into(),
        legacy.remove("enabled").unwrap_or(Value::Bool(true)),
    );
    converted.insert("kind".into(), json!(kind));
    converted.insert(
        "input".into(),
        json!({
            "deviceId": input_device,
            "controlId": input_control,
            "condition": condition,
        }),
    );
    converted.insert("output".into(), json!({ "deviceId": output_device }));
    converted.insert("action".into(), action);
    Some(converted)
}
