//! Triggers: input events and values driving devices
//!
//! A trigger connects an input control to an output device. Action triggers
//! react to a discrete input state (a press, a release, a named value) by
//! starting an animation or applying fixed values. Value triggers follow a
//! continuous input, remapping its domain onto a device control.
//!
//! Triggers compile into style rules. A trigger that cannot compile (it is
//! disabled, or something it refers to is gone) produces no rule; entities
//! are edited independently, so dangling references are expected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::animation::AnimationCollection;
use crate::control::{ControlKind, ControlValues, Rgb};
use crate::device::{Device, DeviceId, DeviceType};
use crate::error::{CoreError, Result};
use crate::input::{
    input_state_attribute, input_value_property, InputCatalog, STATE_PRESSED, STATE_RELEASED,
};
use crate::registry::device_types;
use crate::style::{
    compile_remap, control_properties, AnimationBinding, ColorChannel, Declaration, Selector,
    StyleRule, StyleValue,
};

/// Unique identifier of a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerId(Uuid);

impl TriggerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TriggerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TriggerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    /// Fires on a discrete input state
    Action,
    /// Follows a continuous input value
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Press,
    Release,
}

/// Input state an action trigger waits for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputCondition {
    Edge(Edge),
    /// A named state reported by the input device
    Value(String),
}

impl InputCondition {
    /// Value of the state attribute while the condition holds
    pub fn state(&self) -> &str {
        match self {
            InputCondition::Edge(Edge::Press) => STATE_PRESSED,
            InputCondition::Edge(Edge::Release) => STATE_RELEASED,
            InputCondition::Value(key) => key.as_str(),
        }
    }
}

impl Default for InputCondition {
    fn default() -> Self {
        InputCondition::Edge(Edge::Press)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerInput {
    /// Input device id
    pub device_id: String,
    pub control_id: String,
    #[serde(default)]
    pub condition: InputCondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerOutput {
    pub device_id: DeviceId,
}

/// Animation started by an action trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationRef {
    pub name: String,
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    /// `None` repeats forever
    #[serde(default)]
    pub iterations: Option<u32>,
}

fn default_duration_ms() -> u64 {
    1000
}

/// Continuous copy of an input control onto a device control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyBinding {
    pub source_control_id: String,
    #[serde(default)]
    pub source_component_id: Option<String>,
    pub target_control_id: String,
    /// `None` drives every axis of the target control
    #[serde(default)]
    pub target_component_id: Option<String>,
    #[serde(default)]
    pub invert: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TriggerAction {
    Animation(AnimationRef),
    Values { values: ControlValues },
    Copy(CopyBinding),
}

impl TriggerAction {
    fn name(&self) -> &'static str {
        match self {
            TriggerAction::Animation(_) => "animation",
            TriggerAction::Values { .. } => "values",
            TriggerAction::Copy(_) => "copy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub id: TriggerId,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub kind: TriggerKind,
    pub input: TriggerInput,
    pub output: TriggerOutput,
    pub action: TriggerAction,
}

fn default_enabled() -> bool {
    true
}

impl Trigger {
    pub fn new(
        kind: TriggerKind,
        input: TriggerInput,
        output: TriggerOutput,
        action: TriggerAction,
    ) -> Self {
        Self {
            id: TriggerId::new(),
            enabled: true,
            kind,
            input,
            output,
            action,
        }
    }
}

/// Everything a trigger may refer to
pub struct CompileContext<'a> {
    /// Output devices
    pub devices: &'a [Device],
    /// Element identifier of every device
    pub element_ids: &'a BTreeMap<DeviceId, String>,
    pub animations: &'a AnimationCollection,
    /// Keyframes identifier of every animation, by animation name
    pub keyframe_names: &'a BTreeMap<String, String>,
    pub inputs: &'a dyn InputCatalog,
}

impl CompileContext<'_> {
    fn device(&self, id: &DeviceId) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == *id)
    }
}

/// Compile a trigger into a style rule
///
/// Returns `None` for disabled triggers, dangling references and action
/// shapes that do not fit the trigger kind.
pub fn compile_trigger(trigger: &Trigger, ctx: &CompileContext<'_>) -> Option<StyleRule> {
    if !trigger.enabled {
        return None;
    }

    let Some(target) = ctx.device(&trigger.output.device_id) else {
        tracing::debug!("Trigger {}: output device is gone", trigger.id);
        return None;
    };
    let element = ctx.element_ids.get(&target.id)?;
    let device_type = device_types().get(&target.device_type_key)?;

    let input = &trigger.input;
    if !ctx.inputs.has_control(&input.device_id, &input.control_id) {
        tracing::debug!(
            "Trigger {}: input {}/{} is unknown",
            trigger.id,
            input.device_id,
            input.control_id
        );
        return None;
    }

    match (trigger.kind, &trigger.action) {
        (TriggerKind::Action, TriggerAction::Animation(animation)) => {
            if ctx.animations.get(&animation.name).is_none() {
                tracing::debug!(
                    "Trigger {}: animation '{}' is gone",
                    trigger.id,
                    animation.name
                );
                return None;
            }
            let keyframes = ctx.keyframe_names.get(&animation.name)?.clone();
            let binding = AnimationBinding {
                keyframes,
                duration_ms: animation.duration_ms,
                iterations: animation.iterations,
            };
            Some(action_rule(
                trigger,
                element,
                vec![Declaration::new("animation", StyleValue::Animation(binding))],
            ))
        }
        (TriggerKind::Action, TriggerAction::Values { values }) => {
            let declarations = value_declarations(device_type, values);
            if declarations.is_empty() {
                tracing::debug!("Trigger {}: no values fit the output device", trigger.id);
                return None;
            }
            Some(action_rule(trigger, element, declarations))
        }
        (TriggerKind::Value, TriggerAction::Copy(binding)) => {
            let declarations = copy_declarations(trigger, binding, target, device_type, ctx);
            if declarations.is_empty() {
                return None;
            }
            Some(StyleRule {
                selector: Selector::Element(element.clone()),
                declarations,
            })
        }
        (kind, action) => {
            tracing::debug!(
                "Trigger {}: {:?} trigger cannot run a {} action",
                trigger.id,
                kind,
                action.name()
            );
            None
        }
    }
}

fn action_rule(trigger: &Trigger, element: &str, declarations: Vec<Declaration>) -> StyleRule {
    let input = &trigger.input;
    StyleRule {
        selector: Selector::WhenInput {
            attribute: input_state_attribute(&input.device_id, &input.control_id),
            state: input.condition.state().to_string(),
            element: element.to_string(),
        },
        declarations,
    }
}

fn value_declarations(device_type: &DeviceType, values: &ControlValues) -> Vec<Declaration> {
    values
        .iter()
        .filter_map(|(id, value)| Some((device_type.control(id)?, value)))
        .flat_map(|(binding, value)| control_properties(&binding.control, value))
        .map(|(property, text)| Declaration::literal(property, text))
        .collect()
}

fn copy_declarations(
    trigger: &Trigger,
    binding: &CopyBinding,
    target: &Device,
    device_type: &DeviceType,
    ctx: &CompileContext<'_>,
) -> Vec<Declaration> {
    let input = &trigger.input;
    let source = ctx
        .inputs
        .control(&input.device_id, &binding.source_control_id)
        .and_then(|control| control.resolve(binding.source_component_id.as_deref()));
    let Some((source_descriptor, suffix)) = source else {
        tracing::debug!(
            "Trigger {}: source {}/{:?} is unknown",
            trigger.id,
            binding.source_control_id,
            binding.source_component_id
        );
        return Vec::new();
    };
    let input_var = input_value_property(&input.device_id, &binding.source_control_id, suffix);

    let Some(control_binding) = device_type.control(&binding.target_control_id) else {
        tracing::debug!(
            "Trigger {}: device type '{}' has no control '{}'",
            trigger.id,
            device_type.key(),
            binding.target_control_id
        );
        return Vec::new();
    };
    let control = &control_binding.control;

    let axes: Vec<_> = control
        .style_metadata()
        .iter()
        .enumerate()
        .filter(|(_, descriptor)| {
            binding
                .target_component_id
                .as_deref()
                .map_or(true, |component| descriptor.id == component)
        })
        .collect();

    match control.kind() {
        ControlKind::Color { default } => {
            let current = target
                .control_values
                .get(control.id())
                .and_then(|v| v.as_color())
                .unwrap_or(*default);
            let mut channels = literal_channels(current);
            let mut computed = false;
            for (axis, descriptor) in axes {
                if let Some(expr) =
                    compile_remap(&input_var, source_descriptor, descriptor, binding.invert)
                {
                    if let Some(channel) = channels.get_mut(axis) {
                        *channel = ColorChannel::Computed(expr);
                        computed = true;
                    }
                }
            }
            match control.style_metadata().first() {
                Some(descriptor) if computed => vec![Declaration::new(
                    descriptor.style_property.clone(),
                    StyleValue::Color(channels),
                )],
                _ => Vec::new(),
            }
        }
        _ => axes
            .into_iter()
            .filter_map(|(_, descriptor)| {
                let expr =
                    compile_remap(&input_var, source_descriptor, descriptor, binding.invert)?;
                Some(Declaration::new(
                    descriptor.style_property.clone(),
                    StyleValue::Computed(expr, descriptor.unit),
                ))
            })
            .collect(),
    }
}

fn literal_channels(color: Rgb) -> [ColorChannel; 3] {
    [
        ColorChannel::Literal(color.r),
        ColorChannel::Literal(color.g),
        ColorChannel::Literal(color.b),
    ]
}

/// Triggers in evaluation order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerCollection {
    triggers: Vec<Trigger>,
}

impl TriggerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, trigger: Trigger) -> Result<()> {
        if self.get(&trigger.id).is_some() {
            return Err(CoreError::Duplicate {
                kind: "trigger",
                id: trigger.id.to_string(),
            });
        }
        self.triggers.push(trigger);
        Ok(())
    }

    /// Replace a trigger with the same id or append
    pub fn upsert(&mut self, trigger: Trigger) {
        match self.triggers.iter_mut().find(|t| t.id == trigger.id) {
            Some(existing) => *existing = trigger,
            None => self.triggers.push(trigger),
        }
    }

    pub fn remove(&mut self, id: &TriggerId) -> Option<Trigger> {
        let index = self.triggers.iter().position(|t| t.id == *id)?;
        Some(self.triggers.remove(index))
    }

    pub fn get(&self, id: &TriggerId) -> Option<&Trigger> {
        self.triggers.iter().find(|t| t.id == *id)
    }

    pub fn set_enabled(&mut self, id: &TriggerId, enabled: bool) -> bool {
        match self.triggers.iter_mut().find(|t| t.id == *id) {
            Some(trigger) => {
                trigger.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trigger> {
        self.triggers.iter()
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Animation;
    use crate::control::ControlValue;
    use crate::input::{InputControl, InputDevice, InputRegistry};
    use crate::registry::device_type;

    struct Setup {
        devices: Vec<Device>,
        element_ids: BTreeMap<DeviceId, String>,
        animations: AnimationCollection,
        keyframe_names: BTreeMap<String, String>,
        inputs: InputRegistry,
    }

    impl Setup {
        fn new() -> Self {
            let head = Device::new(device_type("moving-head").unwrap(), "Head", 0);
            let mut par = Device::new(device_type("rgb-par").unwrap(), "Par", 10);
            par.control_values
                .insert("color".into(), ControlValue::Color(Rgb::new(10, 20, 30)));
            let mut element_ids = BTreeMap::new();
            element_ids.insert(head.id, "head".to_string());
            element_ids.insert(par.id, "par".to_string());

            let mut animations = AnimationCollection::new();
            animations.insert(Animation::new("Pulse", "Pulse")).unwrap();
            let mut keyframe_names = BTreeMap::new();
            keyframe_names.insert("Pulse".to_string(), "pulse".to_string());

            let mut inputs = InputRegistry::new();
            inputs.register(
                InputDevice::new("midi", "MIDI")
                    .with_control(InputControl::fader("fader1", "Fader 1", 127.0))
                    .with_control(InputControl::button("pad1", "Pad 1"))
                    .with_control(InputControl::stick("stick", "Stick")),
            );

            Self {
                devices: vec![head, par],
                element_ids,
                animations,
                keyframe_names,
                inputs,
            }
        }

        fn ctx(&self) -> CompileContext<'_> {
            CompileContext {
                devices: &self.devices,
                element_ids: &self.element_ids,
                animations: &self.animations,
                keyframe_names: &self.keyframe_names,
                inputs: &self.inputs,
            }
        }

        fn head(&self) -> DeviceId {
            self.devices[0].id
        }

        fn par(&self) -> DeviceId {
            self.devices[1].id
        }
    }

    fn input(control: &str, condition: InputCondition) -> TriggerInput {
        TriggerInput {
            device_id: "midi".into(),
            control_id: control.into(),
            condition,
        }
    }

    fn copy(
        source: &str,
        component: Option<&str>,
        target: &str,
        target_component: Option<&str>,
        invert: bool,
    ) -> TriggerAction {
        TriggerAction::Copy(CopyBinding {
            source_control_id: source.into(),
            source_component_id: component.map(String::from),
            target_control_id: target.into(),
            target_component_id: target_component.map(String::from),
            invert,
        })
    }

    #[test]
    fn test_animation_action_rule() {
        let fx = Setup::new();
        let trigger = Trigger::new(
            TriggerKind::Action,
            input("pad1", InputCondition::Edge(Edge::Press)),
            TriggerOutput { device_id: fx.head() },
            TriggerAction::Animation(AnimationRef {
                name: "Pulse".into(),
                duration_ms: 2000,
                iterations: Some(1),
            }),
        );
        let rule = compile_trigger(&trigger, &fx.ctx()).unwrap();
        assert_eq!(
            rule.to_string(),
            ":root[data-input-midi-pad1=\"pressed\"] #head {\n  animation: pulse 2000ms linear 1;\n}"
        );
    }

    #[test]
    fn test_values_action_rule() {
        let fx = Setup::new();
        let mut values = ControlValues::new();
        values.insert("dimmer".into(), ControlValue::Level(255));
        values.insert("nonexistent".into(), ControlValue::Level(1));
        let trigger = Trigger::new(
            TriggerKind::Action,
            input("pad1", InputCondition::Value("high".into())),
            TriggerOutput { device_id: fx.head() },
            TriggerAction::Values { values },
        );
        let rule = compile_trigger(&trigger, &fx.ctx()).unwrap();
        assert_eq!(rule.selector.to_string(), ":root[data-input-midi-pad1=\"high\"] #head");
        assert_eq!(rule.declarations, vec![Declaration::literal("--dimmer", "100.0%")]);
    }

    #[test]
    fn test_value_copy_onto_slider() {
        let fx = Setup::new();
        let trigger = Trigger::new(
            TriggerKind::Value,
            input("fader1", InputCondition::default()),
            TriggerOutput { device_id: fx.head() },
            copy("fader1", None, "dimmer", None, false),
        );
        let rule = compile_trigger(&trigger, &fx.ctx()).unwrap();
        assert_eq!(
            rule.to_string(),
            "#head {\n  --dimmer: calc((var(--input-midi-fader1) - 0) / 127 * 100% + 0%);\n}"
        );
    }

    #[test]
    fn test_value_copy_stick_onto_pan() {
        let fx = Setup::new();
        let trigger = Trigger::new(
            TriggerKind::Value,
            input("stick", InputCondition::default()),
            TriggerOutput { device_id: fx.head() },
            copy("stick", Some("x"), "pantilt", Some("pan"), true),
        );
        let rule = compile_trigger(&trigger, &fx.ctx()).unwrap();
        assert_eq!(rule.declarations.len(), 1);
        assert_eq!(rule.declarations[0].property, "--pan");
        assert!(rule.to_string().contains("var(--input-midi-stick-x)"));
    }

    #[test]
    fn test_value_copy_onto_color_component() {
        let fx = Setup::new();
        let trigger = Trigger::new(
            TriggerKind::Value,
            input("fader1", InputCondition::default()),
            TriggerOutput { device_id: fx.par() },
            copy("fader1", None, "color", Some("g"), false),
        );
        let rule = compile_trigger(&trigger, &fx.ctx()).unwrap();
        assert_eq!(
            rule.declarations[0].value.to_string(),
            "rgb(10, calc((var(--input-midi-fader1) - 0) / 127 * 255 + 0), 30)"
        );
    }

    #[test]
    fn test_no_rule_for_broken_triggers() {
        let fx = Setup::new();

        let mut disabled = Trigger::new(
            TriggerKind::Value,
            input("fader1", InputCondition::default()),
            TriggerOutput { device_id: fx.head() },
            copy("fader1", None, "dimmer", None, false),
        );
        disabled.enabled = false;
        assert!(compile_trigger(&disabled, &fx.ctx()).is_none());

        let dangling_device = Trigger::new(
            TriggerKind::Value,
            input("fader1", InputCondition::default()),
            TriggerOutput { device_id: DeviceId::new() },
            copy("fader1", None, "dimmer", None, false),
        );
        assert!(compile_trigger(&dangling_device, &fx.ctx()).is_none());

        let missing_animation = Trigger::new(
            TriggerKind::Action,
            input("pad1", InputCondition::default()),
            TriggerOutput { device_id: fx.head() },
            TriggerAction::Animation(AnimationRef {
                name: "Gone".into(),
                duration_ms: 100,
                iterations: None,
            }),
        );
        assert!(compile_trigger(&missing_animation, &fx.ctx()).is_none());

        let mismatch = Trigger::new(
            TriggerKind::Value,
            input("pad1", InputCondition::default()),
            TriggerOutput { device_id: fx.head() },
            TriggerAction::Values { values: ControlValues::new() },
        );
        assert!(compile_trigger(&mismatch, &fx.ctx()).is_none());

        let token_target = Trigger::new(
            TriggerKind::Value,
            input("fader1", InputCondition::default()),
            TriggerOutput { device_id: fx.head() },
            copy("fader1", None, "strobe", None, false),
        );
        assert!(compile_trigger(&token_target, &fx.ctx()).is_none());
    }

    #[test]
    fn test_action_serialization_shape() {
        let action = TriggerAction::Animation(AnimationRef {
            name: "Pulse".into(),
            duration_ms: 500,
            iterations: None,
        });
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "animation");
        assert_eq!(json["durationMs"], 500);

        let condition: InputCondition = serde_json::from_str(r#"{"edge":"release"}"#).unwrap();
        assert_eq!(condition.state(), "released");
    }
}
