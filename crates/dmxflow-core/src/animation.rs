//! Keyframe animations over control values
//!
//! An animation is a normalized timeline (0.0 to 1.0) of control value
//! records. Playback timing lives in the trigger that starts the animation;
//! the style engine interpolates the compiled `@keyframes` block, and
//! [`Animation::values_at_time`] computes the same curve directly.

use serde::{Deserialize, Serialize};

use crate::control::{ControlValue, ControlValues};
use crate::error::{CoreError, Result};
use crate::registry::control_type;
use crate::style::{control_properties, Declaration, KeyframeStop, KeyframesBlock};

/// Control values at a point of the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Position in the cycle, 0.0..=1.0
    pub time: f64,
    #[serde(default)]
    pub values: ControlValues,
}

impl Keyframe {
    pub fn new(time: f64, values: ControlValues) -> Self {
        Self { time, values }
    }
}

/// A named keyframe timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animation {
    /// Unique key
    pub name: String,
    pub display_name: String,
    /// Controls the animation drives
    #[serde(default)]
    pub control_ids: Vec<String>,
    /// Sorted by time; equal times keep insertion order
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
}

impl Animation {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            control_ids: Vec::new(),
            keyframes: Vec::new(),
        }
    }

    /// Insert a keyframe after every keyframe at the same or an earlier time
    ///
    /// Returns the index the keyframe was stored at.
    pub fn add_keyframe(&mut self, keyframe: Keyframe) -> Result<usize> {
        if !(0.0..=1.0).contains(&keyframe.time) {
            return Err(CoreError::KeyframeTime(keyframe.time));
        }
        for id in keyframe.values.keys() {
            if !self.control_ids.contains(id) {
                self.control_ids.push(id.clone());
            }
        }
        let index = self
            .keyframes
            .iter()
            .position(|k| k.time > keyframe.time)
            .unwrap_or(self.keyframes.len());
        self.keyframes.insert(index, keyframe);
        Ok(index)
    }

    pub fn remove_keyframe(&mut self, index: usize) -> Option<Keyframe> {
        (index < self.keyframes.len()).then(|| self.keyframes.remove(index))
    }

    /// Restore time order after keyframes were edited in place
    pub fn sort_keyframes(&mut self) {
        self.keyframes
            .sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    /// Interpolated control values at `t`
    ///
    /// Times before the first keyframe or after the last one return that
    /// keyframe's values unchanged. Between two keyframes, numeric values
    /// interpolate linearly per component and round to the nearest byte;
    /// controls present in only one of the pair pass through as they are.
    pub fn values_at_time(&self, t: f64) -> ControlValues {
        let (Some(first), Some(last)) = (self.keyframes.first(), self.keyframes.last()) else {
            return ControlValues::new();
        };
        if t <= first.time {
            return first.values.clone();
        }
        if t >= last.time {
            return last.values.clone();
        }

        let Some((from, to)) = self
            .keyframes
            .windows(2)
            .map(|pair| (&pair[0], &pair[1]))
            .find(|(a, b)| a.time <= t && t <= b.time)
        else {
            return last.values.clone();
        };

        let span = to.time - from.time;
        let factor = if span > 0.0 { (t - from.time) / span } else { 0.0 };

        let mut values = to.values.clone();
        for (id, start) in &from.values {
            let value = match to.values.get(id) {
                Some(end) => start.lerp(end, factor),
                None => *start,
            };
            values.insert(id.clone(), value);
        }
        values
    }

    /// Compile into a `@keyframes` block named `ident`
    ///
    /// Values of unknown controls are left out.
    pub fn to_keyframes(&self, ident: &str) -> KeyframesBlock {
        let stops = self
            .keyframes
            .iter()
            .map(|keyframe| KeyframeStop {
                percent: (keyframe.time * 100.0).round().clamp(0.0, 100.0) as u32,
                declarations: keyframe
                    .values
                    .iter()
                    .filter_map(|(id, value)| declarations_for(id, value))
                    .flatten()
                    .collect(),
            })
            .collect();
        KeyframesBlock {
            name: ident.to_string(),
            stops,
        }
    }
}

fn declarations_for(id: &str, value: &ControlValue) -> Option<Vec<Declaration>> {
    let Some(control) = control_type(id) else {
        tracing::debug!("Keyframe value for unknown control '{}'", id);
        return None;
    };
    Some(
        control_properties(control, value)
            .into_iter()
            .map(|(property, text)| Declaration::literal(property, text))
            .collect(),
    )
}

/// Animations keyed by unique name, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimationCollection {
    animations: Vec<Animation>,
}

impl AnimationCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, animation: Animation) -> Result<()> {
        if self.get(&animation.name).is_some() {
            return Err(CoreError::Duplicate {
                kind: "animation",
                id: animation.name,
            });
        }
        self.animations.push(animation);
        Ok(())
    }

    /// Replace an existing animation or append a new one
    pub fn upsert(&mut self, animation: Animation) {
        match self.get_mut(&animation.name) {
            Some(existing) => *existing = animation,
            None => self.animations.push(animation),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Animation> {
        let index = self.animations.iter().position(|a| a.name == name)?;
        Some(self.animations.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<&Animation> {
        self.animations.iter().find(|a| a.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Animation> {
        self.animations.iter_mut().find(|a| a.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Animation> {
        self.animations.iter()
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }
}
