//! Rendered style values back to control values
//!
//! The inverse of [`get_properties`](super::get_properties). Each style axis
//! of each control is read from the renderer, the number at the axis' slot is
//! pulled out of the computed text and mapped back onto the channel range.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::ops::Range;

use crate::control::{ControlKind, ControlValues, StyleUnit};
use crate::device::ControlBinding;

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?").expect("valid number pattern")
});

/// The `slot`-th signed number in a computed value
pub fn extract_number(text: &str, slot: usize) -> Option<f64> {
    NUMBER_RE
        .find_iter(text)
        .nth(slot)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Every number in a computed value with its byte range
pub fn number_tokens(text: &str) -> Vec<(Range<usize>, f64)> {
    NUMBER_RE
        .find_iter(text)
        .filter_map(|m| {
            let value = m.as_str().parse::<f64>().ok()?;
            value.is_finite().then(|| (m.range(), value))
        })
        .collect()
}

/// An axis that could not be read back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAxis {
    pub control_id: String,
    pub axis: String,
    pub property: String,
}

/// Result of sampling one device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleOutcome {
    /// A value for every control of the device
    pub values: ControlValues,
    /// Axes that kept their previous value
    pub skipped: Vec<SkippedAxis>,
}

/// Read every control of a device back from computed style values
///
/// `read` returns the computed text of a style property, or `None` when the
/// renderer has nothing for it. Unreadable axes keep the value from
/// `previous`, or the control's default when there is none.
pub fn sample_control_values<F>(
    controls: &[ControlBinding],
    previous: &ControlValues,
    mut read: F,
) -> SampleOutcome
where
    F: FnMut(&str) -> Option<String>,
{
    let mut outcome = SampleOutcome::default();
    // Several axes share one property (color components), read it once.
    let mut cache: BTreeMap<String, Option<String>> = BTreeMap::new();

    for binding in controls {
        let control = &binding.control;
        let mut value = previous
            .get(binding.id())
            .copied()
            .filter(|v| control.axis_channel(v, 0).is_some())
            .unwrap_or_else(|| control.default_value());

        for (axis, descriptor) in control.style_metadata().iter().enumerate() {
            let computed = cache
                .entry(descriptor.style_property.clone())
                .or_insert_with(|| read(&descriptor.style_property));

            let channel = computed.as_deref().and_then(|text| match control.kind() {
                ControlKind::Toggle(spec) => control
                    .toggle_from_token(text)
                    .map(|on| if on { spec.on_value } else { spec.off_value }),
                _ if descriptor.unit == StyleUnit::Token => None,
                _ => extract_number(text, descriptor.slot)
                    .map(|number| descriptor.style_to_channel(number)),
            });

            match channel {
                Some(channel) => control.set_axis(&mut value, axis, channel),
                None => {
                    tracing::debug!(
                        "Cannot sample {}.{} from {} ({:?})",
                        binding.id(),
                        descriptor.id,
                        descriptor.style_property,
                        computed
                    );
                    outcome.skipped.push(SkippedAxis {
                        control_id: binding.id().to_string(),
                        axis: descriptor.id.clone(),
                        property: descriptor.style_property.clone(),
                    });
                }
            }
        }

        outcome.values.insert(binding.id().to_string(), value);
    }

    outcome
}

/// Ids of controls whose value differs between two samples
pub fn changed_controls<'a>(
    before: &'a ControlValues,
    after: &'a ControlValues,
) -> impl Iterator<Item = &'a str> {
    after
        .iter()
        .filter(move |(id, value)| before.get(id.as_str()) != Some(*value))
        .map(|(id, _)| id.as_str())
}
