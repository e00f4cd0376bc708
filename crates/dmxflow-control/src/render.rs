//! Style renderers
//!
//! A [`StyleRenderer`] evaluates a [`StyleDocument`] the way a browser engine
//! would: rules are cascaded by specificity and source order, `var()` and
//! `calc()` resolve against the input values set on the root, and bound
//! `@keyframes` blocks are run against the renderer clock. The sampling loop
//! only talks to this trait.
//!
//! [`HeadlessRenderer`] is the in-process implementation. Differences from a
//! browser engine:
//!
//! - a declaration whose expression cannot be evaluated (an input that never
//!   reported a value) is skipped, so the next rule in the cascade applies;
//! - animations always use linear timing and have no fill mode, finished
//!   animations fall back to the cascaded value;
//! - two keyframe values interpolate number by number when they have the same
//!   shape (`rgb(0, 0, 0)` and `rgb(255, 10, 0)`), otherwise they flip at the
//!   midpoint.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use dmxflow_core::control::value::clamp_byte;
use dmxflow_core::style::expr::format_number;
use dmxflow_core::style::{
    number_tokens, AnimationBinding, ColorChannel, KeyframesBlock, Selector, StyleDocument,
    StyleRule, StyleValue,
};
use dmxflow_core::Expr;

/// Evaluates style documents and exposes computed property values
pub trait StyleRenderer: Send {
    /// Replace the active document
    fn apply_document(&mut self, document: &StyleDocument);

    /// Set a numeric custom property on the root (`--input-...`)
    fn set_input_value(&mut self, property: &str, value: f64);

    /// Set or clear a state attribute on the root (`data-input-...`)
    fn set_input_state(&mut self, attribute: &str, state: Option<&str>);

    /// Recompute every element; `now` is the time since the renderer clock
    /// started
    fn recompute(&mut self, now: Duration);

    /// Computed value of a property on an element as of the last recompute
    fn computed_value(&self, element: &str, property: &str) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq)]
struct RunningAnimation {
    binding: AnimationBinding,
    started: Duration,
}

/// Result of the cascade for one element
#[derive(Debug, Default)]
struct Cascaded {
    values: BTreeMap<String, String>,
    animation: Option<AnimationBinding>,
}

/// In-process style renderer
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    rules: Vec<StyleRule>,
    keyframes: BTreeMap<String, KeyframesBlock>,
    input_values: BTreeMap<String, f64>,
    input_states: BTreeMap<String, String>,
    running: BTreeMap<String, RunningAnimation>,
    computed: BTreeMap<String, BTreeMap<String, String>>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current numeric value of a root custom property
    pub fn input_value(&self, property: &str) -> Option<f64> {
        self.input_values.get(property).copied()
    }

    /// Elements with at least one computed property
    pub fn elements(&self) -> impl Iterator<Item = &str> {
        self.computed.keys().map(String::as_str)
    }

    /// Whether an animation is bound to the element
    pub fn is_animating(&self, element: &str) -> bool {
        self.running.contains_key(element)
    }

    fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::Element(_) => true,
            Selector::WhenInput {
                attribute, state, ..
            } => self.input_states.get(attribute) == Some(state),
        }
    }

    fn evaluate(&self, expr: &Expr) -> Option<f64> {
        expr.eval(&|name: &str| self.input_values.get(name).copied())
    }

    /// Computed text of a declaration value, `None` when it does not resolve
    fn resolve(&self, value: &StyleValue) -> Option<String> {
        match value {
            StyleValue::Literal(text) => Some(text.clone()),
            StyleValue::Computed(expr, unit) => self.evaluate(expr).map(|v| unit.format(v)),
            StyleValue::Color(channels) => {
                let mut rgb = [0u8; 3];
                for (slot, channel) in rgb.iter_mut().zip(channels) {
                    *slot = match channel {
                        ColorChannel::Literal(v) => *v,
                        ColorChannel::Computed(expr) => clamp_byte(self.evaluate(expr)?),
                    };
                }
                Some(format!("rgb({}, {}, {})", rgb[0], rgb[1], rgb[2]))
            }
            StyleValue::Animation(_) => None,
        }
    }

    fn cascade(&self) -> BTreeMap<String, Cascaded> {
        // (specificity, rule order, declaration order, value)
        let mut candidates: BTreeMap<&str, Vec<(u8, usize, usize, &str, &StyleValue)>> =
            BTreeMap::new();
        for (order, rule) in self.rules.iter().enumerate() {
            if !self.matches(&rule.selector) {
                continue;
            }
            let entry = candidates.entry(rule.selector.element()).or_default();
            for (index, declaration) in rule.declarations.iter().enumerate() {
                entry.push((
                    rule.selector.specificity(),
                    order,
                    index,
                    declaration.property.as_str(),
                    &declaration.value,
                ));
            }
        }

        candidates
            .into_iter()
            .map(|(element, mut declarations)| {
                declarations.sort_by(|a, b| (b.0, b.1, b.2).cmp(&(a.0, a.1, a.2)));
                let mut styles = Cascaded::default();
                for (_, _, _, property, value) in declarations {
                    match value {
                        StyleValue::Animation(binding) => {
                            if styles.animation.is_none() {
                                styles.animation = Some(binding.clone());
                            }
                        }
                        _ if styles.values.contains_key(property) => {}
                        _ => match self.resolve(value) {
                            Some(text) => {
                                styles.values.insert(property.to_string(), text);
                            }
                            None => tracing::trace!(
                                "#{} {}: {} does not resolve",
                                element,
                                property,
                                value
                            ),
                        },
                    }
                }
                (element.to_string(), styles)
            })
            .collect()
    }

    /// Overlay the animated values of `block` at `progress` (0.0-1.0)
    fn apply_keyframes(
        &self,
        block: &KeyframesBlock,
        progress: f64,
        values: &mut BTreeMap<String, String>,
    ) {
        let percent = progress * 100.0;
        let properties: BTreeSet<&str> = block
            .stops
            .iter()
            .flat_map(|stop| stop.declarations.iter().map(|d| d.property.as_str()))
            .collect();

        for property in properties {
            let mut points: Vec<(f64, String)> = block
                .stops
                .iter()
                .filter_map(|stop| {
                    let declaration = stop
                        .declarations
                        .iter()
                        .rev()
                        .find(|d| d.property == property)?;
                    Some((stop.percent as f64, self.resolve(&declaration.value)?))
                })
                .collect();
            points.sort_by(|a, b| a.0.total_cmp(&b.0));

            // Missing 0% / 100% stops take the underlying value.
            if let Some(base) = values.get(property) {
                if points.first().is_some_and(|(p, _)| *p > 0.0) {
                    points.insert(0, (0.0, base.clone()));
                }
                if points.last().is_some_and(|(p, _)| *p < 100.0) {
                    points.push((100.0, base.clone()));
                }
            }

            if let Some(text) = sample_points(&points, percent) {
                values.insert(property.to_string(), text);
            }
        }
    }
}

impl StyleRenderer for HeadlessRenderer {
    fn apply_document(&mut self, document: &StyleDocument) {
        self.rules = document.rules().cloned().collect();
        self.keyframes = document
            .keyframes
            .iter()
            .map(|block| (block.name.clone(), block.clone()))
            .collect();
        tracing::debug!(
            "Applied style document: {} rules, {} keyframes blocks",
            self.rules.len(),
            self.keyframes.len()
        );
    }

    fn set_input_value(&mut self, property: &str, value: f64) {
        if value.is_finite() {
            self.input_values.insert(property.to_string(), value);
        }
    }

    fn set_input_state(&mut self, attribute: &str, state: Option<&str>) {
        match state {
            Some(state) => {
                self.input_states
                    .insert(attribute.to_string(), state.to_string());
            }
            None => {
                self.input_states.remove(attribute);
            }
        }
    }

    fn recompute(&mut self, now: Duration) {
        let mut running = BTreeMap::new();
        let mut computed = BTreeMap::new();

        for (element, mut styles) in self.cascade() {
            if let Some(binding) = styles.animation.take() {
                let started = match self.running.get(&element) {
                    Some(previous) if previous.binding == binding => previous.started,
                    _ => {
                        tracing::debug!("#{} starts animation {}", element, binding);
                        now
                    }
                };
                match animation_progress(&binding, now.saturating_sub(started)) {
                    Some(progress) => match self.keyframes.get(&binding.keyframes) {
                        Some(block) => self.apply_keyframes(block, progress, &mut styles.values),
                        None => tracing::debug!(
                            "#{} references missing keyframes '{}'",
                            element,
                            binding.keyframes
                        ),
                    },
                    None => tracing::trace!("#{} animation {} finished", element, binding),
                }
                running.insert(element.clone(), RunningAnimation { binding, started });
            }
            computed.insert(element, styles.values);
        }

        self.running = running;
        self.computed = computed;
    }

    fn computed_value(&self, element: &str, property: &str) -> Option<String> {
        self.computed.get(element)?.get(property).cloned()
    }
}

/// Position inside the current iteration, `None` once every iteration ran
fn animation_progress(binding: &AnimationBinding, elapsed: Duration) -> Option<f64> {
    if binding.duration_ms == 0 {
        return None;
    }
    let cycles = elapsed.as_secs_f64() * 1000.0 / binding.duration_ms as f64;
    match binding.iterations {
        Some(n) if cycles >= n as f64 => None,
        _ => Some(cycles.fract()),
    }
}

/// Value at `percent` along sorted `(percent, text)` stops
fn sample_points(points: &[(f64, String)], percent: f64) -> Option<String> {
    let (first, last) = (points.first()?, points.last()?);
    if percent <= first.0 {
        return Some(first.1.clone());
    }
    if percent >= last.0 {
        return Some(last.1.clone());
    }
    points.windows(2).find_map(|pair| {
        let (a, b) = (&pair[0], &pair[1]);
        if a.0 <= percent && percent <= b.0 {
            let span = b.0 - a.0;
            let t = if span > 0.0 { (percent - a.0) / span } else { 0.0 };
            Some(interpolate_text(&a.1, &b.1, t))
        } else {
            None
        }
    })
}

/// Interpolate two computed values number by number
///
/// Values whose text around the numbers differs (`on` and `off`, `50%` and
/// `rgb(...)`) switch from `from` to `to` at `t = 0.5`.
pub fn interpolate_text(from: &str, to: &str, t: f64) -> String {
    let a = number_tokens(from);
    let b = number_tokens(to);
    if a.len() != b.len() || skeleton(from, &a) != skeleton(to, &b) {
        let pick = if t < 0.5 { from } else { to };
        return pick.to_string();
    }

    let mut out = String::with_capacity(from.len());
    let mut cursor = 0;
    for ((range, x), (_, y)) in a.iter().zip(&b) {
        out.push_str(&from[cursor..range.start]);
        out.push_str(&format_number(x + (y - x) * t));
        cursor = range.end;
    }
    out.push_str(&from[cursor..]);
    out
}

/// Text between the numbers
fn skeleton<'a>(text: &'a str, tokens: &[(std::ops::Range<usize>, f64)]) -> Vec<&'a str> {
    let mut parts = Vec::with_capacity(tokens.len() + 1);
    let mut cursor = 0;
    for (range, _) in tokens {
        parts.push(&text[cursor..range.start]);
        cursor = range.end;
    }
    parts.push(&text[cursor..]);
    parts
}


#[cfg(test)]
mod interpolation_props {
    use super::interpolate_text;
    use dmxflow_core::style::extract_number;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn interpolated_values_stay_between_stops(a in 0u8..=255, b in 0u8..=255, t in 0.0f64..=1.0) {
            let text = interpolate_text(&format!("{}%", a), &format!("{}%", b), t);
            let value = extract_number(&text, 0).unwrap();
            let (low, high) = (a.min(b) as f64, a.max(b) as f64);
            prop_assert!(value >= low - 1e-6 && value <= high + 1e-6, "{} not in {}..{}", value, low, high);
            prop_assert!(text.ends_with('%'));
        }
    }
}
