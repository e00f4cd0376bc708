//! The generated style document
//!
//! The document is rebuilt wholesale from the show's entities on every
//! change. It holds three sections, written in this order:
//!
//! 1. one rule per device carrying its current control values,
//! 2. one `@keyframes` block per animation,
//! 3. one rule per compilable trigger.
//!
//! Identifiers are slugs of display names, allocated in a fixed order so the
//! same entities always produce the same text.

use std::collections::BTreeMap;
use std::fmt;

use crate::animation::AnimationCollection;
use crate::control::StyleUnit;
use crate::device::{Device, DeviceId};
use crate::input::InputCatalog;
use crate::registry::device_types;
use crate::style::expr::Expr;
use crate::style::properties::get_properties;
use crate::style::slug::SlugAllocator;
use crate::trigger::{compile_trigger, CompileContext, TriggerCollection};

/// Selector of a rule
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// `#<element>`
    Element(String),
    /// `:root[<attribute>="<state>"] #<element>`
    WhenInput {
        attribute: String,
        state: String,
        element: String,
    },
}

impl Selector {
    /// Element the rule applies to
    pub fn element(&self) -> &str {
        match self {
            Selector::Element(element) | Selector::WhenInput { element, .. } => element,
        }
    }

    /// Conditional rules win over unconditional ones
    pub fn specificity(&self) -> u8 {
        match self {
            Selector::Element(_) => 1,
            Selector::WhenInput { .. } => 2,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Element(element) => write!(f, "#{}", element),
            Selector::WhenInput {
                attribute,
                state,
                element,
            } => write!(f, ":root[{}=\"{}\"] #{}", attribute, state, element),
        }
    }
}

/// Binding of a keyframes block to an element
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationBinding {
    /// Keyframes block identifier
    pub keyframes: String,
    pub duration_ms: u64,
    /// `None` repeats forever
    pub iterations: Option<u32>,
}

impl fmt::Display for AnimationBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}ms linear ", self.keyframes, self.duration_ms)?;
        match self.iterations {
            Some(n) => write!(f, "{}", n),
            None => f.write_str("infinite"),
        }
    }
}

/// One component inside `rgb(...)`
#[derive(Debug, Clone, PartialEq)]
pub enum ColorChannel {
    Literal(u8),
    Computed(Expr),
}

impl fmt::Display for ColorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorChannel::Literal(v) => write!(f, "{}", v),
            ColorChannel::Computed(expr) => write!(f, "{}", expr),
        }
    }
}

/// Right-hand side of a declaration
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    Literal(String),
    /// Expression whose result is formatted in `unit`
    Computed(Expr, StyleUnit),
    Color([ColorChannel; 3]),
    Animation(AnimationBinding),
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleValue::Literal(text) => f.write_str(text),
            StyleValue::Computed(expr, _) => write!(f, "{}", expr),
            StyleValue::Color([r, g, b]) => write!(f, "rgb({}, {}, {})", r, g, b),
            StyleValue::Animation(binding) => write!(f, "{}", binding),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: StyleValue,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: StyleValue) -> Self {
        Self {
            property: property.into(),
            value,
        }
    }

    pub fn literal(property: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(property, StyleValue::Literal(text.into()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    pub selector: Selector,
    pub declarations: Vec<Declaration>,
}

impl fmt::Display for StyleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {{", self.selector)?;
        for declaration in &self.declarations {
            writeln!(f, "  {}: {};", declaration.property, declaration.value)?;
        }
        f.write_str("}")
    }
}

/// One stop of a keyframes block
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeStop {
    /// Position in percent of the cycle
    pub percent: u32,
    pub declarations: Vec<Declaration>,
}

/// `@keyframes <name> { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframesBlock {
    pub name: String,
    pub stops: Vec<KeyframeStop>,
}

impl fmt::Display for KeyframesBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "@keyframes {} {{", self.name)?;
        for stop in &self.stops {
            write!(f, "  {}% {{", stop.percent)?;
            for declaration in &stop.declarations {
                write!(f, " {}: {};", declaration.property, declaration.value)?;
            }
            writeln!(f, " }}")?;
        }
        f.write_str("}")
    }
}

/// Generated style text of a show
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleDocument {
    pub device_rules: Vec<StyleRule>,
    pub keyframes: Vec<KeyframesBlock>,
    pub trigger_rules: Vec<StyleRule>,
    /// Element identifier of every device
    pub element_ids: BTreeMap<DeviceId, String>,
}

impl StyleDocument {
    /// Compile the document from the show's entities
    ///
    /// `devices` must be in display order; identifiers are allocated in that
    /// order.
    pub fn generate(
        devices: &[Device],
        animations: &AnimationCollection,
        triggers: &TriggerCollection,
        inputs: &dyn InputCatalog,
    ) -> Self {
        let registry = device_types();
        let mut doc = StyleDocument::default();

        let mut element_slugs = SlugAllocator::new();
        for device in devices {
            let element = element_slugs.allocate(&device.display_name);
            doc.element_ids.insert(device.id, element.clone());

            let Some(device_type) = registry.get(&device.device_type_key) else {
                tracing::debug!(
                    "Device '{}' has unknown type '{}', no rule emitted",
                    device.display_name,
                    device.device_type_key
                );
                continue;
            };
            let declarations = get_properties(&device.control_values, device_type.controls())
                .into_iter()
                .map(|(property, text)| Declaration::literal(property, text))
                .collect();
            doc.device_rules.push(StyleRule {
                selector: Selector::Element(element),
                declarations,
            });
        }

        let mut keyframe_slugs = SlugAllocator::new();
        let mut keyframe_names = BTreeMap::new();
        for animation in animations.iter() {
            let ident = keyframe_slugs.allocate(&animation.display_name);
            doc.keyframes.push(animation.to_keyframes(&ident));
            keyframe_names.insert(animation.name.clone(), ident);
        }

        let ctx = CompileContext {
            devices,
            element_ids: &doc.element_ids,
            animations,
            keyframe_names: &keyframe_names,
            inputs,
        };
        doc.trigger_rules = triggers
            .iter()
            .filter_map(|trigger| compile_trigger(trigger, &ctx))
            .collect();

        doc
    }

    /// Element identifier of a device
    pub fn element_id(&self, device: &DeviceId) -> Option<&str> {
        self.element_ids.get(device).map(String::as_str)
    }

    /// Keyframes block by identifier
    pub fn keyframes_block(&self, name: &str) -> Option<&KeyframesBlock> {
        self.keyframes.iter().find(|block| block.name == name)
    }

    /// Every rule, device rules first
    pub fn rules(&self) -> impl Iterator<Item = &StyleRule> {
        self.device_rules.iter().chain(self.trigger_rules.iter())
    }
}

impl fmt::Display for StyleDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "/* devices */")?;
        for rule in &self.device_rules {
            writeln!(f, "{}", rule)?;
        }
        writeln!(f)?;
        writeln!(f, "/* animations */")?;
        for block in &self.keyframes {
            writeln!(f, "{}", block)?;
        }
        writeln!(f)?;
        writeln!(f, "/* triggers */")?;
        for rule in &self.trigger_rules {
            writeln!(f, "{}", rule)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_text() {
        assert_eq!(Selector::Element("par".into()).to_string(), "#par");
        let when = Selector::WhenInput {
            attribute: "data-input-pad-a1".into(),
            state: "pressed".into(),
            element: "par".into(),
        };
        assert_eq!(when.to_string(), ":root[data-input-pad-a1=\"pressed\"] #par");
        assert!(when.specificity() > Selector::Element("par".into()).specificity());
    }

    #[test]
    fn test_rule_text() {
        let rule = StyleRule {
            selector: Selector::Element("wash".into()),
            declarations: vec![
                Declaration::literal("--dimmer", "50.2%"),
                Declaration::new(
                    "color",
                    StyleValue::Color([
                        ColorChannel::Literal(1),
                        ColorChannel::Computed(Expr::var("--input-fader")),
                        ColorChannel::Literal(3),
                    ]),
                ),
                Declaration::new(
                    "animation",
                    StyleValue::Animation(AnimationBinding {
                        keyframes: "pulse".into(),
                        duration_ms: 1500,
                        iterations: None,
                    }),
                ),
            ],
        };
        assert_eq!(
            rule.to_string(),
            "#wash {\n  --dimmer: 50.2%;\n  color: rgb(1, var(--input-fader), 3);\n  animation: pulse 1500ms linear infinite;\n}"
        );
    }

    #[test]
    fn test_keyframes_text() {
        let block = KeyframesBlock {
            name: "fade".into(),
            stops: vec![
                KeyframeStop {
                    percent: 0,
                    declarations: vec![Declaration::literal("--dimmer", "0.0%")],
                },
                KeyframeStop {
                    percent: 100,
                    declarations: vec![Declaration::literal("--dimmer", "100.0%")],
                },
            ],
        };
        assert_eq!(
            block.to_string(),
            "@keyframes fade {\n  0% { --dimmer: 0.0%; }\n  100% { --dimmer: 100.0%; }\n}"
        );
    }

    #[test]
    fn test_keyframes_named_after_display_name() {
        use crate::animation::Animation;
        use crate::input::InputRegistry;

        let mut animations = AnimationCollection::default();
        animations.insert(Animation::new("a1", "Strobe Chase")).unwrap();
        animations.insert(Animation::new("a2", "strobe chase")).unwrap();

        let doc = StyleDocument::generate(
            &[],
            &animations,
            &TriggerCollection::default(),
            &InputRegistry::default(),
        );
        assert!(doc.keyframes_block("strobe-chase").is_some());
        assert!(doc.keyframes_block("strobe-chase-2").is_some());
        assert!(doc.keyframes_block("a1").is_none());
    }
}
