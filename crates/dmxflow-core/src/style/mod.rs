//! Style compiler and sampler
//!
//! Forward, control values become style property literals ([`get_properties`]);
//! the whole show becomes a [`StyleDocument`]. Backwards, computed property
//! text is sampled into control values ([`sample_control_values`]).

pub mod document;
pub mod expr;
pub mod properties;
pub mod remap;
pub mod sampler;
pub mod slug;

pub use document::{
    AnimationBinding, ColorChannel, Declaration, KeyframeStop, KeyframesBlock, Selector,
    StyleDocument, StyleRule, StyleValue,
};
pub use expr::Expr;
pub use properties::{control_properties, format_rgb, get_properties};
pub use remap::compile_remap;
pub use sampler::{
    changed_controls, extract_number, number_tokens, sample_control_values, SampleOutcome,
    SkippedAxis,
};
pub use slug::{slugify, SlugAllocator};
