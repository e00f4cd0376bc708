//! Linear remapping between two style domains
//!
//! `out = (in - in_min) / (in_max - in_min) * (out_max - out_min) + out_min`,
//! with `out_min`/`out_max` swapped when inverted. The emitted expression is
//! kept as small as the units allow.

use crate::control::{StyleDescriptor, StyleUnit};
use crate::style::expr::Expr;

/// Expression computing `output` from the property `input_var`
///
/// `input` describes the domain and unit of `input_var`. Returns `None` when
/// the two domains cannot be mapped: a keyword domain only maps onto an
/// identical keyword domain, and never inverted.
pub fn compile_remap(
    input_var: &str,
    input: &StyleDescriptor,
    output: &StyleDescriptor,
    invert: bool,
) -> Option<Expr> {
    let in_token = input.unit == StyleUnit::Token;
    let out_token = output.unit == StyleUnit::Token;
    if in_token || out_token {
        let identical = in_token
            && out_token
            && input.same_domain(output)
            && input.channel_min == output.channel_min
            && input.channel_max == output.channel_max;
        return (identical && !invert).then(|| Expr::var(input_var));
    }

    if !invert && input.same_domain(output) {
        return Some(Expr::var(input_var));
    }

    let in_width = input.domain_max - input.domain_min;
    let (out_min, out_max) = if invert {
        (output.domain_max, output.domain_min)
    } else {
        (output.domain_min, output.domain_max)
    };
    let out_width = out_max - out_min;

    if input.unit == output.unit {
        let scale = out_width / in_width;
        let offset = out_min - input.domain_min * scale;
        return Some(
            Expr::var(input_var) * Expr::number(scale) + Expr::dimension(offset, output.unit),
        );
    }

    let normalized = (Expr::var(input_var) - Expr::dimension(input.domain_min, input.unit))
        / Expr::number(in_width);
    Some(
        normalized * Expr::dimension(out_width, output.unit)
            + Expr::dimension(out_min, output.unit),
    )
}
