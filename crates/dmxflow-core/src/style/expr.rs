//! Arithmetic expressions over style properties
//!
//! An [`Expr`] renders as style text (`var(--x)`, `calc(...)`) and evaluates
//! numerically against a property lookup, so the text written to the
//! document and the value a renderer computes from it come from one tree.

use std::fmt;
use std::ops;

use crate::control::StyleUnit;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to a custom property (name includes the leading `--`)
    Var(String),
    Number(f64),
    /// Number carrying a unit (`12.5%`, `90deg`)
    Dimension(f64, StyleUnit),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn var(property: impl Into<String>) -> Self {
        Expr::Var(property.into())
    }

    pub fn number(value: f64) -> Self {
        Expr::Number(value)
    }

    /// A literal in `unit`; unitless units produce a plain number
    pub fn dimension(value: f64, unit: StyleUnit) -> Self {
        if unit.suffix().is_empty() {
            Expr::Number(value)
        } else {
            Expr::Dimension(value, unit)
        }
    }

    /// Evaluate with `lookup` resolving property references
    ///
    /// Units are carried by the caller; a dimension evaluates to its number.
    /// Unknown properties and division by zero yield `None`.
    pub fn eval<F>(&self, lookup: &F) -> Option<f64>
    where
        F: Fn(&str) -> Option<f64>,
    {
        let value = match self {
            Expr::Var(name) => lookup(name)?,
            Expr::Number(v) | Expr::Dimension(v, _) => *v,
            Expr::Add(a, b) => a.eval(lookup)? + b.eval(lookup)?,
            Expr::Sub(a, b) => a.eval(lookup)? - b.eval(lookup)?,
            Expr::Mul(a, b) => a.eval(lookup)? * b.eval(lookup)?,
            Expr::Div(a, b) => {
                let divisor = b.eval(lookup)?;
                if divisor == 0.0 {
                    return None;
                }
                a.eval(lookup)? / divisor
            }
        };
        value.is_finite().then_some(value)
    }

    /// Properties referenced anywhere in the tree
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Var(name) => out.push(name),
            Expr::Number(_) | Expr::Dimension(..) => {}
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                a.collect_refs(out);
                b.collect_refs(out);
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(..) | Expr::Sub(..) => 1,
            Expr::Mul(..) | Expr::Div(..) => 2,
            _ => 3,
        }
    }

    fn write_inner(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, b, op) = match self {
            Expr::Var(name) => return write!(f, "var({})", name),
            Expr::Number(v) => return f.write_str(&format_number(*v)),
            Expr::Dimension(v, unit) => {
                return write!(f, "{}{}", format_number(*v), unit.suffix())
            }
            Expr::Add(a, b) => (a, b, "+"),
            Expr::Sub(a, b) => (a, b, "-"),
            Expr::Mul(a, b) => (a, b, "*"),
            Expr::Div(a, b) => (a, b, "/"),
        };
        let own = self.precedence();
        let right_strict = matches!(self, Expr::Sub(..) | Expr::Div(..));

        write_operand(f, a, a.precedence() < own)?;
        write!(f, " {} ", op)?;
        let wrap_right = b.precedence() < own || (right_strict && b.precedence() == own);
        write_operand(f, b, wrap_right)
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, wrap: bool) -> fmt::Result {
    if wrap {
        f.write_str("(")?;
        expr.write_inner(f)?;
        f.write_str(")")
    } else {
        expr.write_inner(f)
    }
}

/// Shortest decimal form with at most six fractional digits
pub fn format_number(value: f64) -> String {
    let text = format!("{:.6}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(_) | Expr::Number(_) | Expr::Dimension(..) => self.write_inner(f),
            _ => {
                f.write_str("calc(")?;
                self.write_inner(f)?;
                f.write_str(")")
            }
        }
    }
}

impl ops::Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        Expr::Add(Box::new(self), Box::new(rhs))
    }
}

impl ops::Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }
}

impl ops::Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }
}

impl ops::Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        Expr::Div(Box::new(self), Box::new(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<f64> {
        match name {
            "--in" => Some(64.0),
            _ => None,
        }
    }

    #[test]
    fn test_bare_reference() {
        let e = Expr::var("--in");
        assert_eq!(e.to_string(), "var(--in)");
        assert_eq!(e.eval(&lookup), Some(64.0));
    }

    #[test]
    fn test_calc_rendering() {
        let e = Expr::var("--in") * Expr::number(-1.0) + Expr::dimension(50.0, StyleUnit::Percent);
        assert_eq!(e.to_string(), "calc(var(--in) * -1 + 50%)");
        assert_eq!(e.eval(&lookup), Some(-14.0));
    }

    #[test]
    fn test_parenthesized_operands() {
        let e = (Expr::var("--in") - Expr::number(10.0)) / (Expr::number(20.0) - Expr::number(10.0));
        assert_eq!(e.to_string(), "calc((var(--in) - 10) / (20 - 10))");
        assert_eq!(e.eval(&lookup), Some(5.4));
    }

    #[test]
    fn test_unknown_reference_and_zero_division() {
        assert_eq!(Expr::var("--missing").eval(&lookup), None);
        let e = Expr::number(1.0) / Expr::number(0.0);
        assert_eq!(e.eval(&lookup), None);
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(-0.0000001), "0");
        assert_eq!(format_number(1.0 / 3.0), "0.333333");
    }

    #[test]
    fn test_references() {
        let e = Expr::var("--a") + Expr::var("--b") * Expr::number(2.0);
        assert_eq!(e.references(), vec!["--a", "--b"]);
    }
}
