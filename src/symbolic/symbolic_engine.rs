//! # Symbolic Engine Module
//!
//! Core expression tree used by every stage of the step-by-step calculator: the splitter
//! builds it, the normalizer rewrites it, the differentiation and integration engines walk
//! it, and the printer turns it back into the compact textual notation users type in.
//!
//! ## Main Structures and Methods
//!
//! ### `Expr` Enum
//! - **Variables**: `Var(String)` - the variable of the calculation, "x" by default
//! - **Constants**: `Const(f64)` - numerical constants
//! - **Operations**: `Add`, `Sub`, `Mul`, `Div`, `Pow` - basic arithmetic
//! - **Functions**: `Exp`, `Ln`, `sin`, `cos`, `tg`, `sqrt`, `abs`
//!
//! ### Key Methods
//! - `contains_variable()`, `substitute_variable()` - tree queries and rewriting
//! - `eval_expression()` - numeric evaluation (used to check results by value)
//! - `as_monomial()`, `monomial()` - recognising and building `a*x^n`
//! - `negate()` - sign flip that keeps coefficients in front
//!
//! ## Printing
//! `Display` is a precedence aware printer: it only emits the parentheses the grammar
//! needs, glues numeric coefficients to variables (`12x^3`, `-x`, `2x*sin(x)`) and turns
//! `a + (-b)` into `a - b`. Its output is accepted by `parse_expr::parse_expression`
//! and prints back identically.
//!
//! ## Non-standard Function Names
//! Tangent is stored as `tg` like the rest of this library does, but printed as `tan`.

#![allow(non_camel_case_types)]

use std::fmt;
use std::str::FromStr;

use strum_macros::{Display, EnumString};

use crate::symbolic::utils::format_number;

/// Elementary functions the calculator knows how to differentiate and (partly) integrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MathFunction {
    Sin,
    Cos,
    #[strum(to_string = "tan", serialize = "tg")]
    Tan,
    #[strum(to_string = "ln", serialize = "log")]
    Ln,
    Exp,
    Sqrt,
    Abs,
}

impl MathFunction {
    /// wraps `arg` into the matching `Expr` variant
    pub fn apply(self, arg: Expr) -> Expr {
        let arg = arg.boxed();
        match self {
            MathFunction::Sin => Expr::sin(arg),
            MathFunction::Cos => Expr::cos(arg),
            MathFunction::Tan => Expr::tg(arg),
            MathFunction::Ln => Expr::Ln(arg),
            MathFunction::Exp => Expr::Exp(arg),
            MathFunction::Sqrt => Expr::sqrt(arg),
            MathFunction::Abs => Expr::abs(arg),
        }
    }

    /// case-sensitive lookup by name, aliases included ("tg", "log")
    pub fn from_name(name: &str) -> Option<MathFunction> {
        MathFunction::from_str(name).ok()
    }
}

/// Expression tree. Built once by the splitter, then only rewritten into new trees.
///
/// # Examples
/// ```rust, ignore
/// use RustedCalculus::symbolic::symbolic_engine::Expr;
/// let x = Expr::Var("x".to_string());
/// let expr = Expr::Add(Box::new(x), Box::new(Expr::Const(2.0)));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Symbolic variable with a name
    Var(String),
    /// Numerical constant value
    Const(f64),
    /// Addition operation: left + right
    Add(Box<Expr>, Box<Expr>),
    /// Subtraction operation: left - right
    Sub(Box<Expr>, Box<Expr>),
    /// Multiplication operation: left * right
    Mul(Box<Expr>, Box<Expr>),
    /// Division operation: left / right
    Div(Box<Expr>, Box<Expr>),
    /// Power operation: base ^ exponent. The parser only produces numeric exponents
    Pow(Box<Expr>, Box<Expr>),
    /// Exponential function: e^x
    Exp(Box<Expr>),
    /// Natural logarithm: ln(x)
    Ln(Box<Expr>),
    /// Sine function: sin(x)
    sin(Box<Expr>),
    /// Cosine function: cos(x)
    cos(Box<Expr>),
    /// Tangent function: tan(x) - uses mathematical notation 'tg'
    tg(Box<Expr>),
    /// Square root: sqrt(x)
    sqrt(Box<Expr>),
    /// Absolute value, produced by the logarithm rule of integration: ln(abs(x))
    abs(Box<Expr>),
}

/// Position of a sub-expression inside its parent, decides which parentheses are needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Top,
    SumLeft,
    SumRight,
    ProductLeft,
    ProductRight,
    Denominator,
    PowerBase,
}

fn wrap(text: String) -> String {
    format!("({})", text)
}

fn coefficient_prefix(c: f64) -> String {
    if c == 1.0 {
        String::new()
    } else if c == -1.0 {
        "-".to_string()
    } else {
        format_number(c)
    }
}

fn render(expr: &Expr, slot: Slot) -> String {
    match expr {
        Expr::Var(name) => name.clone(),
        Expr::Const(c) => {
            let text = format_number(*c);
            let exposed_sign = text.starts_with('-')
                && matches!(
                    slot,
                    Slot::ProductRight | Slot::Denominator | Slot::PowerBase
                );
            if exposed_sign { wrap(text) } else { text }
        }
        Expr::Add(lhs, rhs) | Expr::Sub(lhs, rhs) => {
            let subtract = matches!(expr, Expr::Sub(..));
            let left = render(lhs, Slot::SumLeft);
            let text = if rhs.is_negative_looking() {
                let op = if subtract { "+" } else { "-" };
                format!("{} {} {}", left, op, render(&rhs.negate(), Slot::SumRight))
            } else {
                let op = if subtract { "-" } else { "+" };
                format!("{} {} {}", left, op, render(rhs, Slot::SumRight))
            };
            match slot {
                Slot::Top | Slot::SumLeft => text,
                _ => wrap(text),
            }
        }
        Expr::Mul(lhs, rhs) => {
            let text = match lhs.as_ref() {
                Expr::Const(c) if *c == 1.0 => return render(rhs, slot),
                Expr::Const(c) if rhs.leads_with_variable() => {
                    format!("{}{}", coefficient_prefix(*c), render(rhs, Slot::ProductLeft))
                }
                Expr::Const(c) if *c == -1.0 => format!("-{}", render(rhs, Slot::ProductLeft)),
                _ => format!(
                    "{}*{}",
                    render(lhs, Slot::ProductLeft),
                    render(rhs, Slot::ProductRight)
                ),
            };
            product_slot(text, slot)
        }
        Expr::Div(lhs, rhs) => {
            let text = format!(
                "{}/{}",
                render(lhs, Slot::ProductLeft),
                render(rhs, Slot::Denominator)
            );
            // a*(b/c) would read back as (a*b)/c
            if slot == Slot::ProductRight {
                return wrap(text);
            }
            product_slot(text, slot)
        }
        Expr::Pow(base, exponent) => {
            let exponent = match exponent.as_ref() {
                Expr::Const(c) => format_number(*c),
                other => render(other, Slot::PowerBase),
            };
            let text = format!("{}^{}", render(base, Slot::PowerBase), exponent);
            // (x^3)^2, not x^3^2
            if slot == Slot::PowerBase { wrap(text) } else { text }
        }
        _ => match expr.as_function() {
            Some((function, arg)) => format!("{}({})", function, render(arg, Slot::Top)),
            None => unreachable!("every remaining variant is a function call"),
        },
    }
}

fn product_slot(text: String, slot: Slot) -> String {
    match slot {
        Slot::Denominator | Slot::PowerBase => wrap(text),
        Slot::ProductRight if text.starts_with('-') => wrap(text),
        _ => text,
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", render(self, Slot::Top))
    }
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(self))
    }
}

impl Expr {
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    pub fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    pub fn pow(self, exponent: Expr) -> Expr {
        Expr::Pow(self.boxed(), exponent.boxed())
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(c) if *c == 0.0)
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Expr::Const(c) if *c == 1.0)
    }

    /// splits a function call into its kind and argument
    pub fn as_function(&self) -> Option<(MathFunction, &Expr)> {
        match self {
            Expr::Exp(arg) => Some((MathFunction::Exp, arg)),
            Expr::Ln(arg) => Some((MathFunction::Ln, arg)),
            Expr::sin(arg) => Some((MathFunction::Sin, arg)),
            Expr::cos(arg) => Some((MathFunction::Cos, arg)),
            Expr::tg(arg) => Some((MathFunction::Tan, arg)),
            Expr::sqrt(arg) => Some((MathFunction::Sqrt, arg)),
            Expr::abs(arg) => Some((MathFunction::Abs, arg)),
            _ => None,
        }
    }

    /// true if the printed form starts with a bare variable (`x`, `x^2`, `x*sin(x)`)
    fn leads_with_variable(&self) -> bool {
        match self {
            Expr::Var(_) => true,
            Expr::Pow(base, exponent) => {
                matches!(base.as_ref(), Expr::Var(_)) && matches!(exponent.as_ref(), Expr::Const(_))
            }
            Expr::Mul(lhs, _) => lhs.leads_with_variable(),
            _ => false,
        }
    }

    /// true if the expression prints with a leading minus
    pub fn is_negative_looking(&self) -> bool {
        match self {
            Expr::Const(c) => *c < 0.0,
            Expr::Mul(lhs, _) | Expr::Div(lhs, _) => lhs.is_negative_looking(),
            _ => false,
        }
    }

    /// Sign flip. Keeps a numeric coefficient in front so that `-(2x*cos(x))`
    /// becomes `-2x*cos(x)` instead of `-1*(2x*cos(x))`.
    pub fn negate(&self) -> Expr {
        match self {
            Expr::Const(c) => Expr::Const(-c),
            Expr::Mul(lhs, rhs) => match lhs.as_ref() {
                Expr::Const(c) if *c == -1.0 => rhs.as_ref().clone(),
                Expr::Const(c) => Expr::Mul(Expr::Const(-c).boxed(), rhs.clone()),
                _ => Expr::Mul(lhs.negate().boxed(), rhs.clone()),
            },
            Expr::Div(lhs, rhs) => Expr::Div(lhs.negate().boxed(), rhs.clone()),
            Expr::Add(lhs, rhs) => Expr::Sub(lhs.negate().boxed(), rhs.clone()),
            Expr::Sub(lhs, rhs) => Expr::Add(lhs.negate().boxed(), rhs.clone()),
            _ => -self.clone(),
        }
    }

    pub fn contains_variable(&self, var_name: &str) -> bool {
        match self {
            Expr::Var(name) => name == var_name,
            Expr::Const(_) => false,
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => {
                lhs.contains_variable(var_name) || rhs.contains_variable(var_name)
            }
            _ => self
                .as_function()
                .is_some_and(|(_, arg)| arg.contains_variable(var_name)),
        }
    }

    /// replaces every occurrence of the variable `var` with `value`
    pub fn substitute_variable(&self, var: &str, value: &Expr) -> Expr {
        match self {
            Expr::Var(name) if name == var => value.clone(),
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => {
                lhs.substitute_variable(var, value) + rhs.substitute_variable(var, value)
            }
            Expr::Sub(lhs, rhs) => {
                lhs.substitute_variable(var, value) - rhs.substitute_variable(var, value)
            }
            Expr::Mul(lhs, rhs) => {
                lhs.substitute_variable(var, value) * rhs.substitute_variable(var, value)
            }
            Expr::Div(lhs, rhs) => {
                lhs.substitute_variable(var, value) / rhs.substitute_variable(var, value)
            }
            Expr::Pow(base, exponent) => base
                .substitute_variable(var, value)
                .pow(exponent.substitute_variable(var, value)),
            _ => match self.as_function() {
                Some((function, arg)) => function.apply(arg.substitute_variable(var, value)),
                None => self.clone(),
            },
        }
    }

    /// Numeric value of the expression. A variable missing from `vars` evaluates to NaN.
    pub fn eval_expression(&self, vars: &[&str], values: &[f64]) -> f64 {
        match self {
            Expr::Var(name) => vars
                .iter()
                .position(|v| v == name)
                .and_then(|i| values.get(i).copied())
                .unwrap_or(f64::NAN),
            Expr::Const(val) => *val,
            Expr::Add(lhs, rhs) => {
                lhs.eval_expression(vars, values) + rhs.eval_expression(vars, values)
            }
            Expr::Sub(lhs, rhs) => {
                lhs.eval_expression(vars, values) - rhs.eval_expression(vars, values)
            }
            Expr::Mul(lhs, rhs) => {
                lhs.eval_expression(vars, values) * rhs.eval_expression(vars, values)
            }
            Expr::Div(lhs, rhs) => {
                lhs.eval_expression(vars, values) / rhs.eval_expression(vars, values)
            }
            Expr::Pow(base, exponent) => base
                .eval_expression(vars, values)
                .powf(exponent.eval_expression(vars, values)),
            Expr::Exp(arg) => arg.eval_expression(vars, values).exp(),
            Expr::Ln(arg) => arg.eval_expression(vars, values).ln(),
            Expr::sin(arg) => arg.eval_expression(vars, values).sin(),
            Expr::cos(arg) => arg.eval_expression(vars, values).cos(),
            Expr::tg(arg) => arg.eval_expression(vars, values).tan(),
            Expr::sqrt(arg) => arg.eval_expression(vars, values).sqrt(),
            Expr::abs(arg) => arg.eval_expression(vars, values).abs(),
        }
    }

    /// Recognises `a*var^n` in the shapes the parser and the engines produce:
    /// `var`, `var^n`, `a*var`, `a*var^n`. Returns `(a, n)`.
    pub fn as_monomial(&self, var: &str) -> Option<(f64, f64)> {
        let power_of_var = |e: &Expr| -> Option<f64> {
            match e {
                Expr::Var(name) if name == var => Some(1.0),
                Expr::Pow(base, exponent) => match (base.as_ref(), exponent.as_ref()) {
                    (Expr::Var(name), Expr::Const(n)) if name == var => Some(*n),
                    _ => None,
                },
                _ => None,
            }
        };
        match self {
            Expr::Mul(lhs, rhs) => match lhs.as_ref() {
                Expr::Const(a) => power_of_var(rhs).map(|n| (*a, n)),
                _ => None,
            },
            other => power_of_var(other).map(|n| (1.0, n)),
        }
    }

    /// builds `a*var^n` in the canonical shape recognised by `as_monomial`
    pub fn monomial(a: f64, n: f64, var: &str) -> Expr {
        if a == 0.0 {
            return Expr::Const(0.0);
        }
        if n == 0.0 {
            return Expr::Const(a);
        }
        let base = if n == 1.0 {
            Expr::var(var)
        } else {
            Expr::var(var).pow(Expr::Const(n))
        };
        if a == 1.0 {
            base
        } else {
            Expr::Const(a) * base
        }
    }

    /// number of nodes in the tree
    pub fn node_count(&self) -> usize {
        match self {
            Expr::Var(_) | Expr::Const(_) => 1,
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => 1 + lhs.node_count() + rhs.node_count(),
            _ => 1 + self.as_function().map_or(0, |(_, arg)| arg.node_count()),
        }
    }

    /// Left-associated product of `factors`, `1` for an empty list.
    pub fn product_of(factors: Vec<Expr>) -> Expr {
        factors
            .into_iter()
            .reduce(|acc, factor| acc * factor)
            .unwrap_or(Expr::Const(1.0))
    }
}
