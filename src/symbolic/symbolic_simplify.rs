//! # Expression Normalization Module
//!
//! Cleans up the raw output of the rule engines (`1*cos(x) + x*0 - -sin(x)`) into the form a
//! person would write (`cos(x) + sin(x)`). Normalization is a bottom-up rewrite pass repeated
//! until the tree stops changing, so `normalize(normalize(e)) == normalize(e)`.
//!
//! ## Rewrites
//!
//! 1. **Additive identity**: `a + 0`, `0 + a`, `a - 0` drop the zero, `0 - a` becomes `-a`
//! 2. **Sign merging**: `a + (-b)` becomes `a - b`, `a - (-b)` becomes `a + b`
//! 3. **Left association**: `a + (b - c)` becomes `(a + b) - c`, `a - (b + c)` becomes `(a - b) - c`,
//!    so the sign rules always see neighbouring terms
//! 4. **Multiplicative identities**: annihilation by `0`, removal of `1*`
//! 5. **Quotients to the right**: `a*(b/c)` becomes `(a*b)/c`, the way the splitter reads `a*b/c`
//! 6. **Coefficients first**: constants of a product are folded and moved to the front,
//!    which also propagates signs (`x*(-sin(x))` becomes `-x*sin(x)`) and removes double negation
//! 7. **Minus over a sum**: `-(a + b)` becomes `-a - b`, also when the sum leads a product:
//!    `-((a + b)*c)` becomes `(-a - b)*c`
//! 8. **Powers**: `u^1`, `u^0`, numeric powers, `(u^a)^n` becomes `u^(a*n)` for integral `n`
//! 9. **Quotients**: `0/a`, `a/1`, nested numeric divisors, integral numeric quotients,
//!    `(1/2*u)/4` becomes `u/8`. A non-integral quotient such as `1/2` stays symbolic
//!
//! [`Expr::canonical`] additionally reads the printed text back until it is stable, so a
//! result passed through `normalize_expression` again comes out unchanged.
//!
//! Parentheses are not part of the tree: the printer emits only the grouping the grammar
//! requires, so doubled parentheses and parentheses around bare monomials never appear.
use log::warn;

use crate::symbolic::errors::Result;
use crate::symbolic::parse_expr::parse_expression;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::is_integral;

const QUOTIENT_TOLERANCE: f64 = 1e-12;
const CANONICAL_ROUNDS: usize = 8;

impl Expr {
    pub fn as_const(&self) -> Option<f64> {
        match self {
            Expr::Const(c) => Some(*c),
            _ => None,
        }
    }

    /// `Some((c, rest))` for a product whose left factor is the numeric constant `c`
    pub fn leading_coefficient(&self) -> Option<(f64, &Expr)> {
        match self {
            Expr::Mul(lhs, rhs) => lhs.as_const().map(|c| (c, rhs.as_ref())),
            _ => None,
        }
    }

    //___________________________________NORMALIZATION____________________________________

    /// Rewrites to the fixpoint of the rules listed in the module documentation.
    pub fn normalize(&self) -> Expr {
        let limit = 4 * self.node_count() + 16;
        let mut current = self.clone();
        for _ in 0..limit {
            let next = current.normalize_once();
            if next == current {
                return current;
            }
            current = next;
        }
        warn!("normalization of {} stopped after {} passes", self, limit);
        current
    }

    fn normalize_once(&self) -> Expr {
        match self {
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => simplify_sum(lhs.normalize_once(), rhs.normalize_once()),
            Expr::Sub(lhs, rhs) => {
                simplify_difference(lhs.normalize_once(), rhs.normalize_once())
            }
            Expr::Mul(lhs, rhs) => simplify_product(lhs.normalize_once(), rhs.normalize_once()),
            Expr::Div(lhs, rhs) => {
                simplify_quotient(lhs.normalize_once(), rhs.normalize_once())
            }
            Expr::Pow(base, exponent) => {
                simplify_power(base.normalize_once(), exponent.normalize_once())
            }
            _ => match self.as_function() {
                Some((function, arg)) => function.apply(arg.normalize_once()),
                None => self.clone(),
            },
        }
    }

    /// Splits an expression into a numeric coefficient and the residual expression:
    /// `2x*cos(x)` gives `(2, x*cos(x))`, `x^3/3` gives `(1/3, x^3)`, `5` gives `(5, 1)`.
    /// Residuals of equal value but different shape are not unified.
    pub fn split_coefficient(&self) -> (f64, Expr) {
        match self {
            Expr::Const(c) => (*c, Expr::Const(1.0)),
            Expr::Mul(lhs, rhs) => {
                let (a, left) = lhs.split_coefficient();
                let (b, right) = rhs.split_coefficient();
                let residual = if left.is_one() {
                    right
                } else if right.is_one() {
                    left
                } else {
                    left * right
                };
                (a * b, residual)
            }
            Expr::Div(lhs, rhs) => {
                let (a, numerator) = lhs.split_coefficient();
                match rhs.as_const() {
                    Some(d) => (a / d, numerator),
                    None => (a, numerator / rhs.as_ref().clone()),
                }
            }
            other => (1.0, other.clone()),
        }
    }

    /// Multiplies by `factor`, distributing it over the terms of a top-level sum.
    pub fn scaled(&self, factor: f64) -> Expr {
        match self {
            Expr::Add(lhs, rhs) => lhs.scaled(factor) + rhs.scaled(factor),
            Expr::Sub(lhs, rhs) => lhs.scaled(factor) - rhs.scaled(factor),
            other => Expr::Const(factor) * other.clone(),
        }
    }
}

fn simplify_sum(lhs: Expr, rhs: Expr) -> Expr {
    if lhs.is_zero() {
        return rhs;
    }
    if rhs.is_zero() {
        return lhs;
    }
    if let (Some(a), Some(b)) = (lhs.as_const(), rhs.as_const()) {
        return Expr::Const(a + b);
    }
    if rhs.is_negative_looking() {
        return lhs - rhs.negate();
    }
    match rhs {
        Expr::Add(p, q) => (lhs + *p) + *q,
        Expr::Sub(p, q) => (lhs + *p) - *q,
        rhs => lhs + rhs,
    }
}

fn simplify_difference(lhs: Expr, rhs: Expr) -> Expr {
    if rhs.is_zero() {
        return lhs;
    }
    if lhs.is_zero() {
        return rhs.negate();
    }
    if let (Some(a), Some(b)) = (lhs.as_const(), rhs.as_const()) {
        return Expr::Const(a - b);
    }
    if rhs.is_negative_looking() {
        return lhs + rhs.negate();
    }
    match rhs {
        Expr::Add(p, q) => (lhs - *p) - *q,
        Expr::Sub(p, q) => (lhs - *p) + *q,
        rhs => lhs - rhs,
    }
}

fn simplify_product(lhs: Expr, rhs: Expr) -> Expr {
    if lhs.is_zero() || rhs.is_zero() {
        return Expr::Const(0.0);
    }
    if lhs.is_one() {
        return rhs;
    }
    if rhs.is_one() {
        return lhs;
    }
    if let Expr::Div(numerator, denominator) = rhs {
        return (lhs * *numerator) / *denominator;
    }
    match (lhs.as_const(), rhs.as_const()) {
        (Some(a), Some(b)) => return Expr::Const(a * b),
        (None, Some(_)) => return simplify_product(rhs, lhs),
        (Some(a), None) => {
            if let Some((b, rest)) = rhs.leading_coefficient() {
                return Expr::Const(a * b) * rest.clone();
            }
            if a == -1.0 {
                if let Some(negated) = negate_leading_sum(&rhs) {
                    return negated;
                }
            }
            // -1*(-x/2*x) is x/2*x, never a double minus
            if rhs.is_negative_looking() {
                return if a == -1.0 {
                    rhs.negate()
                } else {
                    Expr::Const(-a) * rhs.negate()
                };
            }
            return lhs * rhs;
        }
        (None, None) => {}
    }
    if let Some((c, rest)) = lhs.leading_coefficient() {
        return Expr::Const(c) * (rest.clone() * rhs);
    }
    if let Some((c, rest)) = rhs.leading_coefficient() {
        return Expr::Const(c) * (lhs * rest.clone());
    }
    lhs * rhs
}

/// `-((a - b)*c)` becomes `(-a + b)*c`: the sign goes into the sum the printed form starts with
fn negate_leading_sum(expr: &Expr) -> Option<Expr> {
    match expr {
        Expr::Add(..) | Expr::Sub(..) => Some(expr.negate()),
        Expr::Mul(lhs, rhs) => negate_leading_sum(lhs).map(|negated| negated * rhs.as_ref().clone()),
        _ => None,
    }
}

/// `(n/d0)*rest` as numerator and numeric `d`: the two divisors are merged
fn merge_fraction_coefficient(lhs: &Expr, d: f64) -> Option<Expr> {
    let Expr::Mul(coefficient, rest) = lhs else {
        return None;
    };
    let Expr::Div(n, d0) = coefficient.as_ref() else {
        return None;
    };
    let (n, d0) = (n.as_const()?, d0.as_const()?);
    Some((Expr::Const(n) * rest.as_ref().clone()) / Expr::Const(d0 * d))
}

fn simplify_quotient(lhs: Expr, rhs: Expr) -> Expr {
    if lhs.is_zero() {
        return Expr::Const(0.0);
    }
    if rhs.is_one() {
        return lhs;
    }
    let Some(d) = rhs.as_const().filter(|d| *d != 0.0) else {
        return lhs / rhs;
    };
    if let Expr::Div(numerator, inner) = &lhs {
        if let Some(d0) = inner.as_const() {
            return numerator.as_ref().clone() / Expr::Const(d0 * d);
        }
    }
    if let Some(c) = lhs.as_const() {
        if is_integral(c / d, QUOTIENT_TOLERANCE) {
            return Expr::Const((c / d).round());
        }
    }
    if let Some((c, rest)) = lhs.leading_coefficient() {
        if is_integral(c / d, QUOTIENT_TOLERANCE) {
            return Expr::Const((c / d).round()) * rest.clone();
        }
    }
    if let Some(merged) = merge_fraction_coefficient(&lhs, d) {
        return merged;
    }
    lhs / rhs
}

fn simplify_power(base: Expr, exponent: Expr) -> Expr {
    if exponent.is_one() {
        return base;
    }
    if exponent.is_zero() {
        return Expr::Const(1.0);
    }
    if let (Some(b), Some(e)) = (base.as_const(), exponent.as_const()) {
        return Expr::Const(b.powf(e));
    }
    // (u^a)^n = u^(a*n) for integral n
    if let (Expr::Pow(inner, a), Some(n)) = (&base, exponent.as_const()) {
        if let Some(a) = a.as_const().filter(|_| is_integral(n, QUOTIENT_TOLERANCE)) {
            return inner.as_ref().clone().pow(Expr::Const(a * n));
        }
    }
    base.pow(exponent)
}

impl Expr {
    /// Normalized form whose printed text reads back to itself: the text is parsed and
    /// normalized again until it stops changing. Used for every result handed to a caller.
    pub fn canonical(&self, var: &str) -> Expr {
        let mut current = self.normalize();
        let mut text = current.to_string();
        for _ in 0..CANONICAL_ROUNDS {
            let next = match parse_expression(&text, var) {
                Ok(parsed) => parsed.normalize(),
                Err(_) => return current,
            };
            let next_text = next.to_string();
            if next_text == text {
                return next;
            }
            current = next;
            text = next_text;
        }
        warn!("printed form of {} did not settle after {} rounds", self, CANONICAL_ROUNDS);
        current
    }
}

/// Textual entry point: parse, normalize and print again.
pub fn normalize_expression(input: &str, var: &str) -> Result<String> {
    Ok(parse_expression(input, var)?.canonical(var).to_string())
}
