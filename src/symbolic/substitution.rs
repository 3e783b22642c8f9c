//! # u-substitution
//!
//! Entry point for integrating one term. The term is cut into its top-level factors and
//! searched for a composite factor `f(u)`, in this priority:
//! 1. `exp(u)` with a compound exponent
//! 2. any other function of the table applied to a compound argument
//! 3. a power `(u)^n` with a compound base
//!
//! The remaining factors form the "other part". `du/dx` is computed by the differentiation
//! engine and both `du/dx` and the other part are split into (coefficient, residual). Equal
//! residuals mean `∫ f(u)·other dx = (other/du)·∫ f(u) du`; the ratio of the coefficients is
//! either 1 (perfect match) or a constant that multiplies the result. Different residuals
//! make the substitution invalid.
//!
//! A term without a composite factor goes straight to the direct rules.
use log::{debug, warn};
use strum_macros::Display;

use crate::symbolic::errors::{CalcError, Result};
use crate::symbolic::steps::{Notation, StepNode, TraceMode};
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_engine_derivatives::DiffContext;
use crate::symbolic::symbolic_integration::IntegrationContext;
use crate::symbolic::utils::{format_number, round_significant};

/// Outcome of comparing `du/dx` with the other part of the integrand.
#[derive(Debug, Clone, Copy, PartialEq, Display)]
pub enum SubstitutionMatch {
    Perfect,
    /// the integral in `u` gets multiplied by this factor
    Constant(f64),
    Invalid,
}

/// A composite factor found in a term: `inner` is `u`, `pattern` is `f(u)` written in the
/// bound variable.
#[derive(Debug, Clone, PartialEq)]
pub struct SubstitutionCandidate {
    pub inner: Expr,
    pub pattern: Expr,
    pub other: Expr,
}

/// the variable of the u-integral, distinct from the variable of integration
pub fn bound_variable(var: &str) -> &'static str {
    if var == "u" { "t" } else { "u" }
}

/// Top-level factors of a term; `n/d` contributes the factors of `n` and `d^-1`
/// (or the reciprocal of a numeric `d`).
pub fn analysis_factors(term: &Expr) -> Vec<Expr> {
    match term {
        Expr::Mul(lhs, rhs) => {
            let mut factors = analysis_factors(lhs);
            factors.extend(analysis_factors(rhs));
            factors
        }
        Expr::Div(numerator, denominator) => {
            let mut factors = analysis_factors(numerator);
            match denominator.as_const() {
                Some(d) => factors.push(Expr::Const(1.0 / d)),
                None => factors.push(denominator.as_ref().clone().pow(Expr::Const(-1.0))),
            }
            factors
        }
        other => vec![other.clone()],
    }
}

fn is_compound(inner: &Expr, var: &str) -> bool {
    inner.contains_variable(var) && !matches!(inner, Expr::Var(name) if name == var)
}

/// lower is preferred, `None` if the factor is not a candidate at all
fn candidate_priority(factor: &Expr, var: &str) -> Option<u8> {
    match factor {
        Expr::Exp(inner) if is_compound(inner, var) => Some(0),
        Expr::Pow(base, exponent) if exponent.as_const().is_some() && is_compound(base, var) => {
            Some(2)
        }
        _ => factor
            .as_function()
            .filter(|(_, inner)| is_compound(inner, var))
            .map(|_| 1),
    }
}

/// Picks the composite factor of highest priority (leftmost on ties).
pub fn find_candidate(term: &Expr, var: &str) -> Option<SubstitutionCandidate> {
    let factors = analysis_factors(term);
    let (index, _) = factors
        .iter()
        .enumerate()
        .filter_map(|(i, f)| candidate_priority(f, var).map(|p| (i, p)))
        .min_by_key(|(_, p)| *p)?;
    let bound = Expr::var(bound_variable(var));
    let (inner, pattern) = match &factors[index] {
        Expr::Pow(base, exponent) => (base.as_ref().clone(), bound.pow(exponent.as_ref().clone())),
        factor => {
            let (function, inner) = factor.as_function()?;
            (inner.clone(), function.apply(bound))
        }
    };
    let rest: Vec<Expr> = factors
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, f)| f.clone())
        .collect();
    Some(SubstitutionCandidate {
        inner,
        pattern,
        other: Expr::product_of(rest).normalize(),
    })
}

/// Compares `du/dx` with the other part up to a numeric factor.
pub fn classify(du: &Expr, other: &Expr, tolerance: f64) -> SubstitutionMatch {
    let (kd, rd) = du.split_coefficient();
    let (ko, ro) = other.split_coefficient();
    if kd == 0.0 || ko == 0.0 || rd.to_string() != ro.to_string() {
        return SubstitutionMatch::Invalid;
    }
    let ratio = ko / kd;
    if (ratio - 1.0).abs() < tolerance {
        SubstitutionMatch::Perfect
    } else {
        SubstitutionMatch::Constant(ratio)
    }
}

/// `1/2` and `1/4` stay fractions, other factors are rounded to 4 significant digits
fn scale_factor(s: f64) -> Expr {
    let sign = if s < 0.0 { -1.0 } else { 1.0 };
    let magnitude = s.abs();
    if (magnitude - 0.5).abs() < 1e-12 {
        Expr::Const(sign) / Expr::Const(2.0)
    } else if (magnitude - 0.25).abs() < 1e-12 {
        Expr::Const(sign) / Expr::Const(4.0)
    } else {
        Expr::Const(round_significant(s, 4))
    }
}

impl Expr {
    /// Integrates one term of a sum: u-substitution when the term has a composite factor,
    /// the direct rules (and integration by parts behind them) otherwise.
    pub fn integrate_term(&self, ctx: IntegrationContext, trace: &mut StepNode) -> Result<Expr> {
        match find_candidate(self, ctx.var) {
            Some(candidate) => self.integrate_by_substitution(ctx, candidate, trace),
            None => self.integrate_direct(ctx, trace),
        }
    }

    fn integrate_by_substitution(
        &self,
        ctx: IntegrationContext,
        candidate: SubstitutionCandidate,
        trace: &mut StepNode,
    ) -> Result<Expr> {
        let var = ctx.var;
        let bound = bound_variable(var);
        let SubstitutionCandidate { inner, pattern, other } = candidate;
        debug!("substitution {} = {} in {}", bound, inner, self);
        trace.push_rule(
            "Substitution analysis (u-substitution)",
            "The term contains a function of a compound expression; try to recognise its derivative among the remaining factors",
            Some(format!("∫ f({0})·{0}' d{1} = ∫ f({0}) d{0}", bound, var)),
            Some(format!(
                "{} = {}, f({}) = {}, other part = {}",
                bound, inner, bound, pattern, other
            )),
        );

        let mut du_steps = StepNode::sequence(
            &format!("Computing d{}/d{} for {} = {}", bound, var, bound, inner),
            TraceMode::Differentiation,
        );
        let du = inner.diff_steps(DiffContext::new(var, Notation::Leibniz), &mut du_steps);
        trace.push_nested(du_steps);
        let du = du?.normalize();

        let matched = classify(&du, &other, ctx.tolerance);
        trace.push_rule(
            &format!("Substitution match: {}", matched),
            match matched {
                SubstitutionMatch::Perfect => "The other part is exactly the derivative of the inner expression",
                SubstitutionMatch::Constant(_) => "The other part is a constant multiple of the derivative of the inner expression",
                SubstitutionMatch::Invalid => "The other part is not a multiple of the derivative of the inner expression",
            },
            None,
            Some(format!("d{}/d{} = {}, other part = {}", bound, var, du, other)),
        );

        let scale = match matched {
            SubstitutionMatch::Perfect => None,
            SubstitutionMatch::Constant(s) => Some(scale_factor(s)),
            SubstitutionMatch::Invalid => {
                warn!("substitution {} = {} rejected for {}", bound, inner, self);
                if let Some(result) = self.integrate_by_parts(ctx, trace) {
                    return result;
                }
                trace.push_error(
                    "Invalid substitution",
                    "Neither u-substitution nor integration by parts applies to this term",
                    Some(format!("∫ {} d{}", self, var)),
                );
                return Err(CalcError::UnsupportedSubstitution(self.to_string()));
            }
        };

        let mut u_steps = trace.nested(&format!("Integrating {} d{}", pattern, bound));
        let in_u = pattern.integrate_direct(ctx.with_var(bound), &mut u_steps);
        trace.push_nested(u_steps);
        let in_u = in_u?.normalize();

        let back = in_u.substitute_variable(bound, &inner);
        let result = match scale {
            Some(factor) => factor * back,
            None => back,
        };
        trace.push_rule(
            "Back-substitution",
            "Replace the bound variable by the inner expression",
            Some(format!("{} = {}", bound, inner)),
            Some(match matched {
                SubstitutionMatch::Constant(s) => format!(
                    "{}·({}) = {}",
                    format_number(round_significant(s, 4)),
                    in_u,
                    result.normalize()
                ),
                _ => format!("{} = {}", in_u, result.normalize()),
            }),
        );
        Ok(result)
    }
}
