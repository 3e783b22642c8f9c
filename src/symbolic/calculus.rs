//! # Step-by-step calculus
//!
//! Public entry points of the calculator. Both return a [`Calculation`]: the normalized result
//! as text (or an `[Error: ...]` marker), the result tree, the typed error if any, and the
//! complete step trace.
//!
//! # Example
//! ```rust, ignore
//! use RustedCalculus::symbolic::calculus::{differentiate, integrate};
//! use RustedCalculus::symbolic::steps::Notation;
//! let d = differentiate("3x^4", Notation::Lagrange);
//! assert_eq!(d.result, "12x^3");
//! let i = integrate("x*sin(x)");
//! assert_eq!(i.result, "-x*cos(x) + sin(x)");
//! println!("{}", i.trace.render());
//! ```
use log::{info, warn};

use crate::Utils::logger::init_logger;
use crate::symbolic::engine_config::EngineConfig;
use crate::symbolic::errors::{CalcError, Result};
use crate::symbolic::parse_expr::{Sign, SignedTerm, parse_term, split_additive};
use crate::symbolic::steps::{Notation, StepNode, TraceMode};
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_engine_derivatives::{DiffContext, differentiate_sum};
use crate::symbolic::symbolic_integration::IntegrationContext;
use crate::symbolic::utils::strip_whitespace;

/// Outcome of one differentiation or integration.
#[derive(Debug, Clone)]
pub struct Calculation {
    /// printed result, or the error marker of the failing sub-term
    pub result: String,
    pub expr: Option<Expr>,
    pub error: Option<CalcError>,
    pub trace: StepNode,
}

impl Calculation {
    fn success(expr: Expr, trace: StepNode) -> Calculation {
        Calculation {
            result: expr.to_string(),
            expr: Some(expr),
            error: None,
            trace,
        }
    }

    fn failure(error: CalcError, trace: StepNode) -> Calculation {
        warn!("calculation failed: {}", error);
        Calculation {
            result: error.marker(),
            expr: None,
            error: Some(error),
            trace,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

fn record_parse_error(error: &CalcError, trace: &mut StepNode) {
    let title = match error {
        CalcError::UnbalancedParentheses(_) => "Unbalanced parentheses",
        CalcError::UnsupportedExponent(_) => "Unsupported exponent",
        _ => "Unrecognized term",
    };
    trace.push_error(title, &error.to_string(), Some(error.offending().to_string()));
}

/// parses one top-level term, folding its sign in when asked; failures become error steps
fn parse_recorded(
    term: &SignedTerm,
    fold_sign: bool,
    var: &str,
    trace: &mut StepNode,
) -> Result<Expr> {
    match parse_term(&term.text, var) {
        Ok(expr) if fold_sign => Ok(term.sign.apply(expr)),
        Ok(expr) => Ok(expr),
        Err(error) => {
            record_parse_error(&error, trace);
            Err(error)
        }
    }
}

fn signed_label(term: &SignedTerm) -> String {
    match term.sign {
        Sign::Plus => term.text.clone(),
        Sign::Minus => format!("-{}", term.text),
    }
}

fn combine(raw: Expr, var: &str, trace: &mut StepNode) -> Expr {
    let result = raw.canonical(var);
    trace.push_rule(
        "Combining results",
        "Assemble the partial results and simplify",
        None,
        Some(format!("{} = {}", raw, result)),
    );
    result
}

/// Calculator with fixed settings.
#[derive(Debug, Clone, Default)]
pub struct StepCalculator {
    config: EngineConfig,
}

impl StepCalculator {
    pub fn new(config: EngineConfig) -> StepCalculator {
        StepCalculator { config }
    }

    /// Reads the settings from a task document and starts logging at the configured level.
    pub fn from_task_document(document: &str) -> Result<StepCalculator> {
        let config = EngineConfig::from_document(document)?;
        init_logger(config.loglevel.as_deref())?;
        Ok(StepCalculator { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn differentiate(&self, expression: &str) -> Calculation {
        self.differentiate_with(expression, self.config.notation)
    }

    /// Derivative with respect to the configured variable; `notation` only changes the
    /// formulas of the trace.
    pub fn differentiate_with(&self, expression: &str, notation: Notation) -> Calculation {
        let var = self.config.variable.as_str();
        let ctx = DiffContext::new(var, notation);
        let cleaned = strip_whitespace(expression);
        info!("differentiating {} with respect to {}", cleaned, var);
        let mut trace = StepNode::sequence(
            &format!("Differentiation of {}", notation.derivative_of(&cleaned, var)),
            TraceMode::Differentiation,
        );
        if cleaned.is_empty() {
            trace.push_rule(
                "Empty expression",
                "An empty expression is the constant 0, its derivative is 0",
                None,
                None,
            );
            return Calculation::success(Expr::Const(0.0), trace);
        }

        let terms = split_additive(&cleaned);
        let outcome = if terms.len() == 1 {
            parse_recorded(&terms[0], true, var, &mut trace)
                .and_then(|expr| expr.diff_term(ctx, &mut trace))
        } else {
            let labels: Vec<(Sign, String)> =
                terms.iter().map(|t| (t.sign, t.text.clone())).collect();
            differentiate_sum(ctx, &cleaned, &labels, &mut trace, |i, nested| {
                parse_recorded(&terms[i], i == 0, var, nested)?.diff_term(ctx, nested)
            })
        };
        match outcome {
            Ok(raw) => {
                let result = combine(raw, var, &mut trace);
                info!("derivative: {}", result);
                Calculation::success(result, trace)
            }
            Err(error) => Calculation::failure(error, trace),
        }
    }

    /// Antiderivative with respect to the configured variable, without the constant of
    /// integration. Every term of the top-level sum is integrated in its own nested trace.
    pub fn integrate(&self, expression: &str) -> Calculation {
        let var = self.config.variable.as_str();
        let ctx = IntegrationContext::new(
            var,
            self.config.substitution_tolerance,
            self.config.max_parts_depth,
        );
        let cleaned = strip_whitespace(expression);
        info!("integrating {} with respect to {}", cleaned, var);
        let mut trace = StepNode::sequence(
            &format!("Integration of ∫ {} d{}", cleaned, var),
            TraceMode::Integration,
        );
        if cleaned.is_empty() {
            trace.push_rule(
                "Empty expression",
                "An empty expression is the constant 0, its integral is 0",
                None,
                None,
            );
            return Calculation::success(Expr::Const(0.0), trace);
        }

        let terms = split_additive(&cleaned);
        trace.push_rule(
            "Sum rule (integration)",
            "The integral of a sum is the sum of the integrals of its terms",
            Some(format!("∫ (f ± g) d{0} = ∫ f d{0} ± ∫ g d{0}", var)),
            Some(format!(
                "terms: {}",
                terms.iter().map(signed_label).collect::<Vec<_>>().join(", ")
            )),
        );
        let mut total: Option<Expr> = None;
        for term in &terms {
            let mut nested = trace.nested(&format!("Integrating the term: {}", signed_label(term)));
            let integral = parse_recorded(term, true, var, &mut nested)
                .and_then(|expr| expr.integrate_term(ctx, &mut nested));
            trace.push_nested(nested);
            match integral {
                Ok(integral) => {
                    total = Some(match total {
                        None => integral,
                        Some(acc) => acc + integral,
                    })
                }
                Err(error) => return Calculation::failure(error, trace),
            }
        }
        let result = combine(total.unwrap_or(Expr::Const(0.0)), var, &mut trace);
        info!("integral: {}", result);
        Calculation::success(result, trace)
    }
}

/// Derivative in `x` with the default settings.
pub fn differentiate(expression: &str, notation: Notation) -> Calculation {
    StepCalculator::default().differentiate_with(expression, notation)
}

/// Antiderivative in `x` with the default settings.
pub fn integrate(expression: &str) -> Calculation {
    StepCalculator::default().integrate(expression)
}
