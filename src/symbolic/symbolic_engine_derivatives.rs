//! # Symbolic Engine Derivatives Module
//!
//! Step-by-step differentiation. Each rule application records one step in the trace of the
//! calling frame, and every recursive sub-derivative (the two factors of a product, the
//! inner function of a chain rule, the content of a parenthesized sum) records its own
//! nested trace.
//!
//! ## Rule order
//!
//! Sums are split first (sum rule), then each term is tried as a monomial (power rule), a
//! product (product rule) or a quotient (quotient rule). Whatever is left is a factor:
//! constant, bare variable, monomial, parenthesized sum, power of a compound base
//! (chain rule for powers) or a function call (chain rule through the table below).
//!
//! | f(u)     | f'(u)          |
//! |----------|----------------|
//! | sin(u)   | cos(u)         |
//! | cos(u)   | -sin(u)        |
//! | tan(u)   | 1/cos(u)^2     |
//! | ln(u)    | 1/u            |
//! | exp(u)   | exp(u)         |
//! | sqrt(u)  | 1/(2*sqrt(u))  |
//! | abs(u)   | u/abs(u)       |
//!
//! The factor `u'` is omitted when `u` is the variable itself. Results are raw rule output,
//! the caller normalizes.
use log::debug;

use crate::symbolic::errors::{CalcError, Result};
use crate::symbolic::parse_expr::Sign;
use crate::symbolic::steps::{Notation, StepNode, TraceMode};
use crate::symbolic::symbolic_engine::{Expr, MathFunction};
use crate::symbolic::utils::format_number;

/// Variable and notation of a differentiation, passed down unchanged through the recursion.
#[derive(Debug, Clone, Copy)]
pub struct DiffContext<'a> {
    pub var: &'a str,
    pub notation: Notation,
}

impl<'a> DiffContext<'a> {
    pub fn new(var: &'a str, notation: Notation) -> Self {
        DiffContext { var, notation }
    }

    fn of(&self, f: &str) -> String {
        self.notation.derivative_of(f, self.var)
    }

    fn prime(&self, name: &str) -> String {
        self.notation.prime(name, self.var)
    }
}

/// f'(u) for a function of the table in the module documentation
pub fn outer_derivative(function: MathFunction, u: &Expr) -> Expr {
    let u = u.clone();
    match function {
        MathFunction::Sin => Expr::cos(u.boxed()),
        MathFunction::Cos => -Expr::sin(u.boxed()),
        MathFunction::Tan => Expr::Const(1.0) / Expr::cos(u.boxed()).pow(Expr::Const(2.0)),
        MathFunction::Ln => Expr::Const(1.0) / u,
        MathFunction::Exp => Expr::Exp(u.boxed()),
        MathFunction::Sqrt => Expr::Const(1.0) / (Expr::Const(2.0) * Expr::sqrt(u.boxed())),
        MathFunction::Abs => u.clone() / Expr::abs(u.boxed()),
    }
}

/// Sum rule shared by the expression tree and the top-level term list: records the rule,
/// differentiates every term in its own nested trace and joins the results with the
/// original operators. The first term carries its sign itself. Stops at the first failing
/// term, whose partial trace is still attached.
pub(crate) fn differentiate_sum<F>(
    ctx: DiffContext,
    whole: &str,
    labels: &[(Sign, String)],
    trace: &mut StepNode,
    mut term_derivative: F,
) -> Result<Expr>
where
    F: FnMut(usize, &mut StepNode) -> Result<Expr>,
{
    let formula = match ctx.notation {
        Notation::Lagrange => "(u ± v)' = u' ± v'".to_string(),
        Notation::Leibniz => format!("d/d{0}(u ± v) = du/d{0} ± dv/d{0}", ctx.var),
    };
    trace.push_rule(
        "Sum rule",
        "The derivative of a sum (or difference) is the sum (or difference) of the derivatives of its terms",
        Some(formula),
        Some(format!("applying to {}", ctx.of(whole))),
    );
    let mut total: Option<Expr> = None;
    for (i, (sign, label)) in labels.iter().enumerate() {
        let shown = if i == 0 && *sign == Sign::Minus {
            format!("-{}", label)
        } else {
            label.clone()
        };
        let mut nested = trace.nested(&format!("Differentiating {}", ctx.of(&shown)));
        let derivative = term_derivative(i, &mut nested);
        trace.push_nested(nested);
        let derivative = derivative?;
        total = Some(match total {
            None => derivative,
            Some(acc) => match sign {
                Sign::Plus => acc + derivative,
                Sign::Minus => acc - derivative,
            },
        });
    }
    Ok(total.unwrap_or(Expr::Const(0.0)))
}

impl Expr {
    /// Derivative without a trace, for callers that only need the expression.
    pub fn diff(&self, var: &str) -> Result<Expr> {
        let mut scratch = StepNode::sequence("Differentiation", TraceMode::Differentiation);
        Ok(self
            .diff_steps(DiffContext::new(var, Notation::Lagrange), &mut scratch)?
            .normalize())
    }

    /// Signed terms of a top-level sum, left to right; the first one is always `Plus`.
    pub fn sum_terms(&self) -> Vec<(Sign, &Expr)> {
        match self {
            Expr::Add(lhs, rhs) => {
                let mut terms = lhs.sum_terms();
                terms.push((Sign::Plus, rhs.as_ref()));
                terms
            }
            Expr::Sub(lhs, rhs) => {
                let mut terms = lhs.sum_terms();
                terms.push((Sign::Minus, rhs.as_ref()));
                terms
            }
            other => vec![(Sign::Plus, other)],
        }
    }

    /// Derivative of a whole expression, recording every rule application in `trace`.
    pub fn diff_steps(&self, ctx: DiffContext, trace: &mut StepNode) -> Result<Expr> {
        match self {
            Expr::Add(..) | Expr::Sub(..) => {
                let terms = self.sum_terms();
                let labels: Vec<(Sign, String)> =
                    terms.iter().map(|(s, t)| (*s, t.to_string())).collect();
                differentiate_sum(ctx, &self.to_string(), &labels, trace, |i, nested| {
                    terms[i].1.diff_term(ctx, nested)
                })
            }
            _ => self.diff_term(ctx, trace),
        }
    }

    /// Derivative of a multiplicative term: monomial, product, quotient or single factor.
    pub fn diff_term(&self, ctx: DiffContext, trace: &mut StepNode) -> Result<Expr> {
        if let Some((a, n)) = self.as_monomial(ctx.var) {
            return Ok(power_rule(ctx, a, n, trace));
        }
        match self {
            Expr::Mul(u, v) => product_rule(ctx, u, v, trace),
            Expr::Div(u, v) => quotient_rule(ctx, u, v, trace),
            _ => self.diff_factor(ctx, trace),
        }
    }

    /// Derivative of a single factor, see the rule order in the module documentation.
    pub fn diff_factor(&self, ctx: DiffContext, trace: &mut StepNode) -> Result<Expr> {
        if !self.contains_variable(ctx.var) {
            debug!("constant rule for {}", self);
            trace.push_rule(
                "Constant rule",
                "The derivative of a constant is zero",
                Some(format!("{} = 0", ctx.of("c"))),
                Some(format!("{} = 0", ctx.of(&self.to_string()))),
            );
            return Ok(Expr::Const(0.0));
        }
        if let Expr::Var(_) = self {
            trace.push_rule(
                "Variable rule",
                "The derivative of the variable with respect to itself is one",
                Some(format!("{} = 1", ctx.of(ctx.var))),
                None,
            );
            return Ok(Expr::Const(1.0));
        }
        if let Some((a, n)) = self.as_monomial(ctx.var) {
            return Ok(power_rule(ctx, a, n, trace));
        }
        match self {
            Expr::Add(..) | Expr::Sub(..) => {
                trace.push_rule(
                    "Parentheses rule",
                    "The derivative of a parenthesized expression is the derivative of its content",
                    None,
                    Some(format!("differentiating {}", self)),
                );
                let mut nested = trace.nested("Inner steps");
                let derivative = self.diff_steps(ctx, &mut nested);
                trace.push_nested(nested);
                derivative
            }
            Expr::Mul(..) | Expr::Div(..) => self.diff_term(ctx, trace),
            Expr::Pow(base, exponent) => match exponent.as_const() {
                Some(n) => power_chain_rule(ctx, base, n, trace),
                None => {
                    trace.push_error(
                        "Unsupported exponent",
                        "Only numeric exponents can be differentiated",
                        Some(self.to_string()),
                    );
                    Err(CalcError::UnsupportedExponent(self.to_string()))
                }
            },
            _ => match self.as_function() {
                Some((function, inner)) => function_chain_rule(ctx, function, inner, trace),
                None => {
                    trace.push_error("Unrecognized term", "No rule applies", Some(self.to_string()));
                    Err(CalcError::UnrecognizedTerm(self.to_string()))
                }
            },
        }
    }
}

fn power_rule(ctx: DiffContext, a: f64, n: f64, trace: &mut StepNode) -> Expr {
    let result = Expr::monomial(a * n, n - 1.0, ctx.var);
    debug!("power rule: a = {}, n = {} -> {}", a, n, result);
    trace.push_rule(
        "Power rule",
        "Multiply the coefficient by the exponent and lower the exponent by one",
        Some(format!(
            "{} = a·n·{}^(n-1)",
            ctx.of(&format!("a{}^n", ctx.var)),
            ctx.var
        )),
        Some(format!(
            "a = {}, n = {}: {}·{}·{}^{} = {}",
            format_number(a),
            format_number(n),
            format_number(a),
            format_number(n),
            ctx.var,
            format_number(n - 1.0),
            result
        )),
    );
    result
}

/// Differentiates `u` and `v`, each in its own nested trace, and hands the traces back so
/// the caller can attach them after its rule step. On failure the traces computed so far
/// are attached to `trace` right away.
fn derivative_pair(
    ctx: DiffContext,
    u: &Expr,
    v: &Expr,
    trace: &mut StepNode,
) -> Result<(Expr, Expr, StepNode, StepNode)> {
    let mut u_steps = trace.nested(&format!("Derivative of u = {}", u));
    let du = match u.diff_factor(ctx, &mut u_steps) {
        Ok(du) => du,
        Err(e) => {
            trace.push_nested(u_steps);
            return Err(e);
        }
    };
    let mut v_steps = trace.nested(&format!("Derivative of v = {}", v));
    match v.diff_factor(ctx, &mut v_steps) {
        Ok(dv) => Ok((du, dv, u_steps, v_steps)),
        Err(e) => {
            trace.push_nested(u_steps);
            trace.push_nested(v_steps);
            Err(e)
        }
    }
}

fn product_rule(ctx: DiffContext, u: &Expr, v: &Expr, trace: &mut StepNode) -> Result<Expr> {
    let (du, dv, u_steps, v_steps) = derivative_pair(ctx, u, v, trace)?;
    let formula = match ctx.notation {
        Notation::Lagrange => "(u·v)' = u'·v + u·v'".to_string(),
        Notation::Leibniz => format!("d/d{0}(u·v) = du/d{0}·v + u·dv/d{0}", ctx.var),
    };
    trace.push_rule(
        "Product rule",
        "The derivative of a product is the derivative of the first factor times the second plus the first factor times the derivative of the second",
        Some(formula),
        Some(format!(
            "u = {}, v = {}, {} = {}, {} = {}",
            u,
            v,
            ctx.prime("u"),
            du.normalize(),
            ctx.prime("v"),
            dv.normalize()
        )),
    );
    trace.push_nested(u_steps);
    trace.push_nested(v_steps);
    Ok(du * v.clone() + u.clone() * dv)
}

fn quotient_rule(ctx: DiffContext, u: &Expr, v: &Expr, trace: &mut StepNode) -> Result<Expr> {
    let (du, dv, u_steps, v_steps) = derivative_pair(ctx, u, v, trace)?;
    let formula = match ctx.notation {
        Notation::Lagrange => "(u/v)' = (u'·v - u·v')/v^2".to_string(),
        Notation::Leibniz => format!("d/d{0}(u/v) = (du/d{0}·v - u·dv/d{0})/v^2", ctx.var),
    };
    trace.push_rule(
        "Quotient rule",
        "The derivative of a quotient is (u'v - uv') divided by the square of the denominator",
        Some(formula),
        Some(format!(
            "u = {}, v = {}, {} = {}, {} = {}",
            u,
            v,
            ctx.prime("u"),
            du.normalize(),
            ctx.prime("v"),
            dv.normalize()
        )),
    );
    trace.push_nested(u_steps);
    trace.push_nested(v_steps);
    Ok((du * v.clone() - u.clone() * dv) / v.clone().pow(Expr::Const(2.0)))
}

fn power_chain_rule(ctx: DiffContext, base: &Expr, n: f64, trace: &mut StepNode) -> Result<Expr> {
    let mut base_steps = trace.nested(&format!("Derivative of the base u = {}", base));
    let du = base.diff_factor(ctx, &mut base_steps);
    let du = match du {
        Ok(du) => du,
        Err(e) => {
            trace.push_nested(base_steps);
            return Err(e);
        }
    };
    let outer = Expr::Const(n) * base.clone().pow(Expr::Const(n - 1.0));
    let result = outer.clone() * du.clone();
    trace.push_rule(
        "Chain rule (power)",
        "Differentiate the power as if the base were the variable, then multiply by the derivative of the base",
        Some(format!(
            "{} = n·u^(n-1)·{}",
            ctx.of("u^n"),
            ctx.prime("u")
        )),
        Some(format!(
            "u = {}, n = {}: ({})·({}) = {}",
            base,
            format_number(n),
            outer.normalize(),
            du.normalize(),
            result.normalize()
        )),
    );
    trace.push_nested(base_steps);
    Ok(result)
}

fn function_chain_rule(
    ctx: DiffContext,
    function: MathFunction,
    inner: &Expr,
    trace: &mut StepNode,
) -> Result<Expr> {
    let outer = outer_derivative(function, inner);
    let inner_is_var = matches!(inner, Expr::Var(name) if name == ctx.var);
    let formula = format!(
        "{} = {}·{}",
        ctx.of(&format!("{}(u)", function)),
        outer_derivative(function, &Expr::var("u")),
        ctx.prime("u")
    );
    if inner_is_var {
        trace.push_rule(
            &format!("Derivative of {}", function),
            "Direct application of the table of derivatives",
            Some(formula),
            Some(format!("{} = {}", ctx.of(&function.apply(inner.clone()).to_string()), outer)),
        );
        return Ok(outer);
    }
    let mut inner_steps = trace.nested(&format!("Computing {} for u = {}", ctx.prime("u"), inner));
    let du = match inner.diff_steps(ctx, &mut inner_steps) {
        Ok(du) => du,
        Err(e) => {
            trace.push_nested(inner_steps);
            return Err(e);
        }
    };
    let result = du.clone() * outer.clone();
    trace.push_rule(
        &format!("Chain rule ({})", function),
        "Differentiate the outer function at the inner one, then multiply by the derivative of the inner function",
        Some(formula),
        Some(format!(
            "u = {}, {} = {}: {}",
            inner,
            ctx.prime("u"),
            du.normalize(),
            result.normalize()
        )),
    );
    trace.push_nested(inner_steps);
    Ok(result)
}
