//! # Integration by parts
//!
//! `∫ u dv = u·v - ∫ v du`, restricted to a product of a monomial `a·x^n` (positive integer
//! `n`) and one of `sin(x)`, `cos(x)`, `exp(x)`. The monomial is always `u` (LIATE order:
//! algebraic before trigonometric and exponential), so each pass lowers its degree by one
//! and the remaining integral is solved by the same engine until the polynomial is gone.
//! A pass counter in [`IntegrationContext`] bounds the recursion.
use log::{debug, warn};

use crate::symbolic::errors::{CalcError, Result};
use crate::symbolic::steps::{Notation, StepNode, TraceMode};
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_engine_derivatives::DiffContext;
use crate::symbolic::symbolic_integration::IntegrationContext;
use crate::symbolic::utils::format_number;

fn is_polynomial_factor(e: &Expr, var: &str) -> bool {
    e.as_monomial(var)
        .is_some_and(|(_, n)| n >= 1.0 && n.fract() == 0.0)
}

fn is_transcendental_atom(e: &Expr, var: &str) -> bool {
    matches!(e, Expr::sin(arg) | Expr::cos(arg) | Expr::Exp(arg) if matches!(arg.as_ref(), Expr::Var(name) if name == var))
}

/// `(u, dv)` of a product accepted by integration by parts, in either factor order
pub fn parts_split<'e>(term: &'e Expr, var: &str) -> Option<(&'e Expr, &'e Expr)> {
    let Expr::Mul(lhs, rhs) = term else {
        return None;
    };
    if is_polynomial_factor(lhs, var) && is_transcendental_atom(rhs, var) {
        Some((lhs, rhs))
    } else if is_polynomial_factor(rhs, var) && is_transcendental_atom(lhs, var) {
        Some((rhs, lhs))
    } else {
        None
    }
}

impl Expr {
    /// `None` when the term does not have the polynomial × transcendental shape,
    /// otherwise the outcome of integrating it by parts.
    pub fn integrate_by_parts(
        &self,
        ctx: IntegrationContext,
        trace: &mut StepNode,
    ) -> Option<Result<Expr>> {
        let (u, dv) = parts_split(self, ctx.var)?;
        Some(by_parts(ctx, self, u, dv, trace))
    }
}

fn by_parts(
    ctx: IntegrationContext,
    term: &Expr,
    u: &Expr,
    dv: &Expr,
    trace: &mut StepNode,
) -> Result<Expr> {
    let var = ctx.var;
    if ctx.parts_depth >= ctx.max_parts_depth {
        warn!("integration by parts stopped at depth {} on {}", ctx.parts_depth, term);
        trace.push_error(
            "Integration by parts depth exceeded",
            "Too many nested integrations by parts",
            Some(format!(
                "∫ {} d{} after {} passes",
                term, var, ctx.parts_depth
            )),
        );
        return Err(CalcError::PartsDepthExceeded {
            term: term.to_string(),
            depth: ctx.parts_depth,
        });
    }
    debug!("integration by parts on {}, pass {}", term, ctx.parts_depth + 1);
    trace.push_rule(
        "Integration by parts",
        "The polynomial factor is differentiated and the transcendental factor is integrated (LIATE order)",
        Some("∫ u dv = u·v - ∫ v du".to_string()),
        Some(format!("u = {}, dv = {} d{}", u, dv, var)),
    );

    let mut du_steps = StepNode::sequence(
        &format!("Computing du = d/d{}({})", var, u),
        TraceMode::Differentiation,
    );
    let du = u.diff_steps(DiffContext::new(var, Notation::Leibniz), &mut du_steps);
    trace.push_nested(du_steps);
    let du = du?.normalize();

    let mut v_steps = trace.nested(&format!("Computing v = ∫ {} d{}", dv, var));
    let v = dv.integrate_direct(ctx, &mut v_steps);
    trace.push_nested(v_steps);
    let v = v?.normalize();

    // v·du = coefficient·core, the transcendental residual first
    let (kv, rv) = v.split_coefficient();
    let (kdu, rdu) = du.split_coefficient();
    let coefficient = kv * kdu;
    let core = Expr::product_of([rv, rdu].into_iter().filter(|f| !f.is_one()).collect())
        .normalize();
    let uv = (u.clone() * v.clone()).normalize();
    trace.push_rule(
        "Applying the formula",
        "Write u·v and the remaining integral of v·du",
        Some(format!("{} - ∫ ({})·({}) d{}", uv, v, du, var)),
        Some(format!(
            "∫ v du = {}·∫ {} d{}",
            format_number(coefficient),
            core,
            var
        )),
    );

    let mut remaining_steps = trace.nested(&format!("Solving the remaining integral ∫ {} d{}", core, var));
    let remaining = core.integrate_term(ctx.deeper(), &mut remaining_steps);
    trace.push_nested(remaining_steps);
    let remaining = remaining?.normalize();

    let result = (uv.clone() + remaining.scaled(-coefficient)).normalize();
    let sign = if coefficient > 0.0 { "-" } else { "+" };
    trace.push_rule(
        "Conclusion of integration by parts",
        "The coefficient of the remaining integral decides the sign in front of it",
        Some(format!(
            "{} {} {}·({})",
            uv,
            sign,
            format_number(coefficient.abs()),
            remaining
        )),
        Some(result.to_string()),
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse_expr::parse_expression;
    use approx::assert_relative_eq;

    fn term(s: &str) -> Expr {
        parse_expression(s, "x").unwrap()
    }

    fn parts(s: &str, max_depth: usize) -> (Option<Result<Expr>>, StepNode) {
        let mut trace = StepNode::sequence("Integration", TraceMode::Integration);
        let ctx = IntegrationContext::new("x", 1e-9, max_depth);
        let result = term(s).integrate_by_parts(ctx, &mut trace);
        (result, trace)
    }

    fn check_antiderivative(integrand: &str, result: &Expr) {
        let f = term(integrand);
        let df = result.diff("x").unwrap();
        for x in [0.2, 1.0, 2.5] {
            assert_relative_eq!(
                df.eval_expression(&["x"], &[x]),
                f.eval_expression(&["x"], &[x]),
                epsilon = 1e-8,
                max_relative = 1e-10
            );
        }
    }

    #[test]
    fn test_shape_detection() {
        let e = term("x*sin(x)");
        let (u, dv) = parts_split(&e, "x").unwrap();
        assert_eq!((u.to_string(), dv.to_string()), ("x".to_string(), "sin(x)".to_string()));
        let e = term("exp(x)*3x^2");
        let (u, dv) = parts_split(&e, "x").unwrap();
        assert_eq!((u.to_string(), dv.to_string()), ("3x^2".to_string(), "exp(x)".to_string()));
        assert!(parts_split(&term("sin(x)*cos(x)"), "x").is_none());
        assert!(parts_split(&term("x^0.5*exp(x)"), "x").is_none());
        assert!(parts_split(&term("x*sin(2x)"), "x").is_none());
    }

    #[test]
    fn test_x_sin_x() {
        let (result, trace) = parts("x*sin(x)", 32);
        let result = result.unwrap().unwrap();
        assert_eq!(result.to_string(), "-x*cos(x) + sin(x)");
        check_antiderivative("x*sin(x)", &result);
        let titles: Vec<&str> = trace.children.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles[0], "Integration by parts");
        assert_eq!(titles.last(), Some(&"Conclusion of integration by parts"));
        assert_eq!(trace.find("Computing du").map(|n| n.mode), Some(TraceMode::Differentiation));
    }

    #[test]
    fn test_repeated_parts() {
        let (result, trace) = parts("x^2*exp(x)", 32);
        let result = result.unwrap().unwrap();
        assert_eq!(result.to_string(), "x^2*exp(x) - 2x*exp(x) + 2*exp(x)");
        check_antiderivative("x^2*exp(x)", &result);
        let passes = trace
            .walk()
            .iter()
            .filter(|n| n.title == "Integration by parts")
            .count();
        assert_eq!(passes, 2);

        let (result, _) = parts("x^3*cos(x)", 32);
        check_antiderivative("x^3*cos(x)", &result.unwrap().unwrap());
    }

    #[test]
    fn test_depth_guard() {
        let (result, trace) = parts("x^2*exp(x)", 1);
        assert!(matches!(
            result,
            Some(Err(CalcError::PartsDepthExceeded { depth: 1, .. }))
        ));
        assert!(trace.has_error());
    }

    #[test]
    fn test_other_shapes_are_declined() {
        let (result, trace) = parts("sin(x)*cos(x)", 32);
        assert!(result.is_none());
        assert!(trace.children.is_empty());
    }
}
