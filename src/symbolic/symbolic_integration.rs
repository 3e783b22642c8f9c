use log::debug;

use crate::symbolic::errors::{CalcError, Result};
use crate::symbolic::steps::StepNode;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::{format_number, is_integral};

/// Settings of one integration, passed by value down the recursion.
/// `parts_depth` counts the integration-by-parts passes that led to the current call.
#[derive(Debug, Clone, Copy)]
pub struct IntegrationContext<'a> {
    pub var: &'a str,
    pub tolerance: f64,
    pub max_parts_depth: usize,
    pub parts_depth: usize,
}

impl<'a> IntegrationContext<'a> {
    pub fn new(var: &'a str, tolerance: f64, max_parts_depth: usize) -> Self {
        IntegrationContext {
            var,
            tolerance,
            max_parts_depth,
            parts_depth: 0,
        }
    }

    /// same settings, integrating in another variable (the bound variable of a substitution)
    pub fn with_var<'b>(&self, var: &'b str) -> IntegrationContext<'b> {
        IntegrationContext {
            var,
            tolerance: self.tolerance,
            max_parts_depth: self.max_parts_depth,
            parts_depth: self.parts_depth,
        }
    }

    pub fn deeper(&self) -> Self {
        IntegrationContext {
            parts_depth: self.parts_depth + 1,
            ..*self
        }
    }

    fn x(&self) -> Expr {
        Expr::var(self.var)
    }
}

impl Expr {
    /// SYMBOLIC INTEGRATION, direct rules
    ///
    /// Integrates a single term (no top-level sum) with the table of immediate integrals.
    /// Products and quotients that no direct rule covers are handed to integration by parts;
    /// what is still left is reported as unsupported with an error step.
    /// Returns the antiderivative without the constant of integration, not normalized.
    pub fn integrate_direct(&self, ctx: IntegrationContext, trace: &mut StepNode) -> Result<Expr> {
        let var = ctx.var;
        // ∫ 0 dx = 0, ∫ c dx = c*x
        if !self.contains_variable(var) {
            if self.is_zero() {
                trace.push_rule(
                    "Integral of zero",
                    "The integral of zero is zero (up to the constant of integration)",
                    Some(format!("∫ 0 d{} = 0", var)),
                    None,
                );
                return Ok(Expr::Const(0.0));
            }
            let result = self.clone() * ctx.x();
            trace.push_rule(
                "Constant rule (integration)",
                "The integral of a constant is the constant times the variable",
                Some(format!("∫ c d{0} = c·{0}", var)),
                Some(format!("∫ {} d{} = {}", self, var, result.normalize())),
            );
            return Ok(result);
        }
        // ∫ a*x^n dx = a*x^(n+1)/(n+1), ∫ a*x^-1 dx = a*ln|x|
        if let Some((a, n)) = self.as_monomial(var) {
            if n == -1.0 {
                return Ok(logarithm_rule(ctx, Expr::Const(a), self, trace));
            }
            return Ok(power_rule(ctx, a, n, trace));
        }
        // ∫ a/x dx = a*ln|x|
        if let Expr::Div(numerator, denominator) = self {
            if !numerator.contains_variable(var) && **denominator == ctx.x() {
                return Ok(logarithm_rule(ctx, numerator.as_ref().clone(), self, trace));
            }
        }
        // ∫ sin(x) dx = -cos(x), ∫ cos(x) dx = sin(x), ∫ exp(x) dx = exp(x)
        let immediate = match self {
            Expr::sin(arg) if **arg == ctx.x() => Some(Expr::cos(arg.clone()).negate()),
            Expr::cos(arg) if **arg == ctx.x() => Some(Expr::sin(arg.clone())),
            Expr::Exp(arg) if **arg == ctx.x() => Some(Expr::Exp(arg.clone())),
            _ => None,
        };
        if let Some(result) = immediate {
            debug!("immediate integral of {}", self);
            trace.push_rule(
                &format!("Immediate integral of {}", self),
                "Read off the table of immediate integrals",
                Some(format!("∫ {} d{} = {}", self, var, result)),
                None,
            );
            return Ok(result);
        }
        // ∫ c*f dx = c*∫ f dx, ∫ f/c dx = (∫ f dx)/c
        match self {
            Expr::Mul(lhs, rhs) if !lhs.contains_variable(var) => {
                return constant_factor_rule(ctx, lhs, rhs, false, trace);
            }
            Expr::Mul(lhs, rhs) if !rhs.contains_variable(var) => {
                return constant_factor_rule(ctx, rhs, lhs, false, trace);
            }
            Expr::Div(lhs, rhs) if !rhs.contains_variable(var) => {
                return constant_factor_rule(ctx, rhs, lhs, true, trace);
            }
            _ => {}
        }
        if let Expr::Mul(..) | Expr::Div(..) = self {
            if let Some(result) = self.integrate_by_parts(ctx, trace) {
                return result;
            }
            trace.push_error(
                "Unsupported integral",
                "This product needs integration by parts of a kind not covered here or an algebraic simplification first",
                Some(format!("∫ {} d{}", self, var)),
            );
            return Err(CalcError::NotIntegrable(self.to_string()));
        }
        trace.push_error(
            "No direct rule",
            "The term matches no immediate integral",
            Some(format!("∫ {} d{}", self, var)),
        );
        Err(CalcError::NotIntegrable(self.to_string()))
    }
}

fn logarithm_rule(ctx: IntegrationContext, a: Expr, term: &Expr, trace: &mut StepNode) -> Expr {
    let log = Expr::Ln(Expr::abs(ctx.x().boxed()).boxed());
    let result = if a.is_one() { log } else { a * log };
    trace.push_rule(
        "Logarithm rule",
        "The exponent -1 is the exception of the power rule: the integral is a logarithm",
        Some(format!("∫ a/{0} d{0} = a·ln|{0}|", ctx.var)),
        Some(format!("∫ {} d{} = {}", term, ctx.var, result)),
    );
    result
}

fn power_rule(ctx: IntegrationContext, a: f64, n: f64, trace: &mut StepNode) -> Expr {
    let m = n + 1.0;
    let coefficient = a / m;
    let result = if is_integral(coefficient, ctx.tolerance) {
        Expr::monomial(coefficient.round(), m, ctx.var)
    } else {
        Expr::monomial(a, m, ctx.var) / Expr::Const(m)
    };
    debug!("integral power rule: a = {}, n = {} -> {}", a, n, result);
    trace.push_rule(
        "Power rule (integration)",
        "Raise the exponent by one and divide by the new exponent",
        Some(format!("∫ a·{0}^n d{0} = a·{0}^(n+1)/(n+1)", ctx.var)),
        Some(format!(
            "a = {}, n = {}: {}·{}^{}/{} = {}",
            format_number(a),
            format_number(n),
            format_number(a),
            ctx.var,
            format_number(m),
            format_number(m),
            result
        )),
    );
    result
}

fn constant_factor_rule(
    ctx: IntegrationContext,
    constant: &Expr,
    rest: &Expr,
    divides: bool,
    trace: &mut StepNode,
) -> Result<Expr> {
    let formula = if divides {
        format!("∫ f/c d{0} = (∫ f d{0})/c", ctx.var)
    } else {
        format!("∫ c·f d{0} = c·∫ f d{0}", ctx.var)
    };
    trace.push_rule(
        "Constant factor rule",
        "A constant factor can be moved out of the integral",
        Some(formula),
        Some(format!("c = {}, f = {}", constant, rest)),
    );
    let mut nested = trace.nested(&format!("Integrating {} d{}", rest, ctx.var));
    let integral = rest.integrate_term(ctx, &mut nested);
    trace.push_nested(nested);
    let integral = integral?;
    Ok(if divides {
        integral / constant.clone()
    } else {
        constant.clone() * integral
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse_expr::parse_expression;
    use crate::symbolic::steps::TraceMode;
    use approx::assert_relative_eq;

    fn ctx() -> IntegrationContext<'static> {
        IntegrationContext::new("x", 1e-9, 32)
    }

    fn direct(s: &str) -> (Result<Expr>, StepNode) {
        let expr = parse_expression(s, "x").unwrap();
        let mut trace = StepNode::sequence("Integration", TraceMode::Integration);
        let result = expr.integrate_direct(ctx(), &mut trace).map(|e| e.normalize());
        (result, trace)
    }

    #[test]
    fn test_integrate_constant() {
        let (result, trace) = direct("5");
        assert_eq!(result.unwrap().to_string(), "5x");
        assert_eq!(trace.children[0].title, "Constant rule (integration)");
        let (result, trace) = direct("0");
        assert_eq!(result.unwrap(), Expr::Const(0.0));
        assert_eq!(trace.children[0].title, "Integral of zero");
    }

    #[test]
    fn test_integrate_power() {
        assert_eq!(direct("x^2").0.unwrap().to_string(), "x^3/3");
        assert_eq!(direct("3x^2").0.unwrap().to_string(), "x^3");
        assert_eq!(direct("x").0.unwrap().to_string(), "x^2/2");
        assert_eq!(direct("4x^3").0.unwrap().to_string(), "x^4");
        assert_eq!(direct("-x^-2").0.unwrap().to_string(), "x^-1");
    }

    #[test]
    fn test_integrate_logarithm() {
        assert_eq!(direct("x^-1").0.unwrap().to_string(), "ln(abs(x))");
        assert_eq!(direct("1/x").0.unwrap().to_string(), "ln(abs(x))");
        assert_eq!(direct("3/x").0.unwrap().to_string(), "3*ln(abs(x))");
        assert_eq!(direct("2x^-1").0.unwrap().to_string(), "2*ln(abs(x))");
    }

    #[test]
    fn test_immediate_integrals() {
        assert_eq!(direct("sin(x)").0.unwrap().to_string(), "-cos(x)");
        assert_eq!(direct("cos(x)").0.unwrap().to_string(), "sin(x)");
        assert_eq!(direct("exp(x)").0.unwrap().to_string(), "exp(x)");
    }

    #[test]
    fn test_constant_factor() {
        assert_eq!(direct("3*sin(x)").0.unwrap().to_string(), "-3*cos(x)");
        assert_eq!(direct("x/2").0.unwrap().to_string(), "x^2/4");
        let (result, _) = direct("exp(x)*2");
        assert_eq!(result.unwrap().to_string(), "2*exp(x)");
    }

    #[test]
    fn test_unsupported_terms_report_errors() {
        let (result, trace) = direct("tan(x)");
        assert_eq!(result, Err(CalcError::NotIntegrable("tan(x)".to_string())));
        assert!(trace.has_error());
        let (result, trace) = direct("sin(x)*cos(x)");
        assert!(matches!(result, Err(CalcError::NotIntegrable(_))));
        assert_eq!(trace.children.last().map(|n| n.title.as_str()), Some("Unsupported integral"));
    }

    #[test]
    fn test_power_rule_matches_derivative() {
        for input in ["x^2", "5x^4", "x^0.5", "-2x^-3"] {
            let (result, _) = direct(input);
            let integral = result.unwrap();
            let back = integral.diff("x").unwrap();
            let original = parse_expression(input, "x").unwrap();
            for x in [0.5, 1.3, 2.2] {
                assert_relative_eq!(
                    back.eval_expression(&["x"], &[x]),
                    original.eval_expression(&["x"], &[x]),
                    epsilon = 1e-9
                );
            }
        }
    }
}
