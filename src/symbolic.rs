#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// Step-by-step (explainable) symbolic calculus: every derivative and antiderivative comes
/// with the ordered tree of rules that produced it.
///
///# Example
/// ```
/// use RustedCalculus::symbolic::calculus::{differentiate, integrate};
/// use RustedCalculus::symbolic::steps::Notation;
/// let d = differentiate("x^2+sin(x)", Notation::Lagrange);
/// assert_eq!(d.result, "2x + cos(x)");
/// let i = integrate("2x*cos(x^2)");
/// assert_eq!(i.result, "sin(x^2)");
/// // depth-first walk over the steps
/// for step in i.trace.walk() {
///     println!("{}: {}", step.title, step.calculation.clone().unwrap_or_default());
/// }
/// ```
/// ________________________________________________________________________________________________________________________________
/// entry points `differentiate`, `integrate` and the configurable `StepCalculator`
pub mod calculus;
/// settings of a calculation, readable from a task document
pub mod engine_config;
/// error type and in-band error markers
pub mod errors;
/// integration by parts for polynomial × sin/cos/exp products
pub mod integration_by_parts;
/// turns the textual notation into an expression tree
pub mod parse_expr;
/// step trace of a calculation
pub mod steps;
/// u-substitution, the entry point for integrating one term
pub mod substitution;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// expression tree, printer and tree utilities
///# Example#
/// ```
/// use RustedCalculus::symbolic::parse_expr::parse_expression;
/// let e = parse_expression("3x^4 - x*exp(x)", "x").unwrap();
/// assert_eq!(e.to_string(), "3x^4 - x*exp(x)");
/// assert_eq!(e.eval_expression(&["x"], &[0.0]), 0.0);
/// ```
pub mod symbolic_engine;
/// differentiation rules with step recording
pub mod symbolic_engine_derivatives;
/// end-to-end scenarios
mod symbolic_engine_tests;
/// direct integration rules
pub mod symbolic_integration;
/// normalization of rule output
pub mod symbolic_simplify;
/// bracket and number helpers of the splitter
pub mod utils;
