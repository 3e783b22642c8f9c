//! # Expression splitter
//!
//! Turns the compact textual notation (`3x^4 - 2x*sin(x^2) + e^(2x)`) into an [`Expr`] tree.
//! Parsing is done the way a person reads such an expression: first cut the top-level sum
//! into signed terms, then cut each term at its rightmost top-level `*`, `/` or `.`, and
//! finally classify what is left as one factor. Every cut respects parenthesis depth.
//!
//! Factor classes, tried in order:
//! 1. numeric constant `2`, `-0.5`
//! 2. the bare variable `x`
//! 3. monomial `ax^n` with an optional signed coefficient and a numeric exponent
//! 4. negated factor `-sin(x)`
//! 5. fully parenthesized expression `(x^2+1)`
//! 6. exponential written as a power of `e`: `e^x`, `e^(2x)`
//! 7. power with a numeric exponent `(x+1)^3`, `sin(x)^2`
//! 8. function call `sin(..)`, `cos(..)`, `tan(..)`, `ln(..)`, `exp(..)`, `sqrt(..)`, `abs(..)`
//!
//! Anything else is reported as [`CalcError::UnrecognizedTerm`], a function call whose
//! brackets do not match as [`CalcError::UnbalancedParentheses`].
use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use strum_macros::Display;

use crate::symbolic::errors::{CalcError, Result};
use crate::symbolic::symbolic_engine::{Expr, MathFunction};
use crate::symbolic::utils::{
    brackets_balanced, encloses_whole, find_pair_to_this_bracket,
    find_rightmost_operator_outside_brackets, strip_whitespace,
};

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(\d+\.?\d*|\.\d+)$").expect("number pattern"));
static FUNCTION_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]+)\(").expect("function call pattern"));

/// Sign connecting a term to the terms before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Sign {
    #[strum(to_string = "+")]
    Plus,
    #[strum(to_string = "-")]
    Minus,
}

impl Sign {
    pub fn flip(self) -> Sign {
        match self {
            Sign::Plus => Sign::Minus,
            Sign::Minus => Sign::Plus,
        }
    }

    /// folds the sign into the term itself
    pub fn apply(self, term: Expr) -> Expr {
        match self {
            Sign::Plus => term,
            Sign::Minus => term.negate(),
        }
    }
}

/// One top-level term together with the operator that precedes it. The leading `-` of
/// the whole expression is carried as the sign of the first term.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTerm {
    pub sign: Sign,
    pub text: String,
}

/// Cuts a sum at its top-level `+`/`-`. A sign right after `^`, `*`, `/` or `.` belongs to
/// the factor that follows (`x^-1`, `2*-x`) and is not a cut. A dangling operator at the end
/// produces an empty term so the caller reports it.
pub fn split_additive(expr: &str) -> Vec<SignedTerm> {
    let mut terms = Vec::new();
    let mut depth: i64 = 0;
    let mut sign = Sign::Plus;
    let mut start = 0;
    let mut prev: Option<char> = None;
    for (i, c) in expr.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            '+' | '-' if depth == 0 && !matches!(prev, Some('^' | '*' | '/' | '.')) => {
                let pending = expr[start..i].trim();
                if pending.is_empty() {
                    if c == '-' {
                        sign = sign.flip();
                    }
                } else {
                    terms.push(SignedTerm {
                        sign,
                        text: pending.to_string(),
                    });
                    sign = if c == '-' { Sign::Minus } else { Sign::Plus };
                }
                start = i + 1;
            }
            _ => {}
        }
        if !c.is_whitespace() {
            prev = Some(c);
        }
    }
    let tail = expr[start..].trim();
    if !tail.is_empty() || start > 0 {
        terms.push(SignedTerm {
            sign,
            text: tail.to_string(),
        });
    }
    terms
}

/// Cuts a term at its rightmost top-level `*`, `/` or `.`: (left part, operator, last factor).
pub fn split_multiplicative(term: &str) -> Option<(&str, char, &str)> {
    find_rightmost_operator_outside_brackets(term)
        .map(|(pos, op)| (&term[..pos], op, &term[pos + 1..]))
}

/// Parses a whole expression (whitespace allowed) in the variable `var`.
pub fn parse_expression(input: &str, var: &str) -> Result<Expr> {
    let cleaned = strip_whitespace(input);
    let terms = split_additive(&cleaned);
    let mut parsed: Option<Expr> = None;
    for term in terms {
        let expr = parse_term(&term.text, var)?;
        parsed = Some(match parsed {
            None => term.sign.apply(expr),
            Some(acc) => match term.sign {
                Sign::Plus => acc + expr,
                Sign::Minus => acc - expr,
            },
        });
    }
    parsed.ok_or(CalcError::UnrecognizedTerm(cleaned))
}

/// Parses one multiplicative term; products and quotients associate to the left.
pub fn parse_term(term: &str, var: &str) -> Result<Expr> {
    match split_multiplicative(term) {
        Some((left, op, right)) => {
            let lhs = parse_term(left, var)?;
            let rhs = parse_factor(right, var)?;
            Ok(if op == '/' { lhs / rhs } else { lhs * rhs })
        }
        None => parse_factor(term, var),
    }
}

fn parse_number(text: &str) -> Option<f64> {
    match text {
        "" => Some(1.0),
        "-" => Some(-1.0),
        _ => text.parse::<f64>().ok(),
    }
}

fn monomial_regex(var: &str) -> Option<Regex> {
    Regex::new(&format!(
        r"^(-?[\d.]*){}(?:\^(-?[\d.]+))?$",
        regex::escape(var)
    ))
    .ok()
}

/// byte position of the last `^` at parenthesis depth zero
fn rightmost_caret(factor: &str) -> Option<usize> {
    let mut depth: i64 = 0;
    let mut found = None;
    for (i, c) in factor.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            '^' if depth == 0 => found = Some(i),
            _ => {}
        }
    }
    found
}

/// Classifies a single factor, see the module documentation for the order of the classes.
pub fn parse_factor(factor: &str, var: &str) -> Result<Expr> {
    let unrecognized = || CalcError::UnrecognizedTerm(factor.to_string());
    if factor.is_empty() {
        return Err(unrecognized());
    }
    // constant
    if NUMBER.is_match(factor) {
        return factor.parse::<f64>().map(Expr::Const).map_err(|_| unrecognized());
    }
    // bare variable
    if factor == var {
        return Ok(Expr::var(var));
    }
    // monomial
    if let Some(caps) = monomial_regex(var).and_then(|re| re.captures(factor)) {
        let coefficient = parse_number(caps.get(1).map_or("", |m| m.as_str()));
        let exponent = caps.get(2).map_or(Some(1.0), |m| m.as_str().parse::<f64>().ok());
        return match (coefficient, exponent) {
            (Some(a), Some(n)) => Ok(Expr::monomial(a, n, var)),
            _ => Err(unrecognized()),
        };
    }
    if let Some(rest) = factor.strip_prefix('-') {
        return Ok(parse_factor(rest, var)?.negate());
    }
    if encloses_whole(factor) {
        return parse_expression(&factor[1..factor.len() - 1], var);
    }
    if let Some(exponent) = factor.strip_prefix("e^") {
        return Ok(Expr::Exp(parse_factor(exponent, var)?.boxed()));
    }
    if let Some(pos) = rightmost_caret(factor) {
        let (base, exponent) = (&factor[..pos], &factor[pos + 1..]);
        if base.is_empty() {
            return Err(unrecognized());
        }
        if !NUMBER.is_match(exponent) {
            return Err(CalcError::UnsupportedExponent(factor.to_string()));
        }
        let n = exponent.parse::<f64>().map_err(|_| unrecognized())?;
        return Ok(match parse_factor(base, var)? {
            // (u^a)^n reads as u^(a*n)
            Expr::Pow(inner, a) if n.fract() == 0.0 => match a.as_const() {
                Some(a) => (*inner).pow(Expr::Const(a * n)),
                None => Expr::Pow(inner, a).pow(Expr::Const(n)),
            },
            base => base.pow(Expr::Const(n)),
        });
    }
    if let Some(caps) = FUNCTION_CALL.captures(factor) {
        let name = caps.get(1).map_or("", |m| m.as_str());
        let open = name.len();
        if !brackets_balanced(factor) {
            return Err(CalcError::UnbalancedParentheses(factor.to_string()));
        }
        let function = MathFunction::from_name(name).ok_or_else(unrecognized)?;
        if find_pair_to_this_bracket(factor, open) != Some(factor.len() - 1) {
            return Err(unrecognized());
        }
        let inner = parse_expression(&factor[open + 1..factor.len() - 1], var)?;
        debug!("function call {} with argument {}", function, inner);
        return Ok(function.apply(inner));
    }
    if !brackets_balanced(factor) {
        return Err(CalcError::UnbalancedParentheses(factor.to_string()));
    }
    Err(unrecognized())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn parse(s: &str) -> Expr {
        parse_expression(s, "x").unwrap()
    }

    fn texts(terms: &[SignedTerm]) -> Vec<(Sign, &str)> {
        terms.iter().map(|t| (t.sign, t.text.as_str())).collect()
    }

    #[test]
    fn test_split_additive() {
        let terms = split_additive("3x^2-2x+sin(x+1)");
        assert_eq!(
            texts(&terms),
            vec![
                (Sign::Plus, "3x^2"),
                (Sign::Minus, "2x"),
                (Sign::Plus, "sin(x+1)")
            ]
        );
    }

    #[test]
    fn test_split_additive_leading_and_unary_signs() {
        let terms = split_additive("-x^-2+2*-x");
        assert_eq!(texts(&terms), vec![(Sign::Minus, "x^-2"), (Sign::Plus, "2*-x")]);
        let terms = split_additive("x+-y");
        assert_eq!(texts(&terms), vec![(Sign::Plus, "x"), (Sign::Minus, "y")]);
        assert!(split_additive("").is_empty());
        let terms = split_additive("x+");
        assert_eq!(texts(&terms), vec![(Sign::Plus, "x"), (Sign::Plus, "")]);
    }

    #[test]
    fn test_split_multiplicative() {
        assert_eq!(split_multiplicative("2x*cos(x^2)"), Some(("2x", '*', "cos(x^2)")));
        assert_eq!(split_multiplicative("x^3/3"), Some(("x^3", '/', "3")));
        assert_eq!(split_multiplicative("sin(x*y)"), None);
    }

    #[test]
    fn test_parse_constants_and_monomials() {
        assert_eq!(parse("5"), Expr::Const(5.0));
        assert_eq!(parse("x"), Expr::var("x"));
        assert_eq!(parse("3x^4"), Expr::monomial(3.0, 4.0, "x"));
        assert_eq!(parse("-x"), Expr::monomial(-1.0, 1.0, "x"));
        assert_eq!(parse("2.5x"), Expr::monomial(2.5, 1.0, "x"));
        assert_eq!(parse("x^-1"), Expr::monomial(1.0, -1.0, "x"));
    }

    #[test]
    fn test_parse_functions_and_powers() {
        let x = Expr::var("x");
        assert_eq!(parse("sin(x)"), Expr::sin(x.clone().boxed()));
        assert_eq!(parse("tg(x)"), Expr::tg(x.clone().boxed()));
        assert_eq!(parse("e^x"), Expr::Exp(x.clone().boxed()));
        assert_eq!(parse("e^(2x)"), Expr::Exp(Expr::monomial(2.0, 1.0, "x").boxed()));
        assert_eq!(
            parse("(x+1)^3"),
            (x.clone() + Expr::Const(1.0)).pow(Expr::Const(3.0))
        );
        assert_eq!(
            parse("sin(x)^2"),
            Expr::sin(x.clone().boxed()).pow(Expr::Const(2.0))
        );
        assert_eq!(parse("(x^2)^3"), x.clone().pow(Expr::Const(6.0)));
        assert_eq!(
            parse("(sin(x)^2)^2"),
            Expr::sin(x.clone().boxed()).pow(Expr::Const(4.0))
        );
        assert_eq!(
            parse("(x^2)^0.5"),
            x.clone().pow(Expr::Const(2.0)).pow(Expr::Const(0.5))
        );
    }

    #[test]
    fn test_parse_products_keep_left_association() {
        let e = parse("2x*cos(x^2)");
        let expected = Expr::monomial(2.0, 1.0, "x") * Expr::cos(Expr::monomial(1.0, 2.0, "x").boxed());
        assert_eq!(e, expected);
        let e = parse("x.exp(x)");
        assert_eq!(e, Expr::var("x") * Expr::Exp(Expr::var("x").boxed()));
    }

    #[test]
    fn test_parse_evaluates_correctly() {
        let e = parse("x^2 + 3*sin(x) - (x+1)/(x-1) + e^x");
        let x = 0.7f64;
        let expected = x * x + 3.0 * x.sin() - (x + 1.0) / (x - 1.0) + x.exp();
        assert_relative_eq!(e.eval_expression(&["x"], &[x]), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_negated_term_folds_sign_into_coefficient() {
        let e = parse("-2x*cos(x)");
        assert_eq!(e.to_string(), "-2x*cos(x)");
        assert!(e.is_negative_looking());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_expression("sin((x)", "x"),
            Err(CalcError::UnbalancedParentheses(_))
        ));
        assert!(matches!(
            parse_expression("sin(x", "x"),
            Err(CalcError::UnbalancedParentheses(_))
        ));
        assert_eq!(
            parse_expression("foo(x)", "x"),
            Err(CalcError::UnrecognizedTerm("foo(x)".to_string()))
        );
        assert_eq!(
            parse_expression("y", "x"),
            Err(CalcError::UnrecognizedTerm("y".to_string()))
        );
        assert!(matches!(
            parse_expression("x^x", "x"),
            Err(CalcError::UnsupportedExponent(_))
        ));
        assert!(parse_expression("x+", "x").is_err());
        assert!(parse_expression("", "x").is_err());
    }

    #[test]
    fn test_printed_form_parses_back() {
        for input in [
            "2x + cos(x)",
            "-x*cos(x) + sin(x)",
            "x^3/3",
            "1/2*exp(2x)",
            "ln(abs(x))",
            "(x + 1)^3/3",
            "1/(2*sqrt(x))",
        ] {
            assert_eq!(parse(input).to_string(), input);
        }
    }
}
