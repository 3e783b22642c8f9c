//___________________________________TESTS____________________________________
// end-to-end scenarios through the public entry points

#[cfg(test)]
mod tests {
    use crate::symbolic::calculus::{Calculation, StepCalculator, differentiate, integrate};
    use crate::symbolic::engine_config::EngineConfig;
    use crate::symbolic::errors::{CalcError, has_error_marker};
    use crate::symbolic::parse_expr::parse_expression;
    use crate::symbolic::steps::{Notation, StepNode, TraceMode};
    use crate::symbolic::symbolic_simplify::normalize_expression;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use regex::Regex;

    fn same_function(lhs: &str, rhs: &str) {
        let f = parse_expression(lhs, "x").unwrap();
        let g = parse_expression(rhs, "x").unwrap();
        for x in [0.25, 0.7, 1.3, 2.1] {
            assert_relative_eq!(
                f.eval_expression(&["x"], &[x]),
                g.eval_expression(&["x"], &[x]),
                epsilon = 1e-8,
                max_relative = 1e-9
            );
        }
    }

    fn titles(trace: &StepNode) -> Vec<String> {
        trace.walk().iter().map(|n| n.title.clone()).collect()
    }

    #[test]
    fn test_power_rule_scenario() {
        let d = differentiate("3x^4", Notation::Lagrange);
        assert_eq!(d.result, "12x^3");
        assert!(titles(&d.trace).contains(&"Power rule".to_string()));
    }

    #[test]
    fn test_sum_rule_scenario() {
        let d = differentiate("x^2+sin(x)", Notation::Lagrange);
        assert_eq!(d.result, "2x + cos(x)");
        let t = titles(&d.trace);
        assert_eq!(t[0], "Sum rule");
        assert!(t.contains(&"Differentiating (x^2)'".to_string()));
        assert!(t.contains(&"Differentiating (sin(x))'".to_string()));
    }

    #[test]
    fn test_product_rule_scenario() {
        let d = differentiate("x*exp(x)", Notation::Lagrange);
        assert_eq!(d.result, "exp(x) + x*exp(x)");
        same_function(&d.result, "(1 + x)*exp(x)");
    }

    #[test]
    fn test_notation_does_not_change_results() {
        for input in ["x*exp(x)", "sin(x^2)/x", "sqrt(x^2+1) - 3x", "(2x+1)^3*cos(x)"] {
            let lagrange = differentiate(input, Notation::Lagrange);
            let leibniz = differentiate(input, Notation::Leibniz);
            assert_eq!(lagrange.result, leibniz.result);
            assert_eq!(titles(&lagrange.trace).len(), titles(&leibniz.trace).len());
        }
    }

    #[test]
    fn test_direct_integration_scenarios() {
        assert_eq!(integrate("x^2").result, "x^3/3");
        let zero = integrate("0");
        assert_eq!(zero.result, "0");
        assert!(zero.trace.find("Integral of zero").is_some());
    }

    #[test]
    fn test_substitution_scenario() {
        let i = integrate("2x*cos(x^2)");
        assert_eq!(i.result, "sin(x^2)");
        let analysis = i.trace.find("Substitution analysis").unwrap();
        assert!(analysis.calculation.as_deref().unwrap().starts_with("u = x^2"));
        assert!(i.trace.find("Substitution match: Perfect").is_some());
        let du = i.trace.find("Computing du/dx").unwrap();
        assert_eq!(du.mode, TraceMode::Differentiation);
        assert_eq!(i.trace.mode, TraceMode::Integration);
    }

    #[test]
    fn test_integration_by_parts_scenario() {
        let i = integrate("x*sin(x)");
        assert_eq!(i.result, "-x*cos(x) + sin(x)");
        let back = differentiate(&i.result, Notation::Lagrange);
        same_function(&back.result, "x*sin(x)");
        assert!(i.trace.find("Integration by parts").is_some());
    }

    #[test]
    fn test_error_propagation() {
        let d = differentiate("3x + sin(x", Notation::Lagrange);
        assert!(has_error_marker(&d.result));
        assert!(d.trace.walk().iter().any(|n| n.is_error));

        let i = integrate("x^2 + cos(x^2)");
        assert!(has_error_marker(&i.result));
        assert!(matches!(i.error, Some(CalcError::UnsupportedSubstitution(_))));
        assert!(i.trace.has_error());

        let d = differentiate("2*foo(x)", Notation::Lagrange);
        assert_eq!(d.result, "[Error: foo(x)]");
    }

    #[test]
    fn test_integrate_then_differentiate() {
        for integrand in [
            "x^2",
            "5",
            "3x^2 - 4x + 7",
            "x^-1 + 2/x",
            "sin(x) + cos(x) - exp(x)",
            "2x*cos(x^2)",
            "exp(4x)",
            "x*exp(x^2)",
            "sin(x)^2*cos(x)",
            "2x/(x^2+1)",
            "(2x+1)^4",
            "x*sin(x)",
            "x^2*exp(x)",
            "3x*cos(x)",
            "x^3*sin(x) - x",
            "sin(x)/4",
        ] {
            let i = integrate(integrand);
            assert!(!i.is_error(), "failed to integrate {}: {}", integrand, i.result);
            let d = differentiate(&i.result, Notation::Lagrange);
            assert!(!d.is_error(), "failed to differentiate {}", i.result);
            same_function(&d.result, integrand);
        }
    }

    #[test]
    fn test_results_are_normalized() {
        let outputs: Vec<Calculation> = vec![
            differentiate("x^3*sin(x) - 2x/(x+1)", Notation::Lagrange),
            differentiate("tan(2x)", Notation::Leibniz),
            integrate("x^2*cos(x)"),
            integrate("x^3/3 - 1/x"),
        ];
        for output in outputs {
            assert!(!output.is_error());
            let again = normalize_expression(&output.result, "x").unwrap();
            assert_eq!(again, output.result);
        }
    }

    /// random well-formed input in `x`: sums, differences, products, quotients, powers,
    /// leading and embedded minus signs, sin and exp
    fn random_expression(rng: &mut StdRng, depth: u32) -> String {
        const ATOMS: [&str; 6] = ["x", "2", "3x^2", "x^3", "-x", "0.5x"];
        if depth == 0 || rng.random_range(0..4) == 0 {
            return ATOMS[rng.random_range(0..ATOMS.len())].to_string();
        }
        let a = random_expression(rng, depth - 1);
        let b = random_expression(rng, depth - 1);
        match rng.random_range(0..10) {
            0 => format!("{} + {}", a, b),
            1 => format!("{} - ({})", a, b),
            2 => format!("({})*({})", a, b),
            3 => format!("({})/({})", a, b),
            4 => format!("-({})*{}", a, b),
            5 => format!("{}*-({})", a, b),
            6 => format!("sin({})", a),
            7 => format!("exp({})", a),
            8 => format!("({})^2", a),
            _ => format!("(({})^2)^2", a),
        }
    }

    fn assert_fixpoint(result: &str, input: &str) {
        let again = normalize_expression(result, "x")
            .unwrap_or_else(|e| panic!("{} (from {}) does not parse: {}", result, input, e));
        assert_eq!(again, result, "result of {} is not normalized", input);
        assert!(!result.contains("--"), "double minus in {}", result);
        let unbracketed_power = Regex::new(r"\^-?[\d.]+\^").unwrap();
        assert!(!unbracketed_power.is_match(result), "nested power in {}", result);
    }

    #[test]
    fn test_normalized_inputs_are_fixpoints() {
        let mut rng = StdRng::seed_from_u64(2024);
        for _ in 0..300 {
            let input = random_expression(&mut rng, 3);
            let once = normalize_expression(&input, "x").unwrap();
            assert_fixpoint(&once, &input);
        }
    }

    #[test]
    fn test_engine_results_are_fixpoints() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut derivatives = 0;
        for _ in 0..300 {
            let input = random_expression(&mut rng, 3);
            let d = differentiate(&input, Notation::Lagrange);
            if !d.is_error() {
                derivatives += 1;
                assert_fixpoint(&d.result, &input);
            }
            let i = integrate(&input);
            if !i.is_error() {
                assert_fixpoint(&i.result, &input);
            }
        }
        assert!(derivatives >= 250, "only {} of 300 inputs differentiated", derivatives);
    }

    #[test]
    fn test_signed_products_and_nested_powers() {
        let d = differentiate("-x*sin(x)*-(x)", Notation::Lagrange);
        assert_eq!(d.result, "(sin(x) + x*cos(x))*x + x*sin(x)");
        assert_fixpoint(&d.result, "-x*sin(x)*-(x)");
        let d = differentiate("3x^2*x*-x*2", Notation::Lagrange);
        assert_fixpoint(&d.result, "3x^2*x*-x*2");
        same_function(&d.result, "-24x^3");

        assert_eq!(differentiate("1/x^3", Notation::Lagrange).result, "-3x^2/x^6");
        let d = differentiate("1/sin(x)^2", Notation::Lagrange);
        assert_fixpoint(&d.result, "1/sin(x)^2");
        same_function(&d.result, "-2*cos(x)/sin(x)^3");

        let i = integrate("(x^2)^3");
        assert_eq!(i.result, "x^7/7");
        assert_eq!(integrate("x*(x^2+1)^3").result, "(x^2 + 1)^4/8");
    }

    #[test]
    fn test_trace_accounts_for_every_rule() {
        let d = differentiate("x^2*sin(x)", Notation::Lagrange);
        let t = titles(&d.trace);
        for expected in [
            "Product rule",
            "Derivative of u = x^2",
            "Power rule",
            "Derivative of v = sin(x)",
            "Derivative of sin",
            "Combining results",
        ] {
            assert!(t.contains(&expected.to_string()), "missing step {}", expected);
        }
        let rendered = d.trace.render();
        assert!(rendered.starts_with("Differentiation of (x^2*sin(x))'"));
    }

    #[test]
    fn test_parts_depth_from_config() {
        let calculator = StepCalculator::new(EngineConfig {
            max_parts_depth: 2,
            ..EngineConfig::default()
        });
        assert!(!calculator.integrate("x^2*sin(x)").is_error());
        let deep = calculator.integrate("x^3*sin(x)");
        assert!(matches!(
            deep.error,
            Some(CalcError::PartsDepthExceeded { depth: 2, .. })
        ));
        assert!(deep.trace.find("Integration by parts depth exceeded").is_some());
    }
}
