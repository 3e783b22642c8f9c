#![allow(non_snake_case)]
use std::env;

use RustedCalculus::Utils::logger::init_logger;
use RustedCalculus::symbolic::calculus::{StepCalculator, differentiate, integrate};
use RustedCalculus::symbolic::steps::Notation;

/// usage: `RustedCalculus d "x^2*sin(x)"` or `RustedCalculus i "x*exp(x)"`;
/// without arguments one of the built-in examples runs
fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() >= 3 {
        run_from_args(&args[1], &args[2]);
        return;
    }
    let _ = init_logger(Some("info"));
    let example = 2;
    match example {
        0 => {
            // DIFFERENTIATION
            let d = differentiate("3x^4 - 2x*sin(x^2) + e^(2x)", Notation::Lagrange);
            println!("derivative: {}", d.result);
            println!("{}", d.trace.render());
        }
        1 => {
            // same derivative, formulas in Leibniz notation
            let d = differentiate("x*exp(x)/(x^2+1)", Notation::Leibniz);
            println!("derivative: {}", d.result);
            println!("{}", d.trace.render());
        }
        2 => {
            // INTEGRATION: direct rules, u-substitution and integration by parts in one sum
            let i = integrate("x^2 + 2x*cos(x^2) + x*sin(x)");
            println!("integral: {} + C", i.result);
            println!("{}", i.trace.render());
        }
        3 => {
            // an unsupported term poisons the result, the trace shows where
            let i = integrate("x + sin(x)*cos(x)");
            println!("integral: {}", i.result);
            if let Some(error) = &i.error {
                println!("error: {}", error);
            }
            println!("{}", i.trace.render());
        }
        4 => {
            // settings from a task document
            let document = "
            engine
            variable: t
            notation: leibniz
            parts_depth: 8
            loglevel: info
            ";
            match StepCalculator::from_task_document(document) {
                Ok(calculator) => {
                    let i = calculator.integrate("t^2*exp(t)");
                    println!("integral: {} + C", i.result);
                    let d = calculator.differentiate(&i.result);
                    println!("check: {}", d.result);
                }
                Err(e) => println!("invalid task document: {}", e),
            }
        }
        _ => println!("no such example"),
    }
}

fn run_from_args(mode: &str, input: &str) {
    match mode {
        "d" | "diff" => {
            let d = differentiate(input, Notation::Lagrange);
            println!("{}", d.trace.render());
            println!("result: {}", d.result);
        }
        "i" | "int" => {
            let i = integrate(input);
            println!("{}", i.trace.render());
            println!("result: {} + C", i.result);
        }
        other => println!("unknown mode '{}', expected d or i", other),
    }
}
