//! Settings of a calculation. The defaults reproduce the behaviour of the free functions
//! `calculus::differentiate` and `calculus::integrate`; a task document can override them:
//!
//! ```text
//! engine
//! variable: x
//! notation: leibniz
//! tolerance: 1e-9
//! parts_depth: 32
//! loglevel: info
//! ```
use std::str::FromStr;

use crate::Utils::task_parser::{DocumentMap, SectionMap, Value, first_value, parse_document_as};
use crate::symbolic::errors::{CalcError, Result};
use crate::symbolic::steps::Notation;

pub const ENGINE_SECTION: &str = "engine";
const KEYS: [&str; 5] = ["variable", "notation", "tolerance", "parts_depth", "loglevel"];

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// variable of differentiation and integration
    pub variable: String,
    pub notation: Notation,
    /// how close to 1 the coefficient ratio of a u-substitution must be to count as perfect
    pub substitution_tolerance: f64,
    /// maximal number of nested integrations by parts
    pub max_parts_depth: usize,
    pub loglevel: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            variable: "x".to_string(),
            notation: Notation::Lagrange,
            substitution_tolerance: 1e-9,
            max_parts_depth: 32,
            loglevel: None,
        }
    }
}

fn template() -> DocumentMap {
    let section: SectionMap = KEYS.iter().map(|k| (k.to_string(), None)).collect();
    DocumentMap::from([(ENGINE_SECTION.to_string(), section)])
}

fn expect_string<'v>(key: &str, value: &'v Value) -> Result<&'v String> {
    value
        .as_string()
        .ok_or_else(|| CalcError::Config(format!("{} must be a name, got {}", key, value)))
}

impl EngineConfig {
    /// Reads the `engine` section of a task document; missing keys keep their defaults.
    pub fn from_document(document: &str) -> Result<EngineConfig> {
        let parsed = parse_document_as(document, Some(&template()))?;
        if let Some(section) = parsed.get(ENGINE_SECTION) {
            if let Some(unknown) = section.keys().find(|k| !KEYS.contains(&k.as_str())) {
                return Err(CalcError::Config(format!("unknown key '{}' in section engine", unknown)));
            }
        }
        let mut config = EngineConfig::default();
        let value = |key: &str| first_value(&parsed, ENGINE_SECTION, key);

        if let Some(v) = value("variable") {
            let name = expect_string("variable", v)?;
            if name == "e" || !name.chars().all(|c| c.is_ascii_lowercase()) {
                return Err(CalcError::Config(format!("'{}' cannot be a variable", name)));
            }
            config.variable = name.clone();
        }
        if let Some(v) = value("notation") {
            let name = expect_string("notation", v)?;
            config.notation = Notation::from_str(name)
                .map_err(|_| CalcError::Config(format!("unknown notation '{}'", name)))?;
        }
        if let Some(v) = value("tolerance") {
            match v.as_float() {
                Some(t) if t > 0.0 => config.substitution_tolerance = t,
                _ => {
                    return Err(CalcError::Config(format!(
                        "tolerance must be a positive number, got {}",
                        v
                    )));
                }
            }
        }
        if let Some(v) = value("parts_depth") {
            match v.as_integer() {
                Some(d) if d > 0 => config.max_parts_depth = d as usize,
                _ => {
                    return Err(CalcError::Config(format!(
                        "parts_depth must be a positive integer, got {}",
                        v
                    )));
                }
            }
        }
        if let Some(v) = value("loglevel") {
            config.loglevel = Some(expect_string("loglevel", v)?.clone());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.variable, "x");
        assert_eq!(config.notation, Notation::Lagrange);
        assert_eq!(config.max_parts_depth, 32);
        assert_eq!(EngineConfig::from_document("").unwrap(), config);
    }

    #[test]
    fn test_read_engine_section() {
        let config = EngineConfig::from_document(
            "engine\n variable: t\n notation: leibniz\n tolerance: 1e-6\n parts_depth: 4\n loglevel: off",
        )
        .unwrap();
        assert_eq!(config.variable, "t");
        assert_eq!(config.notation, Notation::Leibniz);
        assert_eq!(config.substitution_tolerance, 1e-6);
        assert_eq!(config.max_parts_depth, 4);
        assert_eq!(config.loglevel.as_deref(), Some("off"));
    }

    #[test]
    fn test_invalid_values() {
        for doc in [
            "engine notation: newton",
            "engine parts_depth: 0",
            "engine tolerance: small",
            "engine variable: e",
            "engine variable: 3",
            "engine colour: red",
        ] {
            assert!(
                matches!(EngineConfig::from_document(doc), Err(CalcError::Config(_))),
                "accepted {}",
                doc
            );
        }
    }
}
