//! Error type shared by the splitter, the rule engines and the configuration layer.
//!
//! Errors travel twice: as a typed `CalcError` through `Result` so that sum and product
//! assembly stops at the first failing sub-computation, and as an in-band marker string
//! (`[Error: ...]`) inside the public result so that callers displaying only text still
//! see which sub-term could not be handled.
use thiserror::Error;

/// Prefix of every in-band error marker placed in a result string
pub const ERROR_MARKER_PREFIX: &str = "[Error";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("unbalanced parentheses in '{0}'")]
    UnbalancedParentheses(String),
    #[error("unrecognized term '{0}'")]
    UnrecognizedTerm(String),
    #[error("unsupported exponent in '{0}'")]
    UnsupportedExponent(String),
    #[error("no integration rule applies to '{0}'")]
    NotIntegrable(String),
    #[error("invalid substitution for '{0}'")]
    UnsupportedSubstitution(String),
    #[error("integration by parts exceeded {depth} nested passes on '{term}'")]
    PartsDepthExceeded { term: String, depth: usize },
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CalcError>;

impl CalcError {
    /// the text fragment that caused the failure
    pub fn offending(&self) -> &str {
        match self {
            CalcError::UnbalancedParentheses(s)
            | CalcError::UnrecognizedTerm(s)
            | CalcError::UnsupportedExponent(s)
            | CalcError::NotIntegrable(s)
            | CalcError::UnsupportedSubstitution(s)
            | CalcError::Config(s) => s,
            CalcError::PartsDepthExceeded { term, .. } => term,
        }
    }

    /// in-band marker placed into the result string of a failed computation
    pub fn marker(&self) -> String {
        format!("{}: {}]", ERROR_MARKER_PREFIX, self.offending())
    }
}

/// true if a result string carries an error marker somewhere inside
pub fn has_error_marker(result: &str) -> bool {
    result.contains(ERROR_MARKER_PREFIX)
}
