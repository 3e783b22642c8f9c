//! Step trace of a calculation.
//!
//! Every rule application appends one [`StepNode`] to the trace of the call that applied it.
//! A recursive sub-computation (the derivative of a factor, the inner function of a chain
//! rule, the remaining integral of integration by parts) gets its own fresh node, owned by
//! the call that created it and moved into the parent when that call finishes, successful
//! or not. The tree therefore follows the order in which sub-computations actually ran.
use strum_macros::{Display, EnumString};

/// Kind of computation a trace node belongs to. Fixed when the node is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TraceMode {
    Differentiation,
    Integration,
}

/// Notation of derivative formulas in the trace: `f'(x)` or `d/dx(f)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Notation {
    #[default]
    Lagrange,
    Leibniz,
}

impl Notation {
    /// "(f)'" or "d/dx(f)"
    pub fn derivative_of(self, f: &str, var: &str) -> String {
        match self {
            Notation::Lagrange => format!("({})'", f),
            Notation::Leibniz => format!("d/d{}({})", var, f),
        }
    }

    /// derivative symbol of a named function: "u'" or "du/dx"
    pub fn prime(self, name: &str, var: &str) -> String {
        match self {
            Notation::Lagrange => format!("{}'", name),
            Notation::Leibniz => format!("d{}/d{}", name, var),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepNode {
    pub title: String,
    pub explanation: String,
    pub formula: Option<String>,
    pub calculation: Option<String>,
    pub is_error: bool,
    pub mode: TraceMode,
    pub children: Vec<StepNode>,
}

impl StepNode {
    /// empty sequence header, the root of a trace or of a nested sub-trace
    pub fn sequence(title: &str, mode: TraceMode) -> StepNode {
        StepNode {
            title: title.to_string(),
            explanation: String::new(),
            formula: None,
            calculation: None,
            is_error: false,
            mode,
            children: Vec::new(),
        }
    }

    /// fresh sub-trace of the same mode, to be attached with `push_nested`
    pub fn nested(&self, title: &str) -> StepNode {
        StepNode::sequence(title, self.mode)
    }

    pub fn push_rule(
        &mut self,
        title: &str,
        explanation: &str,
        formula: Option<String>,
        calculation: Option<String>,
    ) {
        let mut node = StepNode::sequence(title, self.mode);
        node.explanation = explanation.to_string();
        node.formula = formula;
        node.calculation = calculation;
        self.children.push(node);
    }

    pub fn push_error(&mut self, title: &str, explanation: &str, calculation: Option<String>) {
        let mut node = StepNode::sequence(title, self.mode);
        node.explanation = explanation.to_string();
        node.calculation = calculation;
        node.is_error = true;
        self.children.push(node);
    }

    pub fn push_nested(&mut self, child: StepNode) {
        self.children.push(child);
    }

    /// all nodes below this one, depth first, in the order they were recorded
    pub fn walk(&self) -> Vec<&StepNode> {
        let mut out = Vec::new();
        for child in &self.children {
            out.push(child);
            out.extend(child.walk());
        }
        out
    }

    pub fn has_error(&self) -> bool {
        self.is_error || self.children.iter().any(StepNode::has_error)
    }

    /// first node (depth first) whose title starts with `prefix`
    pub fn find(&self, prefix: &str) -> Option<&StepNode> {
        self.walk().into_iter().find(|n| n.title.starts_with(prefix))
    }

    /// indented plain-text rendering, one line per field
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(0, &mut out);
        out
    }

    fn render_into(&self, level: usize, out: &mut String) {
        let indent = "  ".repeat(level);
        let marker = if self.is_error { "[!] " } else { "" };
        out.push_str(&format!("{}{}{}\n", indent, marker, self.title));
        if !self.explanation.is_empty() {
            out.push_str(&format!("{}  {}\n", indent, self.explanation));
        }
        if let Some(formula) = &self.formula {
            out.push_str(&format!("{}  formula: {}\n", indent, formula));
        }
        if let Some(calculation) = &self.calculation {
            out.push_str(&format!("{}  calculation: {}\n", indent, calculation));
        }
        for child in &self.children {
            child.render_into(level + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_notation_from_str() {
        assert_eq!(Notation::from_str("leibniz"), Ok(Notation::Leibniz));
        assert_eq!(Notation::from_str("lagrange"), Ok(Notation::Lagrange));
        assert!(Notation::from_str("newton").is_err());
        assert_eq!(Notation::default(), Notation::Lagrange);
        assert_eq!(Notation::Leibniz.derivative_of("x^2", "x"), "d/dx(x^2)");
        assert_eq!(Notation::Lagrange.prime("u", "x"), "u'");
    }

    #[test]
    fn test_nested_traces_keep_order_and_mode() {
        let mut root = StepNode::sequence("Integration", TraceMode::Integration);
        root.push_rule("Sum rule", "split", None, None);
        let mut child = root.nested("Term 1");
        let mut du = StepNode::sequence("du", TraceMode::Differentiation);
        du.push_rule("Power rule", "", Some("(x^n)' = nx^(n-1)".to_string()), None);
        child.push_nested(du);
        child.push_error("Unsupported", "no rule", Some("tan(x)".to_string()));
        root.push_nested(child);

        let titles: Vec<&str> = root.walk().iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Sum rule", "Term 1", "du", "Power rule", "Unsupported"]);
        assert!(root.has_error());
        assert_eq!(root.find("Term").map(|n| n.mode), Some(TraceMode::Integration));
        assert_eq!(root.find("Power").map(|n| n.mode), Some(TraceMode::Differentiation));
        assert!(root.render().contains("[!] Unsupported"));
    }
}
