// Abstract Syntax Tree types for URI templates

use serde::{Deserialize, Serialize};

use super::operator::Operator;

/// A compiled template.
///
/// Parts always alternate literal / variable and start and end with a literal,
/// so a template with `n` expressions holds `n + 1` literals (some of them empty).
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    raw: String,
    parts: Vec<TemplatePart>,
}

impl Template {
    /// Build from parts in any arrangement; adjacent literals are joined and
    /// empty literals are inserted so that literals and variables alternate.
    pub fn new(raw: &str, parts: Vec<TemplatePart>) -> Self {
        let mut normalized = vec![TemplatePart::Literal(String::new())];
        for part in parts {
            match part {
                TemplatePart::Literal(text) => match normalized.last_mut() {
                    Some(TemplatePart::Literal(current)) => current.push_str(&text),
                    _ => normalized.push(TemplatePart::Literal(text)),
                },
                TemplatePart::Variable(expr) => {
                    if matches!(normalized.last(), Some(TemplatePart::Variable(_))) {
                        normalized.push(TemplatePart::Literal(String::new()));
                    }
                    normalized.push(TemplatePart::Variable(expr));
                }
            }
        }
        if matches!(normalized.last(), Some(TemplatePart::Variable(_))) {
            normalized.push(TemplatePart::Literal(String::new()));
        }

        Self {
            raw: raw.to_string(),
            parts: normalized,
        }
    }

    pub fn parts(&self) -> &[TemplatePart] {
        &self.parts
    }

    /// The template string this was compiled from
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Literal fragments in declaration order
    pub fn literals(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                TemplatePart::Literal(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Get all expressions in this template
    pub fn expressions(&self) -> Vec<&VariableExpr> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                TemplatePart::Variable(var) => Some(var),
                _ => None,
            })
            .collect()
    }

    /// Every variable name referenced, in declaration order
    pub fn variable_names(&self) -> Vec<&str> {
        self.expressions()
            .into_iter()
            .flat_map(|expr| expr.vars.iter().map(|v| v.name.as_str()))
            .collect()
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A template consists of literal strings and variable expressions
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    Variable(VariableExpr),
}

/// One `{...}` expression: an operator and one or more var-refs
#[derive(Debug, Clone, PartialEq)]
pub struct VariableExpr {
    pub operator: Operator,
    pub vars: Vec<VarSpec>,
}

impl VariableExpr {
    pub fn new(operator: Operator, vars: Vec<VarSpec>) -> Self {
        Self { operator, vars }
    }
}

/// A single var-ref inside an expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarSpec {
    pub name: String,
    /// `{name:N}` - keep only the first N characters of a string value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_len: Option<usize>,
    /// `{name*}`
    pub explode: bool,
}

impl VarSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            prefix_len: None,
            explode: false,
        }
    }

    pub fn with_explode(mut self, explode: bool) -> Self {
        self.explode = explode;
        self
    }

    pub fn with_prefix_len(mut self, len: usize) -> Self {
        self.prefix_len = Some(len);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> TemplatePart {
        TemplatePart::Variable(VariableExpr::new(Operator::Simple, vec![VarSpec::new(name)]))
    }

    #[test]
    fn test_new_restores_alternation() {
        let template = Template::new(
            "{a}{b}/x",
            vec![
                var("a"),
                var("b"),
                TemplatePart::Literal("/".to_string()),
                TemplatePart::Literal("x".to_string()),
            ],
        );

        assert_eq!(template.literals(), vec!["", "", "/x"]);
        assert_eq!(template.variable_names(), vec!["a", "b"]);
        assert_eq!(template.parts().len(), 5);
    }

    #[test]
    fn test_new_with_no_parts_is_one_empty_literal() {
        let template = Template::new("", Vec::new());
        assert_eq!(template.parts(), &[TemplatePart::Literal(String::new())]);
        assert!(template.match_uri("").is_some());
        assert!(template.match_uri("x").is_none());
    }

    #[test]
    fn test_hand_built_template_matches_without_panicking() {
        let template = Template::new("{a}", vec![var("a")]);
        let matched = template.match_uri("zoo").unwrap();
        assert_eq!(matched.get("a"), Some(&serde_json::json!("zoo")));
    }
}
