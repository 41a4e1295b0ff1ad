// Template module for RFC 6570 URI templates
//
// This module provides compilation, expansion, and reverse matching of
// URI templates (levels 1-4).

mod ast;
mod cache;
mod expander;
mod matcher;
mod operator;
mod parser;

pub use ast::{Template, TemplatePart, VarSpec, VariableExpr};
pub use cache::TemplateCache;
pub use expander::TemplateExpander;
pub(crate) use expander::scalar_text;
pub use matcher::TemplateMatcher;
pub use operator::{encode_reserved, encode_strict, Encoding, Operator, OperatorRules};
pub use parser::TemplateParser;

use serde_json::{Map, Value};

impl Template {
    /// Compile a template string
    pub fn parse(template: &str) -> Self {
        TemplateParser::parse(template)
    }

    /// Expand with a bindings map
    pub fn expand(&self, bindings: &Map<String, Value>) -> String {
        TemplateExpander::expand(self, bindings)
    }

    /// Expand with a lookup callback
    pub fn expand_with<F>(&self, lookup: F) -> String
    where
        F: FnMut(&str) -> Option<Value>,
    {
        TemplateExpander::expand_with(self, lookup)
    }

    /// Recover bindings from an expanded string; `None` means no match
    pub fn match_uri(&self, uri: &str) -> Option<Map<String, Value>> {
        TemplateMatcher::match_uri(self, uri)
    }
}
