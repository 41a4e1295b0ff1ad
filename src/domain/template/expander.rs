// Template expansion (RFC 6570 levels 1-4)

use serde_json::{Map, Value};

use super::ast::{Template, TemplatePart, VarSpec, VariableExpr};
use super::operator::OperatorRules;

/// Substitutes variables in a compiled template
pub struct TemplateExpander;

impl TemplateExpander {
    /// Expand using a bindings map
    pub fn expand(template: &Template, bindings: &Map<String, Value>) -> String {
        Self::expand_with(template, |name| bindings.get(name).cloned())
    }

    /// Expand using a lookup callback. The callback is invoked once per var-ref,
    /// in declaration order, and may mutate its own state (e.g. consume keys).
    pub fn expand_with<F>(template: &Template, mut lookup: F) -> String
    where
        F: FnMut(&str) -> Option<Value>,
    {
        let mut result = String::new();

        for part in template.parts() {
            match part {
                TemplatePart::Literal(s) => result.push_str(s),
                TemplatePart::Variable(expr) => {
                    result.push_str(&Self::expand_expression(expr, &mut lookup))
                }
            }
        }

        result
    }

    fn expand_expression<F>(expr: &VariableExpr, lookup: &mut F) -> String
    where
        F: FnMut(&str) -> Option<Value>,
    {
        let rules = expr.operator.rules();
        let mut result = String::new();
        let mut emitted_any = false;

        for spec in &expr.vars {
            let value = match lookup(&spec.name) {
                Some(value) if !is_undefined(&value) => value,
                _ => continue,
            };

            if emitted_any {
                result.push_str(rules.joiner());
            } else {
                result.push_str(rules.prefix);
                emitted_any = true;
            }

            match &value {
                Value::Array(items) => expand_list(&mut result, spec, &rules, items),
                Value::Object(entries) => expand_map(&mut result, spec, &rules, entries),
                scalar => expand_scalar(&mut result, spec, &rules, &scalar_text(scalar)),
            }
        }

        result
    }
}

/// Values that expand to nothing at all
fn is_undefined(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
        _ => false,
    }
}

/// Text form of a value before encoding
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

fn expand_list(out: &mut String, spec: &VarSpec, rules: &OperatorRules, items: &[Value]) {
    if rules.named {
        push_label(out, &spec.name);
    }

    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            if spec.explode {
                out.push_str(rules.joiner());
                if rules.named {
                    push_label(out, &spec.name);
                }
            } else {
                out.push(',');
            }
        }
        out.push_str(&rules.encode(&scalar_text(item)));
    }
}

fn expand_map(
    out: &mut String,
    spec: &VarSpec,
    rules: &OperatorRules,
    entries: &Map<String, Value>,
) {
    if rules.named && !spec.explode {
        push_label(out, &spec.name);
    }

    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 {
            out.push_str(if spec.explode { rules.joiner() } else { "," });
        }
        out.push_str(&rules.encode(key));
        out.push(if spec.explode { '=' } else { ',' });
        out.push_str(&rules.encode(&scalar_text(value)));
    }
}

fn expand_scalar(out: &mut String, spec: &VarSpec, rules: &OperatorRules, text: &str) {
    if rules.named {
        out.push_str(&spec.name);
        if !rules.trim_empty || !text.is_empty() {
            out.push('=');
        }
    }

    let value = match spec.prefix_len {
        Some(len) => text.chars().take(len).collect(),
        None => text.to_string(),
    };
    out.push_str(&rules.encode(&value));
}

fn push_label(out: &mut String, name: &str) {
    out.push_str(name);
    out.push('=');
}
