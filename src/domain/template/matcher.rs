// Reverse matching: recover variable bindings from an expanded URI
//
// This is a best-effort inverse. When several bindings could have produced the
// same string, one of them is picked heuristically; no uniqueness is promised.

use serde_json::{Map, Value};

use super::ast::{Template, VarSpec, VariableExpr};
use super::operator::OperatorRules;

pub struct TemplateMatcher;

impl TemplateMatcher {
    /// Returns `None` when the literal text of the template does not line up
    /// with `uri`, i.e. the string was not produced by this template.
    pub fn match_uri(template: &Template, uri: &str) -> Option<Map<String, Value>> {
        let literals = template.literals();
        let expressions = template.expressions();
        let last = literals.len() - 1;

        let mut result = Map::new();
        let mut remaining = uri;

        for (i, literal) in literals.iter().enumerate() {
            remaining = remaining.strip_prefix(literal)?;

            if i == last {
                if remaining.is_empty() {
                    break;
                }
                return None;
            }

            let (value, rest) = Self::value_region(&literals, &expressions, i, remaining)?;
            remaining = rest;
            unexpand(expressions[i], value, &mut result);
        }

        Some(result)
    }

    /// Split `remaining` into the text belonging to expression `index` and the rest
    fn value_region<'a>(
        literals: &[&str],
        expressions: &[&VariableExpr],
        index: usize,
        remaining: &'a str,
    ) -> Option<(&'a str, &'a str)> {
        let mut offset = index;
        let mut next_literal = literals[index + 1];

        loop {
            // The final literal anchors at the end of the input
            if offset == literals.len() - 2 {
                let value = remaining.strip_suffix(next_literal)?;
                return Some((value, &remaining[value.len()..]));
            }

            if !next_literal.is_empty() {
                let pos = remaining.find(next_literal)?;
                return Some(remaining.split_at(pos));
            }

            let next_prefix = expressions[offset + 1].operator.rules().prefix;
            if !next_prefix.is_empty() {
                let pos = remaining.find(next_prefix).unwrap_or(remaining.len());
                return Some(remaining.split_at(pos));
            }

            // Zero-width boundary with no prefix: look further ahead
            if literals.len() > offset + 2 {
                offset += 1;
                next_literal = literals[offset + 1];
                continue;
            }

            return Some((remaining, ""));
        }
    }
}

/// Recover bindings for one expression from its value region
fn unexpand(expr: &VariableExpr, value: &str, result: &mut Map<String, Value>) {
    let rules = expr.operator.rules();

    let value = if rules.prefix.is_empty() {
        value
    } else {
        match value.strip_prefix(rules.prefix) {
            Some(stripped) => stripped,
            None => return,
        }
    };

    if expr.vars.len() == 1 && expr.vars[0].explode {
        unexpand_exploded(&expr.vars[0], &rules, value, result);
    } else {
        unexpand_list(&expr.vars, &rules, value, result);
    }
}

/// A single exploded var-ref: either a list or `key=value` pairs
fn unexpand_exploded(
    spec: &VarSpec,
    rules: &OperatorRules,
    value: &str,
    result: &mut Map<String, Value>,
) {
    let joiner = rules.joiner();
    let mut items: Vec<String> = value.split(joiner).map(str::to_string).collect();

    // Values cannot contain a raw `=` under strict encoding, so an element
    // without one was split off its neighbour by a separator in the value.
    let has_equals = rules.is_strict() && value.contains('=');
    if has_equals {
        let mut i = 1;
        while i < items.len() {
            if items[i].contains('=') {
                i += 1;
            } else {
                let piece = items.remove(i);
                items[i - 1].push_str(joiner);
                items[i - 1].push_str(&piece);
            }
        }
    }

    if rules.named || has_equals {
        let mut object = match result.shift_remove(&spec.name) {
            Some(Value::Object(existing)) => existing,
            _ => Map::new(),
        };

        for item in &items {
            if rules.named && item.is_empty() {
                continue;
            }
            let (key, rest) = item.split_once('=').unwrap_or((item.as_str(), ""));
            let key = decode(rules, key);
            push_binding(&mut object, &key, split_inner(rules, rest));
        }

        // `{?list*}` labels every element with the variable name
        if object.len() == 1 && object.contains_key(&spec.name) {
            if let Some(inner) = object.shift_remove(&spec.name) {
                result.insert(spec.name.clone(), inner);
            }
        } else {
            result.insert(spec.name.clone(), Value::Object(object));
        }
    } else {
        let values: Vec<Value> = items.iter().map(|item| split_inner(rules, item)).collect();
        append_values(result, &spec.name, values);
    }
}

/// One or more var-refs sharing the operator's separator
fn unexpand_list(
    specs: &[VarSpec],
    rules: &OperatorRules,
    value: &str,
    result: &mut Map<String, Value>,
) {
    let elements: Vec<&str> = if specs.len() == 1 {
        vec![value]
    } else {
        value.split(rules.joiner()).collect()
    };
    let assignment = assign_elements(specs, elements.len());

    for (i, element) in elements.iter().enumerate() {
        if element.is_empty() && rules.named {
            continue;
        }

        let mut inner: Vec<&str> = element.split(',').collect();
        let (name, spec) = if rules.named {
            let (name, rest) = inner[0].split_once('=').unwrap_or((inner[0], ""));
            inner[0] = rest;
            let spec = specs.iter().find(|s| s.name == name).unwrap_or(&specs[0]);
            (name.to_string(), spec)
        } else {
            let spec = &specs[assignment[i]];
            (spec.name.clone(), spec)
        };

        let decoded: Vec<Value> = inner
            .iter()
            .map(|part| Value::String(decode(rules, part)))
            .collect();

        if (rules.named || spec.explode) && result.contains_key(&name) {
            append_values(result, &name, decoded);
        } else if decoded.len() == 1 && !spec.explode {
            result.insert(name, decoded.into_iter().next().unwrap_or(Value::Null));
        } else {
            result.insert(name, Value::Array(decoded));
        }
    }
}

/// Map each split element to the index of the var-ref it belongs to.
///
/// Elements are assigned front-to-back while no exploded var-ref has been
/// passed; otherwise the tail is anchored against the var-refs from the end,
/// and if neither fits the first exploded var-ref absorbs the element.
fn assign_elements(specs: &[VarSpec], count: usize) -> Vec<usize> {
    (0..count)
        .map(|i| {
            let mut first_starred = 0;
            while first_starred < specs.len() - 1 && first_starred < i {
                if specs[first_starred].explode {
                    break;
                }
                first_starred += 1;
            }
            if first_starred == i {
                return i;
            }

            let mut last_starred = specs.len() - 1;
            while last_starred > 0 && specs.len() - last_starred < count - i {
                if specs[last_starred].explode {
                    break;
                }
                last_starred -= 1;
            }
            if specs.len() - last_starred == count - i {
                return last_starred;
            }

            first_starred
        })
        .collect()
}

/// Comma-split an element; a single part stays a string
fn split_inner(rules: &OperatorRules, text: &str) -> Value {
    let mut parts: Vec<Value> = text
        .split(',')
        .map(|part| Value::String(decode(rules, part)))
        .collect();
    if parts.len() == 1 {
        parts.remove(0)
    } else {
        Value::Array(parts)
    }
}

fn decode(rules: &OperatorRules, text: &str) -> String {
    if !rules.is_strict() {
        return text.to_string();
    }
    urlencoding::decode(text)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| text.to_string())
}

/// Insert, or turn a repeated key into an array of values
fn push_binding(object: &mut Map<String, Value>, key: &str, value: Value) {
    match object.get_mut(key) {
        Some(Value::Array(existing)) => existing.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            object.insert(key.to_string(), value);
        }
    }
}

/// Concatenate values onto whatever is already bound to `name`
fn append_values(result: &mut Map<String, Value>, name: &str, values: Vec<Value>) {
    match result.get_mut(name) {
        Some(Value::Array(existing)) => existing.extend(values),
        Some(existing) => {
            let mut combined = vec![existing.take()];
            combined.extend(values);
            *existing = Value::Array(combined);
        }
        None => {
            result.insert(name.to_string(), Value::Array(values));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::template::expander::TemplateExpander;
    use crate::domain::template::parser::TemplateParser;
    use serde_json::json;

    fn match_uri(template: &str, uri: &str) -> Option<Value> {
        let template = TemplateParser::parse(template);
        TemplateMatcher::match_uri(&template, uri).map(Value::Object)
    }

    #[test]
    fn test_match_simple_path() {
        assert_eq!(
            match_uri("/api/zoo/{id}", "/api/zoo/2344"),
            Some(json!({"id": "2344"}))
        );
    }

    #[test]
    fn test_match_literal_mismatch_fails() {
        assert_eq!(match_uri("/api/zoo/{id}", "/api/farm/2344"), None);
        assert_eq!(match_uri("/api/zoo", "/api/zoo/extra"), None);
        assert_eq!(match_uri("/api/{id}.json", "/api/12.xml"), None);
    }

    #[test]
    fn test_match_between_literals() {
        assert_eq!(
            match_uri("/users/{user}/posts/{post}", "/users/fred/posts/42"),
            Some(json!({"user": "fred", "post": "42"}))
        );
    }

    #[test]
    fn test_match_decodes_strict_values() {
        assert_eq!(
            match_uri("/search/{term}", "/search/rust%20templates"),
            Some(json!({"term": "rust templates"}))
        );
    }

    #[test]
    fn test_match_reserved_values_stay_raw() {
        assert_eq!(
            match_uri("{+path}/here", "/foo/bar/here"),
            Some(json!({"path": "/foo/bar"}))
        );
    }

    #[test]
    fn test_match_query() {
        assert_eq!(
            match_uri("/api/zoo{?type,size}", "/api/zoo?type=panda&size=big"),
            Some(json!({"type": "panda", "size": "big"}))
        );
    }

    #[test]
    fn test_match_query_out_of_order() {
        assert_eq!(
            match_uri("/api/zoo{?type,size}", "/api/zoo?size=big&type=panda"),
            Some(json!({"size": "big", "type": "panda"}))
        );
    }

    #[test]
    fn test_match_omitted_query() {
        assert_eq!(match_uri("/api/zoo{?type}", "/api/zoo"), Some(json!({})));
    }

    #[test]
    fn test_match_adjacent_prefixed_expressions() {
        assert_eq!(
            match_uri("/api{/resource}{?id}", "/api/zoo?id=3"),
            Some(json!({"resource": "zoo", "id": "3"}))
        );
    }

    #[test]
    fn test_match_exploded_path_list() {
        assert_eq!(
            match_uri("{/list*}", "/red/green/blue"),
            Some(json!({"list": ["red", "green", "blue"]}))
        );
    }

    #[test]
    fn test_match_exploded_query_list() {
        assert_eq!(
            match_uri("{?list*}", "?list=red&list=green&list=blue"),
            Some(json!({"list": ["red", "green", "blue"]}))
        );
    }

    #[test]
    fn test_match_exploded_query_map() {
        assert_eq!(
            match_uri("/api/zoo{?params*}", "/api/zoo?type=panda&size=big"),
            Some(json!({"params": {"type": "panda", "size": "big"}}))
        );
    }

    #[test]
    fn test_match_exploded_map_rejoins_split_values() {
        assert_eq!(
            match_uri("{keys*}", "semi=%3B,dot=.,comma=%2C"),
            Some(json!({"keys": {"semi": ";", "dot": ".", "comma": ","}}))
        );
    }

    #[test]
    fn test_match_multiple_simple_vars() {
        assert_eq!(
            match_uri("map?{x,y}", "map?1024,768"),
            Some(json!({"x": "1024", "y": "768"}))
        );
    }

    #[test]
    fn test_match_exploded_var_among_others_is_anchored_from_end() {
        assert_eq!(
            match_uri("{/list*,last}", "/a/b/c/z"),
            Some(json!({"list": ["a", "b", "c"], "last": "z"}))
        );
    }

    #[test]
    fn test_match_path_params_trim_empty() {
        assert_eq!(
            match_uri("{;x,empty}", ";x=1024;empty"),
            Some(json!({"x": "1024", "empty": ""}))
        );
    }

    #[test]
    fn test_match_adjacent_unprefixed_expressions_look_ahead() {
        // No literal or prefix separates `a` from `b`: `a` takes everything up
        // to the next non-empty literal and `b` is left empty
        assert_eq!(
            match_uri("{a}{b}/x", "foo/x"),
            Some(json!({"a": "foo", "b": ""}))
        );
        assert_eq!(
            match_uri("/{a}{b}.json", "/report.json"),
            Some(json!({"a": "report", "b": ""}))
        );
        assert_eq!(match_uri("/{a}{b}.json", "/report.xml"), None);
    }

    #[test]
    fn test_match_look_ahead_across_several_expressions() {
        assert_eq!(
            match_uri("{a}{b}{c}", "xyz"),
            Some(json!({"a": "xyz", "b": "", "c": ""}))
        );
    }

    #[test]
    fn test_match_keeps_unescaped_sub_delims() {
        assert_eq!(
            match_uri("/q/{term}", "/q/it's(a)*b%21"),
            Some(json!({"term": "it's(a)*b!"}))
        );
    }

    #[test]
    fn test_round_trip_simple_strings() {
        let template = TemplateParser::parse("/api/{resource}/{id}{?type,owner}");
        let bindings = json!({
            "resource": "zoo",
            "id": "2344",
            "type": "giant panda",
            "owner": "fred"
        });
        let bindings = bindings.as_object().unwrap();

        let uri = TemplateExpander::expand(&template, bindings);
        assert_eq!(uri, "/api/zoo/2344?type=giant%20panda&owner=fred");

        let recovered = TemplateMatcher::match_uri(&template, &uri).unwrap();
        assert_eq!(&recovered, bindings);
        assert_eq!(TemplateExpander::expand(&template, &recovered), uri);
    }
}
