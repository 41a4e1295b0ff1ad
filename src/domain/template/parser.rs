// Template compiler
//
// Compilation is lenient: any input produces a template. Unclosed braces and
// empty var-refs are kept as best-effort expressions instead of failing.

use super::ast::{Template, TemplatePart, VarSpec, VariableExpr};
use super::operator::Operator;

pub struct TemplateParser;

impl TemplateParser {
    pub fn parse(template: &str) -> Template {
        let mut chunks = template.split('{');
        let mut parts = vec![TemplatePart::Literal(
            chunks.next().unwrap_or_default().to_string(),
        )];

        for chunk in chunks {
            // A chunk without a closing brace is all expression body
            let (body, literal) = chunk.split_once('}').unwrap_or((chunk, ""));
            parts.push(TemplatePart::Variable(Self::parse_expression(body)));
            parts.push(TemplatePart::Literal(literal.to_string()));
        }

        Template::new(template, parts)
    }

    fn parse_expression(body: &str) -> VariableExpr {
        let mut chars = body.chars();
        let (operator, rest) = match chars.next().and_then(Operator::from_char) {
            Some(op) => (op, chars.as_str()),
            None => (Operator::Simple, body),
        };

        let vars = rest.split(',').map(Self::parse_var_spec).collect();
        VariableExpr::new(operator, vars)
    }

    fn parse_var_spec(raw: &str) -> VarSpec {
        let mut explode = false;
        let mut text = raw;
        while let Some(stripped) = text.strip_suffix('*') {
            explode = true;
            text = stripped;
        }

        let (name, prefix_len) = match text.split_once(':') {
            Some((name, len)) => (name, Self::parse_prefix_len(len)),
            None => (text, None),
        };

        // `{var*:3}` is malformed, but a trailing star on the name still explodes
        let mut name = name;
        while let Some(stripped) = name.strip_suffix('*') {
            explode = true;
            name = stripped;
        }

        VarSpec {
            name: name.to_string(),
            prefix_len,
            explode,
        }
    }

    /// Leading decimal digits of the length suffix, if any
    fn parse_prefix_len(len: &str) -> Option<usize> {
        let digits: String = len
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }
}
