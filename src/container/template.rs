//! `{{field}}` template substitution inside document values

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::store::Document;

static TEMPLATE_VAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("template regex")
});

/// Variables referenced anywhere in `value` that `context` does not define
pub fn undefined_variables(value: &Value, context: &Document) -> BTreeSet<String> {
    let mut undefined = BTreeSet::new();
    collect_undefined(value, context, &mut undefined);
    undefined
}

fn collect_undefined(value: &Value, context: &Document, out: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => {
            for caps in TEMPLATE_VAR.captures_iter(s) {
                let name = &caps[1];
                if !context.contains_key(name) {
                    out.insert(name.to_string());
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_undefined(v, context, out)),
        Value::Object(map) => map.values().for_each(|v| collect_undefined(v, context, out)),
        _ => {}
    }
}

/// Renders every template in `value` from `context`.
///
/// A string that is exactly one template takes the context value verbatim,
/// so `"{{z}}"` renders to the number rather than its text. Returns the
/// undefined variable names on failure.
pub fn render(value: &Value, context: &Document) -> Result<Value, BTreeSet<String>> {
    let undefined = undefined_variables(value, context);
    if !undefined.is_empty() {
        return Err(undefined);
    }
    Ok(render_defined(value, context))
}

fn render_defined(value: &Value, context: &Document) -> Value {
    match value {
        Value::String(s) => {
            if let Some(caps) = TEMPLATE_VAR.captures(s) {
                if caps[0].len() == s.len() {
                    return context[&caps[1]].clone();
                }
            }
            let rendered = TEMPLATE_VAR.replace_all(s, |caps: &Captures| match &context[&caps[1]] {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            });
            Value::String(rendered.into_owned())
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| render_defined(v, context)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_defined(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::document_from_value;
    use serde_json::json;

    fn ctx() -> Document {
        document_from_value(json!({"prefix": "XCS:01", "z": 12.5})).unwrap()
    }

    #[test]
    fn test_undefined_variables_found() {
        let value = json!({"kwargs": {"a": "{{prefix}}", "b": "{{ extra }}"}, "args": ["{{missing}}"]});
        let undefined = undefined_variables(&value, &ctx());
        assert_eq!(
            undefined.into_iter().collect::<Vec<_>>(),
            vec!["extra".to_string(), "missing".to_string()]
        );
    }

    #[test]
    fn test_render_whole_and_embedded() {
        let value = json!(["{{z}}", "pv={{prefix}}:{{z}}"]);
        let rendered = render(&value, &ctx()).unwrap();
        assert_eq!(rendered, json!([12.5, "pv=XCS:01:12.5"]));
    }

    #[test]
    fn test_render_fails_on_undefined() {
        let err = render(&json!("{{nope}}"), &ctx()).unwrap_err();
        assert!(err.contains("nope"));
    }
}
