//! Payload template rendering.
//!
//! ACTION nodes carry a JSON payload template in which string scalars may
//! contain `{{identifier}}` placeholders. Rendering walks the template and
//! substitutes each placeholder with the context value under that key:
//! strings substitute verbatim, other values stringify compactly, and a
//! missing key becomes the empty string. Non-string scalars pass through
//! untouched.
//!
//! Lookup is a shallow single-level variable read — no dotted paths and no
//! escaping. This mirrors the upstream wire contract and is a documented
//! limitation, not a templating engine.
//!
//! # Examples
//!
//! ```
//! use eventweave::template::render;
//! use serde_json::json;
//!
//! let template = json!({"ref": "{{order_id}}", "total": 3});
//! let context = json!({"order_id": "A-17"});
//! assert_eq!(render(&template, &context), json!({"ref": "A-17", "total": 3}));
//! ```

use serde_json::Value;

/// Render a template value against a context object.
#[must_use]
pub fn render(template: &Value, context: &Value) -> Value {
    match template {
        Value::String(s) => Value::String(render_str(s, context)),
        Value::Array(items) => Value::Array(items.iter().map(|v| render(v, context)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Substitute every `{{identifier}}` occurrence in one string.
fn render_str(input: &str, context: &Value) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open + 2..].find("}}") else {
            break;
        };
        out.push_str(&rest[..open]);
        let key = rest[open + 2..open + 2 + close].trim();
        out.push_str(&lookup(key, context));
        rest = &rest[open + 2 + close + 2..];
    }
    out.push_str(rest);
    out
}

/// Single-level context lookup, stringified for splicing.
fn lookup(key: &str, context: &Value) -> String {
    match context.as_object().and_then(|obj| obj.get(key)) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
