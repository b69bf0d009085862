//! Template rendering semantics.

use proptest::prelude::*;
use serde_json::json;

use eventweave::template::render;

#[test]
fn replaces_placeholders_in_nested_structures() {
    let template = json!({
        "client": "{{client_id}}",
        "lines": [{"ref": "{{ref}}"}, "{{ref}}"],
        "fixed": true,
        "count": 2
    });
    let context = json!({"client_id": "c-9", "ref": "r-1"});
    assert_eq!(
        render(&template, &context),
        json!({
            "client": "c-9",
            "lines": [{"ref": "r-1"}, "r-1"],
            "fixed": true,
            "count": 2
        })
    );
}

#[test]
fn missing_keys_become_empty_strings() {
    let rendered = render(&json!({"x": "{{nope}}"}), &json!({}));
    assert_eq!(rendered, json!({"x": ""}));
}

#[test]
fn non_string_context_values_stringify_compactly() {
    let context = json!({"n": 42, "flag": true, "obj": {"a": 1}});
    let rendered = render(&json!(["{{n}}", "{{flag}}", "{{obj}}"]), &context);
    assert_eq!(rendered, json!(["42", "true", "{\"a\":1}"]));
}

#[test]
fn null_renders_as_empty_string() {
    assert_eq!(render(&json!("{{x}}"), &json!({"x": null})), json!(""));
}

#[test]
fn embedded_placeholders_substitute_in_place() {
    let rendered = render(
        &json!("order {{id}} for {{client}}"),
        &json!({"id": "A-17", "client": "acme"}),
    );
    assert_eq!(rendered, json!("order A-17 for acme"));
}

#[test]
fn inner_whitespace_is_tolerated() {
    assert_eq!(
        render(&json!("{{ id }}"), &json!({"id": "x"})),
        json!("x")
    );
}

#[test]
fn unterminated_braces_pass_through() {
    assert_eq!(
        render(&json!("stray {{open"), &json!({"open": "nope"})),
        json!("stray {{open")
    );
}

#[test]
fn lookup_is_single_level_only() {
    // No dotted-path traversal: the literal key "a.b" misses.
    let rendered = render(&json!("{{a.b}}"), &json!({"a": {"b": "deep"}}));
    assert_eq!(rendered, json!(""));
}

proptest! {
    #[test]
    fn strings_without_placeholders_are_unchanged(s in "[^{}]*") {
        let value = json!(s);
        prop_assert_eq!(render(&value, &json!({"k": "v"})), value);
    }

    #[test]
    fn non_string_scalars_pass_through(n in any::<i64>(), b in any::<bool>()) {
        let template = json!([n, b, null]);
        prop_assert_eq!(render(&template, &json!({})), template);
    }
}
