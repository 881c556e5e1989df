//! Variable store behaviour through the public API.

use mamiya::dsl::{Dsl, DslDefinition, Value};
use std::sync::Arc;

fn dsl_with_defaults() -> Dsl {
    let definition = DslDefinition::new("test");
    definition.set_default("deploy_to", "/srv/app");
    definition.set_default("keep_releases", 5i64);
    Dsl::new(Arc::new(definition))
}

#[test]
fn set_then_get_wins_over_default() {
    let dsl = dsl_with_defaults();
    for (key, value) in [
        ("deploy_to", Value::from("/opt/app")),
        ("keep_releases", Value::Integer(1)),
        ("fresh", Value::Bool(false)),
        ("nothing", Value::Nil),
    ] {
        dsl.set(key, value.clone());
        assert_eq!(dsl.get(key), Some(value));
    }
}

#[test]
fn undefined_key_reads_default_or_absent() {
    let dsl = dsl_with_defaults();
    assert_eq!(dsl.get("keep_releases"), Some(Value::Integer(5)));
    assert_eq!(dsl.get("unknown"), None);
}

#[test]
fn set_default_returns_existing_value() {
    let dsl = dsl_with_defaults();
    assert_eq!(dsl.set_default("branch", "main"), Value::from("main"));
    assert_eq!(dsl.set_default("branch", "release"), Value::from("main"));

    dsl.set("branch", "hotfix");
    assert_eq!(dsl.set_default("branch", "main"), Value::from("hotfix"));
}

#[test]
fn set_registers_accessor_once() {
    let dsl = dsl_with_defaults();
    dsl.set("servers", vec!["web-1"]);
    dsl.set("servers", vec!["web-2"]);
    assert!(dsl.definition().has_accessor("servers"));

    dsl.evaluate("set :copy, servers", None, None).unwrap();
    assert_eq!(dsl.get("copy"), Some(Value::from(vec!["web-2"])));
}

#[test]
fn reserved_names_are_stored_without_accessor() {
    let definition = DslDefinition::new("test");
    definition.add_hook("release").unwrap();
    let dsl = Dsl::new(Arc::new(definition));

    dsl.evaluate("set :release, 1\nset :task, 2\nset :copy, fetch(:release)", None, None).unwrap();
    assert_eq!(dsl.get("release"), Some(Value::Integer(1)));
    assert_eq!(dsl.get("task"), Some(Value::Integer(2)));
    assert_eq!(dsl.get("copy"), Some(Value::Integer(1)));
    assert!(!dsl.definition().has_accessor("release"));
}

#[test]
fn symbol_and_string_name_same_variable() {
    let dsl = dsl_with_defaults();
    dsl.evaluate("set :app, \"a\"\nset \"app\", \"b\"", None, None).unwrap();
    assert_eq!(dsl.get("app"), Some(Value::from("b")));
}

#[test]
fn append_collects_values() {
    let dsl = dsl_with_defaults();
    dsl.append("results", "h1").unwrap();
    dsl.evaluate("append :results, \"h2\"", None, None).unwrap();
    assert_eq!(dsl.get("results"), Some(Value::from(vec!["h1", "h2"])));
    assert!(dsl.append("deploy_to", "x").is_err());
}

#[test]
fn fetch_reads_unknown_keys_as_nil_or_fallback() {
    let dsl = dsl_with_defaults();
    dsl.evaluate(
        "set :a, fetch(:missing)\nset :b, fetch(:missing, \"fallback\")\nset :c, fetch(:keep_releases, 0)",
        None,
        None,
    )
    .unwrap();

    assert_eq!(dsl.get("a"), Some(Value::Nil));
    assert_eq!(dsl.get("b"), Some(Value::from("fallback")));
    assert_eq!(dsl.get("c"), Some(Value::Integer(5)));
}
