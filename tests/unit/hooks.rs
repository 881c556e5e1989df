//! Hook chains, placement and label-filtered dispatch.

use crate::common::{on_deploy_definition, record};
use mamiya::core::MamiyaError;
use mamiya::dsl::{Callback, Dsl, HookFilter, Placement, Value};
use std::sync::Arc;

fn dsl() -> Dsl {
    Dsl::new(Arc::new(on_deploy_definition()))
}

fn web() -> Vec<Value> {
    vec![Value::symbol("web")]
}

#[test]
fn prepend_runs_before_appended_entries() {
    let dsl = dsl();
    dsl.register_hook("on_deploy", record("A"), HookFilter::none(), Placement::Append).unwrap();
    dsl.register_hook("on_deploy", record("B"), HookFilter::none(), Placement::Append).unwrap();
    dsl.register_hook("on_deploy", record("C"), HookFilter::none(), Placement::Prepend).unwrap();

    let results = dsl.dispatch_hook("on_deploy", &[], &[]).unwrap();
    assert_eq!(results, vec![Value::from("C"), Value::from("A"), Value::from("B")]);
}

#[test]
fn overwrite_collapses_chain() {
    let dsl = dsl();
    dsl.register_hook("on_deploy", record("A"), HookFilter::none(), Placement::Append).unwrap();
    dsl.register_hook("on_deploy", record("B"), HookFilter::none(), Placement::Prepend).unwrap();
    dsl.register_hook("on_deploy", record("X"), HookFilter::none(), Placement::Overwrite).unwrap();

    assert_eq!(dsl.hook_chain_len("on_deploy"), 1);
    dsl.dispatch_hook("on_deploy", &[], &[]).unwrap();
    assert_eq!(dsl.get("order"), Some(Value::from(vec!["X"])));
}

#[test]
fn only_and_except_combine_with_and() {
    let dsl = dsl();
    let filter = HookFilter {
        only: Some(vec![Value::symbol("app")]),
        except: Some(web()),
    };
    dsl.register_hook("on_deploy", record("only-web"), HookFilter::only(web()), Placement::Append).unwrap();
    dsl.register_hook("on_deploy", record("except-web"), HookFilter::except(web()), Placement::Append).unwrap();
    dsl.register_hook("on_deploy", record("app-not-web"), filter, Placement::Append).unwrap();

    let run = |labels: &[&str]| {
        let selectors: Vec<Value> = labels.iter().map(|l| Value::symbol(*l)).collect();
        dsl.dispatch_hook("on_deploy", &selectors, &[]).unwrap()
    };

    assert_eq!(run(&["web"]), vec![Value::from("only-web")]);
    assert_eq!(run(&["db"]), vec![Value::from("except-web")]);
    assert_eq!(run(&["app"]), vec![Value::from("except-web"), Value::from("app-not-web")]);
    assert_eq!(run(&["app", "web"]), vec![Value::from("only-web")]);
}

#[test]
fn glob_and_group_expressions() {
    let dsl = dsl();
    dsl.register_hook(
        "on_deploy",
        record("canary"),
        HookFilter::only(vec![Value::from("web-*")]),
        Placement::Append,
    )
    .unwrap();
    dsl.register_hook(
        "on_deploy",
        record("grouped"),
        HookFilter::only(vec![
            Value::List(vec![Value::symbol("db"), Value::symbol("primary")]),
            Value::List(vec![Value::symbol("cache")]),
        ]),
        Placement::Append,
    )
    .unwrap();

    assert_eq!(dsl.dispatch_hook("on_deploy", &[Value::from("web-3")], &[]).unwrap(), vec![Value::from("canary")]);
    assert!(dsl.dispatch_hook("on_deploy", &[Value::symbol("db")], &[]).unwrap().is_empty());
    assert_eq!(
        dsl.dispatch_hook("on_deploy", &[Value::symbol("primary"), Value::symbol("db")], &[]).unwrap(),
        vec![Value::from("grouped")]
    );
    assert_eq!(dsl.dispatch_hook("on_deploy", &[Value::symbol("cache")], &[]).unwrap(), vec![Value::from("grouped")]);
}

#[test]
fn dispatcher_reads_chain_at_call_time() {
    let dsl = dsl();
    let dispatcher = dsl.dispatcher("on_deploy", &web()).unwrap();
    assert!(dispatcher.call(&[]).unwrap().is_empty());

    dsl.register_hook("on_deploy", record("late"), HookFilter::none(), Placement::Append).unwrap();
    assert_eq!(dispatcher.call(&[]).unwrap(), vec![Value::from("late")]);
}

#[test]
fn results_scenario() {
    let dsl = dsl();
    dsl.evaluate("on_deploy only: [:web] do |host|\n  append :results, host\nend", None, None).unwrap();

    dsl.dispatcher("on_deploy", &web()).unwrap().call(&[Value::from("h1")]).unwrap();
    assert_eq!(dsl.get("results"), Some(Value::from(vec!["h1"])));

    dsl.dispatcher("on_deploy", &[Value::symbol("db")]).unwrap().call(&[Value::from("h2")]).unwrap();
    assert_eq!(dsl.get("results"), Some(Value::from(vec!["h1"])));
}

#[test]
fn results_scenario_with_brace_block() {
    let dsl = dsl();
    dsl.evaluate("\u{feff}on_deploy(only: [:web]) { |host| append :results, host }\n", None, None).unwrap();

    dsl.dispatcher("on_deploy", &web()).unwrap().call(&[Value::from("h1")]).unwrap();
    dsl.dispatcher("on_deploy", &[Value::symbol("db")]).unwrap().call(&[Value::from("h2")]).unwrap();
    assert_eq!(dsl.get("results"), Some(Value::from(vec!["h1"])));
}

#[test]
fn malformed_filter_does_not_touch_chain() {
    let dsl = dsl();
    dsl.register_hook("on_deploy", record("A"), HookFilter::none(), Placement::Append).unwrap();

    let err = dsl.evaluate("on_deploy :overwrite, only: {role: :web} do\nend", None, None).unwrap_err();
    assert!(matches!(err.downcast_ref::<MamiyaError>(), Some(MamiyaError::InvalidHookFilter { .. })));
    assert_eq!(dsl.hook_chain_len("on_deploy"), 1);
}

#[test]
fn callback_error_reaches_caller_unchanged() {
    let dsl = dsl();
    dsl.register_hook(
        "on_deploy",
        Callback::native(|_, _| Err(anyhow::anyhow!("agent h1 unreachable"))),
        HookFilter::none(),
        Placement::Append,
    )
    .unwrap();

    let err = dsl.dispatch_hook("on_deploy", &[], &[]).unwrap_err();
    assert_eq!(err.to_string(), "agent h1 unreachable");
    assert_eq!(err.chain().count(), 1);
}

#[test]
fn undeclared_hook_is_rejected() {
    let dsl = dsl();
    let err = dsl.register_hook("on_rollback", record("A"), HookFilter::none(), Placement::Append).unwrap_err();
    assert!(matches!(err.downcast_ref::<MamiyaError>(), Some(MamiyaError::UnknownHook { .. })));
}
