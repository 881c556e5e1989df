//! Task definition and invocation.

use mamiya::core::MamiyaError;
use mamiya::dsl::{Dsl, DslDefinition, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn dsl() -> Dsl {
    Dsl::new(Arc::new(DslDefinition::new("test")))
}

#[test]
fn invoke_runs_block_exactly_once() {
    let dsl = dsl();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    dsl.task_fn("deploy", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    dsl.invoke("deploy").unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn invoke_missing_task_fails() {
    let dsl = dsl();
    let err = dsl.invoke("missing").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MamiyaError>(),
        Some(MamiyaError::TaskNotFound { name, .. }) if name == "missing"
    ));
}

#[test]
fn recipe_tasks_invoke_each_other() {
    let dsl = dsl();
    dsl.evaluate(
        "task :build do\n  append :steps, :build\nend\n\
         task :deploy do\n  invoke :build\n  append :steps, :deploy\nend",
        None,
        None,
    )
    .unwrap();

    dsl.invoke("deploy").unwrap();
    assert_eq!(dsl.get("steps"), Some(Value::List(vec![Value::symbol("build"), Value::symbol("deploy")])));
}

#[test]
fn redefinition_replaces_task() {
    let dsl = dsl();
    dsl.evaluate("task :deploy do\n  set :v, 1\nend\ntask :deploy do\n  set :v, 2\nend", None, None).unwrap();
    dsl.invoke("deploy").unwrap();
    assert_eq!(dsl.get("v"), Some(Value::Integer(2)));
    assert_eq!(dsl.task_names(), vec!["deploy".to_string()]);
}

#[test]
fn task_error_propagates() {
    let dsl = dsl();
    dsl.evaluate("task :deploy do\n  invoke :missing\nend", None, None).unwrap();
    let err = dsl.invoke("deploy").unwrap_err();
    assert!(matches!(err.downcast_ref::<MamiyaError>(), Some(MamiyaError::TaskNotFound { .. })));
}
