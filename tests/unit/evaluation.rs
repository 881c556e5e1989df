//! Recipe evaluation: current file tracking, locking and diagnostics.

use mamiya::core::MamiyaError;
use mamiya::dsl::{Dsl, DslDefinition, Value};
use mamiya::test_utils::RecipeEnvironment;
use std::path::Path;
use std::sync::Arc;

fn dsl() -> Dsl {
    Dsl::new(Arc::new(DslDefinition::new("test")))
}

#[test]
fn current_file_absent_after_evaluate() {
    let dsl = dsl();
    dsl.evaluate("set :a, 1", Some(Path::new("/srv/app/deploy.rb")), None).unwrap();
    assert_eq!(dsl.current_file(), None);

    assert!(dsl.evaluate("set :b, 2\nexplode", Some(Path::new("/srv/app/deploy.rb")), None).is_err());
    assert_eq!(dsl.current_file(), None);
    assert_eq!(dsl.get("b"), Some(Value::Integer(2)));
}

#[test]
fn evaluate_inside_evaluation_is_rejected() {
    let dsl = dsl();
    dsl.task_fn("nested", |dsl| dsl.evaluate("set :inner, 1", None, None));

    let err = dsl.evaluate("invoke :nested", None, None).unwrap_err();
    assert!(matches!(err.downcast_ref::<MamiyaError>(), Some(MamiyaError::ReentrantEvaluation)));
    assert_eq!(dsl.get("inner"), None);

    // The lock is released afterwards, and outside evaluation the task works.
    dsl.invoke("nested").unwrap();
    assert_eq!(dsl.get("inner"), Some(Value::Integer(1)));
}

#[test]
fn evaluate_with_holds_the_lock() {
    let dsl = dsl();
    let value = dsl
        .evaluate_with(|dsl| {
            dsl.set("from_host", true);
            Ok(dsl.get("from_host"))
        })
        .unwrap();
    assert_eq!(value, Some(Value::Bool(true)));

    let err = dsl.evaluate_with(|dsl| dsl.evaluate("set :x, 1", None, None)).unwrap_err();
    assert!(matches!(err.downcast_ref::<MamiyaError>(), Some(MamiyaError::ReentrantEvaluation)));
}

#[test]
fn parse_error_names_file_and_line() {
    let dsl = dsl();
    let err = dsl
        .evaluate("set :a, 1\nset :b 2\nset :c, 3\n", Some(Path::new("deploy.rb")), None)
        .unwrap_err();

    match err.downcast_ref::<MamiyaError>() {
        Some(MamiyaError::RecipeParseError { file, reason }) => {
            assert_eq!(file, "deploy.rb");
            assert!(reason.contains("line 2"), "reason: {reason}");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
    assert_eq!(dsl.get("a"), None);
}

#[test]
fn runtime_errors_use_starting_line() {
    let dsl = dsl();
    let err = dsl.evaluate("set :a, 1\nunknown_op 3", Some(Path::new("deploy.rb")), Some(10)).unwrap_err();

    match err.downcast_ref::<MamiyaError>() {
        Some(MamiyaError::UnknownOperation { name, location, .. }) => {
            assert_eq!(name, "unknown_op");
            assert_eq!(location, "deploy.rb:11");
        }
        other => panic!("expected unknown operation, got {other:?}"),
    }
}

#[test]
fn parse_errors_use_starting_line() {
    let dsl = dsl();
    let err = dsl.evaluate("set :a, 1\nset :b 2", Some(Path::new("deploy.rb")), Some(10)).unwrap_err();

    match err.downcast_ref::<MamiyaError>() {
        Some(MamiyaError::RecipeParseError { reason, .. }) => {
            assert!(reason.starts_with("line 11,"), "reason: {reason}");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn runtime_error_location_saturates() {
    let dsl = dsl();
    let err = dsl.evaluate("set :a, 1\nboom 1", None, Some(usize::MAX)).unwrap_err();

    match err.downcast_ref::<MamiyaError>() {
        Some(MamiyaError::UnknownOperation { location, .. }) => {
            assert_eq!(location, &format!("(eval):{}", usize::MAX));
        }
        other => panic!("expected unknown operation, got {other:?}"),
    }
}

#[test]
fn deeply_nested_recipe_is_parse_error() {
    let dsl = dsl();
    let source = format!("set :a, {}", "[".repeat(200_000));
    let err = dsl.evaluate(&source, Some(Path::new("deep.rb")), None).unwrap_err();

    match err.downcast_ref::<MamiyaError>() {
        Some(MamiyaError::RecipeParseError { file, reason }) => {
            assert_eq!(file, "deep.rb");
            assert!(reason.contains("nesting no deeper than"), "reason: {reason}");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
    assert_eq!(dsl.get("a"), None);
}

#[test]
fn unknown_operation_suggests_builder() {
    let dsl = dsl();
    let err = dsl.evaluate("set_defualt :a, 1", None, None).unwrap_err();
    match err.downcast_ref::<MamiyaError>() {
        Some(MamiyaError::UnknownOperation { did_you_mean, .. }) => {
            assert_eq!(did_you_mean.as_deref(), Some("set_default"));
        }
        other => panic!("expected unknown operation, got {other:?}"),
    }
}

#[test]
fn load_reads_recipe_file() {
    let env = RecipeEnvironment::new().unwrap();
    let recipe = env
        .write_recipe("deploy.rb", "set :application, \"shop\"\nset :deploy_to, \"/srv/#{application}\"\n")
        .unwrap();

    let dsl = env.script_instance().unwrap();
    dsl.load(&recipe).unwrap();
    assert_eq!(dsl.get("deploy_to"), Some(Value::from("/srv/shop")));

    let err = dsl.load(env.project_dir.join("missing.rb")).unwrap_err();
    assert!(matches!(err.downcast_ref::<MamiyaError>(), Some(MamiyaError::FileSystemError { .. })));
}
