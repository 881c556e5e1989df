//! Helper lookup and `use`.

use crate::common::on_deploy_definition;
use mamiya::core::MamiyaError;
use mamiya::dsl::Value;
use mamiya::test_utils::RecipeEnvironment;

#[test]
fn load_path_beats_relative_beats_builtin() {
    let env = RecipeEnvironment::new().unwrap();
    let recipe = env.project_dir.join("deploy.rb");
    env.write_builtin_helper("foo", "set :from, :builtin").unwrap();
    env.write_helper("foo", "set :from, :relative").unwrap();
    env.write_helper_in("custom", "foo", "set :from, :load_path").unwrap();

    let dsl = env.instance(on_deploy_definition());
    dsl.evaluate("use :foo", Some(&recipe), None).unwrap();
    assert_eq!(dsl.get("from"), Some(Value::symbol("relative")));

    let custom = env.path().join("custom").display().to_string();
    dsl.set("load_path", vec![custom]);
    dsl.evaluate("use :foo", Some(&recipe), None).unwrap();
    assert_eq!(dsl.get("from"), Some(Value::symbol("load_path")));

    dsl.set("load_path", Value::List(Vec::new()));
    dsl.evaluate("use :foo", None, None).unwrap();
    assert_eq!(dsl.get("from"), Some(Value::symbol("builtin")));
}

#[test]
fn missing_helper_lists_search_path() {
    let env = RecipeEnvironment::new().unwrap();
    let dsl = env.instance(on_deploy_definition());

    let err = dsl.evaluate("use :nope", Some(&env.project_dir.join("deploy.rb")), None).unwrap_err();
    match err.downcast_ref::<MamiyaError>() {
        Some(MamiyaError::HelperNotFound { name, searched }) => {
            assert_eq!(name, "nope");
            assert_eq!(searched.len(), 2);
            assert!(searched[0].ends_with("helpers"));
            assert_eq!(searched[1], env.builtin_dir.display().to_string());
        }
        other => panic!("expected helper not found, got {other:?}"),
    }
}

#[test]
fn nested_use_completes() {
    let env = RecipeEnvironment::new().unwrap();
    env.write_builtin_helper("outer", "append :loaded, :outer_start\nuse :inner, depth: 2\nappend :loaded, options[:name]")
        .unwrap();
    env.write_builtin_helper("inner", "append :loaded, options[:depth]").unwrap();

    let dsl = env.instance(on_deploy_definition());
    dsl.evaluate("use :outer, name: \"outer\"", None, None).unwrap();

    assert_eq!(
        dsl.get("loaded"),
        Some(Value::List(vec![Value::symbol("outer_start"), Value::Integer(2), Value::from("outer")]))
    );
    assert!(!dsl.helper_options_pending());
}

#[test]
fn options_slot_empty_after_failed_helper() {
    let env = RecipeEnvironment::new().unwrap();
    env.write_builtin_helper("broken", "set :seen, options[:a]\nnot_an_operation").unwrap();

    let dsl = env.instance(on_deploy_definition());
    assert!(dsl.evaluate("use :broken, a: 1", None, None).is_err());
    assert_eq!(dsl.get("seen"), Some(Value::Integer(1)));
    assert!(!dsl.helper_options_pending());
}

#[test]
fn helper_registers_hooks_on_instance() {
    let env = RecipeEnvironment::new().unwrap();
    env.write_builtin_helper("notify", "on_deploy except: :db do |host|\n  append :notified, host\nend").unwrap();

    let dsl = env.instance(on_deploy_definition());
    dsl.evaluate("use :notify\nuse :notify", None, None).unwrap();
    assert_eq!(dsl.hook_chain_len("on_deploy"), 2);

    dsl.dispatch_hook("on_deploy", &[Value::symbol("web")], &[Value::from("h1")]).unwrap();
    dsl.dispatch_hook("on_deploy", &[Value::symbol("db")], &[Value::from("h2")]).unwrap();
    assert_eq!(dsl.get("notified"), Some(Value::from(vec!["h1", "h1"])));
}

#[test]
fn bundled_helpers_work_without_files() {
    // Nothing is written to the built-in directory; the shipped helpers are
    // compiled into the binary.
    let env = RecipeEnvironment::new().unwrap();
    assert!(std::fs::read_dir(&env.builtin_dir).map_or(true, |mut dir| dir.next().is_none()));

    let dsl = env.script_instance().unwrap();
    dsl.evaluate(
        "set :ref, \"v1\"\nuse :git, repository: \"git@example.com:shop.git\", branch: \"main\"\nuse :package_layout, root: \"/srv/shop\"",
        None,
        None,
    )
    .unwrap();

    assert_eq!(dsl.get("repository"), Some(Value::from("git@example.com:shop.git")));
    assert_eq!(dsl.get("ref"), Some(Value::from("v1")));
    assert_eq!(dsl.get("build_from"), Some(Value::from("/srv/shop/current")));
    assert_eq!(dsl.get("exclude_from_package"), Some(Value::from(vec![".git", "tmp", "log"])));
    assert_eq!(dsl.hook_chain_len("prepare_build"), 1);
}
