use crate::common::{mamiya, write_config};
use anyhow::Result;
use mamiya::test_utils::RecipeEnvironment;
use predicates::prelude::*;

const RECIPE: &str = r#"
set :application, "shop"

task :build do
  log "building #{application}"
end

prepare only: [:web] do |host|
  append :prepared, host
end
"#;

#[test]
fn check_lists_tasks_hooks_and_variables() -> Result<()> {
    let env = RecipeEnvironment::new()?;
    env.write_recipe("deploy.rb", RECIPE)?;

    mamiya(&env)?
        .args(["check", "deploy.rb"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tasks:\n  build\n"))
        .stdout(predicate::str::contains("  prepare (1)\n"))
        .stdout(predicate::str::contains("  application = \"shop\"\n"));
    Ok(())
}

#[test]
fn check_json_output() -> Result<()> {
    let env = RecipeEnvironment::new()?;
    env.write_recipe("deploy.rb", RECIPE)?;

    let output = mamiya(&env)?.args(["check", "deploy.rb", "--format", "json"]).output()?;
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(summary["tasks"], serde_json::json!(["build"]));
    assert_eq!(summary["hooks"]["prepare"], 1);
    assert_eq!(summary["hooks"]["release"], 0);
    assert_eq!(summary["variables"]["application"], "shop");
    Ok(())
}

#[test]
fn check_yaml_output() -> Result<()> {
    let env = RecipeEnvironment::new()?;
    env.write_recipe("deploy.rb", RECIPE)?;

    let output = mamiya(&env)?.args(["check", "deploy.rb", "--format", "yaml"]).output()?;
    assert!(output.status.success());

    let summary: serde_yaml::Value = serde_yaml::from_slice(&output.stdout)?;
    assert_eq!(summary["tasks"][0].as_str(), Some("build"));
    assert_eq!(summary["hooks"]["prepare"].as_u64(), Some(1));
    Ok(())
}

#[test]
fn check_reports_parse_error() -> Result<()> {
    let env = RecipeEnvironment::new()?;
    env.write_recipe("deploy.rb", "task :build do\n  log \"x\"\n")?;

    mamiya(&env)?
        .args(["check", "deploy.rb"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("deploy.rb"))
        .stderr(predicate::str::contains("do/end"));
    Ok(())
}

#[test]
fn check_missing_recipe_fails() -> Result<()> {
    let env = RecipeEnvironment::new()?;

    mamiya(&env)?
        .args(["check", "nope.rb"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.rb"))
        .stderr(predicate::str::contains("details:"));
    Ok(())
}

#[test]
fn configured_hooks_and_variables_apply() -> Result<()> {
    let env = RecipeEnvironment::new()?;
    env.write_recipe("deploy.rb", "notify do\nend\n")?;

    let mut cmd = mamiya(&env)?;
    write_config(&env, "hooks = [\"notify\"]\n\n[variables]\nretries = 3\n")?;
    let output = cmd.args(["check", "deploy.rb", "--format", "json"]).output()?;
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(summary["hooks"]["notify"], 1);
    assert_eq!(summary["variables"]["retries"], 3);
    Ok(())
}
