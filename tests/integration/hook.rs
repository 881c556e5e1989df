use crate::common::mamiya;
use anyhow::Result;
use mamiya::test_utils::RecipeEnvironment;
use predicates::prelude::*;

const RECIPE: &str = r#"
prepare only: [:web] do |host|
  set :last, "web #{host}"
end

prepare except: :web do |host|
  set :last, "other #{host}"
end
"#;

#[test]
fn hook_runs_matching_callbacks() -> Result<()> {
    let env = RecipeEnvironment::new()?;
    env.write_recipe("deploy.rb", RECIPE)?;

    mamiya(&env)?
        .args(["hook", "deploy.rb", "prepare", "-l", "web", "h1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("prepare: 1 of 2 callback(s) ran"))
        .stdout(predicate::str::contains("\"web h1\""))
        .stdout(predicate::str::contains("other").not());

    mamiya(&env)?
        .args(["hook", "deploy.rb", "prepare", "--label", "db", "h2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"other h2\""));
    Ok(())
}

#[test]
fn hook_without_labels_skips_only_filters() -> Result<()> {
    let env = RecipeEnvironment::new()?;
    env.write_recipe("deploy.rb", RECIPE)?;

    mamiya(&env)?
        .args(["hook", "deploy.rb", "prepare", "h3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 of 2"))
        .stdout(predicate::str::contains("\"other h3\""));
    Ok(())
}

#[test]
fn undeclared_hook_fails() -> Result<()> {
    let env = RecipeEnvironment::new()?;
    env.write_recipe("deploy.rb", RECIPE)?;

    mamiya(&env)?
        .args(["hook", "deploy.rb", "notify"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("notify"));
    Ok(())
}
