use crate::common::mamiya;
use anyhow::Result;
use mamiya::test_utils::RecipeEnvironment;
use predicates::prelude::*;

#[test]
fn helpers_lists_search_path_and_helpers() -> Result<()> {
    let env = RecipeEnvironment::new()?;
    env.write_builtin_helper("git", "")?;
    env.write_helper("notify", "")?;
    let recipe = env.write_recipe("deploy.rb", "")?;

    mamiya(&env)?
        .args(["helpers"])
        .arg(&recipe)
        .assert()
        .success()
        .stdout(predicate::str::contains("Search path:"))
        .stdout(predicate::str::contains(env.builtin_dir.display().to_string()))
        .stdout(predicate::str::contains("  git "))
        .stdout(predicate::str::contains("  notify "));

    mamiya(&env)?
        .args(["helpers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  git "))
        .stdout(predicate::str::contains("notify").not());
    Ok(())
}

#[test]
fn load_path_flag_is_searched_first() -> Result<()> {
    let env = RecipeEnvironment::new()?;
    env.write_builtin_helper("layout", "set :from, \"builtin\"")?;
    env.write_helper("layout", "set :from, \"relative\"")?;
    let extra = env.write_helper_in("extra", "layout", "set :from, \"flag\"")?;
    env.write_recipe("deploy.rb", "use :layout\n")?;
    let extra_dir = extra.parent().map(|p| p.display().to_string()).unwrap_or_default();

    let output = mamiya(&env)?.args(["check", "deploy.rb", "--format", "json"]).output()?;
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(summary["variables"]["from"], "relative");

    let output = mamiya(&env)?
        .args(["-I", extra_dir.as_str(), "check", "deploy.rb", "--format", "json"])
        .output()?;
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(summary["variables"]["from"], "flag");
    Ok(())
}

#[test]
fn missing_helper_lists_searched_directories() -> Result<()> {
    let env = RecipeEnvironment::new()?;
    env.write_recipe("deploy.rb", "use :nope, a: 1\n")?;

    mamiya(&env)?
        .args(["check", "deploy.rb"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"))
        .stderr(predicate::str::contains("Searched:"))
        .stderr(predicate::str::contains(env.builtin_dir.display().to_string()));
    Ok(())
}
