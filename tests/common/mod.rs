//! Common test utilities shared by the unit, integration and stress suites

// Not every suite uses every helper
#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use mamiya::dsl::{Callback, Dsl, DslDefinition, Value};
use mamiya::test_utils::RecipeEnvironment;
use std::fs;
use std::path::PathBuf;

/// Definition with a single `on_deploy` hook.
pub fn on_deploy_definition() -> DslDefinition {
    let definition = DslDefinition::new("test");
    definition.add_hook("on_deploy").expect("declare on_deploy");
    definition
}

/// Callback appending `tag` to the `order` variable.
pub fn record(tag: &'static str) -> Callback {
    Callback::native(move |dsl: &Dsl, _args: &[Value]| {
        dsl.append("order", tag)?;
        Ok(Value::from(tag))
    })
}

/// `mamiya` binary configured to use the environment's built-in helpers and
/// nothing from the user's own configuration.
pub fn mamiya(env: &RecipeEnvironment) -> Result<Command> {
    let config_path = write_config(env, "")?;
    let mut cmd = Command::cargo_bin("mamiya")?;
    cmd.env("MAMIYA_CONFIG", &config_path).env("NO_COLOR", "1").env_remove("RUST_LOG").current_dir(&env.project_dir);
    Ok(cmd)
}

/// Write the configuration file `mamiya` uses, with `extra` appended.
pub fn write_config(env: &RecipeEnvironment, extra: &str) -> Result<PathBuf> {
    let path = env.path().join("config.toml");
    let content = format!("builtin_helpers_dir = {:?}\n{extra}", env.builtin_dir.display().to_string());
    fs::write(&path, content)?;
    Ok(path)
}
