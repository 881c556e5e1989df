//! Common setup shared by the recipe commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::CliConfig;
use crate::config::MamiyaConfig;
use crate::constants::LOAD_PATH_VARIABLE;
use crate::dsl::{Dsl, DslDefinition, Value};
use crate::script::Script;

/// Everything a command needs to create DSL instances: the script preset
/// extended by the configuration file and command-line flags.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub definition: Arc<DslDefinition>,
    pub builtin_helpers_dir: PathBuf,
    pub quiet: bool,
}

impl CommandContext {
    pub async fn prepare(config: &CliConfig) -> Result<Self> {
        let file_config = MamiyaConfig::load_with_optional(config.config_path.clone()).await?;

        let definition = Script::definition()?;
        file_config.apply_to(&definition)?;

        // -I directories are searched before configured ones
        if !config.load_path.is_empty() {
            let mut entries: Vec<Value> = config.load_path.iter().map(|dir| Value::from(dir.as_str())).collect();
            match definition.default_value(LOAD_PATH_VARIABLE) {
                Some(Value::List(configured)) => entries.extend(configured),
                Some(Value::Nil) | None => {}
                Some(single) => entries.push(single),
            }
            definition.set_default(LOAD_PATH_VARIABLE, Value::List(entries));
        }

        Ok(Self {
            definition: Arc::new(definition),
            builtin_helpers_dir: file_config.resolved_builtin_helpers_dir()?,
            quiet: config.quiet,
        })
    }

    pub fn new_instance(&self) -> Dsl {
        Dsl::with_builtin_helpers_dir(Arc::clone(&self.definition), self.builtin_helpers_dir.clone())
    }

    /// Create an instance and load `recipe` into it off the async runtime.
    pub async fn load_recipe(&self, recipe: &Path) -> Result<Arc<Dsl>> {
        let dsl = Arc::new(self.new_instance());
        let handle = Arc::clone(&dsl);
        let path = recipe.to_path_buf();
        debug!(recipe = %path.display(), "loading recipe");
        run_blocking(move || handle.load(&path)).await?;
        Ok(dsl)
    }
}

/// Run engine work on the blocking pool; callbacks may block on locks or I/O.
pub async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.context("Recipe execution task failed")?
}
