//! Temporary deployment project for tests.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use crate::constants::{HELPERS_DIR_NAME, RECIPE_EXTENSION};
use crate::dsl::{Dsl, DslDefinition};
use crate::script::Script;

/// A temp directory with a project directory (recipes and their `helpers/`)
/// and a separate built-in helpers directory.
pub struct RecipeEnvironment {
    pub temp_dir: TempDir,
    pub project_dir: PathBuf,
    pub builtin_dir: PathBuf,
}

impl RecipeEnvironment {
    pub fn new() -> Result<Self> {
        super::init_test_logging(None);

        let temp_dir = TempDir::new()?;
        let project_dir = temp_dir.path().join("project");
        let builtin_dir = temp_dir.path().join("builtin");

        fs::create_dir_all(project_dir.join(HELPERS_DIR_NAME))?;
        fs::create_dir_all(&builtin_dir)?;

        Ok(Self {
            temp_dir,
            project_dir,
            builtin_dir,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a file relative to the project directory.
    pub fn write_recipe(&self, name: &str, content: &str) -> Result<PathBuf> {
        self.write(&self.project_dir.join(name), content)
    }

    /// Write `<name>.rb` into the project's `helpers/` directory.
    pub fn write_helper(&self, name: &str, content: &str) -> Result<PathBuf> {
        self.write(&self.project_dir.join(HELPERS_DIR_NAME).join(format!("{name}.{RECIPE_EXTENSION}")), content)
    }

    /// Write `<name>.rb` into the built-in helpers directory.
    pub fn write_builtin_helper(&self, name: &str, content: &str) -> Result<PathBuf> {
        self.write(&self.builtin_dir.join(format!("{name}.{RECIPE_EXTENSION}")), content)
    }

    /// Write `<name>.rb` into `dir` (relative to the temp root), creating it.
    pub fn write_helper_in(&self, dir: &str, name: &str, content: &str) -> Result<PathBuf> {
        self.write(&self.path().join(dir).join(format!("{name}.{RECIPE_EXTENSION}")), content)
    }

    /// Instance of `definition` whose built-in helpers are this environment's.
    pub fn instance(&self, definition: DslDefinition) -> Dsl {
        Dsl::with_builtin_helpers_dir(Arc::new(definition), self.builtin_dir.clone())
    }

    /// Instance of the deployment preset.
    pub fn script_instance(&self) -> Result<Dsl> {
        Ok(self.instance(Script::definition()?))
    }

    fn write(&self, path: &Path, content: &str) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(path, content).with_context(|| format!("Failed to write file: {}", path.display()))?;
        Ok(path.to_path_buf())
    }
}
