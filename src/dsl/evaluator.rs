//! Top-level recipe evaluation.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

use super::interpreter::{self, Locals, Origin};
use super::Dsl;
use crate::constants::ANONYMOUS_SOURCE;
use crate::core::MamiyaError;
use crate::recipe::parse_recipe;

/// Records the file being evaluated and clears it when dropped.
struct CurrentFile<'a> {
    dsl: &'a Dsl,
}

impl<'a> CurrentFile<'a> {
    fn enter(dsl: &'a Dsl, path: Option<&Path>) -> Self {
        if let Some(path) = path {
            *dsl.current_file_slot() = Some(path.to_path_buf());
        }
        Self {
            dsl,
        }
    }
}

impl Drop for CurrentFile<'_> {
    fn drop(&mut self) {
        *self.dsl.current_file_slot() = None;
    }
}

impl Dsl {
    /// Parse and run recipe text on this instance.
    ///
    /// `filename` is recorded as the current file while the recipe runs, so
    /// `use` can find helpers next to it, and is used in diagnostics along
    /// with `lineno` (the line the text starts on, default 1).
    ///
    /// Only one evaluation runs per instance at a time; other threads wait.
    ///
    /// # Errors
    ///
    /// - [`MamiyaError::ReentrantEvaluation`] when called from inside an
    ///   evaluation already running on this thread (a task or hook body
    ///   invoked during `evaluate`, or an [`evaluate_with`](Self::evaluate_with) closure)
    /// - [`MamiyaError::RecipeParseError`] for malformed text
    /// - any error raised by the statements, unchanged
    pub fn evaluate(&self, source: &str, filename: Option<&Path>, lineno: Option<usize>) -> Result<()> {
        let _lock = self.eval_lock.acquire_exclusive()?;
        let _file = CurrentFile::enter(self, filename);

        let source_name = filename.map_or_else(|| ANONYMOUS_SOURCE.to_string(), |p| p.display().to_string());
        let first_line = lineno.unwrap_or(1);
        let program = parse_recipe(source, &source_name, first_line)?;
        debug!(file = %source_name, statements = program.statements.len(), "evaluating recipe");

        interpreter::execute(self, &program, Origin::new(source_name, first_line), Locals::new())?;
        Ok(())
    }

    /// Run host code under the evaluation lock.
    pub fn evaluate_with<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Dsl) -> Result<T>,
    {
        let _lock = self.eval_lock.acquire_exclusive()?;
        f(self)
    }

    /// Read a recipe file and evaluate it from line 1.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).with_context(|| MamiyaError::FileSystemError {
            operation: "reading recipe".to_string(),
            path: path.display().to_string(),
        })?;
        self.evaluate(&source, Some(path), Some(1))
    }
}
