//! Helper resolution and loading (`use`).
//!
//! A helper is a recipe fragment `<name>.rb`. `use :name, key: value` finds
//! the first matching file on the search path:
//!
//! 1. each directory in the `load_path` variable, in order (`~` and
//!    environment variables are expanded)
//! 2. `helpers/` next to the recipe currently being evaluated, if any
//! 3. the built-in helpers directory
//!
//! When no directory has the file, a helper bundled with the definition of
//! that name is used instead.
//!
//! The helper runs on the same instance with its options bound to the local
//! `options`. Helper loads are serialized by a reentrant lock so a helper may
//! itself `use` other helpers.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::interpreter::{self, Locals, Origin};
use super::{Dsl, Value};
use crate::constants::{HELPERS_DIR_NAME, LOAD_PATH_VARIABLE, OPTIONS_LOCAL, RECIPE_EXTENSION};
use crate::core::MamiyaError;
use crate::recipe::parse_recipe;
use crate::utils::expand_path;

/// Where `use` finds a helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelperLocation {
    /// `<name>.rb` in a search directory
    File(PathBuf),
    /// Source bundled with the definition
    Bundled,
}

impl fmt::Display for HelperLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Bundled => f.write_str("(bundled)"),
        }
    }
}

/// Holds the options of one `use` call; empties the slot when dropped.
struct OptionsHandoff<'a> {
    dsl: &'a Dsl,
}

impl<'a> OptionsHandoff<'a> {
    fn fill(dsl: &'a Dsl, options: Value) -> Self {
        *dsl.helper_options_slot() = Some(options);
        Self {
            dsl,
        }
    }

    fn take(&self) -> Value {
        self.dsl.helper_options_slot().take().unwrap_or_default()
    }
}

impl Drop for OptionsHandoff<'_> {
    fn drop(&mut self) {
        *self.dsl.helper_options_slot() = None;
    }
}

impl Dsl {
    /// Directories `use` searches, in order.
    ///
    /// # Errors
    ///
    /// Fails if `load_path` is not a list of strings or an entry cannot be expanded.
    pub fn helper_search_path(&self) -> Result<Vec<PathBuf>> {
        self.search_path_from(self.current_file().as_deref())
    }

    /// Directories `use` would search while evaluating `recipe`.
    pub fn helper_search_path_for(&self, recipe: &Path) -> Result<Vec<PathBuf>> {
        self.search_path_from(Some(recipe))
    }

    fn search_path_from(&self, current_file: Option<&Path>) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();

        let entries = match self.get(LOAD_PATH_VARIABLE) {
            None | Some(Value::Nil) => Vec::new(),
            Some(Value::List(entries)) => entries,
            Some(single) => vec![single],
        };
        for entry in &entries {
            let Some(dir) = entry.as_key() else {
                return Err(MamiyaError::InvalidArgument {
                    operation: LOAD_PATH_VARIABLE.to_string(),
                    location: "host".to_string(),
                    reason: format!("entries must be strings, got a {}", entry.type_name()),
                }
                .into());
            };
            dirs.push(expand_path(dir)?);
        }

        if let Some(parent) = current_file.and_then(Path::parent) {
            dirs.push(parent.join(HELPERS_DIR_NAME));
        }

        dirs.push(self.builtin_helpers_dir.clone());
        Ok(dirs)
    }

    /// Where `use` would load `name` from, if anywhere.
    pub fn find_helper(&self, name: &str) -> Result<Option<HelperLocation>> {
        if let Some(path) = self.find_helper_file(name)? {
            return Ok(Some(HelperLocation::File(path)));
        }
        Ok(self.definition.bundled_helper(name).map(|_| HelperLocation::Bundled))
    }

    fn find_helper_file(&self, name: &str) -> Result<Option<PathBuf>> {
        let file_name = format!("{name}.{RECIPE_EXTENSION}");
        Ok(self.helper_search_path()?.into_iter().map(|dir| dir.join(&file_name)).find(|path| path.is_file()))
    }

    /// Every helper reachable by `use`, by name. Earlier directories shadow
    /// later ones and any file shadows a bundled helper.
    pub fn available_helpers(&self) -> Result<BTreeMap<String, HelperLocation>> {
        self.helpers_on(self.helper_search_path()?)
    }

    /// Like [`available_helpers`](Self::available_helpers), as seen from a
    /// recipe at `recipe` being evaluated.
    pub fn available_helpers_for(&self, recipe: &Path) -> Result<BTreeMap<String, HelperLocation>> {
        self.helpers_on(self.search_path_from(Some(recipe))?)
    }

    fn helpers_on(&self, search_path: Vec<PathBuf>) -> Result<BTreeMap<String, HelperLocation>> {
        let mut helpers = BTreeMap::new();

        for dir in search_path {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries {
                let path = entry.with_context(|| format!("Failed to list helpers in {}", dir.display()))?.path();
                if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(RECIPE_EXTENSION) {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    helpers.entry(stem.to_string()).or_insert(HelperLocation::File(path));
                }
            }
        }

        for name in self.definition.bundled_helper_names() {
            helpers.entry(name).or_insert(HelperLocation::Bundled);
        }
        Ok(helpers)
    }

    /// Load helper `name` into this instance with `options` bound as `options`.
    ///
    /// # Errors
    ///
    /// [`MamiyaError::HelperNotFound`] listing the searched directories when
    /// neither a helper file nor a bundled helper exists; otherwise any error
    /// from reading, parsing or running the helper.
    pub fn use_helper(&self, name: &str, options: Value) -> Result<()> {
        let (source, source_name): (Arc<str>, String) =
            match (self.find_helper_file(name)?, self.definition.bundled_helper(name)) {
                (Some(path), _) => {
                    let text = std::fs::read_to_string(&path).with_context(|| MamiyaError::FileSystemError {
                        operation: "reading helper".to_string(),
                        path: path.display().to_string(),
                    })?;
                    (Arc::from(text), path.display().to_string())
                }
                (None, Some(bundled)) => (bundled, format!("(bundled)/{name}.{RECIPE_EXTENSION}")),
                (None, None) => {
                    let searched = self.helper_search_path()?.iter().map(|d| d.display().to_string()).collect();
                    return Err(MamiyaError::HelperNotFound {
                        name: name.to_string(),
                        searched,
                    }
                    .into());
                }
            };

        let _lock = self.use_lock.acquire();
        let handoff = OptionsHandoff::fill(self, options);

        debug!(helper = name, source = %source_name, "using helper");
        let program = parse_recipe(&source, &source_name, 1)?;

        let mut locals = Locals::new();
        locals.insert(OPTIONS_LOCAL.to_string(), handoff.take());
        interpreter::execute(self, &program, Origin::new(source_name, 1), locals)?;
        Ok(())
    }
}
