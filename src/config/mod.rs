//! User configuration for the `mamiya` command.
//!
//! The configuration file extends the script preset before a recipe is
//! loaded: extra helper directories, a different built-in helpers directory,
//! extra hook names and extra defaults.
//!
//! # Location
//!
//! 1. `--config <path>`
//! 2. `$MAMIYA_CONFIG`
//! 3. `<config dir>/mamiya/config.toml` (`~/.config/mamiya/config.toml` on Linux)
//!
//! A missing file is the same as an empty one.
//!
//! # Format
//!
//! ```toml
//! load_path = ["~/deploy/helpers", "$SHARED/helpers"]
//! builtin_helpers_dir = "/usr/share/mamiya/helpers"
//! hooks = ["notify"]
//!
//! [variables]
//! application = "shop"
//! servers = ["web-1", "web-2"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::constants::{CONFIG_ENV_VAR, LOAD_PATH_VARIABLE, builtin_helpers_dir};
use crate::dsl::{DslDefinition, Value};
use crate::utils::expand_path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MamiyaConfig {
    /// Helper directories searched before the recipe-relative `helpers/`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub load_path: Vec<String>,

    /// Replaces the built-in helpers directory shipped with mamiya
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builtin_helpers_dir: Option<String>,

    /// Hook names declared in addition to the lifecycle hooks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<String>,

    /// Extra definition defaults
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, Value>,
}

impl MamiyaConfig {
    /// `$MAMIYA_CONFIG`, else `<config dir>/mamiya/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Ok(PathBuf::from(path));
        }
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Unable to determine configuration directory"))?;
        Ok(config_dir.join("mamiya").join("config.toml"))
    }

    /// Load from `path` if given, else from [`default_path`](Self::default_path).
    /// A missing file yields the default configuration.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };

        if fs::try_exists(&path).await.unwrap_or(false) {
            Self::load_from(&path).await
        } else {
            debug!(path = %path.display(), "configuration file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration from {}", path.display()))?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Add this configuration's hooks and defaults to `definition`.
    ///
    /// `load_path` entries become the `load_path` default, after any
    /// `load_path` given in `[variables]`.
    pub fn apply_to(&self, definition: &DslDefinition) -> Result<()> {
        for hook in &self.hooks {
            definition.add_hook(hook.as_str())?;
        }
        for (key, value) in &self.variables {
            definition.set_default(key.as_str(), value.clone());
        }

        if !self.load_path.is_empty() {
            let mut entries = match definition.default_value(LOAD_PATH_VARIABLE) {
                Some(Value::List(entries)) => entries,
                Some(Value::Nil) | None => Vec::new(),
                Some(single) => vec![single],
            };
            entries.extend(self.load_path.iter().map(|dir| Value::from(dir.as_str())));
            definition.set_default(LOAD_PATH_VARIABLE, Value::List(entries));
        }
        Ok(())
    }

    /// Configured built-in helpers directory, else the per-user default.
    pub fn resolved_builtin_helpers_dir(&self) -> Result<PathBuf> {
        match &self.builtin_helpers_dir {
            Some(dir) => expand_path(dir),
            None => Ok(builtin_helpers_dir()),
        }
    }
}
