//! Class-level part of a DSL: defaults, hook names and accessors.
//!
//! A [`DslDefinition`] plays the role a DSL subclass plays in a dynamic
//! language. Hosts declare their configuration defaults and lifecycle hook
//! names once, wrap the definition in an [`Arc`](std::sync::Arc), and create
//! any number of [`Dsl`](super::Dsl) instances from it. Defaults set on the
//! definition are visible to every instance that has no value of its own.
//!
//! A definition can also carry bundled helper sources, compiled into the
//! binary, that `use` falls back to when no helper file is found on disk.

use dashmap::{DashMap, DashSet};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::Value;
use crate::core::MamiyaError;

/// Operations every recipe can call. Hook names and variable accessors may
/// not shadow them.
pub const BUILDER_OPERATIONS: &[&str] =
    &["set", "set_default", "append", "task", "invoke", "use", "log", "fetch"];

#[derive(Debug)]
pub struct DslDefinition {
    name: String,
    defaults: DashMap<String, Value>,
    accessors: DashSet<String>,
    hooks: DashSet<String>,
    bundled_helpers: DashMap<String, Arc<str>>,
}

impl DslDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            defaults: DashMap::new(),
            accessors: DashSet::new(),
            hooks: DashSet::new(),
            bundled_helpers: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a default applied to every instance lacking an override.
    pub fn set_default(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        self.define_accessor(&key);
        self.defaults.insert(key, value.into());
    }

    pub fn default_value(&self, key: &str) -> Option<Value> {
        self.defaults.get(key).map(|v| v.value().clone())
    }

    /// All defaults, sorted by key.
    pub fn defaults(&self) -> BTreeMap<String, Value> {
        self.defaults.iter().map(|e| (e.key().clone(), e.value().clone())).collect()
    }

    /// Declare a hook point. Declaring the same hook twice is a no-op.
    pub fn add_hook(&self, name: impl Into<String>) -> Result<(), MamiyaError> {
        let name = name.into();
        if BUILDER_OPERATIONS.contains(&name.as_str()) {
            return Err(MamiyaError::ConfigError {
                message: format!("hook name '{name}' collides with a builder operation"),
            });
        }
        if self.hooks.insert(name.clone()) {
            debug!(definition = %self.name, hook = %name, "declared hook");
        }
        Ok(())
    }

    pub fn has_hook(&self, name: &str) -> bool {
        self.hooks.contains(name)
    }

    /// Declared hook names, sorted.
    pub fn hook_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.hooks.iter().map(|h| h.key().clone()).collect();
        names.sort();
        names
    }

    /// Make `key` readable as a bare identifier in recipes.
    ///
    /// Idempotent. Returns `false` without registering anything when the
    /// name is a builder operation or a declared hook.
    pub fn define_accessor(&self, key: &str) -> bool {
        if self.is_reserved(key) {
            return false;
        }
        if !self.accessors.contains(key) {
            self.accessors.insert(key.to_string());
        }
        true
    }

    pub fn has_accessor(&self, key: &str) -> bool {
        self.accessors.contains(key)
    }

    /// Builder operations and declared hooks.
    pub fn is_reserved(&self, name: &str) -> bool {
        BUILDER_OPERATIONS.contains(&name) || self.has_hook(name)
    }

    /// Register helper source `use :name` loads when no `<name>.rb` exists
    /// on the search path. Replaces an earlier bundle of the same name.
    pub fn bundle_helper(&self, name: impl Into<String>, source: impl Into<Arc<str>>) {
        let name = name.into();
        debug!(definition = %self.name, helper = %name, "bundled helper");
        self.bundled_helpers.insert(name, source.into());
    }

    pub fn bundled_helper(&self, name: &str) -> Option<Arc<str>> {
        self.bundled_helpers.get(name).map(|source| Arc::clone(source.value()))
    }

    /// Bundled helper names, sorted.
    pub fn bundled_helper_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bundled_helpers.iter().map(|h| h.key().clone()).collect();
        names.sort();
        names
    }
}
