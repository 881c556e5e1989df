//! The recipe DSL engine.
//!
//! A host describes its DSL once with a [`DslDefinition`] (configuration
//! defaults and lifecycle hook names), then creates [`Dsl`] instances from
//! it. Recipes evaluated into an instance populate its variables, tasks and
//! hook chains; the host then invokes tasks or dispatches hooks.
//!
//! ```rust,no_run
//! use mamiya::dsl::{Dsl, DslDefinition, Value};
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let definition = DslDefinition::new("deploy");
//! definition.add_hook("on_deploy")?;
//! let dsl = Dsl::new(Arc::new(definition));
//!
//! dsl.evaluate(
//!     "on_deploy only: [:web] do |host|\n  append :results, host\nend",
//!     None,
//!     None,
//! )?;
//! dsl.dispatch_hook("on_deploy", &[Value::symbol("web")], &[Value::from("h1")])?;
//! dsl.dispatch_hook("on_deploy", &[Value::symbol("db")], &[Value::from("h2")])?;
//! assert_eq!(dsl.get("results"), Some(Value::from(vec!["h1"])));
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! [`Dsl`] is `Send + Sync`. Registries are concurrent maps, and callbacks
//! run on a snapshot of their chain, so a callback may register hooks or
//! tasks. Evaluation is serialized per instance by an exclusive lock and
//! helper loading by a reentrant one; a thread evaluating a recipe that
//! calls `use` holds both.

pub mod callback;
pub mod definition;
mod evaluator;
mod helpers;
pub mod hooks;
pub mod interpreter;
pub mod lock;
pub mod tasks;
pub mod value;
pub mod variables;

pub use callback::{Callback, NativeCallback};
pub use definition::{BUILDER_OPERATIONS, DslDefinition};
pub use helpers::HelperLocation;
pub use hooks::{Dispatcher, HookEntry, HookFilter, HookRegistry, Placement};
pub use interpreter::{Origin, ScriptBlock};
pub use lock::{OwnedLock, OwnedLockGuard};
pub use tasks::TaskRegistry;
pub use value::{Symbol, Value};
pub use variables::VariableStore;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::constants::builtin_helpers_dir;
use crate::core::MamiyaError;

/// One DSL instance: variables, tasks and hook chains plus evaluation state.
#[derive(Debug)]
pub struct Dsl {
    definition: Arc<DslDefinition>,
    variables: VariableStore,
    tasks: TaskRegistry,
    hooks: HookRegistry,
    eval_lock: OwnedLock,
    use_lock: OwnedLock,
    current_file: Mutex<Option<PathBuf>>,
    helper_options: Mutex<Option<Value>>,
    builtin_helpers_dir: PathBuf,
}

impl Dsl {
    /// New instance using the default built-in helpers directory.
    pub fn new(definition: Arc<DslDefinition>) -> Self {
        Self::with_builtin_helpers_dir(definition, builtin_helpers_dir())
    }

    pub fn with_builtin_helpers_dir(definition: Arc<DslDefinition>, dir: impl Into<PathBuf>) -> Self {
        Self {
            variables: VariableStore::new(Arc::clone(&definition)),
            definition,
            tasks: TaskRegistry::new(),
            hooks: HookRegistry::new(),
            eval_lock: OwnedLock::new("evaluate"),
            use_lock: OwnedLock::new("use"),
            current_file: Mutex::new(None),
            helper_options: Mutex::new(None),
            builtin_helpers_dir: dir.into(),
        }
    }

    pub fn definition(&self) -> &Arc<DslDefinition> {
        &self.definition
    }

    pub fn builtin_helpers_dir(&self) -> &Path {
        &self.builtin_helpers_dir
    }

    /// Instance value, else the definition default, else `None`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.variables.get(key)
    }

    /// Store a value, overriding any default.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.variables.set(key, value.into());
    }

    /// Store `value` only if the instance has no value for `key` yet.
    /// Returns the value stored afterwards.
    pub fn set_default(&self, key: &str, value: impl Into<Value>) -> Value {
        self.variables.set_default(key, value.into())
    }

    /// Append to the list under `key`.
    ///
    /// # Errors
    ///
    /// [`MamiyaError::InvalidArgument`] if the visible value is neither a list nor nil.
    pub fn append(&self, key: &str, value: impl Into<Value>) -> Result<(), MamiyaError> {
        self.variables.append(key, value.into())
    }

    /// Every visible variable, defaults included, sorted by key.
    pub fn variables(&self) -> BTreeMap<String, Value> {
        self.variables.snapshot()
    }

    /// File of the running `evaluate`/`load`, if it was given one.
    pub fn current_file(&self) -> Option<PathBuf> {
        self.current_file_slot().clone()
    }

    /// Whether a `use` options payload is waiting to be taken.
    pub fn helper_options_pending(&self) -> bool {
        self.helper_options_slot().is_some()
    }

    fn current_file_slot(&self) -> MutexGuard<'_, Option<PathBuf>> {
        self.current_file.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn helper_options_slot(&self) -> MutexGuard<'_, Option<Value>> {
        self.helper_options.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
