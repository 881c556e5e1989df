//! Callables stored in the task and hook registries.

use std::fmt;
use std::sync::Arc;

use super::interpreter::ScriptBlock;
use super::{Dsl, Value};

/// Host closure registered as a task or hook callback.
pub type NativeCallback = Arc<dyn Fn(&Dsl, &[Value]) -> anyhow::Result<Value> + Send + Sync>;

/// A task body or hook callback.
///
/// Recipes register [`Callback::Script`] blocks; hosts register closures
/// through [`Callback::native`]. Both run synchronously on the calling
/// thread and receive the DSL instance they were invoked on.
#[derive(Clone)]
pub enum Callback {
    Native(NativeCallback),
    Script(ScriptBlock),
}

impl Callback {
    pub fn native<F>(f: F) -> Self
    where
        F: Fn(&Dsl, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self::Native(Arc::new(f))
    }

    /// Run the callback. Errors are returned exactly as the callback produced them.
    pub fn call(&self, dsl: &Dsl, args: &[Value]) -> anyhow::Result<Value> {
        match self {
            Self::Native(f) => f(dsl, args),
            Self::Script(block) => block.call(dsl, args),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(_) => f.write_str("Callback::Native(..)"),
            Self::Script(block) => write!(f, "Callback::Script({})", block.origin()),
        }
    }
}
