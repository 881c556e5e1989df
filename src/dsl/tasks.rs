//! Named one-shot tasks.

use anyhow::Result;
use dashmap::DashMap;
use tracing::{debug, info};

use super::{Callback, Dsl};
use crate::core::MamiyaError;
use crate::utils::find_similar_name;

/// Task name to body. Redefining a name replaces the earlier body.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: DashMap<String, Callback>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&self, name: &str, callback: Callback) {
        if self.tasks.insert(name.to_string(), callback).is_some() {
            debug!(task = name, "redefined task");
        } else {
            debug!(task = name, "defined task");
        }
    }

    /// Clone of the stored body, so no map lock is held while it runs.
    pub fn get(&self, name: &str) -> Option<Callback> {
        self.tasks.get(name).map(|entry| entry.value().clone())
    }

    /// Sorted task names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl Dsl {
    /// Define (or replace) a task.
    pub fn task(&self, name: &str, callback: Callback) {
        self.tasks.define(name, callback);
    }

    /// Define a task from a host closure.
    pub fn task_fn<F>(&self, name: &str, f: F)
    where
        F: Fn(&Dsl) -> Result<()> + Send + Sync + 'static,
    {
        self.task(
            name,
            Callback::native(move |dsl, _args| {
                f(dsl)?;
                Ok(super::Value::Nil)
            }),
        );
    }

    /// Run a task on this instance.
    ///
    /// # Errors
    ///
    /// [`MamiyaError::TaskNotFound`] if no task has that name; otherwise
    /// whatever the task body fails with.
    pub fn invoke(&self, name: &str) -> Result<()> {
        let Some(callback) = self.tasks.get(name) else {
            let names = self.tasks.names();
            return Err(MamiyaError::TaskNotFound {
                name: name.to_string(),
                did_you_mean: find_similar_name(name, names.iter().map(String::as_str)),
            }
            .into());
        };

        info!(task = name, "invoking task");
        callback.call(self, &[])?;
        Ok(())
    }

    /// Sorted names of defined tasks.
    pub fn task_names(&self) -> Vec<String> {
        self.tasks.names()
    }
}
