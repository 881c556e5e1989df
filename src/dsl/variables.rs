//! Instance variables layered over definition defaults.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

use super::{DslDefinition, Value};
use crate::core::MamiyaError;

/// Per-instance variables. Reads fall back to the definition's defaults;
/// presence decides, so an instance value of `nil` still hides a default.
#[derive(Debug)]
pub struct VariableStore {
    definition: Arc<DslDefinition>,
    values: DashMap<String, Value>,
}

impl VariableStore {
    pub fn new(definition: Arc<DslDefinition>) -> Self {
        Self {
            definition,
            values: DashMap::new(),
        }
    }

    /// Instance value, else the definition default, else `None`.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.values.get(key) {
            Some(value) => Some(value.value().clone()),
            None => self.definition.default_value(key),
        }
    }

    /// Whether the instance itself holds a value for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn set(&self, key: &str, value: Value) {
        self.definition.define_accessor(key);
        trace!(key, value = %value.inspect(), "set variable");
        self.values.insert(key.to_string(), value);
    }

    /// Store `value` unless the instance already has a value for `key`;
    /// returns whichever value ends up stored.
    pub fn set_default(&self, key: &str, value: Value) -> Value {
        self.definition.define_accessor(key);
        self.values.entry(key.to_string()).or_insert(value).value().clone()
    }

    /// Push `value` onto the list stored under `key`.
    ///
    /// Starts from the visible value (instance, then default), treating an
    /// absent or `nil` value as an empty list. Fails without changing anything
    /// if the visible value is not a list.
    pub fn append(&self, key: &str, value: Value) -> Result<(), MamiyaError> {
        let not_a_list = |found: &Value| MamiyaError::InvalidArgument {
            operation: "append".to_string(),
            location: "host".to_string(),
            reason: format!("variable '{key}' holds a {}, not a list", found.type_name()),
        };

        match self.values.entry(key.to_string()) {
            Entry::Occupied(mut entry) => match entry.get_mut() {
                Value::List(items) => items.push(value),
                slot @ Value::Nil => *slot = Value::List(vec![value]),
                other => return Err(not_a_list(other)),
            },
            Entry::Vacant(entry) => {
                let items = match self.definition.default_value(key) {
                    None | Some(Value::Nil) => vec![value],
                    Some(Value::List(mut items)) => {
                        items.push(value);
                        items
                    }
                    Some(other) => return Err(not_a_list(&other)),
                };
                entry.insert(Value::List(items));
            }
        }

        self.definition.define_accessor(key);
        Ok(())
    }

    /// Defaults overlaid with instance values, sorted by key.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        let mut all = self.definition.defaults();
        for entry in &self.values {
            all.insert(entry.key().clone(), entry.value().clone());
        }
        all
    }
}
