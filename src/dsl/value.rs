//! Dynamic values stored in variables and passed to callbacks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A value a recipe can produce or a host can store.
///
/// Strings and symbols are distinct values but name the same variable, task
/// or hook when used as a key (see [`Value::as_key`]).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value
    #[default]
    Nil,
    /// `true` / `false`
    Bool(bool),
    /// Signed integer
    Integer(i64),
    /// Text
    String(String),
    /// List of values
    List(Vec<Value>),
    /// String-keyed map, used for `use` options and keyword arguments
    Map(BTreeMap<String, Value>),
    /// Interned-name value written `:name` in recipes
    Symbol(Symbol),
}

/// Symbol payload; serializes as its bare name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Value {
    /// Build a symbol value.
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(Symbol(name.into()))
    }

    /// Name this value denotes when used as a key: strings and symbols only.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Symbol(Symbol(s)) => Some(s),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Symbol(_) => "symbol",
        }
    }

    /// Index into a list (integer) or map (string/symbol key). Missing entries are `nil`.
    pub fn index(&self, key: &Value) -> Option<Value> {
        match (self, key) {
            (Self::List(items), Self::Integer(i)) => {
                let len = items.len() as i64;
                let idx = if *i < 0 { len + i } else { *i };
                if (0..len).contains(&idx) {
                    Some(items[idx as usize].clone())
                } else {
                    Some(Self::Nil)
                }
            }
            (Self::Map(map), key) => {
                let key = key.as_key()?;
                Some(map.get(key).cloned().unwrap_or_default())
            }
            (Self::Nil, _) => Some(Self::Nil),
            _ => None,
        }
    }

    /// Recipe-literal rendering, used for lists and maps inside interpolation.
    pub fn inspect(&self) -> String {
        match self {
            Self::Nil => "nil".to_string(),
            Self::String(s) => format!("{s:?}"),
            Self::Symbol(Symbol(s)) => format!(":{s}"),
            Self::List(items) => {
                let inner: Vec<String> = items.iter().map(Value::inspect).collect();
                format!("[{}]", inner.join(", "))
            }
            Self::Map(map) => {
                let inner: Vec<String> =
                    map.iter().map(|(k, v)| format!("{k}: {}", v.inspect())).collect();
                format!("{{{}}}", inner.join(", "))
            }
            other => other.to_string(),
        }
    }
}

/// String rendering used by interpolation and `log`: `nil` renders empty,
/// symbols render as their name.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::String(s) => f.write_str(s),
            Self::Symbol(Symbol(s)) => f.write_str(s),
            Self::List(_) | Self::Map(_) => f.write_str(&self.inspect()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self::Map(map)
    }
}
