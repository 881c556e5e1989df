//! Hook chains and label-filtered dispatch.
//!
//! A hook is a named extension point declared on the [`DslDefinition`]. Each
//! instance keeps one ordered chain of [`HookEntry`] values per hook name.
//! Registration places an entry according to a [`Placement`]; dispatch builds
//! a [`Dispatcher`] from selector labels and runs every entry whose
//! `only`/`except` filter accepts those labels, in chain order.
//!
//! ```rust,no_run
//! use mamiya::dsl::{Callback, Dsl, DslDefinition, HookFilter, Placement, Value};
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let definition = DslDefinition::new("deploy");
//! definition.add_hook("prepare")?;
//! let dsl = Dsl::new(Arc::new(definition));
//!
//! dsl.register_hook(
//!     "prepare",
//!     Callback::native(|_, args| Ok(args[0].clone())),
//!     HookFilter::only(vec![Value::symbol("web")]),
//!     Placement::Append,
//! )?;
//!
//! let results = dsl.dispatcher("prepare", &[Value::symbol("web")])?.call(&[Value::from("web-1")])?;
//! assert_eq!(results, vec![Value::from("web-1")]);
//! # Ok(())
//! # }
//! ```
//!
//! [`DslDefinition`]: super::DslDefinition

use anyhow::Result;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

use super::{Callback, Dsl, Value};
use crate::core::MamiyaError;
use crate::labels::LabelMatcher;

/// Where a newly registered entry goes in its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// Add at the tail
    #[default]
    Append,
    /// Insert at the head
    Prepend,
    /// Replace the whole chain with the entry
    Overwrite,
}

impl Placement {
    /// Placement named by the first selector argument of a registration:
    /// `:overwrite`, `:prepend`, anything else appends.
    pub fn from_selector(selector: Option<&Value>) -> Self {
        match selector.and_then(Value::as_key) {
            Some("overwrite") => Self::Overwrite,
            Some("prepend") => Self::Prepend,
            _ => Self::Append,
        }
    }
}

/// `only`/`except` label expressions attached to a hook entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookFilter {
    pub only: Option<Vec<Value>>,
    pub except: Option<Vec<Value>>,
}

impl HookFilter {
    /// Filter that lets every dispatch through.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn only(labels: Vec<Value>) -> Self {
        Self {
            only: Some(labels),
            except: None,
        }
    }

    pub fn except(labels: Vec<Value>) -> Self {
        Self {
            only: None,
            except: Some(labels),
        }
    }

    /// Build a filter from registration options.
    ///
    /// `only` and `except` accept a label expression list or a single label;
    /// `nil` means unset. Other keys are ignored.
    ///
    /// # Errors
    ///
    /// [`MamiyaError::InvalidHookFilter`] when either expression has another shape.
    pub fn from_options(hook: &str, options: &BTreeMap<String, Value>) -> Result<Self, MamiyaError> {
        let expression = |key: &str| -> Result<Option<Vec<Value>>, MamiyaError> {
            match options.get(key) {
                None | Some(Value::Nil) => Ok(None),
                Some(value) => validate_expression(hook, key, value).map(Some),
            }
        };

        for key in options.keys().filter(|k| *k != "only" && *k != "except") {
            debug!(hook, option = %key, "ignoring unrecognized hook option");
        }

        Ok(Self {
            only: expression("only")?,
            except: expression("except")?,
        })
    }

    /// Whether an entry with this filter runs for `matcher`'s labels.
    pub fn accepts(&self, matcher: &LabelMatcher) -> bool {
        let only_ok = self.only.as_ref().is_none_or(|only| matcher.matches(only));
        let except_ok = self.except.as_ref().is_none_or(|except| !matcher.matches(except));
        only_ok && except_ok
    }
}

fn validate_expression(hook: &str, key: &str, value: &Value) -> Result<Vec<Value>, MamiyaError> {
    let invalid = |what: &str| MamiyaError::InvalidHookFilter {
        hook: hook.to_string(),
        reason: format!("'{key}' {what}"),
    };

    let terms = match value {
        Value::List(terms) => terms.clone(),
        label if label.as_key().is_some() => return Ok(vec![label.clone()]),
        other => return Err(invalid(&format!("must be a label or a list of labels, got a {}", other.type_name()))),
    };

    for term in &terms {
        match term {
            Value::List(group) => {
                if let Some(bad) = group.iter().find(|t| t.as_key().is_none()) {
                    return Err(invalid(&format!("contains a {} inside a label group", bad.type_name())));
                }
            }
            t if t.as_key().is_some() => {}
            other => return Err(invalid(&format!("contains a {}, expected a label", other.type_name()))),
        }
    }
    Ok(terms)
}

/// One callback in a hook chain.
#[derive(Debug)]
pub struct HookEntry {
    pub callback: Callback,
    pub filter: HookFilter,
}

/// Per-instance hook chains.
#[derive(Debug, Default)]
pub struct HookRegistry {
    chains: DashMap<String, Vec<Arc<HookEntry>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, hook: &str, entry: HookEntry, placement: Placement) {
        let entry = Arc::new(entry);
        let mut chain = self.chains.entry(hook.to_string()).or_default();
        match placement {
            Placement::Append => chain.push(entry),
            Placement::Prepend => chain.insert(0, entry),
            Placement::Overwrite => *chain = vec![entry],
        }
        debug!(hook, ?placement, len = chain.len(), "registered hook entry");
    }

    /// Current entries of a chain; empty when nothing was registered.
    pub fn snapshot(&self, hook: &str) -> Vec<Arc<HookEntry>> {
        self.chains.get(hook).map(|chain| chain.value().clone()).unwrap_or_default()
    }

    pub fn len(&self, hook: &str) -> usize {
        self.chains.get(hook).map_or(0, |chain| chain.len())
    }
}

/// Runs one hook's chain for a fixed set of selector labels.
///
/// Created by [`Dsl::dispatcher`]; each [`call`](Dispatcher::call) reads the
/// chain as it is at that moment.
#[derive(Debug)]
pub struct Dispatcher<'a> {
    dsl: &'a Dsl,
    hook: String,
    matcher: LabelMatcher,
}

impl Dispatcher<'_> {
    /// Run every matching entry with `args`, in chain order, and collect
    /// their results. The first failing callback stops the walk and its
    /// error is returned unchanged.
    pub fn call(&self, args: &[Value]) -> Result<Vec<Value>> {
        let chain = self.dsl.hooks.snapshot(&self.hook);
        let mut results = Vec::new();

        for (position, entry) in chain.iter().enumerate() {
            if !entry.filter.accepts(&self.matcher) {
                trace!(hook = %self.hook, position, "hook entry filtered out");
                continue;
            }
            trace!(hook = %self.hook, position, "running hook entry");
            results.push(entry.callback.call(self.dsl, args)?);
        }

        debug!(
            hook = %self.hook,
            labels = ?self.matcher.labels(),
            ran = results.len(),
            chain = chain.len(),
            "dispatched hook"
        );
        Ok(results)
    }
}

impl Dsl {
    fn ensure_hook(&self, hook: &str) -> Result<(), MamiyaError> {
        if self.definition.has_hook(hook) {
            Ok(())
        } else {
            Err(MamiyaError::UnknownHook {
                name: hook.to_string(),
            })
        }
    }

    /// Add a callback to a declared hook's chain.
    ///
    /// # Errors
    ///
    /// [`MamiyaError::UnknownHook`] if the definition never declared `hook`.
    /// The chain is untouched on error.
    pub fn register_hook(&self, hook: &str, callback: Callback, filter: HookFilter, placement: Placement) -> Result<()> {
        self.ensure_hook(hook)?;
        self.hooks.register(
            hook,
            HookEntry {
                callback,
                filter,
            },
            placement,
        );
        Ok(())
    }

    /// Dispatcher for `hook` matching entries against `selectors`.
    ///
    /// # Errors
    ///
    /// [`MamiyaError::UnknownHook`] if the definition never declared `hook`.
    pub fn dispatcher(&self, hook: &str, selectors: &[Value]) -> Result<Dispatcher<'_>> {
        self.ensure_hook(hook)?;
        Ok(Dispatcher {
            dsl: self,
            hook: hook.to_string(),
            matcher: LabelMatcher::from_values(selectors),
        })
    }

    /// `dispatcher(hook, selectors)?.call(args)`
    pub fn dispatch_hook(&self, hook: &str, selectors: &[Value], args: &[Value]) -> Result<Vec<Value>> {
        self.dispatcher(hook, selectors)?.call(args)
    }

    /// Number of entries currently registered on `hook`.
    pub fn hook_chain_len(&self, hook: &str) -> usize {
        self.hooks.len(hook)
    }

    /// Hook names declared by the definition, sorted.
    pub fn hook_names(&self) -> Vec<String> {
        self.definition.hook_names()
    }
}
