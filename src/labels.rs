//! Label matching for hook filters.
//!
//! A [`LabelMatcher`] is built from the selector labels passed when a hook is
//! dispatched (typically the labels of the host being deployed) and answers
//! whether the `only`/`except` expression stored on a hook entry matches them.
//!
//! # Expression semantics
//!
//! An expression is a list of terms:
//!
//! - `[:web, :app]` is an AND: every term must match one of the labels
//! - `[[:web, :app], [:db]]` (every term is a list) is an OR of AND-groups
//! - `[]` never matches
//!
//! A term matches when a label is equal to it. Terms containing glob
//! metacharacters (`*`, `?`, `[`) are compiled with [`glob::Pattern`] and
//! match any label the pattern accepts, so `only: ["web-*"]` covers
//! `web-1` and `web-canary`.

use crate::dsl::Value;
use glob::Pattern;
use tracing::trace;

/// Matches label expressions against a fixed set of selector labels.
#[derive(Debug, Clone, Default)]
pub struct LabelMatcher {
    labels: Vec<String>,
}

impl LabelMatcher {
    /// Create a matcher over the given labels.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a matcher from dispatch selector arguments.
    ///
    /// Nested lists are flattened; strings and symbols become labels and
    /// anything else is ignored.
    pub fn from_values(selectors: &[Value]) -> Self {
        let mut labels = Vec::new();
        flatten_into(selectors, &mut labels);
        Self {
            labels,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Whether `expression` matches this matcher's labels.
    pub fn matches(&self, expression: &[Value]) -> bool {
        if expression.is_empty() {
            return false;
        }

        if expression.iter().all(|term| matches!(term, Value::List(_))) {
            return expression.iter().any(|group| match group {
                Value::List(terms) => self.matches(terms),
                _ => false,
            });
        }

        let result = expression.iter().all(|term| self.term_matches(term));
        trace!(labels = ?self.labels, ?expression, result, "label expression evaluated");
        result
    }

    fn term_matches(&self, term: &Value) -> bool {
        let Some(term) = term.as_key() else {
            return false;
        };

        if is_glob(term) {
            match Pattern::new(term) {
                Ok(pattern) => self.labels.iter().any(|label| pattern.matches(label)),
                // An invalid pattern can only ever match itself literally
                Err(_) => self.labels.iter().any(|label| label == term),
            }
        } else {
            self.labels.iter().any(|label| label == term)
        }
    }
}

fn is_glob(term: &str) -> bool {
    term.contains(['*', '?', '['])
}

fn flatten_into(values: &[Value], out: &mut Vec<String>) {
    for value in values {
        match value {
            Value::List(items) => flatten_into(items, out),
            other => {
                if let Some(label) = other.as_key() {
                    out.push(label.to_string());
                }
            }
        }
    }
}
