//! Deployment script preset.
//!
//! The definition deployment recipes are evaluated against: the lifecycle
//! hooks the build, distribute, prepare, switch and rollback phases
//! dispatch, and the configuration defaults those phases read.

use std::sync::Arc;

use crate::core::MamiyaError;
use crate::dsl::{Dsl, DslDefinition, Value};

/// Helpers compiled into the binary, loadable with `use` unless a file of
/// the same name shadows them.
pub const BUNDLED_HELPERS: &[(&str, &str)] = &[
    ("git", include_str!("../helpers/git.rb")),
    ("package_layout", include_str!("../helpers/package_layout.rb")),
];

/// Lifecycle hooks in the order a deployment runs them.
pub const LIFECYCLE_HOOKS: &[&str] = &[
    "before_build",
    "prepare_build",
    "build",
    "after_build",
    "before_distribute",
    "after_distribute",
    "before_prepare",
    "prepare",
    "after_prepare",
    "before_switch",
    "release",
    "after_switch",
    "before_rollback",
    "rollback",
    "after_rollback",
];

pub struct Script;

impl Script {
    /// Definition with every lifecycle hook declared and the deployment defaults set.
    pub fn definition() -> Result<DslDefinition, MamiyaError> {
        let definition = DslDefinition::new("script");
        for hook in LIFECYCLE_HOOKS {
            definition.add_hook(*hook)?;
        }

        definition.set_default("application", Value::Nil);
        definition.set_default("repository", Value::Nil);
        definition.set_default("ref", Value::Nil);
        definition.set_default("build_from", Value::Nil);
        definition.set_default("build_to", Value::Nil);
        definition.set_default("package_under", Value::Nil);
        definition.set_default("exclude_from_package", Value::List(Vec::new()));
        definition.set_default("dereference_symlinks", true);
        definition.set_default("skip_prepare_build", false);
        definition.set_default("discover_servers", true);
        definition.set_default("on_client_failure", Value::symbol("error"));

        for (name, source) in BUNDLED_HELPERS {
            definition.bundle_helper(*name, *source);
        }

        Ok(definition)
    }

    /// Fresh instance of the preset.
    pub fn new_instance() -> Result<Dsl, MamiyaError> {
        Ok(Dsl::new(Arc::new(Self::definition()?)))
    }
}
