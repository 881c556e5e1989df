//! mamiya - recipe DSL and hook dispatch for cluster deployments
//!
//! Deployment recipes are small scripts that configure a deployment, define
//! named tasks and attach callbacks to lifecycle hooks:
//!
//! ```text
//! set :application, "shop"
//! use :git, branch: "main"
//!
//! task :migrate do
//!   log "migrating #{application}"
//! end
//!
//! prepare only: [:web] do |host|
//!   append :prepared, host
//! end
//! ```
//!
//! A host evaluates recipes into a [`dsl::Dsl`] instance and then invokes
//! tasks or dispatches hooks for the labels of the machine being deployed.
//!
//! # Modules
//!
//! - [`dsl`] - the engine: definitions, variables, tasks, hooks, evaluation and helpers
//! - [`recipe`] - recipe syntax tree and parser
//! - [`labels`] - label expressions used by hook `only`/`except` filters
//! - [`script`] - the deployment lifecycle preset
//! - [`config`] - user configuration file
//! - [`cli`] - the `mamiya` command
//! - [`core`] - error types and user-facing error rendering

// Engine
pub mod dsl;
pub mod labels;
pub mod recipe;
pub mod script;

// Front end
pub mod cli;
pub mod config;

// Supporting modules
pub mod constants;
pub mod core;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
