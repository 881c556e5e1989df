//! Test utilities for mamiya
//!
//! Helpers for writing tests against the engine and the CLI: logging setup
//! and a temporary directory laid out like a deployment project.
//!
//! # Example
//!
//! ```rust,ignore
//! use mamiya::test_utils::RecipeEnvironment;
//!
//! let env = RecipeEnvironment::new().unwrap();
//! env.write_helper("git", "set_default :branch, options[:branch]").unwrap();
//! let recipe = env.write_recipe("deploy.rb", "use :git, branch: \"main\"").unwrap();
//!
//! let dsl = env.script_instance().unwrap();
//! dsl.load(&recipe).unwrap();
//! ```

pub mod environment;

pub use environment::RecipeEnvironment;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; without either, logging
/// stays off. Only the first call has any effect.
///
/// ```bash
/// RUST_LOG=mamiya=trace cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(true)
            .try_init();
    });
}
