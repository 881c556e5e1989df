//! Command-line interface for mamiya.
//!
//! Each subcommand lives in its own module with its argument struct and
//! execution logic. All of them load a recipe into an instance of the script
//! preset (extended by the configuration file) and then inspect or run it.
//!
//! # Commands
//!
//! - `check` - load a recipe and list its tasks, hooks and variables
//! - `invoke` - load a recipe and run tasks
//! - `hook` - load a recipe and dispatch a hook for a set of labels
//! - `helpers` - list the helpers `use` can find
//!
//! # Global Options
//!
//! - `--verbose` - enable debug logging
//! - `--quiet` - only log errors and suppress status output
//! - `--config` - configuration file to use instead of the default
//! - `-I, --load-path` - extra helper directory, searched first (repeatable)
//!
//! # Example
//!
//! ```bash
//! mamiya check deploy.rb --format json
//! mamiya invoke deploy.rb build package
//! mamiya hook deploy.rb prepare -l web -l canary web-1
//! ```

mod check;
pub mod common;
mod helpers;
mod hook;
mod invoke;

pub use check::{CheckCommand, OutputFormat, RecipeSummary};
pub use common::CommandContext;
pub use helpers::HelpersCommand;
pub use hook::HookCommand;
pub use invoke::InvokeCommand;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Runtime configuration resolved from the global flags.
///
/// Built once from [`Cli`] and handed to the commands, so tests can drive
/// commands without going through argument parsing.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter; `None` defers to `RUST_LOG`, falling back to `info`
    pub log_level: Option<String>,
    /// Suppress status output
    pub quiet: bool,
    /// Configuration file overriding the default location
    pub config_path: Option<PathBuf>,
    /// Helper directories from `-I`, in order
    pub load_path: Vec<String>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global tracing subscriber. Later calls are no-ops.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[derive(Parser)]
#[command(
    name = "mamiya",
    about = "Evaluate deployment recipes, run their tasks and dispatch their hooks",
    version,
    long_about = "mamiya loads deployment recipes written in its recipe DSL, then runs tasks or \
                  dispatches lifecycle hooks filtered by host labels."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors and suppress status output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Extra helper directory searched before configured ones (repeatable)
    #[arg(short = 'I', long = "load-path", global = true, value_name = "DIR")]
    load_path: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a recipe and report its tasks, hooks and variables
    Check(CheckCommand),

    /// Load a recipe and run tasks in order
    Invoke(InvokeCommand),

    /// Load a recipe and dispatch a hook
    Hook(HookCommand),

    /// List helpers available to `use`
    Helpers(HelpersCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            quiet: self.quiet,
            config_path: self.config.clone(),
            load_path: self.load_path.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        let context = CommandContext::prepare(&config).await?;

        match self.command {
            Commands::Check(cmd) => cmd.execute(&context).await,
            Commands::Invoke(cmd) => cmd.execute(&context).await,
            Commands::Hook(cmd) => cmd.execute(&context).await,
            Commands::Helpers(cmd) => cmd.execute(&context).await,
        }
    }
}
