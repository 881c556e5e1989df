//! Load a recipe and dispatch one hook.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use super::CommandContext;
use super::common::run_blocking;
use crate::dsl::Value;

#[derive(Args)]
pub struct HookCommand {
    /// Recipe file to load
    #[arg(value_name = "RECIPE")]
    pub recipe: PathBuf,

    /// Hook to dispatch
    #[arg(value_name = "HOOK")]
    pub hook: String,

    /// Selector label matched against `only`/`except` filters (repeatable)
    #[arg(short, long = "label", value_name = "LABEL")]
    pub labels: Vec<String>,

    /// Arguments passed to every callback
    #[arg(value_name = "ARGS", trailing_var_arg = true)]
    pub args: Vec<String>,
}

impl HookCommand {
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let dsl = context.load_recipe(&self.recipe).await?;

        let selectors: Vec<Value> = self.labels.iter().map(|l| Value::from(l.as_str())).collect();
        let args: Vec<Value> = self.args.iter().map(|a| Value::from(a.as_str())).collect();
        let hook = self.hook.clone();
        let handle = Arc::clone(&dsl);
        let results = run_blocking(move || handle.dispatch_hook(&hook, &selectors, &args)).await?;

        if !context.quiet {
            println!(
                "{} {}: {} of {} callback(s) ran",
                "✓".green(),
                self.hook,
                results.len(),
                dsl.hook_chain_len(&self.hook)
            );
            for result in results.iter().filter(|r| !r.is_nil()) {
                println!("  {}", result.inspect());
            }
        }
        Ok(())
    }
}
