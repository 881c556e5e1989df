//! Load a recipe and run tasks.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use super::CommandContext;
use super::common::run_blocking;

#[derive(Args)]
pub struct InvokeCommand {
    /// Recipe file to load
    #[arg(value_name = "RECIPE")]
    pub recipe: PathBuf,

    /// Tasks to run, in order
    #[arg(value_name = "TASK", required = true, num_args = 1..)]
    pub tasks: Vec<String>,
}

impl InvokeCommand {
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let dsl = context.load_recipe(&self.recipe).await?;

        for task in self.tasks {
            let handle = Arc::clone(&dsl);
            let name = task.clone();
            run_blocking(move || handle.invoke(&name)).await?;
            if !context.quiet {
                println!("{} {}", "✓".green(), task);
            }
        }
        Ok(())
    }
}
