//! List helpers reachable by `use`.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::CommandContext;

#[derive(Args)]
pub struct HelpersCommand {
    /// Recipe whose `load_path` and `helpers/` directory are taken into account
    #[arg(value_name = "RECIPE")]
    pub recipe: Option<PathBuf>,
}

impl HelpersCommand {
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let (search_path, helpers) = match &self.recipe {
            Some(recipe) => {
                let dsl = context.load_recipe(recipe).await?;
                (dsl.helper_search_path_for(recipe)?, dsl.available_helpers_for(recipe)?)
            }
            None => {
                let dsl = context.new_instance();
                (dsl.helper_search_path()?, dsl.available_helpers()?)
            }
        };

        if context.quiet {
            return Ok(());
        }

        println!("{}", "Search path:".bold());
        for dir in &search_path {
            let marker = if dir.is_dir() { "" } else { " (missing)" };
            println!("  {}{}", dir.display(), marker.dimmed());
        }

        println!("\n{}", "Helpers:".bold());
        if helpers.is_empty() {
            println!("  (none)");
        }
        for (name, location) in &helpers {
            println!("  {} {}", name.green(), location.to_string().dimmed());
        }
        Ok(())
    }
}
