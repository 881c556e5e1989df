//! Load a recipe and report what it defined.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::CommandContext;
use crate::dsl::{Dsl, Value};

/// Output format for `mamiya check`.
#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing
    Text,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
}

#[derive(Args)]
pub struct CheckCommand {
    /// Recipe file to load
    #[arg(value_name = "RECIPE")]
    pub recipe: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// What a loaded recipe left in its instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeSummary {
    pub recipe: String,
    pub tasks: Vec<String>,
    /// Declared hook name to number of registered callbacks
    pub hooks: BTreeMap<String, usize>,
    pub variables: BTreeMap<String, Value>,
}

impl RecipeSummary {
    pub fn from_dsl(recipe: &str, dsl: &Dsl) -> Self {
        Self {
            recipe: recipe.to_string(),
            tasks: dsl.task_names(),
            hooks: dsl.hook_names().into_iter().map(|h| (h.clone(), dsl.hook_chain_len(&h))).collect(),
            variables: dsl.variables(),
        }
    }

    fn render_text(&self) -> String {
        let mut out = format!("{} {}\n", "✓".green(), self.recipe.bold());

        out.push_str(&format!("\n{}\n", "Tasks:".bold()));
        if self.tasks.is_empty() {
            out.push_str("  (none)\n");
        }
        for task in &self.tasks {
            out.push_str(&format!("  {task}\n"));
        }

        out.push_str(&format!("\n{}\n", "Hooks:".bold()));
        for (hook, count) in &self.hooks {
            if *count == 0 {
                out.push_str(&format!("  {}\n", hook.dimmed()));
            } else {
                out.push_str(&format!("  {hook} ({count})\n"));
            }
        }

        out.push_str(&format!("\n{}\n", "Variables:".bold()));
        for (key, value) in &self.variables {
            out.push_str(&format!("  {key} = {}\n", value.inspect()));
        }
        out
    }
}

impl CheckCommand {
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let dsl = context.load_recipe(&self.recipe).await?;
        let summary = RecipeSummary::from_dsl(&self.recipe.display().to_string(), &dsl);

        match self.format {
            OutputFormat::Text => {
                if !context.quiet {
                    print!("{}", summary.render_text());
                }
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&summary)?),
        }
        Ok(())
    }
}
