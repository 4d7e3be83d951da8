//! `pkiscout config` - Inspect CLI configuration.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::config::Config;
use crate::output::OutputFormat;

pub fn execute(ctx: Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(&ctx),
        ConfigCommands::Path => show_path(),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    match ctx.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Pretty => {
            println!("{}", "Current Configuration:".bold());
            println!();

            let roots = if config.roots.is_empty() {
                "(not set)".dimmed().to_string()
            } else {
                config
                    .roots
                    .iter()
                    .map(|r| r.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            println!("  {} {}", "roots:".bold(), roots);

            let extensions = if config.extensions.is_empty() {
                "(all)".dimmed().to_string()
            } else {
                config.extensions.join(", ")
            };
            println!("  {} {}", "extensions:".bold(), extensions);

            println!("  {} {}", "recursive:".bold(), config.recursive);
            println!("  {} {}", "follow_links:".bold(), config.follow_links);
            println!(
                "  {} {}",
                "workers:".bold(),
                config
                    .workers
                    .map_or_else(|| "(default)".dimmed().to_string(), |w| w.to_string())
            );
            println!(
                "  {} {}",
                "output_format:".bold(),
                config.output_format.unwrap_or_default()
            );

            if !ctx.search_path.is_empty() {
                println!();
                println!(
                    "  {} {} root(s) from PKISCOUT_PATH take precedence",
                    "note:".yellow().bold(),
                    ctx.search_path.len()
                );
            }
        }
    }

    Ok(())
}

fn show_path() -> Result<()> {
    let path = Config::path()?;
    println!("{}", path.display());
    Ok(())
}
