//! `pkiscout find` - Print the first file matching a name.

use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use pkiscout::locate;
use pkiscout_core::ScanError;

use super::Context;
use crate::cli::args::FindArgs;
use crate::output::OutputFormat;

pub async fn execute(ctx: Context, args: FindArgs) -> Result<()> {
    let roots = ctx.roots(&args.roots.roots)?;
    let options = ctx.walk_options(&args.roots);

    let location = match locate(&ctx.cancel, &args.name, &roots, &options).await {
        Ok(location) => location,
        Err(ScanError::NotFound { target }) => {
            anyhow::bail!(
                "{target} not found under {} root(s).\n\n\
                 Try --recursive, or add roots with PKISCOUT_PATH.",
                roots.len()
            );
        }
        Err(err) => return Err(err.into()),
    };

    match ctx.output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "location": location }))?
            );
        }
        OutputFormat::Pretty => {
            if ctx.verbose {
                eprintln!("{} {}", "Found:".green().bold(), args.name.cyan());
            }
            println!("{}", location.path.display());
        }
    }

    Ok(())
}
