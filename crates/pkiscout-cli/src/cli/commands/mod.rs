//! Command implementations.

pub mod config;
pub mod find;
pub mod list;
pub mod scan;

use std::path::PathBuf;

use pkiscout::{Cancellation, WalkOptions, DEFAULT_WORKERS};

use super::args::RootArgs;
use crate::config::Config;
use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output format
    pub output_format: OutputFormat,

    /// Verbose output
    pub verbose: bool,

    /// Disable colors
    pub no_color: bool,

    /// Roots from `--search-path` / `PKISCOUT_PATH`
    pub search_path: Vec<PathBuf>,

    /// Loaded configuration
    pub config: Config,

    /// Raised on Ctrl-C
    pub cancel: Cancellation,
}

impl Context {
    /// Roots to search: explicit arguments, then the search path, then config.
    pub fn roots(&self, explicit: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
        let roots = [explicit, self.search_path.as_slice(), self.config.roots.as_slice()]
            .into_iter()
            .find(|candidates| !candidates.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No search roots.\n\n\
                     Give them with one of:\n  \
                     1. pkiscout <command> <PATH>...\n  \
                     2. PKISCOUT_PATH=/etc/ssl:/etc/pki\n  \
                     3. roots = [...] in the configuration file"
                )
            })?;

        Ok(roots.to_vec())
    }

    /// Walk options from the flags, falling back to config.
    pub fn walk_options(&self, args: &RootArgs) -> WalkOptions {
        let extensions = if args.extensions.is_empty() {
            &self.config.extensions
        } else {
            &args.extensions
        };

        let options = WalkOptions::default()
            .recursive(args.recursive || self.config.recursive)
            .follow_links(args.follow_links || self.config.follow_links)
            .verbose(self.verbose);

        if extensions.is_empty() {
            options
        } else {
            options.extensions(extensions)
        }
    }

    /// Worker count from the flag, then config, then the engine default.
    pub fn workers(&self, flag: Option<usize>) -> usize {
        flag.or(self.config.workers).unwrap_or(DEFAULT_WORKERS)
    }
}
