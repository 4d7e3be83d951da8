//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Find private keys, public keys, certificates and CRLs on disk,
/// and pair each private key with the certificates issued for it.
///
/// Roots come from the arguments, then PKISCOUT_PATH, then the
/// `roots` list in the configuration file.
#[derive(Parser, Debug)]
#[command(name = "pkiscout")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Report unreadable files and skipped entries
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Colon-separated search roots used when none are given
    #[arg(
        long,
        env = "PKISCOUT_PATH",
        global = true,
        value_delimiter = ':',
        hide_env_values = true
    )]
    pub search_path: Vec<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, env = "PKISCOUT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every key, certificate, request and CRL under the roots
    Scan(ScanArgs),

    /// Pair private keys with their public keys and certificates
    List(ListArgs),

    /// Print the first file whose path ends with NAME
    Find(FindArgs),

    /// Inspect CLI configuration
    Config(ConfigArgs),
}

// ============================================================================
// Shared root selection
// ============================================================================

#[derive(Args, Debug, Clone, Default)]
pub struct RootArgs {
    /// Files or directories to search
    pub roots: Vec<PathBuf>,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Follow symbolic links
    #[arg(long)]
    pub follow_links: bool,

    /// Only read files with these extensions (e.g., pem,crt,key)
    #[arg(short, long = "ext", value_delimiter = ',')]
    pub extensions: Vec<String>,
}

// ============================================================================
// Scan command
// ============================================================================

#[derive(Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub roots: RootArgs,

    /// Only keep resources with these tags (e.g., CERTIFICATE,"PRIVATE KEY")
    #[arg(short = 't', long = "type", value_delimiter = ',')]
    pub types: Vec<String>,

    /// Number of concurrent file readers
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,
}

// ============================================================================
// List command
// ============================================================================

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub roots: RootArgs,

    /// Number of concurrent file readers
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Hide private keys that matched no public key
    #[arg(long)]
    pub no_anonymous: bool,

    /// Show a line per certificate under each identity
    #[arg(long)]
    pub certs: bool,
}

// ============================================================================
// Find command
// ============================================================================

#[derive(Args, Debug)]
pub struct FindArgs {
    /// File name, or trailing path components, to look for
    pub name: String,

    #[command(flatten)]
    pub roots: RootArgs,
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Show config file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn scan_splits_lists() {
        let cli = Cli::try_parse_from([
            "pkiscout",
            "scan",
            "-r",
            "--ext",
            "pem,crt",
            "-t",
            "CERTIFICATE,PRIVATE KEY",
            "/etc/ssl",
            "/etc/pki",
        ])
        .unwrap();

        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert!(args.roots.recursive);
        assert_eq!(args.roots.roots.len(), 2);
        assert_eq!(args.roots.extensions, ["pem", "crt"]);
        assert_eq!(args.types, ["CERTIFICATE", "PRIVATE KEY"]);
        assert_eq!(args.workers, None);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["pkiscout", "list", "-o", "json", "--no-anonymous", "-v"])
            .unwrap();

        assert_eq!(cli.output, Some(OutputFormat::Json));
        assert!(cli.verbose);
        let Commands::List(args) = cli.command else {
            panic!("expected list");
        };
        assert!(args.no_anonymous);
        assert!(args.roots.roots.is_empty());
    }

    #[test]
    fn find_requires_a_name() {
        assert!(Cli::try_parse_from(["pkiscout", "find"]).is_err());
        let cli = Cli::try_parse_from(["pkiscout", "find", "tls/server.pem", "/srv"]).unwrap();
        let Commands::Find(args) = cli.command else {
            panic!("expected find");
        };
        assert_eq!(args.name, "tls/server.pem");
        assert_eq!(args.roots.roots, [PathBuf::from("/srv")]);
    }
}
