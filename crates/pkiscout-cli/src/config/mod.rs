//! Configuration file.
//!
//! The file is read, never written: pkiscout does not persist anything.

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Roots scanned when none are given and `PKISCOUT_PATH` is unset.
    pub roots: Vec<PathBuf>,

    /// Descend into subdirectories by default.
    pub recursive: bool,

    /// Follow symbolic links by default.
    pub follow_links: bool,

    /// Only read files with these extensions.
    pub extensions: Vec<String>,

    /// Number of concurrent reader tasks.
    pub workers: Option<usize>,

    /// Default output format.
    pub output_format: Option<OutputFormat>,
}

impl Config {
    /// Get the config file path.
    pub fn path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("org", "pkiscout", "pkiscout")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load the default config file, or defaults if there is none.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load a specific config file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn full_file() {
        let config: Config = toml::from_str(
            r#"
            roots = ["/etc/ssl", "~/.pki"]
            recursive = true
            extensions = ["pem", "crt"]
            workers = 4
            output_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.roots.len(), 2);
        assert!(config.recursive);
        assert!(!config.follow_links);
        assert_eq!(config.workers, Some(4));
        assert_eq!(config.output_format, Some(OutputFormat::Json));
    }

    #[test]
    fn load_from_reports_bad_files() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "recursive = \"very\"").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
        assert!(Config::load_from(&tmp.path().join("missing.toml")).is_err());
    }
}
