//! Output formatting.

use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use pkiscout::{algorithm_of, public_key_der, summarize, KeyAlgorithm};
use pkiscout_core::{Identity, Resource, ResourceKind, ScanOutcome};

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed tables with colors
    #[default]
    Pretty,
    /// JSON output
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "table" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!(
                "Unknown output format: {s}\n\
                 Valid formats: pretty, json"
            ),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Public-key algorithm of a resource, when it has a readable public key.
pub fn resource_algorithm(resource: &Resource) -> Option<KeyAlgorithm> {
    public_key_der(resource)
        .ok()
        .and_then(|spki| algorithm_of(&spki))
}

/// Public-key algorithm of an identity, from whichever part carries it.
pub fn identity_algorithm(identity: &Identity) -> Option<KeyAlgorithm> {
    std::iter::once(&identity.key)
        .chain(identity.public_key.as_ref())
        .chain(identity.certificates.iter())
        .find_map(resource_algorithm)
}

/// One-line description for the "Detail" column.
pub fn describe(resource: &Resource) -> String {
    match resource.kind {
        ResourceKind::Certificate => summarize(resource).map_or_else(
            |_| "unparseable".to_string(),
            |s| {
                if s.expired {
                    format!("{} (expired)", s.subject)
                } else {
                    s.subject
                }
            },
        ),
        ResourceKind::PrivateKey if resource.is_encrypted() => "encrypted".to_string(),
        _ => resource_algorithm(resource).map_or_else(String::new, |a| a.to_string()),
    }
}

/// Tell the user a scan was interrupted.
pub fn print_outcome_notice(outcome: ScanOutcome) {
    if !outcome.is_complete() {
        eprintln!(
            "{} scan interrupted, results are partial",
            "Warning:".yellow().bold()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_parsing() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("TABLE".parse::<OutputFormat>().unwrap(), OutputFormat::Pretty);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn output_format_display_round_trips() {
        for format in [OutputFormat::Pretty, OutputFormat::Json] {
            assert_eq!(format.to_string().parse::<OutputFormat>().unwrap(), format);
        }
    }
}
