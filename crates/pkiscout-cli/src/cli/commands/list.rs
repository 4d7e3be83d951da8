//! `pkiscout list` - Pair private keys with their public keys and certificates.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use pkiscout::{resolve_identities, summarize, CertificateSummary, ResolverOptions, ScanConfig};
use pkiscout_core::{Identity, MatchSource, ScanOutcome};

use super::Context;
use crate::cli::args::ListArgs;
use crate::output::{identity_algorithm, print_outcome_notice, OutputFormat};

#[derive(Tabled)]
struct IdentityRow {
    #[tabled(rename = "Fingerprint")]
    fingerprint: String,
    #[tabled(rename = "Algorithm")]
    algorithm: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Matched By")]
    matched_by: String,
    #[tabled(rename = "Certs")]
    certs: usize,
}

#[derive(Tabled)]
struct CertificateRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Not After")]
    not_after: String,
    #[tabled(rename = "Location")]
    location: String,
}

#[derive(Serialize)]
struct ListReport<'a> {
    outcome: ScanOutcome,
    count: usize,
    identities: Vec<IdentityEntry<'a>>,
}

#[derive(Serialize)]
struct IdentityEntry<'a> {
    #[serde(flatten)]
    identity: &'a Identity,
    #[serde(skip_serializing_if = "Option::is_none")]
    algorithm: Option<String>,
    certificate_details: Vec<CertificateSummary>,
}

pub async fn execute(ctx: Context, args: ListArgs) -> Result<()> {
    let roots = ctx.roots(&args.roots.roots)?;
    let config = ScanConfig::default()
        .walk(ctx.walk_options(&args.roots))
        .workers(ctx.workers(args.workers));
    let options = ResolverOptions::default()
        .emit_anonymous(!args.no_anonymous)
        .verbose(ctx.verbose);

    let resolution = resolve_identities(&ctx.cancel, &roots, config, options).await?;
    let mut identities = resolution.identities.into_vec();
    identities.sort_by(|a, b| a.key.location.cmp(&b.key.location));

    match ctx.output_format {
        OutputFormat::Json => {
            let report = ListReport {
                outcome: resolution.outcome,
                count: identities.len(),
                identities: identities
                    .iter()
                    .map(|identity| IdentityEntry {
                        identity,
                        algorithm: identity_algorithm(identity).map(|a| a.to_string()),
                        certificate_details: identity
                            .certificates
                            .iter()
                            .filter_map(|cert| summarize(cert).ok())
                            .collect(),
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Pretty => print_identities_pretty(&identities, args.certs),
    }

    print_outcome_notice(resolution.outcome);

    Ok(())
}

fn print_identities_pretty(identities: &[Identity], show_certs: bool) {
    if identities.is_empty() {
        println!("{}", "No identities found.".dimmed());
        return;
    }

    let rows: Vec<IdentityRow> = identities
        .iter()
        .map(|identity| IdentityRow {
            fingerprint: identity.fingerprint.short().to_string(),
            algorithm: identity_algorithm(identity)
                .map_or_else(|| "-".to_string(), |a| a.to_string()),
            key: identity.key.location.to_string(),
            matched_by: match_label(identity.matched_by).to_string(),
            certs: identity.certificates.len(),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");

    if show_certs {
        print_certificates(identities);
    }

    let anonymous = identities.iter().filter(|i| i.is_anonymous()).count();
    println!();
    println!(
        "{} {}  {} {}",
        "Identities:".bold(),
        identities.len().to_string().cyan(),
        "Unmatched:".bold(),
        if anonymous > 0 {
            anonymous.to_string().yellow()
        } else {
            anonymous.to_string().green()
        }
    );
}

fn print_certificates(identities: &[Identity]) {
    let rows: Vec<CertificateRow> = identities
        .iter()
        .flat_map(|identity| {
            identity.certificates.iter().map(move |cert| {
                let (subject, not_after) = summarize(cert).map_or_else(
                    |_| ("unparseable".to_string(), String::new()),
                    |s| {
                        let date = s.not_after.format("%Y-%m-%d").to_string();
                        if s.expired {
                            (s.subject, format!("{date} (expired)"))
                        } else {
                            (s.subject, date)
                        }
                    },
                );
                CertificateRow {
                    key: identity.fingerprint.short().to_string(),
                    subject,
                    not_after,
                    location: cert.location.to_string(),
                }
            })
        })
        .collect();

    if rows.is_empty() {
        return;
    }

    println!();
    println!("{}", "Certificates:".bold().underline());
    println!("{}", Table::new(&rows).with(Style::rounded()));
}

const fn match_label(source: MatchSource) -> &'static str {
    match source {
        MatchSource::Derived => "derived",
        MatchSource::LinkedKey => "linked key",
        MatchSource::LocationRoot => "location",
        MatchSource::Unmatched => "unmatched",
    }
}
