//! `pkiscout scan` - List every resource under the roots.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use pkiscout::{ScanConfig, ScanPipeline};
use pkiscout_core::{Resource, ScanOutcome};

use super::Context;
use crate::cli::args::ScanArgs;
use crate::output::{describe, print_outcome_notice, resource_algorithm, OutputFormat};

#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Tag")]
    tag: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

#[derive(Serialize)]
struct ScanReport<'a> {
    outcome: ScanOutcome,
    count: usize,
    resources: Vec<ResourceEntry<'a>>,
}

#[derive(Serialize)]
struct ResourceEntry<'a> {
    #[serde(flatten)]
    resource: &'a Resource,
    #[serde(skip_serializing_if = "Option::is_none")]
    algorithm: Option<String>,
    encrypted: bool,
}

pub async fn execute(ctx: Context, args: ScanArgs) -> Result<()> {
    let roots = ctx.roots(&args.roots.roots)?;
    let config = ScanConfig::default()
        .walk(ctx.walk_options(&args.roots))
        .workers(ctx.workers(args.workers))
        .type_filter(args.types.iter().map(|t| t.trim().to_uppercase()));

    let scan = ScanPipeline::new(config).scan(&ctx.cancel, &roots)?;
    let (mut resources, outcome) = scan.collect_all().await?;
    resources.sort_by(|a, b| a.location.cmp(&b.location));

    match ctx.output_format {
        OutputFormat::Json => {
            let report = ScanReport {
                outcome,
                count: resources.len(),
                resources: resources
                    .iter()
                    .map(|resource| ResourceEntry {
                        resource,
                        algorithm: resource_algorithm(resource).map(|a| a.to_string()),
                        encrypted: resource.is_encrypted(),
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Pretty => print_resources_pretty(&resources),
    }

    print_outcome_notice(outcome);

    Ok(())
}

fn print_resources_pretty(resources: &[Resource]) {
    if resources.is_empty() {
        println!("{}", "No resources found.".dimmed());
        return;
    }

    let rows: Vec<ResourceRow> = resources
        .iter()
        .map(|resource| ResourceRow {
            kind: resource.kind.to_string(),
            tag: resource.tag.clone(),
            location: resource.location.to_string(),
            detail: describe(resource),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!();
    println!("{} {}", "Resources:".bold(), resources.len().to_string().cyan());
}
