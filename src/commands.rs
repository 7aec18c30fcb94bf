// src/commands.rs
//! Command handlers for the fleetpack CLI

use anyhow::{Context, Result};
use fleetpack::db::{self, ListOptions};
use fleetpack::{Config, Service, SpecGroup};
use std::io::Read;
use std::path::Path;
use tracing::info;

use crate::cli::{GetCommands, OutputFormat, PageArgs};

impl From<&PageArgs> for ListOptions {
    fn from(args: &PageArgs) -> Self {
        ListOptions::page(args.page, args.per_page)
    }
}

/// Create the database file and migrate it
pub fn cmd_init(config: &Config) -> Result<()> {
    let db_path = config.db_path()?;
    info!("Initializing fleetpack database at: {}", db_path);
    db::init(db_path)?;
    println!("Database initialized successfully at: {}", db_path);
    Ok(())
}

/// Apply every spec in a YAML stream
pub fn cmd_apply(config: &Config, file: &Path) -> Result<()> {
    let input = if file == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read specs from stdin")?;
        buf
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read spec file: {}", file.display()))?
    };

    let group = SpecGroup::parse_yaml(&input)
        .with_context(|| format!("Failed to parse spec file: {}", file.display()))?;
    if group.is_empty() {
        println!("No specs found in {}", file.display());
        return Ok(());
    }

    let mut svc = Service::open(config)?;
    svc.apply_specs(&group)?;

    println!(
        "Applied {} queries, {} labels, {} packs",
        group.queries.len(),
        group.labels.len(),
        group.packs.len()
    );
    Ok(())
}

/// Print stored specs as a YAML stream or a JSON array
pub fn cmd_get(config: &Config, what: &GetCommands, output: OutputFormat) -> Result<()> {
    let mut svc = Service::open(config)?;

    let group = match what {
        GetCommands::Packs => SpecGroup {
            packs: svc.get_pack_specs()?,
            ..Default::default()
        },
        GetCommands::Queries => SpecGroup {
            queries: svc.get_query_specs()?,
            ..Default::default()
        },
        GetCommands::Labels => SpecGroup {
            labels: svc.get_label_specs()?,
            ..Default::default()
        },
        GetCommands::All => svc.get_specs()?,
    };

    match output {
        OutputFormat::Yaml => print!("{}", group.to_yaml()?),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&group.documents()?)?)
        }
    }
    Ok(())
}

pub fn cmd_delete_pack(config: &Config, name: &str) -> Result<()> {
    let svc = Service::open(config)?;
    let pack = svc.pack_by_name(name)?;
    svc.delete_pack(pack.id)?;
    println!("Deleted pack: {}", name);
    Ok(())
}

pub fn cmd_delete_label(config: &Config, name: &str) -> Result<()> {
    let svc = Service::open(config)?;
    svc.delete_label(name)?;
    println!("Deleted label: {}", name);
    Ok(())
}

pub fn cmd_delete_query(config: &Config, name: &str) -> Result<()> {
    let svc = Service::open(config)?;
    svc.delete_query(name)?;
    println!("Deleted query: {}", name);
    Ok(())
}

/// Disable or re-enable a pack by name
pub fn cmd_set_pack_disabled(config: &Config, name: &str, disabled: bool) -> Result<()> {
    let svc = Service::open(config)?;
    let pack = svc.pack_by_name(name)?;
    svc.set_pack_disabled(pack.id, disabled)?;
    println!(
        "{} pack: {}",
        if disabled { "Disabled" } else { "Enabled" },
        name
    );
    Ok(())
}

/// List the hosts a pack reaches; `explicit` skips label expansion
pub fn cmd_hosts_for_pack(
    config: &Config,
    name: &str,
    page: &PageArgs,
    explicit: bool,
) -> Result<()> {
    let svc = Service::open(config)?;
    let pack = svc.pack_by_name(name)?;
    let opts = ListOptions::from(page);

    let ids = if explicit {
        svc.explicit_hosts_for_pack(pack.id, &opts)?
    } else {
        svc.hosts_for_pack(pack.id, &opts)?
    };

    if ids.is_empty() {
        println!("Pack {} reaches no hosts.", name);
        return Ok(());
    }

    println!("Hosts for pack {} ({}):", name, ids.len());
    for id in ids {
        let host = svc.host(id)?;
        println!("  {:>6}  {}", id, host.hostname);
    }
    Ok(())
}

pub fn cmd_packs_for_host(config: &Config, hostname: &str) -> Result<()> {
    let svc = Service::open(config)?;
    let host = svc.host_by_hostname(hostname)?;
    let host_id = host
        .id
        .with_context(|| format!("Host {} has no id", hostname))?;

    let packs = svc.packs_for_host(host_id)?;
    if packs.is_empty() {
        println!("No packs apply to {}.", hostname);
    } else {
        println!("Packs for {} ({}):", hostname, packs.len());
        for pack in &packs {
            if pack.description.is_empty() {
                println!("  {}", pack.name);
            } else {
                println!("  {} - {}", pack.name, pack.description);
            }
        }
    }

    let results = svc.label_results_for_host(host_id)?;
    if !results.is_empty() {
        println!();
        println!("Label results for {}:", hostname);
        for result in &results {
            let evaluated = result
                .evaluated_at()
                .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| result.updated_at.clone());
            println!(
                "  [{}] {}  (evaluated {})",
                if result.matches { "x" } else { " " },
                result.label_name,
                evaluated
            );
        }
    }
    Ok(())
}

pub fn cmd_labels_for_pack(config: &Config, name: &str) -> Result<()> {
    let svc = Service::open(config)?;
    let pack = svc.pack_by_name(name)?;
    let labels = svc.labels_for_pack(pack.id)?;

    if labels.is_empty() {
        println!("Pack {} targets no labels.", name);
        return Ok(());
    }

    println!("Labels for pack {} ({}):", name, labels.len());
    for label in &labels {
        println!("  {}", label);
    }
    Ok(())
}
