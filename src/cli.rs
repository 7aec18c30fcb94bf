// src/cli.rs
//! CLI definitions for fleetpack
//!
//! The command implementations live in the `commands` module.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fleetpack")]
#[command(author, version, about = "Declarative query packs for a host fleet", long_about = None)]
pub struct Cli {
    /// Config file (default: /etc/fleetpack/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database path, overriding the config file and FLEETPACK_DB
    #[arg(short, long, global = true)]
    pub db_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and bring its schema up to date
    Init,

    /// Apply a YAML stream of query, label and pack specs in one transaction
    Apply {
        /// Spec file, or '-' for stdin
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print stored specs
    Get {
        #[command(subcommand)]
        what: GetCommands,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,
    },

    /// Soft-delete a pack; re-applying its spec brings it back
    DeletePack {
        name: String,
    },

    /// Soft-delete a label; packs stop targeting it until it is re-applied
    DeleteLabel {
        name: String,
    },

    /// Delete a query along with every pack entry that schedules it
    DeleteQuery {
        name: String,
    },

    /// Stop delivering a pack without changing its spec
    DisablePack {
        name: String,
    },

    /// Resume delivering a disabled pack
    EnablePack {
        name: String,
    },

    /// Hosts that receive a pack through host or label targets
    HostsForPack {
        name: String,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Hosts a pack targets by hostname, without label expansion
    ExplicitHosts {
        name: String,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Packs delivered to a host
    PacksForHost {
        hostname: String,
    },

    /// Live labels a pack targets
    LabelsForPack {
        name: String,
    },
}

#[derive(Subcommand)]
pub enum GetCommands {
    /// Every live pack
    Packs,
    /// Every query
    Queries,
    /// Every live label
    Labels,
    /// Queries, labels and packs as one stream
    All,
}

/// How `get` renders spec documents
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// A `---`-separated stream that `apply` accepts
    Yaml,
    /// A JSON array of documents
    Json,
}

#[derive(Args)]
pub struct PageArgs {
    /// Zero-based page number
    #[arg(long, default_value_t = 0)]
    pub page: u32,

    /// Rows per page (0 = everything)
    #[arg(long, default_value_t = 0)]
    pub per_page: u32,
}
