//! # Command Line Interface
//!
//! Resolve a snapshot into the canonical player table, or query a table that
//! was already published.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Player identity resolver
#[derive(Parser, Debug)]
#[command(name = "resolve-players")]
#[command(about = "Reconcile provider IDs into one canonical player table", version)]
pub struct Cli {
    /// Resolver configuration (TOML); defaults are used when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the resolution pipeline and publish the result
    Resolve(ResolveArgs),

    /// Look up players in a published table
    Lookup {
        /// Published table (JSON)
        #[arg(short, long, default_value = "player_identity.json")]
        table: PathBuf,

        #[command(subcommand)]
        query: LookupQuery,
    },

    /// Print the mapping from one provider's IDs to another's
    Crosswalk {
        /// Published table (JSON)
        #[arg(short, long, default_value = "player_identity.json")]
        table: PathBuf,

        /// Source provider column
        from: String,

        /// Target provider column
        to: String,
    },

    /// Write the default resolver configuration
    InitConfig {
        /// Destination file
        #[arg(default_value = "resolver.toml")]
        path: PathBuf,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Provider snapshot (JSON array or CSV)
    #[arg(short, long)]
    pub snapshot: PathBuf,

    /// Platform roster file; ignored with --fetch-roster
    #[arg(short, long)]
    pub roster: Option<PathBuf>,

    /// Download the roster from the Sleeper API
    #[arg(long)]
    pub fetch_roster: bool,

    /// Resolved table output
    #[arg(short, long, default_value = "player_identity.json")]
    pub output: PathBuf,

    /// Where violation rows are written when the quality gate fails
    #[arg(long, default_value = "player_identity_violations.json")]
    pub violations: PathBuf,

    /// Run statistics output; defaults to `<output stem>_stats.json`
    #[arg(long)]
    pub stats: Option<PathBuf>,

    /// Also replace the Postgres table
    #[arg(long)]
    pub publish_db: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum LookupQuery {
    /// By canonical ID
    Id { canonical_id: u32 },

    /// By provider column and value
    Provider { provider: String, value: String },

    /// By exact (normalized) name
    Name { name: String },

    /// By partial name
    Search { query: String },
}
