//! Player identity resolver
//!
//! Resolves a provider snapshot into the canonical player table and answers
//! lookups against a published table.

use anyhow::{Context, Result};
use clap::Parser;
use player_identity::ResolvedPlayer;
use tracing::info;

use identity_resolver::runner::{run_crosswalk, run_init_config, run_lookup, run_resolve};
use identity_resolver::{initialize_logging, load_config, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config =
        load_config(cli.config.as_deref(), cli.log_level.as_deref(), cli.log_format.as_deref())
            .context("Failed to load configuration")?;
    initialize_logging(&config.logging)?;

    info!("Starting player identity resolver v{}", player_identity::VERSION);

    match cli.command {
        Commands::Resolve(args) => {
            run_resolve(&config, &args).await?;
        }
        Commands::Lookup { table, query } => {
            let players = run_lookup(&table, &query).await?;
            print_players(&players)?;
        }
        Commands::Crosswalk { table, from, to } => {
            for (source, target) in run_crosswalk(&table, &from, &to).await? {
                println!("{source}\t{target}");
            }
        }
        Commands::InitConfig { path } => {
            run_init_config(&path)?;
        }
    }

    Ok(())
}

fn print_players(players: &[ResolvedPlayer]) -> Result<()> {
    if players.is_empty() {
        println!("No players found");
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(players)?);
    Ok(())
}
