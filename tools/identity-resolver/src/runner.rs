//! Subcommand handlers

use anyhow::{Context, Result};
use player_identity::loader::{load_roster, load_snapshot};
use player_identity::{
    IdentityResolver, PlayerRegistry, ResolutionStats, ResolveError, ResolvedPlayer,
    RosterCandidate,
};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::cli::{LookupQuery, ResolveArgs};
use crate::config::ToolConfig;
use crate::publish;
use crate::sleeper::SleeperRosterClient;

/// Resolve a snapshot end to end: load, run every stage, gate, publish.
/// A failed gate writes the violations and publishes nothing.
pub async fn run_resolve(config: &ToolConfig, args: &ResolveArgs) -> Result<ResolutionStats> {
    let resolver = IdentityResolver::new(config.resolver.clone())
        .context("Invalid resolver configuration")?;

    let snapshot = load_snapshot(&args.snapshot, &config.resolver.providers)
        .await
        .with_context(|| format!("Failed to load snapshot: {:?}", args.snapshot))?;
    let roster = load_roster_feed(config, args).await?;

    let resolution = match resolver.resolve(snapshot, &roster) {
        Ok(resolution) => resolution,
        Err(ResolveError::Validation(report)) => {
            error!(
                "Quality gate rejected the table: {} violation(s), nothing published",
                report.violations.len()
            );
            publish::write_violations(&args.violations, &report).await?;
            anyhow::bail!(
                "Quality gate failed with {} violation(s); see {:?}",
                report.violations.len(),
                args.violations
            );
        }
        Err(e) => return Err(e).context("Resolution failed"),
    };

    let stats = resolution.stats.clone();
    log_stats(&stats);

    let players = &resolution.players;

    // The database goes first so a failed transaction leaves no table file
    if args.publish_db {
        let pool = publish::connect(&config.publish).await?;
        publish::replace_table(&pool, &config.publish.table, players).await?;
    }

    publish::write_table(&args.output, players).await?;

    let stats_path = args.stats.clone().unwrap_or_else(|| stats_path_for(&args.output));
    publish::write_stats(&stats_path, &stats).await?;

    info!("Resolved {} players", players.len());
    Ok(stats)
}

/// `resolved.json` -> `resolved_stats.json` in the same directory
fn stats_path_for(output: &Path) -> PathBuf {
    let stem = output.file_stem().and_then(|stem| stem.to_str()).unwrap_or("player_identity");
    output.with_file_name(format!("{stem}_stats.json"))
}

async fn load_roster_feed(config: &ToolConfig, args: &ResolveArgs) -> Result<Vec<RosterCandidate>> {
    if args.fetch_roster {
        let client = SleeperRosterClient::new(config.sleeper.clone())?;
        return client.fetch_roster().await.context("Failed to fetch roster from Sleeper");
    }

    match &args.roster {
        Some(path) => {
            load_roster(path).await.with_context(|| format!("Failed to load roster: {path:?}"))
        }
        None => {
            warn!("No roster given; duplicates cannot be verified and nothing will be recovered");
            Ok(Vec::new())
        }
    }
}

fn log_stats(stats: &ResolutionStats) {
    info!(
        "Rows loaded: {}, placeholders dropped: {}, records resolved: {}",
        stats.rows_loaded, stats.placeholders_dropped, stats.records_resolved
    );
    for outcome in &stats.dedup {
        info!(
            "{}: {} contested groups, {} cleared ({} contradicted the roster birthdate)",
            outcome.provider, outcome.contested_groups, outcome.cleared, outcome.cleared_mismatched
        );
    }
    info!(
        "Fallback: {} added, {} corrected, {} collisions reverted, {} still without a platform ID",
        stats.fallback.added,
        stats.fallback.corrected,
        stats.fallback.collisions_reverted,
        stats.fallback.unresolved
    );
}

async fn load_registry(table: &Path) -> Result<PlayerRegistry> {
    let mut registry = PlayerRegistry::new();
    registry
        .load_from_file(table)
        .await
        .with_context(|| format!("Failed to load published table: {table:?}"))?;
    Ok(registry)
}

/// Answer a lookup query against a published table
pub async fn run_lookup(table: &Path, query: &LookupQuery) -> Result<Vec<ResolvedPlayer>> {
    let registry = load_registry(table).await?;

    let found: Vec<ResolvedPlayer> = match query {
        LookupQuery::Id { canonical_id } => {
            vec![registry.get_by_canonical_id(*canonical_id)?.clone()]
        }
        LookupQuery::Provider { provider, value } => {
            vec![registry.get_by_provider_id(provider, value)?.clone()]
        }
        LookupQuery::Name { name } => registry.get_by_name(name)?.into_iter().cloned().collect(),
        LookupQuery::Search { query } => {
            registry.search_players(query).into_iter().cloned().collect()
        }
    };

    Ok(found)
}

/// Mapping between two provider columns of a published table
pub async fn run_crosswalk(table: &Path, from: &str, to: &str) -> Result<Vec<(String, String)>> {
    let registry = load_registry(table).await?;
    Ok(registry.crosswalk(from, to))
}

/// Write the default resolver configuration
pub fn run_init_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("Refusing to overwrite existing file: {:?}", path);
    }

    player_identity::ResolverConfig::default()
        .to_file(path)
        .with_context(|| format!("Failed to write configuration: {path:?}"))?;
    info!("Wrote default resolver configuration to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = "mfl_id,sleeper_id,gsis_id,name,position,team,birthdate,draft_year\n\
        13589,4984,00-0034857,Josh Allen,QB,BUF,1996-05-21,2018\n\
        13590,4984,,Josh Allen,LB,JAX,1997-02-13,2019\n\
        501,,,Buffalo Bills,DEF,BUF,,\n\
        16000,,00-0039999,John Smith,DL,FA,2000-01-01,2023\n";

    const ROSTER: &str = r#"{
        "4984": {"player_id": "4984", "full_name": "Josh Allen", "position": "QB",
                 "birth_date": "1996-05-21"},
        "9100": {"player_id": "9100", "first_name": "John", "last_name": "Smith", "position": "DE",
                 "birth_date": "2000-01-01"}
    }"#;

    fn args(dir: &Path) -> ResolveArgs {
        ResolveArgs {
            snapshot: dir.join("snapshot.csv"),
            roster: Some(dir.join("roster.json")),
            fetch_roster: false,
            output: dir.join("resolved.json"),
            violations: dir.join("violations.json"),
            stats: Some(dir.join("stats.json")),
            publish_db: false,
        }
    }

    #[tokio::test]
    async fn test_resolve_then_query() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("snapshot.csv"), SNAPSHOT).unwrap();
        std::fs::write(dir.path().join("roster.json"), ROSTER).unwrap();
        let args = args(dir.path());

        let stats = run_resolve(&ToolConfig::default(), &args).await.unwrap();
        assert_eq!(stats.rows_loaded, 4);
        assert_eq!(stats.placeholders_dropped, 1);
        assert_eq!(stats.fallback.added, 1);
        assert!(args.stats.as_ref().unwrap().exists());
        assert!(!args.violations.exists());

        let allen = run_lookup(
            &args.output,
            &LookupQuery::Provider { provider: "sleeper_id".into(), value: "4984".into() },
        )
        .await
        .unwrap();
        assert_eq!(allen.len(), 1);
        assert_eq!(allen[0].team, "BUF");
        assert_eq!(allen[0].correction_status.to_string(), "kept_sleeper_verified");

        let smith = run_lookup(&args.output, &LookupQuery::Name { name: "john smith".into() })
            .await
            .unwrap();
        assert_eq!(smith[0].correction_status.to_string(), "added_sleeper_id");

        let pairs = run_crosswalk(&args.output, "sleeper_id", "mfl_id").await.unwrap();
        assert_eq!(
            pairs,
            vec![
                ("4984".to_string(), "13589".to_string()),
                ("9100".to_string(), "16000".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_gate_publishes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        // A sentinel the snapshot carries without any correction status
        std::fs::write(
            dir.path().join("snapshot.csv"),
            "mfl_id,sleeper_id,espn_id,name\n1,DUPLICATE_CLEARED,77,Stale Row\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("roster.json"), "[]").unwrap();
        let args = args(dir.path());

        let result = run_resolve(&ToolConfig::default(), &args).await;
        assert!(result.is_err());
        assert!(!args.output.exists());
        assert!(args.violations.exists());

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&args.violations).unwrap()).unwrap();
        assert_eq!(written["violations"][0]["kind"], "sentinel_mismatch");
    }

    #[tokio::test]
    async fn test_failed_publish_writes_no_table() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("snapshot.csv"), SNAPSHOT).unwrap();
        std::fs::write(dir.path().join("roster.json"), ROSTER).unwrap();
        let args = ResolveArgs { publish_db: true, ..args(dir.path()) };

        // No database URL configured, so publishing fails before any file is written
        let result = run_resolve(&ToolConfig::default(), &args).await;
        assert!(result.is_err());
        assert!(!args.output.exists());
        assert!(!args.stats.as_ref().unwrap().exists());
    }

    #[test]
    fn test_stats_written_next_to_output() {
        assert_eq!(
            stats_path_for(Path::new("out/resolved.json")),
            PathBuf::from("out/resolved_stats.json")
        );
    }

    #[test]
    fn test_init_config_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("resolver.toml");

        run_init_config(&path).unwrap();
        let loaded = player_identity::ResolverConfig::from_file(&path).unwrap();
        assert_eq!(loaded, player_identity::ResolverConfig::default());
        assert!(run_init_config(&path).is_err());
    }
}
