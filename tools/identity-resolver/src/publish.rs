//! Publishing the resolved table and run reports

use anyhow::{Context, Result};
use player_identity::projection::write_json;
use player_identity::{ResolutionStats, ResolvedPlayer, ValidationReport};
use serde::Serialize;
use sqlx::PgPool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::{is_valid_table_name, PublishConfig};

/// Write the resolved table as pretty JSON
pub async fn write_table(path: &Path, players: &[ResolvedPlayer]) -> Result<()> {
    write_json(path, players)
        .await
        .with_context(|| format!("Failed to write resolved table: {path:?}"))
}

/// Write run statistics as pretty JSON
pub async fn write_stats(path: &Path, stats: &ResolutionStats) -> Result<()> {
    write_pretty(path, stats)
        .await
        .with_context(|| format!("Failed to write run statistics: {path:?}"))
}

/// Write every violation of a failed quality gate
pub async fn write_violations(path: &Path, report: &ValidationReport) -> Result<()> {
    write_pretty(path, report)
        .await
        .with_context(|| format!("Failed to write violations: {path:?}"))?;
    info!("Wrote {} violations to {:?}", report.violations.len(), path);
    Ok(())
}

async fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, content).await?;
    Ok(())
}

/// Connect to Postgres with the configured timeout
pub async fn connect(config: &PublishConfig) -> Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("No database URL configured; set RESOLVER_DATABASE_URL or DATABASE_URL")?;

    let timeout_secs = config.connect_timeout_secs;
    let connecting = PgPool::connect(database_url);
    let pool = tokio::time::timeout(Duration::from_secs(timeout_secs), connecting)
        .await
        .with_context(|| format!("Database connection timed out after {timeout_secs} seconds"))?
        .context("Failed to connect to database")?;

    Ok(pool)
}

/// Replace the identity table in one transaction. Nothing is visible to
/// readers until every row has been written.
pub async fn replace_table(pool: &PgPool, table: &str, players: &[ResolvedPlayer]) -> Result<u64> {
    if !is_valid_table_name(table) {
        anyhow::bail!("Invalid table name: {}", table);
    }

    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    sqlx::query(&create_table_sql(table))
        .execute(&mut *tx)
        .await
        .context("Failed to create table")?;
    sqlx::query(&format!("DELETE FROM {table}"))
        .execute(&mut *tx)
        .await
        .context("Failed to clear existing rows")?;

    let insert = insert_sql(table);
    for player in players {
        let provider_ids = serde_json::to_value(&player.provider_ids)?;
        let correction_history = serde_json::to_value(&player.correction_history)?;
        sqlx::query(&insert)
            .bind(player.canonical_id as i32)
            .bind(provider_ids)
            .bind(&player.name)
            .bind(&player.normalized_name)
            .bind(&player.name_last_first)
            .bind(&player.position)
            .bind(&player.team)
            .bind(player.birthdate)
            .bind(player.draft_year)
            .bind(player.correction_status.to_string())
            .bind(correction_history)
            .execute(&mut *tx)
            .await
            .with_context(|| {
                format!("Failed to insert player {} ({})", player.canonical_id, player.name)
            })?;
    }

    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&mut *tx)
        .await
        .context("Failed to count published rows")?;
    if count != players.len() as i64 {
        anyhow::bail!("Published {} rows but expected {}; rolling back", count, players.len());
    }

    tx.commit().await.context("Failed to commit publish transaction")?;
    info!("Published {} players to {}", count, table);
    Ok(count as u64)
}

fn create_table_sql(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            canonical_id INTEGER PRIMARY KEY,
            provider_ids JSONB NOT NULL,
            name TEXT NOT NULL,
            normalized_name TEXT NOT NULL,
            name_last_first TEXT NOT NULL,
            position TEXT NOT NULL,
            team TEXT NOT NULL,
            birthdate DATE,
            draft_year INTEGER,
            correction_status TEXT NOT NULL,
            correction_history JSONB NOT NULL
        )
        "#
    )
}

fn insert_sql(table: &str) -> String {
    format!(
        r#"
        INSERT INTO {table}
        (canonical_id, provider_ids, name, normalized_name, name_last_first, position, team,
         birthdate, draft_year, correction_status, correction_history)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#
    )
}
