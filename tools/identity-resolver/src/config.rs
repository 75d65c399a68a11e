//! Tool configuration management

use anyhow::{Context, Result};
use player_identity::ResolverConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a run needs beyond the snapshot and roster inputs
#[derive(Debug, Clone, Default)]
pub struct ToolConfig {
    /// Pipeline configuration
    pub resolver: ResolverConfig,

    /// Sleeper API configuration
    pub sleeper: SleeperConfig,

    /// Database publishing configuration
    pub publish: PublishConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Sleeper API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleeperConfig {
    pub api_base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Database publishing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Postgres connection string
    pub database_url: Option<String>,

    /// Table replaced on every publish
    pub table: String,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty)
    pub format: String,
}

impl Default for SleeperConfig {
    fn default() -> Self {
        Self { api_base_url: "https://api.sleeper.app/v1".to_string(), timeout_secs: 30 }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self { database_url: None, table: "player_identity".to_string(), connect_timeout_secs: 10 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

/// Load configuration: resolver file (if any), then environment, then
/// command line overrides
pub fn load_config(
    resolver_file: Option<&Path>,
    log_level: Option<&str>,
    log_format: Option<&str>,
) -> Result<ToolConfig> {
    let mut config = ToolConfig::default();

    if let Some(path) = resolver_file {
        tracing::debug!("Loading resolver configuration from file: {:?}", path);
        config.resolver = ResolverConfig::from_file(path)
            .with_context(|| format!("Failed to load resolver configuration: {path:?}"))?;
    }

    load_from_env(&mut config);

    if let Some(level) = log_level {
        config.logging.level = level.to_string();
    }
    if let Some(format) = log_format {
        config.logging.format = format.to_string();
    }

    validate_config(&config)?;
    Ok(config)
}

/// Override with environment variables
fn load_from_env(config: &mut ToolConfig) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

/// Apply `RESOLVER_*` overrides from any variable source
pub fn apply_overrides<F>(config: &mut ToolConfig, var: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(level) = var("RESOLVER_LOG_LEVEL") {
        config.logging.level = level;
    }

    if let Some(format) = var("RESOLVER_LOG_FORMAT") {
        config.logging.format = format;
    }

    if let Some(url) = var("RESOLVER_SLEEPER_URL") {
        config.sleeper.api_base_url = url;
    }

    if let Some(timeout) = var("RESOLVER_SLEEPER_TIMEOUT_SECS") {
        config.sleeper.timeout_secs = timeout.parse().unwrap_or(30);
    }

    if let Some(url) = var("RESOLVER_DATABASE_URL").or_else(|| var("DATABASE_URL")) {
        config.publish.database_url = Some(url);
    }

    if let Some(table) = var("RESOLVER_TABLE") {
        config.publish.table = table;
    }
}

/// Validate configuration
pub fn validate_config(config: &ToolConfig) -> Result<()> {
    match config.logging.level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow::anyhow!("Invalid log level: {}", config.logging.level)),
    }

    match config.logging.format.as_str() {
        "json" | "pretty" => {}
        _ => return Err(anyhow::anyhow!("Invalid log format: {}", config.logging.format)),
    }

    let api_base_url = &config.sleeper.api_base_url;
    if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
        return Err(anyhow::anyhow!("Invalid Sleeper API URL: {}", api_base_url));
    }

    if config.sleeper.timeout_secs == 0 {
        return Err(anyhow::anyhow!("Sleeper timeout must be positive"));
    }

    if !is_valid_table_name(&config.publish.table) {
        return Err(anyhow::anyhow!("Invalid table name: {}", config.publish.table));
    }

    config.resolver.validate().context("Invalid resolver configuration")?;
    Ok(())
}

/// Plain lowercase SQL identifier; the name is interpolated into statements
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && name.len() <= 63
}
