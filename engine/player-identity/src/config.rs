//! Configuration for the identity resolver

use crate::error::{ResolveError, Result};
use crate::types::{IdKind, ProviderSchema, ProviderSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Configuration for one resolution run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Primary join key; rows with nothing beyond it are placeholders
    pub base_key: String,

    /// Fantasy-platform column checked against the roster and recovered by
    /// fallback matching
    pub platform_key: String,

    /// Columns to deduplicate, in dependency order
    pub dedup_order: Vec<String>,

    /// Provider identifier columns, in output order
    pub providers: ProviderSchema,

    /// Fallback matcher scoring
    pub matching: MatchingConfig,
}

/// Scoring weights for the fallback matcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Awarded for a raw or normalized name match (required)
    pub name_points: u32,

    /// Awarded for an identical position code
    pub exact_position_points: u32,

    /// Awarded for a position in the same family
    pub family_position_points: u32,

    /// Awarded when both birthdates are present and equal
    pub birthdate_points: u32,

    /// Lowest admissible total
    pub min_score: u32,

    /// Roster entries whose name contains any of these are never candidates
    pub placeholder_markers: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let numeric = [
            "mfl_id",
            "fantasypros_id",
            "pff_id",
            "nfl_id",
            "espn_id",
            "yahoo_id",
            "fleaflicker_id",
            "cbs_id",
            "rotowire_id",
            "rotoworld_id",
            "ktc_id",
            "stats_id",
            "stats_global_id",
            "fantasy_data_id",
        ];
        let columns = [
            "mfl_id",
            "sportradar_id",
            "fantasypros_id",
            "gsis_id",
            "pff_id",
            "sleeper_id",
            "nfl_id",
            "espn_id",
            "yahoo_id",
            "fleaflicker_id",
            "cbs_id",
            "pfr_id",
            "cfbref_id",
            "rotowire_id",
            "rotoworld_id",
            "ktc_id",
            "stats_id",
            "stats_global_id",
            "fantasy_data_id",
            "swish_id",
        ];
        let providers = columns
            .iter()
            .map(|name| {
                let kind = if numeric.contains(name) { IdKind::Numeric } else { IdKind::Text };
                ProviderSpec::new(*name, kind)
            })
            .collect();

        Self {
            base_key: "mfl_id".to_string(),
            platform_key: "sleeper_id".to_string(),
            dedup_order: vec![
                "sleeper_id".to_string(),
                "gsis_id".to_string(),
                "mfl_id".to_string(),
            ],
            providers: ProviderSchema::new(providers),
            matching: MatchingConfig::default(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            name_points: 100,
            exact_position_points: 10,
            family_position_points: 5,
            birthdate_points: 20,
            min_score: 105,
            placeholder_markers: vec!["Invalid".to_string(), "Duplicate".to_string()],
        }
    }
}

impl ResolverConfig {
    /// Column definition of the platform key
    pub fn platform(&self) -> Result<&ProviderSpec> {
        self.providers
            .get(&self.platform_key)
            .ok_or_else(|| ResolveError::UnknownProvider(self.platform_key.clone()))
    }

    /// Check that every referenced column exists and the weights are usable
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(ResolveError::config("at least one provider column is required"));
        }

        let mut seen = HashSet::new();
        for spec in self.providers.iter() {
            if spec.name.trim().is_empty() {
                return Err(ResolveError::config("provider column names must not be empty"));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(ResolveError::config(format!(
                    "duplicate provider column: {}",
                    spec.name
                )));
            }
        }

        for key in [&self.base_key, &self.platform_key] {
            if !self.providers.contains(key) {
                return Err(ResolveError::UnknownProvider(key.clone()));
            }
        }

        let mut dedup_seen = HashSet::new();
        for key in &self.dedup_order {
            if !self.providers.contains(key) {
                return Err(ResolveError::UnknownProvider(key.clone()));
            }
            if !dedup_seen.insert(key.as_str()) {
                return Err(ResolveError::config(format!("column deduplicated twice: {key}")));
            }
        }
        if !dedup_seen.contains(self.platform_key.as_str()) {
            return Err(ResolveError::config(format!(
                "platform column {} must be part of dedup_order",
                self.platform_key
            )));
        }

        let matching = &self.matching;
        if matching.min_score < matching.name_points {
            return Err(ResolveError::config(format!(
                "min_score {} is below name_points {}; a name match is mandatory",
                matching.min_score, matching.name_points
            )));
        }
        if matching.family_position_points > matching.exact_position_points {
            return Err(ResolveError::config(
                "family_position_points must not exceed exact_position_points",
            ));
        }

        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ResolverConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
