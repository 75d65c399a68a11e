//! Sleeper API roster fetch

use crate::config::SleeperConfig;
use anyhow::{Context, Result};
use player_identity::loader::parse_roster_value;
use player_identity::RosterCandidate;
use std::time::Duration;
use tracing::info;

/// Sleeper API client for the NFL player directory
#[derive(Debug)]
pub struct SleeperRosterClient {
    config: SleeperConfig,
    client: reqwest::Client,
}

impl SleeperRosterClient {
    /// Create a new Sleeper API client
    pub fn new(config: SleeperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    pub fn players_url(&self) -> String {
        format!("{}/players/nfl", self.config.api_base_url.trim_end_matches('/'))
    }

    /// Fetch every NFL player Sleeper knows about, sorted by player ID
    pub async fn fetch_roster(&self) -> Result<Vec<RosterCandidate>> {
        let url = self.players_url();
        info!("Fetching Sleeper roster from: {}", url);

        let response =
            self.client.get(&url).send().await.context("Failed to fetch Sleeper players")?;
        if !response.status().is_success() {
            anyhow::bail!("Sleeper players request failed with status: {}", response.status());
        }

        let body: serde_json::Value =
            response.json().await.context("Failed to parse Sleeper players JSON")?;
        let roster = parse_roster_value(&body).context("Unexpected Sleeper players payload")?;

        info!("Fetched {} roster candidates from Sleeper", roster.len());
        Ok(roster)
    }
}
