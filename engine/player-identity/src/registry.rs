use crate::error::{ResolveError, Result};
use crate::normalize::normalize_name;
use crate::projection::ResolvedPlayer;
use crate::types::{NUMERIC_SENTINEL, TEXT_SENTINEL};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use tracing::info;

/// Errors for registry lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// No player with this name
    PlayerNotFound(String),

    /// No player with this canonical ID
    InvalidCanonicalId(u32),

    /// No player holds this provider value
    UnknownProviderId { provider: String, value: String },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::PlayerNotFound(name) => {
                write!(f, "Player '{name}' not found in registry")
            }
            LookupError::InvalidCanonicalId(id) => {
                write!(f, "Invalid canonical ID: {id}")
            }
            LookupError::UnknownProviderId { provider, value } => {
                write!(f, "No player holds {provider} {value}")
            }
        }
    }
}

impl std::error::Error for LookupError {}

type LookupResult<T> = std::result::Result<T, LookupError>;

/// Player Registry - lookups over a resolved player table
///
/// Built from published rows. Every index is one-to-one, so a provider value
/// or canonical ID always leads to exactly one player.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    /// Map from canonical ID to player
    players_by_id: BTreeMap<u32, ResolvedPlayer>,

    /// Map from (provider column, value text) to canonical ID
    ids_by_provider: HashMap<(String, String), u32>,

    /// Map from normalized name to canonical IDs
    ids_by_name: HashMap<String, Vec<u32>>,
}

impl PlayerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry, rejecting any row that would make a lookup ambiguous
    pub fn from_players(players: Vec<ResolvedPlayer>) -> Result<Self> {
        let mut registry = Self::new();
        registry.create_mappings(players)?;
        Ok(registry)
    }

    /// Load published rows from a JSON file
    pub async fn load_from_file<P: AsRef<Path>>(&mut self, file_path: P) -> Result<()> {
        info!("Loading resolved players from: {:?}", file_path.as_ref());

        let json_content = tokio::fs::read_to_string(&file_path).await?;
        let players: Vec<ResolvedPlayer> = serde_json::from_str(&json_content)?;
        info!("Loaded {} players from file", players.len());

        self.create_mappings(players)?;
        info!("Indexed {} players", self.player_count());
        Ok(())
    }

    fn create_mappings(&mut self, players: Vec<ResolvedPlayer>) -> Result<()> {
        self.players_by_id.clear();
        self.ids_by_provider.clear();
        self.ids_by_name.clear();

        for player in players {
            let id = player.canonical_id;
            if self.players_by_id.contains_key(&id) {
                return Err(ResolveError::RegistryConflict(format!(
                    "canonical ID {id} appears twice"
                )));
            }

            for (provider, value) in &player.provider_ids {
                let Some(text) = key_text(value) else {
                    continue;
                };
                let key = (provider.clone(), text);
                if let Some(other) = self.ids_by_provider.insert(key.clone(), id) {
                    return Err(ResolveError::RegistryConflict(format!(
                        "{} {} held by canonical IDs {} and {}",
                        key.0, key.1, other, id
                    )));
                }
            }

            self.ids_by_name.entry(normalize_name(&player.name)).or_default().push(id);
            self.players_by_id.insert(id, player);
        }

        Ok(())
    }

    /// Get a player by canonical ID
    pub fn get_by_canonical_id(&self, canonical_id: u32) -> LookupResult<&ResolvedPlayer> {
        self.players_by_id.get(&canonical_id).ok_or(LookupError::InvalidCanonicalId(canonical_id))
    }

    /// Get the player holding a provider value
    pub fn get_by_provider_id(&self, provider: &str, value: &str) -> LookupResult<&ResolvedPlayer> {
        let key = (provider.to_string(), value.trim().to_string());
        let id = self.ids_by_provider.get(&key).ok_or_else(|| LookupError::UnknownProviderId {
            provider: provider.to_string(),
            value: value.to_string(),
        })?;

        self.get_by_canonical_id(*id)
    }

    /// Get every player with this name, compared after normalization
    pub fn get_by_name(&self, name: &str) -> LookupResult<Vec<&ResolvedPlayer>> {
        let ids = self
            .ids_by_name
            .get(&normalize_name(name))
            .ok_or_else(|| LookupError::PlayerNotFound(name.to_string()))?;

        ids.iter().map(|id| self.get_by_canonical_id(*id)).collect()
    }

    /// Search for players by partial name match
    pub fn search_players(&self, query: &str) -> Vec<&ResolvedPlayer> {
        let query_lower = query.to_lowercase();
        self.players_by_id
            .values()
            .filter(|player| player.name.to_lowercase().contains(&query_lower))
            .collect()
    }

    /// Pairs of (from value, to value) for every player holding real IDs in
    /// both columns, sorted by the first
    pub fn crosswalk(&self, from: &str, to: &str) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .players_by_id
            .values()
            .filter_map(|player| {
                let source = player.provider_ids.get(from).and_then(key_text)?;
                let target = player.provider_ids.get(to).and_then(key_text)?;
                Some((source, target))
            })
            .collect();
        pairs.sort();
        pairs
    }

    /// Get all players in canonical order
    pub fn get_all_players(&self) -> Vec<&ResolvedPlayer> {
        self.players_by_id.values().collect()
    }

    pub fn player_count(&self) -> usize {
        self.players_by_id.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.players_by_id.is_empty()
    }
}

/// Index text for a real provider value; nulls and sentinels have none
fn key_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(text) if text == TEXT_SENTINEL || text.trim().is_empty() => None,
        serde_json::Value::String(text) => Some(text.trim().to_string()),
        serde_json::Value::Number(number) if number.as_i64() == Some(NUMERIC_SENTINEL) => None,
        serde_json::Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CorrectionStatus;
    use serde_json::json;

    fn player(
        canonical_id: u32,
        name: &str,
        mfl: serde_json::Value,
        sleeper: serde_json::Value,
    ) -> ResolvedPlayer {
        let provider_ids = [("mfl_id".to_string(), mfl), ("sleeper_id".to_string(), sleeper)]
            .into_iter()
            .collect();
        ResolvedPlayer {
            canonical_id,
            provider_ids,
            name: name.to_string(),
            normalized_name: normalize_name(name),
            name_last_first: crate::normalize::last_first(name),
            position: "QB".to_string(),
            team: "FA".to_string(),
            birthdate: None,
            draft_year: None,
            correction_status: CorrectionStatus::Original,
            correction_history: Vec::new(),
        }
    }

    fn create_test_players() -> Vec<ResolvedPlayer> {
        vec![
            player(1, "Lamar Jackson", json!(13116), json!("4881")),
            player(2, "Josh Allen", json!(13589), json!("4984")),
            player(3, "Josh Allen", json!(13590), json!("DUPLICATE_CLEARED")),
        ]
    }

    #[test]
    fn test_registry_creation() {
        let registry = PlayerRegistry::from_players(create_test_players()).unwrap();

        assert_eq!(registry.player_count(), 3);
        assert!(!registry.is_empty());
        assert!(PlayerRegistry::new().is_empty());
    }

    #[test]
    fn test_lookups() {
        let registry = PlayerRegistry::from_players(create_test_players()).unwrap();

        let lamar = registry.get_by_provider_id("sleeper_id", "4881").unwrap();
        assert_eq!(lamar.canonical_id, 1);
        assert_eq!(registry.get_by_provider_id("mfl_id", "13589").unwrap().canonical_id, 2);
        assert_eq!(registry.get_by_canonical_id(3).unwrap().name, "Josh Allen");

        assert_eq!(
            registry.get_by_provider_id("sleeper_id", "DUPLICATE_CLEARED"),
            Err(LookupError::UnknownProviderId {
                provider: "sleeper_id".into(),
                value: "DUPLICATE_CLEARED".into()
            })
        );
        assert_eq!(registry.get_by_canonical_id(9), Err(LookupError::InvalidCanonicalId(9)));

        let allens = registry.get_by_name("josh allen").unwrap();
        assert_eq!(allens.len(), 2);
        assert!(registry.get_by_name("Tom Brady").is_err());
    }

    #[test]
    fn test_search_players() {
        let registry = PlayerRegistry::from_players(create_test_players()).unwrap();

        let results = registry.search_players("Lamar");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Lamar Jackson");

        let results = registry.search_players("josh");
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_crosswalk_skips_sentinels() {
        let registry = PlayerRegistry::from_players(create_test_players()).unwrap();

        let pairs = registry.crosswalk("sleeper_id", "mfl_id");
        assert_eq!(
            pairs,
            vec![
                ("4881".to_string(), "13116".to_string()),
                ("4984".to_string(), "13589".to_string())
            ]
        );
    }

    #[test]
    fn test_conflicts_are_rejected() {
        let mut players = create_test_players();
        players.push(player(4, "Imposter", json!(1), json!("4984")));
        let result = PlayerRegistry::from_players(players);
        assert!(matches!(result, Err(ResolveError::RegistryConflict(_))));

        let mut players = create_test_players();
        players.push(player(1, "Repeat", json!(2), json!("5")));
        let result = PlayerRegistry::from_players(players);
        assert!(matches!(result, Err(ResolveError::RegistryConflict(_))));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolved.json");
        std::fs::write(&path, serde_json::to_string(&create_test_players()).unwrap()).unwrap();

        let mut registry = PlayerRegistry::new();
        registry.load_from_file(&path).await.unwrap();
        assert_eq!(registry.player_count(), 3);
    }
}
