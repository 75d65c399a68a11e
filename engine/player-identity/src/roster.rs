//! Fantasy-platform roster used for birthdate checks and fallback matching

use crate::normalize::{canonical_position, normalize_name};
use crate::types::{IdKind, IdSlot, ProviderValue};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// One entry of the platform's own player list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterCandidate {
    /// Platform player ID (e.g., Sleeper "4046")
    pub player_id: String,

    /// Full player name as the platform spells it
    pub full_name: String,

    /// Platform position code
    pub position: Option<String>,

    /// Platform birthdate-of-record
    pub birthdate: Option<NaiveDate>,
}

/// A roster entry prepared for matching
#[derive(Debug, Clone)]
pub struct PreparedCandidate {
    pub id: ProviderValue,
    pub full_name: String,
    pub lower_name: String,
    pub normalized_name: String,
    pub position: String,
    pub birthdate: Option<NaiveDate>,

    /// Name carries a placeholder marker; kept for birthdate lookup only
    pub placeholder: bool,
}

/// Roster indexed by platform ID and by name
#[derive(Debug, Clone, Default)]
pub struct Roster {
    candidates: Vec<PreparedCandidate>,
    by_id: BTreeMap<ProviderValue, usize>,
    by_lower_name: HashMap<String, Vec<usize>>,
    by_normalized_name: HashMap<String, Vec<usize>>,
}

impl Roster {
    /// Index a roster feed. Entries whose ID does not parse as the platform
    /// column's kind are skipped; a repeated ID keeps its first entry in ID order.
    pub fn new(feed: &[RosterCandidate], kind: IdKind, placeholder_markers: &[String]) -> Self {
        let mut sorted: Vec<&RosterCandidate> = feed.iter().collect();
        sorted.sort_by(|a, b| {
            a.player_id.cmp(&b.player_id).then_with(|| a.full_name.cmp(&b.full_name))
        });

        let mut roster = Roster::default();
        for entry in sorted {
            let id = match IdSlot::parse(kind, &entry.player_id) {
                Some(IdSlot::Known(id)) => id,
                _ => {
                    warn!(
                        "Skipping roster entry with unusable ID {:?} ({})",
                        entry.player_id, entry.full_name
                    );
                    continue;
                }
            };
            if roster.by_id.contains_key(&id) {
                warn!("Roster lists player ID {} more than once; keeping the first entry", id);
                continue;
            }

            let full_name = entry.full_name.trim().to_string();
            let placeholder =
                placeholder_markers.iter().any(|marker| full_name.contains(marker.as_str()));
            let index = roster.candidates.len();

            roster.by_id.insert(id.clone(), index);
            if !placeholder {
                roster.by_lower_name.entry(full_name.to_lowercase()).or_default().push(index);
                roster
                    .by_normalized_name
                    .entry(normalize_name(&full_name))
                    .or_default()
                    .push(index);
            }
            roster.candidates.push(PreparedCandidate {
                id,
                lower_name: full_name.to_lowercase(),
                normalized_name: normalize_name(&full_name),
                full_name,
                position: entry.position.as_deref().map(canonical_position).unwrap_or_default(),
                birthdate: entry.birthdate,
                placeholder,
            });
        }

        roster
    }

    pub fn get(&self, id: &ProviderValue) -> Option<&PreparedCandidate> {
        self.by_id.get(id).map(|&index| &self.candidates[index])
    }

    /// Platform birthdate-of-record for an ID
    pub fn birthdate_of(&self, id: &ProviderValue) -> Option<NaiveDate> {
        self.get(id).and_then(|candidate| candidate.birthdate)
    }

    /// Non-placeholder candidates whose raw (case-insensitive) or normalized
    /// name equals the given name, in ID order
    pub fn name_matches(&self, name: &str, normalized_name: &str) -> Vec<&PreparedCandidate> {
        let mut indices: Vec<usize> = Vec::new();
        if let Some(found) = self.by_lower_name.get(&name.trim().to_lowercase()) {
            indices.extend(found);
        }
        if let Some(found) = self.by_normalized_name.get(normalized_name) {
            indices.extend(found);
        }
        indices.sort_unstable();
        indices.dedup();
        indices.into_iter().map(|index| &self.candidates[index]).collect()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Number of candidates eligible for matching
    pub fn matchable(&self) -> usize {
        self.candidates.iter().filter(|candidate| !candidate.placeholder).count()
    }
}
