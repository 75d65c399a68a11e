//! Output rows for the resolved table

use crate::error::{ResolveError, Result};
use crate::types::{CorrectionStatus, PlayerRecord, ProviderSchema};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// One published row. Provider columns are flattened next to the named
/// fields; each holds the real value, the sentinel encoding, or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlayer {
    pub canonical_id: u32,

    #[serde(flatten)]
    pub provider_ids: BTreeMap<String, serde_json::Value>,

    pub name: String,
    pub normalized_name: String,
    pub name_last_first: String,
    pub position: String,
    pub team: String,
    pub birthdate: Option<NaiveDate>,
    pub draft_year: Option<i32>,
    pub correction_status: CorrectionStatus,

    /// Every status applied, in stage order. A row cleared on one provider
    /// and later corrected on another shows only the correction as its
    /// primary status; the clearing is kept here.
    #[serde(default)]
    pub correction_history: Vec<CorrectionStatus>,
}

impl ResolvedPlayer {
    /// Provider value as displayed text, `None` for null
    pub fn provider_text(&self, provider: &str) -> Option<String> {
        match self.provider_ids.get(provider)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Whether the published statuses explain a sentinel on this provider
    /// label
    pub fn accounts_for_sentinel(&self, label: &str) -> bool {
        self.correction_status.reflects_clearing(label)
            || self.correction_history.iter().any(|status| status.reflects_clearing(label))
    }
}

/// Project numbered records into output rows, every schema column included
pub fn project(records: &[PlayerRecord], schema: &ProviderSchema) -> Result<Vec<ResolvedPlayer>> {
    records
        .iter()
        .map(|record| {
            let canonical_id = record
                .canonical_id
                .ok_or_else(|| {
                    ResolveError::invalid_row(record.source_row, "canonical_id not assigned")
                })?;

            let provider_ids = schema
                .iter()
                .map(|spec| (spec.name.clone(), record.slot(&spec.name).encode(spec.kind)))
                .collect();

            Ok(ResolvedPlayer {
                canonical_id,
                provider_ids,
                name: record.name.clone(),
                normalized_name: record.normalized_name.clone(),
                name_last_first: record.name_last_first(),
                position: record.position.clone(),
                team: record.team.clone(),
                birthdate: record.birthdate,
                draft_year: record.draft_year,
                correction_status: record.correction_status.clone(),
                correction_history: record.correction_history.clone(),
            })
        })
        .collect()
}

/// Write rows as pretty JSON
pub async fn write_json<P: AsRef<Path>>(path: P, players: &[ResolvedPlayer]) -> Result<()> {
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(players)?;
    tokio::fs::write(path, content).await?;

    info!("Wrote {} resolved players to {:?}", players.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IdKind, IdSlot, ProviderSpec, ProviderValue};
    use serde_json::json;

    fn schema() -> ProviderSchema {
        ProviderSchema::new(vec![
            ProviderSpec::new("mfl_id", IdKind::Numeric),
            ProviderSpec::new("sleeper_id", IdKind::Text),
            ProviderSpec::new("espn_id", IdKind::Numeric),
        ])
    }

    #[test]
    fn test_projection_encodes_every_column() {
        let mut record = PlayerRecord::new(4, "Amon-Ra St. Brown", "WR", "DET")
            .with_id("mfl_id", ProviderValue::Numeric(15281))
            .with_slot("sleeper_id", IdSlot::Cleared)
            .with_birthdate(NaiveDate::from_ymd_opt(1999, 10, 24))
            .with_draft_year(Some(2021));
        record.canonical_id = Some(1);
        record.apply_status(CorrectionStatus::ClearedDuplicate("sleeper".into()));

        let rows = project(&[record], &schema()).unwrap();
        let row = &rows[0];
        assert_eq!(row.provider_ids["mfl_id"], json!(15281));
        assert_eq!(row.provider_ids["sleeper_id"], json!("DUPLICATE_CLEARED"));
        assert_eq!(row.provider_ids["espn_id"], serde_json::Value::Null);
        assert_eq!(row.name_last_first, "St. Brown, Amon-Ra");
        assert_eq!(row.provider_text("mfl_id").as_deref(), Some("15281"));
        assert_eq!(row.provider_text("espn_id"), None);

        let value = serde_json::to_value(row).unwrap();
        assert_eq!(value["canonical_id"], json!(1));
        assert_eq!(value["sleeper_id"], json!("DUPLICATE_CLEARED"));
        assert_eq!(value["correction_status"], json!("cleared_sleeper_duplicate"));
        assert_eq!(value["birthdate"], json!("1999-10-24"));
        assert_eq!(value["correction_history"], json!(["cleared_sleeper_duplicate"]));
    }

    #[test]
    fn test_clearing_survives_later_correction() {
        let mut record = PlayerRecord::new(2, "Other Walker", "RB", "SEA")
            .with_id("mfl_id", ProviderValue::Numeric(16100))
            .with_slot("espn_id", IdSlot::Cleared)
            .with_id("sleeper_id", ProviderValue::Text("42".into()));
        record.canonical_id = Some(3);
        record.apply_status(CorrectionStatus::ClearedDuplicate("espn".into()));
        record.apply_status(CorrectionStatus::AddedId("sleeper".into()));

        let row = &project(&[record], &schema()).unwrap()[0];
        assert_eq!(row.correction_status.to_string(), "added_sleeper_id");
        assert!(row.accounts_for_sentinel("espn"));
        assert!(!row.accounts_for_sentinel("mfl"));

        let value = serde_json::to_value(row).unwrap();
        assert_eq!(
            value["correction_history"],
            json!(["cleared_espn_duplicate", "added_sleeper_id"])
        );
    }

    #[test]
    fn test_rows_without_history_still_load() {
        let row: ResolvedPlayer = serde_json::from_value(json!({
            "canonical_id": 1,
            "mfl_id": 1,
            "name": "Josh Allen",
            "normalized_name": "josh allen",
            "name_last_first": "Allen, Josh",
            "position": "QB",
            "team": "BUF",
            "birthdate": null,
            "draft_year": 2018,
            "correction_status": "original"
        }))
        .unwrap();
        assert!(row.correction_history.is_empty());
        assert_eq!(row.provider_text("mfl_id").as_deref(), Some("1"));
    }

    #[test]
    fn test_unnumbered_record_is_rejected() {
        let record = PlayerRecord::new(0, "No Number", "WR", "FA")
            .with_id("mfl_id", ProviderValue::Numeric(1));
        assert!(project(&[record], &schema()).is_err());
    }

    #[tokio::test]
    async fn test_write_json_reads_back() {
        let mut record = PlayerRecord::new(0, "Josh Allen", "QB", "BUF")
            .with_id("mfl_id", ProviderValue::Numeric(1));
        record.canonical_id = Some(1);
        let rows = project(&[record], &schema()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolved.json");
        write_json(&path, &rows).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let back: Vec<ResolvedPlayer> = serde_json::from_str(&content).unwrap();
        assert_eq!(back, rows);
    }
}
