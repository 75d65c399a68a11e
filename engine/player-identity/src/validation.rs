//! Quality gate over the resolved table
//!
//! The gate never repairs anything. It collects every violation so the
//! upstream snapshot can be fixed in one pass, and the pipeline refuses to
//! return a table that has any.

use crate::projection::ResolvedPlayer;
use crate::types::{IdSlot, PlayerRecord, ProviderSchema, ProviderValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category of invariant that was broken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    DuplicateId,
    SentinelMismatch,
    NoProviderIds,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::DuplicateId => write!(f, "duplicate_id"),
            ViolationKind::SentinelMismatch => write!(f, "sentinel_mismatch"),
            ViolationKind::NoProviderIds => write!(f, "no_provider_ids"),
        }
    }
}

/// Identifying fields of a record, enough to find it without re-running
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordContext {
    pub canonical_id: Option<u32>,

    /// Snapshot row; absent when checking an already published table
    pub source_row: Option<usize>,
    pub name: String,
    pub position: String,
    pub team: String,
    pub correction_status: String,

    /// Every non-missing provider value, sentinels rendered as encoded
    pub provider_ids: BTreeMap<String, serde_json::Value>,
}

impl RecordContext {
    pub fn from_record(record: &PlayerRecord, schema: &ProviderSchema) -> Self {
        let provider_ids = schema
            .iter()
            .filter_map(|spec| match record.slot(&spec.name) {
                IdSlot::Unknown => None,
                slot => Some((spec.name.clone(), slot.encode(spec.kind))),
            })
            .collect();

        Self {
            canonical_id: record.canonical_id,
            source_row: Some(record.source_row),
            name: record.name.clone(),
            position: record.position.clone(),
            team: record.team.clone(),
            correction_status: record.correction_status.to_string(),
            provider_ids,
        }
    }

    pub fn from_row(row: &ResolvedPlayer) -> Self {
        let provider_ids = row
            .provider_ids
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Self {
            canonical_id: Some(row.canonical_id),
            source_row: None,
            name: row.name.clone(),
            position: row.position.clone(),
            team: row.team.clone(),
            correction_status: row.correction_status.to_string(),
            provider_ids,
        }
    }
}

/// One broken invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,

    /// Provider column involved, if any
    pub provider: Option<String>,

    /// Offending value, if any
    pub value: Option<String>,

    /// Records involved; two for duplicates, one otherwise
    pub records: Vec<RecordContext>,

    pub message: String,
}

/// Every violation found in one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub records_checked: usize,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn count(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|violation| violation.kind == kind).count()
    }
}

/// Check the resolved table's invariants
pub fn validate(records: &[PlayerRecord], schema: &ProviderSchema) -> ValidationReport {
    let mut report = ValidationReport { records_checked: records.len(), violations: Vec::new() };

    for spec in schema.iter() {
        let mut holders: BTreeMap<&ProviderValue, Vec<usize>> = BTreeMap::new();
        for (index, record) in records.iter().enumerate() {
            if let Some(value) = record.slot(&spec.name).known() {
                holders.entry(value).or_default().push(index);
            }
        }

        for (value, indices) in holders {
            let first = &records[indices[0]];
            for &other in &indices[1..] {
                let other = &records[other];
                report.violations.push(Violation {
                    kind: ViolationKind::DuplicateId,
                    provider: Some(spec.name.clone()),
                    value: Some(value.to_string()),
                    records: vec![
                        RecordContext::from_record(first, schema),
                        RecordContext::from_record(other, schema),
                    ],
                    message: format!(
                        "{} {} held by row {} ({}) and row {} ({})",
                        spec.name, value, first.source_row, first.name, other.source_row, other.name
                    ),
                });
            }
        }
    }

    for record in records {
        for spec in schema.iter() {
            if record.slot(&spec.name).is_cleared() && !record.accounts_for_sentinel(spec.label()) {
                report.violations.push(Violation {
                    kind: ViolationKind::SentinelMismatch,
                    provider: Some(spec.name.clone()),
                    value: Some(render(&record.slot(&spec.name).encode(spec.kind))),
                    records: vec![RecordContext::from_record(record, schema)],
                    message: format!(
                        "row {} ({}) carries the {} sentinel with status {}",
                        record.source_row, record.name, spec.name, record.correction_status
                    ),
                });
            }
        }
    }

    for record in records {
        if !record.has_known_id() {
            report.violations.push(Violation {
                kind: ViolationKind::NoProviderIds,
                provider: None,
                value: None,
                records: vec![RecordContext::from_record(record, schema)],
                message: format!(
                    "row {} ({}) has no real provider identifier",
                    record.source_row, record.name
                ),
            });
        }
    }

    report
}

/// Check sentinel coupling on output rows, using only what the rows carry.
/// Runs after [`validate`] so a status lost on the way out is still caught.
pub fn validate_published(rows: &[ResolvedPlayer], schema: &ProviderSchema) -> ValidationReport {
    let mut report = ValidationReport { records_checked: rows.len(), violations: Vec::new() };

    for row in rows {
        for spec in schema.iter() {
            let Some(value) = row.provider_ids.get(&spec.name) else {
                continue;
            };
            let cleared = IdSlot::from_json(spec.kind, value).is_some_and(|slot| slot.is_cleared());
            if cleared && !row.accounts_for_sentinel(spec.label()) {
                report.violations.push(Violation {
                    kind: ViolationKind::SentinelMismatch,
                    provider: Some(spec.name.clone()),
                    value: Some(render(value)),
                    records: vec![RecordContext::from_row(row)],
                    message: format!(
                        "player {} ({}) is published with the {} sentinel and status {}",
                        row.canonical_id, row.name, spec.name, row.correction_status
                    ),
                });
            }
        }
    }

    report
}

fn render(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CorrectionStatus, IdKind, ProviderSpec};

    fn schema() -> ProviderSchema {
        ProviderSchema::new(vec![
            ProviderSpec::new("mfl_id", IdKind::Numeric),
            ProviderSpec::new("sleeper_id", IdKind::Text),
        ])
    }

    #[test]
    fn test_clean_table() {
        let mut cleared = PlayerRecord::new(1, "Cleared", "WR", "FA")
            .with_id("mfl_id", ProviderValue::Numeric(2))
            .with_slot("sleeper_id", IdSlot::Cleared);
        cleared.apply_status(CorrectionStatus::ClearedDuplicate("sleeper".into()));
        let records = vec![
            PlayerRecord::new(0, "Kept", "WR", "FA")
                .with_id("mfl_id", ProviderValue::Numeric(1))
                .with_id("sleeper_id", ProviderValue::Text("9".into())),
            cleared,
        ];

        let report = validate(&records, &schema());
        assert!(report.is_clean(), "{:?}", report.violations);
        assert_eq!(report.records_checked, 2);
    }

    #[test]
    fn test_every_violation_reported() {
        let records = vec![
            PlayerRecord::new(0, "First", "WR", "FA").with_id("mfl_id", ProviderValue::Numeric(7)),
            PlayerRecord::new(1, "Second", "WR", "FA").with_id("mfl_id", ProviderValue::Numeric(7)),
            PlayerRecord::new(2, "Third", "WR", "FA").with_id("mfl_id", ProviderValue::Numeric(7)),
            PlayerRecord::new(3, "Stale Sentinel", "WR", "FA")
                .with_id("mfl_id", ProviderValue::Numeric(8))
                .with_slot("sleeper_id", IdSlot::Cleared),
            PlayerRecord::new(4, "Empty", "WR", "FA").with_slot("mfl_id", IdSlot::Cleared),
        ];

        let report = validate(&records, &schema());
        assert_eq!(report.count(ViolationKind::DuplicateId), 2);
        // Row 4 has an unexplained mfl sentinel as well as no real identifier
        assert_eq!(report.count(ViolationKind::SentinelMismatch), 2);
        assert_eq!(report.count(ViolationKind::NoProviderIds), 1);

        let duplicate = &report.violations[0];
        assert_eq!(duplicate.value.as_deref(), Some("7"));
        assert_eq!(duplicate.records.len(), 2);
        assert_eq!(duplicate.records[0].name, "First");

        let mismatch =
            report.violations.iter().find(|v| v.kind == ViolationKind::SentinelMismatch).unwrap();
        assert_eq!(mismatch.value.as_deref(), Some("DUPLICATE_CLEARED"));
        let context = &mismatch.records[0];
        assert_eq!(context.provider_ids["sleeper_id"], serde_json::json!("DUPLICATE_CLEARED"));
        assert_eq!(context.source_row, Some(3));
    }

    #[test]
    fn test_sentinel_explained_by_history() {
        let mut record = PlayerRecord::new(0, "Twice Cleared", "WR", "FA")
            .with_id("sleeper_id", ProviderValue::Text("3".into()))
            .with_slot("mfl_id", IdSlot::Cleared);
        record.apply_status(CorrectionStatus::ClearedDuplicate("gsis".into()));
        record.apply_status(CorrectionStatus::ClearedDuplicate("mfl".into()));

        let report = validate(&[record], &schema());
        assert!(report.is_clean());
    }

    #[test]
    fn test_published_rows_need_their_history() {
        let mut record = PlayerRecord::new(1, "Other Walker", "RB", "SEA")
            .with_id("mfl_id", ProviderValue::Numeric(16100))
            .with_slot("sleeper_id", IdSlot::Cleared);
        record.canonical_id = Some(1);
        record.apply_status(CorrectionStatus::ClearedDuplicate("sleeper".into()));
        record.apply_status(CorrectionStatus::CorrectedId("mfl".into()));

        let mut rows = crate::projection::project(&[record], &schema()).unwrap();
        assert!(validate_published(&rows, &schema()).is_clean());

        rows[0].correction_history.clear();
        let report = validate_published(&rows, &schema());
        assert_eq!(report.count(ViolationKind::SentinelMismatch), 1);
        let context = &report.violations[0].records[0];
        assert_eq!(context.canonical_id, Some(1));
        assert_eq!(context.source_row, None);
        assert_eq!(context.correction_status, "corrected_mfl_id");
    }

    #[test]
    fn test_violation_kind_serialization() {
        let encoded = serde_json::to_string(&ViolationKind::NoProviderIds).unwrap();
        assert_eq!(encoded, "\"no_provider_ids\"");
        assert_eq!(ViolationKind::DuplicateId.to_string(), "duplicate_id");
    }
}
