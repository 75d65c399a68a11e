//! Per-ID-type deduplication
//!
//! Every group of records sharing a real value for one provider column is
//! reduced to a single holder. The losers keep their row but get the
//! provider's sentinel. Holder order:
//!
//! 1. platform column only: records whose birthdate contradicts the roster go last
//! 2. newest `draft_year` first, missing draft years last
//! 3. smallest `name`
//! 4. identifier slots in schema order, then source row

use crate::types::{
    BirthdateCheck, CorrectionStatus, IdSlot, PlayerRecord, ProviderSchema, ProviderSpec,
    ProviderValue,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Summary of one deduplication pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupOutcome {
    /// Provider column that was deduplicated
    pub provider: String,

    /// Groups of two or more records sharing a value
    pub contested_groups: usize,

    /// Records whose value was replaced by the sentinel
    pub cleared: usize,

    /// Losers that had contradicted the roster birthdate
    pub cleared_mismatched: usize,
}

/// Deduplicate one provider column
pub fn deduplicate(
    mut records: Vec<PlayerRecord>,
    provider: &ProviderSpec,
    is_platform: bool,
    schema: &ProviderSchema,
) -> (Vec<PlayerRecord>, DedupOutcome) {
    let mut groups: BTreeMap<ProviderValue, Vec<usize>> = BTreeMap::new();
    for (index, record) in records.iter().enumerate() {
        if let Some(value) = record.slot(&provider.name).known() {
            groups.entry(value.clone()).or_default().push(index);
        }
    }

    let label = provider.label().to_string();
    let mut outcome = DedupOutcome { provider: provider.name.clone(), ..Default::default() };

    for (value, mut members) in groups {
        if members.len() < 2 {
            continue;
        }
        outcome.contested_groups += 1;

        members.sort_by(|&a, &b| holder_cmp(&records[a], &records[b], is_platform, schema));
        let holder = members[0];

        let verified = records[holder].birthdate_check == BirthdateCheck::ContestedVerified;
        let kept_status = if is_platform && verified {
            CorrectionStatus::KeptVerified(label.clone())
        } else {
            CorrectionStatus::KeptNewer(label.clone())
        };
        debug!(
            "{} {} shared by {} records; keeping row {} ({})",
            provider.name,
            value,
            members.len(),
            records[holder].source_row,
            records[holder].name
        );
        records[holder].apply_status(kept_status);

        for &loser in &members[1..] {
            let record = &mut records[loser];
            if record.birthdate_check == BirthdateCheck::ContestedMismatch && is_platform {
                outcome.cleared_mismatched += 1;
            }
            record.set_slot(&provider.name, IdSlot::Cleared);
            record.apply_status(CorrectionStatus::ClearedDuplicate(label.clone()));
            outcome.cleared += 1;
        }
    }

    info!(
        "Deduplicated {}: {} contested groups, {} records cleared",
        provider.name, outcome.contested_groups, outcome.cleared
    );
    (records, outcome)
}

/// Ordering that puts the preferred holder first
fn holder_cmp(
    a: &PlayerRecord,
    b: &PlayerRecord,
    is_platform: bool,
    schema: &ProviderSchema,
) -> Ordering {
    let mismatch_rank = |record: &PlayerRecord| {
        u8::from(is_platform && record.birthdate_check == BirthdateCheck::ContestedMismatch)
    };

    mismatch_rank(a)
        .cmp(&mismatch_rank(b))
        .then_with(|| draft_year_desc(a.draft_year, b.draft_year))
        .then_with(|| a.tiebreak_cmp(b, schema))
}

fn draft_year_desc(a: Option<i32>, b: Option<i32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IdKind;

    fn schema() -> ProviderSchema {
        ProviderSchema::new(vec![
            ProviderSpec::new("mfl_id", IdKind::Numeric),
            ProviderSpec::new("gsis_id", IdKind::Text),
            ProviderSpec::new("sleeper_id", IdKind::Text),
        ])
    }

    fn gsis(row: usize, name: &str, id: &str, draft_year: Option<i32>) -> PlayerRecord {
        PlayerRecord::new(row, name, "RB", "FA")
            .with_id("mfl_id", ProviderValue::Numeric(1000 + row as i64))
            .with_id("gsis_id", ProviderValue::Text(id.into()))
            .with_draft_year(draft_year)
    }

    #[test]
    fn test_newest_draft_year_kept() {
        let schema = schema();
        let spec = schema.get("gsis_id").unwrap().clone();
        let records = vec![
            gsis(0, "Old Player", "00-1", Some(2012)),
            gsis(1, "New Player", "00-1", Some(2021)),
            gsis(2, "Unknown Year", "00-1", None),
            gsis(3, "Alone", "00-2", Some(2015)),
        ];

        let (records, outcome) = deduplicate(records, &spec, false, &schema);

        assert_eq!(outcome.contested_groups, 1);
        assert_eq!(outcome.cleared, 2);
        assert_eq!(records[1].slot("gsis_id").known(), Some(&ProviderValue::Text("00-1".into())));
        assert_eq!(records[1].correction_status.to_string(), "kept_gsis_newer");
        assert_eq!(records[0].slot("gsis_id"), &IdSlot::Cleared);
        assert_eq!(records[0].correction_status.to_string(), "cleared_gsis_duplicate");
        assert_eq!(records[2].slot("gsis_id"), &IdSlot::Cleared);
        assert_eq!(records[3].correction_status, CorrectionStatus::Original);
    }

    #[test]
    fn test_name_breaks_draft_year_tie() {
        let schema = schema();
        let spec = schema.get("gsis_id").unwrap().clone();
        let records = vec![
            gsis(0, "Zed Player", "00-9", Some(2020)),
            gsis(1, "Abe Player", "00-9", Some(2020)),
        ];

        let (records, _) = deduplicate(records, &spec, false, &schema);
        assert!(records[1].slot("gsis_id").is_known());
        assert!(records[0].slot("gsis_id").is_cleared());
    }

    #[test]
    fn test_mismatched_birthdate_loses_on_platform_only() {
        let schema = schema();
        let spec = schema.get("sleeper_id").unwrap().clone();
        let mut newer = PlayerRecord::new(0, "Newer Wrong", "WR", "FA")
            .with_id("sleeper_id", ProviderValue::Text("555".into()))
            .with_draft_year(Some(2023));
        newer.birthdate_check = BirthdateCheck::ContestedMismatch;
        let mut older = PlayerRecord::new(1, "Older Right", "WR", "FA")
            .with_id("sleeper_id", ProviderValue::Text("555".into()))
            .with_draft_year(Some(2015));
        older.birthdate_check = BirthdateCheck::ContestedVerified;

        let (records, outcome) =
            deduplicate(vec![newer.clone(), older.clone()], &spec, true, &schema);
        assert!(records[1].slot("sleeper_id").is_known());
        assert_eq!(records[1].correction_status.to_string(), "kept_sleeper_verified");
        assert_eq!(records[0].correction_status.to_string(), "cleared_sleeper_duplicate");
        assert_eq!(outcome.cleared_mismatched, 1);

        // Outside the platform column the birthdate flag is ignored
        let (records, _) = deduplicate(vec![newer, older], &spec, false, &schema);
        assert!(records[0].slot("sleeper_id").is_known());
        assert_eq!(records[0].correction_status.to_string(), "kept_sleeper_newer");
    }

    #[test]
    fn test_dedup_is_deterministic() {
        let schema = schema();
        let spec = schema.get("gsis_id").unwrap().clone();
        let records: Vec<PlayerRecord> = (0..12)
            .map(|row| gsis(row, "Same Name", &format!("00-{}", row % 3), Some(2019)))
            .collect();

        let first = deduplicate(records.clone(), &spec, false, &schema);
        let second = deduplicate(records, &spec, false, &schema);
        assert_eq!(first, second);
    }
}
