//! Settles competing fallback proposals for the same candidate ID

use crate::fallback::Proposal;
use crate::types::{PlayerRecord, ProviderSchema, ProviderValue};
use std::collections::BTreeMap;
use tracing::debug;

/// Proposals split into the ones to apply and the ones to revert
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettledProposals {
    pub accepted: Vec<Proposal>,
    pub reverted: Vec<Proposal>,
}

/// Keep only the highest-scoring proposal per candidate ID. Equal scores go
/// to the record that sorts first by name, identifiers, then source row.
pub fn enforce_unique(
    proposals: Vec<Proposal>,
    records: &[PlayerRecord],
    schema: &ProviderSchema,
) -> SettledProposals {
    let mut by_candidate: BTreeMap<ProviderValue, Vec<Proposal>> = BTreeMap::new();
    for proposal in proposals {
        by_candidate.entry(proposal.candidate.clone()).or_default().push(proposal);
    }

    let mut settled = SettledProposals::default();
    for (candidate, mut claims) in by_candidate {
        claims.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| records[a.record].tiebreak_cmp(&records[b.record], schema))
        });

        let mut claims = claims.into_iter();
        if let Some(winner) = claims.next() {
            settled.accepted.push(winner);
        }
        for loser in claims {
            debug!(
                "Reverting match of row {} ({}) to {}: claimed by a stronger record",
                records[loser.record].source_row, records[loser.record].name, candidate
            );
            settled.reverted.push(loser);
        }
    }

    settled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchingConfig;
    use crate::fallback::recover_platform_ids;
    use crate::roster::{Roster, RosterCandidate};
    use crate::types::{CorrectionStatus, IdKind, IdSlot, ProviderSpec};

    fn schema() -> ProviderSchema {
        ProviderSchema::new(vec![
            ProviderSpec::new("mfl_id", IdKind::Numeric),
            ProviderSpec::new("sleeper_id", IdKind::Text),
        ])
    }

    fn record(row: usize, name: &str) -> PlayerRecord {
        PlayerRecord::new(row, name, "WR", "FA")
            .with_id("mfl_id", ProviderValue::Numeric(row as i64 + 10))
    }

    fn proposal(record: usize, candidate: &str, score: u32) -> Proposal {
        Proposal { record, candidate: ProviderValue::Text(candidate.into()), score }
    }

    #[test]
    fn test_highest_score_wins() {
        let records = vec![record(0, "Mike Williams"), record(1, "Mike Williams")];
        let settled = enforce_unique(
            vec![proposal(0, "77", 110), proposal(1, "77", 130)],
            &records,
            &schema(),
        );

        assert_eq!(settled.accepted, vec![proposal(1, "77", 130)]);
        assert_eq!(settled.reverted, vec![proposal(0, "77", 110)]);
    }

    #[test]
    fn test_equal_scores_use_record_order() {
        let records =
            vec![record(0, "Zach Player"), record(1, "Aaron Player"), record(2, "Third Player")];
        let settled = enforce_unique(
            vec![proposal(0, "5", 110), proposal(1, "5", 110), proposal(2, "6", 105)],
            &records,
            &schema(),
        );

        assert_eq!(settled.accepted, vec![proposal(1, "5", 110), proposal(2, "6", 105)]);
        assert_eq!(settled.reverted, vec![proposal(0, "5", 110)]);
    }

    #[test]
    fn test_collision_leaves_loser_untouched() {
        let feed = vec![RosterCandidate {
            player_id: "900".into(),
            full_name: "Chris Jones".into(),
            position: Some("DT".into()),
            birthdate: chrono::NaiveDate::from_ymd_opt(1994, 7, 3),
        }];
        let roster = Roster::new(&feed, IdKind::Text, &[]);

        let exact = PlayerRecord::new(0, "Chris Jones", "DT", "KC")
            .with_id("mfl_id", ProviderValue::Numeric(1));
        let mut family = PlayerRecord::new(1, "Chris Jones", "DE", "FA")
            .with_id("mfl_id", ProviderValue::Numeric(2))
            .with_slot("sleeper_id", IdSlot::Cleared);
        family.apply_status(CorrectionStatus::ClearedDuplicate("sleeper".into()));

        let platform = ProviderSpec::new("sleeper_id", IdKind::Text);
        let (records, outcome) = recover_platform_ids(
            vec![exact, family],
            &platform,
            &roster,
            &MatchingConfig::default(),
            &schema(),
        );

        assert_eq!(records[0].slot("sleeper_id").known(), Some(&ProviderValue::Text("900".into())));
        assert_eq!(records[0].correction_status.to_string(), "added_sleeper_id");
        assert_eq!(records[1].slot("sleeper_id"), &IdSlot::Cleared);
        assert_eq!(records[1].correction_status.to_string(), "cleared_sleeper_duplicate");
        assert_eq!(records[1].correction_history.len(), 1);
        assert_eq!(outcome.collisions_reverted, 1);
        assert_eq!(outcome.unresolved, 1);
    }
}
