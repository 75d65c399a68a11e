//! Fallback matching for records without a platform ID
//!
//! Matching runs in rounds. Each round scores every pending record against
//! the roster independently and proposes its best candidate; the uniqueness
//! enforcer then settles competing proposals for the same candidate. Winners
//! are applied and their IDs join the claimed set, losers go back into the
//! pending list for the next round. The loop ends when a round proposes
//! nothing.

use crate::config::MatchingConfig;
use crate::normalize::{compare_positions, PositionMatch};
use crate::roster::{PreparedCandidate, Roster};
use crate::types::{
    CorrectionStatus, IdSlot, PlayerRecord, ProviderSchema, ProviderSpec, ProviderValue,
};
use crate::uniqueness::enforce_unique;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// A scored candidate assignment for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// Index of the record in the working table
    pub record: usize,

    /// Candidate platform ID
    pub candidate: ProviderValue,

    pub score: u32,
}

/// Summary of the fallback pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackOutcome {
    /// Records that entered without a platform ID
    pub pending: usize,

    /// Recovered where the ID had never been observed
    pub added: usize,

    /// Recovered where the ID had been cleared as a duplicate
    pub corrected: usize,

    /// Proposals reverted because a better claim won the same candidate
    pub collisions_reverted: usize,

    /// Matching rounds executed
    pub rounds: usize,

    /// Records still without a platform ID
    pub unresolved: usize,
}

/// Score one candidate against a record. `None` means disqualified: the
/// name must match and the position must match exactly or by family.
pub fn score_candidate(
    record: &PlayerRecord,
    candidate: &PreparedCandidate,
    weights: &MatchingConfig,
) -> Option<u32> {
    let normalized_match =
        !record.normalized_name.is_empty() && record.normalized_name == candidate.normalized_name;
    let name_match = record.name.trim().to_lowercase() == candidate.lower_name || normalized_match;
    if !name_match {
        return None;
    }

    let position_points = match compare_positions(&record.position, &candidate.position) {
        PositionMatch::Exact => weights.exact_position_points,
        PositionMatch::Family => weights.family_position_points,
        PositionMatch::None => return None,
    };

    let birthdate_points = match (record.birthdate, candidate.birthdate) {
        (Some(own), Some(of_record)) if own == of_record => weights.birthdate_points,
        _ => 0,
    };

    let score = weights.name_points + position_points + birthdate_points;
    (score >= weights.min_score).then_some(score)
}

/// Best admissible candidate per pending record, ignoring claimed IDs.
/// Ties go to the smallest candidate ID.
pub fn propose_matches(
    records: &[PlayerRecord],
    pending: &[usize],
    roster: &Roster,
    claimed: &BTreeSet<ProviderValue>,
    weights: &MatchingConfig,
) -> Vec<Proposal> {
    pending
        .iter()
        .filter_map(|&index| {
            let record = &records[index];
            roster
                .name_matches(&record.name, &record.normalized_name)
                .into_iter()
                .filter(|candidate| !claimed.contains(&candidate.id))
                .filter_map(|candidate| {
                    score_candidate(record, candidate, weights).map(|score| (score, &candidate.id))
                })
                .min_by(|(score_a, id_a), (score_b, id_b)| {
                    score_b.cmp(score_a).then_with(|| id_a.cmp(id_b))
                })
                .map(|(score, id)| Proposal { record: index, candidate: id.clone(), score })
        })
        .collect()
}

/// Recover platform IDs for every record that lacks one
pub fn recover_platform_ids(
    mut records: Vec<PlayerRecord>,
    platform: &ProviderSpec,
    roster: &Roster,
    weights: &MatchingConfig,
    schema: &ProviderSchema,
) -> (Vec<PlayerRecord>, FallbackOutcome) {
    let mut claimed: BTreeSet<ProviderValue> =
        records.iter().filter_map(|record| record.slot(&platform.name).known().cloned()).collect();
    let mut pending: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| !record.slot(&platform.name).is_known())
        .map(|(index, _)| index)
        .collect();

    let label = platform.label().to_string();
    let mut outcome = FallbackOutcome { pending: pending.len(), ..Default::default() };

    loop {
        let proposals = propose_matches(&records, &pending, roster, &claimed, weights);
        if proposals.is_empty() {
            break;
        }
        outcome.rounds += 1;

        let settled = enforce_unique(proposals, &records, schema);
        outcome.collisions_reverted += settled.reverted.len();

        for proposal in settled.accepted {
            let record = &mut records[proposal.record];
            let status = if record.slot(&platform.name).is_cleared() {
                outcome.corrected += 1;
                CorrectionStatus::CorrectedId(label.clone())
            } else {
                outcome.added += 1;
                CorrectionStatus::AddedId(label.clone())
            };
            debug!(
                "Matched row {} ({}) to {} {} with score {}",
                record.source_row, record.name, platform.name, proposal.candidate, proposal.score
            );

            record.set_slot(&platform.name, IdSlot::Known(proposal.candidate.clone()));
            record.apply_status(status);
            claimed.insert(proposal.candidate);
        }

        pending = settled.reverted.into_iter().map(|proposal| proposal.record).collect();
        pending.sort_unstable();
        if pending.is_empty() {
            break;
        }
    }

    outcome.unresolved =
        records.iter().filter(|record| !record.slot(&platform.name).is_known()).count();
    info!(
        "Fallback on {}: {} pending, {} added, {} corrected, {} unresolved after {} round(s)",
        platform.name,
        outcome.pending,
        outcome.added,
        outcome.corrected,
        outcome.unresolved,
        outcome.rounds
    );
    (records, outcome)
}
