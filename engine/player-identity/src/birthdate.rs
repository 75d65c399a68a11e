//! Birthdate cross-check for contested platform IDs

use crate::roster::Roster;
use crate::types::{BirthdateCheck, PlayerRecord, ProviderValue};
use std::collections::HashMap;
use tracing::debug;

/// Annotate every record with the roster birthdate for its platform ID and,
/// when that ID is claimed by two or more records, whether the record's own
/// birthdate agrees with it. Nothing is cleared here.
pub fn annotate_birthdates(
    mut records: Vec<PlayerRecord>,
    platform_key: &str,
    roster: &Roster,
) -> Vec<PlayerRecord> {
    let mut claims: HashMap<ProviderValue, usize> = HashMap::new();
    for record in &records {
        if let Some(id) = record.slot(platform_key).known() {
            *claims.entry(id.clone()).or_default() += 1;
        }
    }

    for record in &mut records {
        let Some(id) = record.slot(platform_key).known().cloned() else {
            record.birthdate_check = BirthdateCheck::Uncontested;
            record.roster_birthdate = None;
            continue;
        };

        let roster_birthdate = roster.birthdate_of(&id);
        record.roster_birthdate = roster_birthdate;

        record.birthdate_check = if claims.get(&id).copied().unwrap_or(0) < 2 {
            BirthdateCheck::Uncontested
        } else {
            match (record.birthdate, roster_birthdate) {
                (Some(own), Some(of_record)) if own == of_record => {
                    BirthdateCheck::ContestedVerified
                }
                (Some(_), Some(_)) => BirthdateCheck::ContestedMismatch,
                _ => BirthdateCheck::ContestedUnverified,
            }
        };

        if record.birthdate_check != BirthdateCheck::Uncontested {
            debug!(
                "Contested {} {} on row {} ({}): {:?}",
                platform_key, id, record.source_row, record.name, record.birthdate_check
            );
        }
    }

    records
}
