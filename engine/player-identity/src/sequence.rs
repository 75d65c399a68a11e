//! Canonical ID assignment

use crate::types::{PlayerRecord, ProviderSchema};
use std::cmp::Ordering;

/// Sort the table and number it 1..=N. Order: first real identifier in
/// schema order (records without one last), then name, then the full
/// tiebreak. The same snapshot always gets the same numbering.
pub fn assign_canonical_ids(
    mut records: Vec<PlayerRecord>,
    schema: &ProviderSchema,
) -> Vec<PlayerRecord> {
    records.sort_by(|a, b| canonical_cmp(a, b, schema));

    for (index, record) in records.iter_mut().enumerate() {
        record.canonical_id = Some((index + 1) as u32);
    }

    records
}

fn canonical_cmp(a: &PlayerRecord, b: &PlayerRecord, schema: &ProviderSchema) -> Ordering {
    let first_a = a.first_known_id(schema);
    let first_b = b.first_known_id(schema);

    let by_first_id = match (first_a, first_b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    by_first_id.then_with(|| a.tiebreak_cmp(b, schema))
}
