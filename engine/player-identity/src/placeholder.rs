//! Drops team and roster placeholder rows

use crate::types::PlayerRecord;
use tracing::debug;

/// Keep rows that carry at least one real identifier besides the base join
/// key. Rows with nothing else are team/roster placeholders, not players.
pub fn filter_placeholders(records: Vec<PlayerRecord>, base_key: &str) -> Vec<PlayerRecord> {
    records
        .into_iter()
        .filter(|record| {
            let keep = record
                .provider_ids
                .iter()
                .any(|(provider, slot)| provider != base_key && slot.is_known());
            if !keep {
                debug!("Dropping placeholder row {} ({})", record.source_row, record.name);
            }
            keep
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IdSlot, ProviderValue};

    #[test]
    fn test_placeholders_dropped() {
        let records = vec![
            PlayerRecord::new(0, "Buffalo Bills", "DEF", "BUF")
                .with_id("mfl_id", ProviderValue::Numeric(501)),
            PlayerRecord::new(1, "Josh Allen", "QB", "BUF")
                .with_id("mfl_id", ProviderValue::Numeric(13589))
                .with_id("sleeper_id", ProviderValue::Text("4984".into())),
            PlayerRecord::new(2, "Cleared Only", "WR", "FA")
                .with_id("mfl_id", ProviderValue::Numeric(777))
                .with_slot("gsis_id", IdSlot::Cleared),
            PlayerRecord::new(3, "No Base Key", "WR", "FA")
                .with_id("gsis_id", ProviderValue::Text("00-1".into())),
        ];

        let kept = filter_placeholders(records, "mfl_id");
        let rows: Vec<usize> = kept.iter().map(|record| record.source_row).collect();
        assert_eq!(rows, vec![1, 3]);
    }

    #[test]
    fn test_empty_input() {
        assert!(filter_placeholders(Vec::new(), "mfl_id").is_empty());
    }
}
