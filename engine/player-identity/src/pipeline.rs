//! Stage orchestration for one resolution run

use crate::birthdate::annotate_birthdates;
use crate::config::ResolverConfig;
use crate::dedup::{deduplicate, DedupOutcome};
use crate::error::{ResolveError, Result};
use crate::fallback::{recover_platform_ids, FallbackOutcome};
use crate::placeholder::filter_placeholders;
use crate::projection::{project, ResolvedPlayer};
use crate::roster::{Roster, RosterCandidate};
use crate::sequence::assign_canonical_ids;
use crate::types::{BirthdateCheck, PlayerRecord};
use crate::validation::{validate, validate_published};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Counters collected while a snapshot moves through the stages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStats {
    pub rows_loaded: usize,
    pub placeholders_dropped: usize,
    pub records_resolved: usize,

    pub roster_candidates: usize,
    pub roster_matchable: usize,

    pub contested_verified: usize,
    pub contested_mismatched: usize,
    pub contested_unverified: usize,

    /// One entry per column in dedup order
    pub dedup: Vec<DedupOutcome>,

    pub fallback: FallbackOutcome,
}

impl ResolutionStats {
    /// Records cleared across every deduplicated column
    pub fn total_cleared(&self) -> usize {
        self.dedup.iter().map(|outcome| outcome.cleared).sum()
    }
}

/// The resolved table with its run statistics
#[derive(Debug, Clone)]
pub struct Resolution {
    pub records: Vec<PlayerRecord>,

    /// Output rows, one per record in canonical order
    pub players: Vec<ResolvedPlayer>,

    pub stats: ResolutionStats,
}

/// Runs the resolution stages in order over a materialized snapshot
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    config: ResolverConfig,
}

impl IdentityResolver {
    pub fn new(config: ResolverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a snapshot and refuse the result unless the quality gate
    /// passes. A failed gate returns every violation in
    /// [`ResolveError::Validation`].
    pub fn resolve(
        &self,
        snapshot: Vec<PlayerRecord>,
        roster_feed: &[RosterCandidate],
    ) -> Result<Resolution> {
        let resolution = self.run_stages(snapshot, roster_feed)?;
        let schema = &self.config.providers;

        let mut report = validate(&resolution.records, schema);
        if report.is_clean() {
            report = validate_published(&resolution.players, schema);
        }
        if !report.is_clean() {
            for violation in &report.violations {
                error!("{}: {}", violation.kind, violation.message);
            }
            return Err(ResolveError::Validation(report));
        }

        info!("Quality gate passed for {} records", report.records_checked);
        Ok(resolution)
    }

    /// Run every stage up to canonical numbering without the quality gate
    pub fn run_stages(
        &self,
        snapshot: Vec<PlayerRecord>,
        roster_feed: &[RosterCandidate],
    ) -> Result<Resolution> {
        let config = &self.config;
        let schema = &config.providers;
        let platform = config.platform()?;

        let mut stats = ResolutionStats { rows_loaded: snapshot.len(), ..Default::default() };
        info!("Resolving {} snapshot rows", stats.rows_loaded);

        let records = filter_placeholders(snapshot, &config.base_key);
        stats.placeholders_dropped = stats.rows_loaded - records.len();
        info!(
            "Placeholder filter dropped {} rows, {} remain",
            stats.placeholders_dropped,
            records.len()
        );

        let roster = Roster::new(roster_feed, platform.kind, &config.matching.placeholder_markers);
        stats.roster_candidates = roster.len();
        stats.roster_matchable = roster.matchable();
        if roster.is_empty() {
            warn!("Roster feed is empty; contested IDs cannot be verified or recovered");
        }

        let mut records = annotate_birthdates(records, &platform.name, &roster);
        for record in &records {
            match record.birthdate_check {
                BirthdateCheck::Uncontested => {}
                BirthdateCheck::ContestedVerified => stats.contested_verified += 1,
                BirthdateCheck::ContestedMismatch => stats.contested_mismatched += 1,
                BirthdateCheck::ContestedUnverified => stats.contested_unverified += 1,
            }
        }
        info!(
            "Birthdate check on {}: {} verified, {} mismatched, {} unverified",
            platform.name,
            stats.contested_verified,
            stats.contested_mismatched,
            stats.contested_unverified
        );

        for key in &config.dedup_order {
            let provider =
                schema.get(key).ok_or_else(|| ResolveError::UnknownProvider(key.clone()))?;
            let is_platform = key == &platform.name;
            let (deduplicated, outcome) = deduplicate(records, provider, is_platform, schema);
            records = deduplicated;
            stats.dedup.push(outcome);
        }

        let (records, fallback) =
            recover_platform_ids(records, platform, &roster, &config.matching, schema);
        stats.fallback = fallback;

        let records = assign_canonical_ids(records, schema);
        stats.records_resolved = records.len();
        info!("Assigned canonical IDs 1..={}", stats.records_resolved);

        let players = project(&records, schema)?;
        Ok(Resolution { records, players, stats })
    }
}
