//! # Player Identity
//!
//! Resolves one canonical identity per player across fantasy football data
//! providers. A snapshot of provider identifier rows goes through a fixed
//! sequence of stages: placeholder filtering, a birthdate cross-check of
//! contested platform IDs, per-column deduplication, fallback matching
//! against the platform roster, canonical numbering, and a quality gate that
//! refuses to publish a table with duplicate or unexplained identifiers.
//!
//! Every stage is a deterministic function over the whole table, so the same
//! snapshot and roster always produce the same canonical IDs and statuses.

pub mod birthdate;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fallback;
pub mod loader;
pub mod normalize;
pub mod pipeline;
pub mod placeholder;
pub mod projection;
pub mod registry;
pub mod roster;
pub mod sequence;
pub mod types;
pub mod uniqueness;
pub mod validation;


pub use config::{MatchingConfig, ResolverConfig};
pub use error::{ResolveError, Result};
pub use pipeline::{IdentityResolver, Resolution, ResolutionStats};
pub use projection::ResolvedPlayer;
pub use registry::{LookupError, PlayerRegistry};
pub use roster::RosterCandidate;
pub use types::{
    CorrectionStatus, IdKind, IdSlot, PlayerRecord, ProviderSchema, ProviderSpec, ProviderValue,
};
pub use validation::{validate, validate_published, ValidationReport, Violation, ViolationKind};

/// Current version of the player identity library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
