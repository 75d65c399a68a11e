//! Error types for player identity resolution

use crate::validation::ValidationReport;
use thiserror::Error;

/// Result type for identity resolution operations
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Errors that can occur while loading, resolving or publishing a snapshot
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown provider column: {0}")]
    UnknownProvider(String),

    #[error("Invalid {provider} identifier at row {row}: {value}")]
    InvalidIdentifier { provider: String, row: usize, value: String },

    #[error("Invalid snapshot row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("Registry conflict: {0}")]
    RegistryConflict(String),

    #[error("Quality gate failed with {} violation(s)", .0.violations.len())]
    Validation(ValidationReport),
}

impl ResolveError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new invalid row error
    pub fn invalid_row(row: usize, reason: impl Into<String>) -> Self {
        Self::InvalidRow { row, reason: reason.into() }
    }

    /// The validation report, if this error is a failed quality gate
    pub fn validation_report(&self) -> Option<&ValidationReport> {
        match self {
            Self::Validation(report) => Some(report),
            _ => None,
        }
    }
}
