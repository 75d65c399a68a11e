//! Identity resolver tool
//!
//! Adapters around the `player-identity` pipeline: configuration layering,
//! logging setup, roster fetch, and publishing.

pub mod cli;
pub mod config;
pub mod logging;
pub mod publish;
pub mod runner;
pub mod sleeper;

pub use cli::{Cli, Commands, LookupQuery, ResolveArgs};
pub use config::{load_config, ToolConfig};
pub use logging::initialize_logging;
