//! Error types
//!
//! Simulation itself never fails: the stepper and win conditions are total.
//! What can fail is loading data, rewinding without history, and talking to
//! external services.

use thiserror::Error;

/// Result alias for fallible crate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level errors (catalog, settings, storage)
#[derive(Debug, Error)]
pub enum Error {
    /// Level catalog or settings JSON could not be parsed
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A level id that the catalog does not contain
    #[error("unknown level `{0}`")]
    UnknownLevel(String),

    /// A settings field outside its valid range
    #[error("invalid setting `{name}`: {reason}")]
    InvalidSetting {
        name: &'static str,
        reason: String,
    },

    /// A level definition that cannot be played
    #[error("invalid level `{id}`: {reason}")]
    InvalidLevel { id: String, reason: String },

    /// The key-value store rejected a read or write
    #[error("storage error: {0}")]
    Storage(String),
}

/// Why a rewind request did not restore anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RewindError {
    /// Rewind is only accepted while the level is running
    #[error("rewind requested while the level is not running")]
    NotRunning,
    /// All rewind charges have been spent
    #[error("no rewind charges left")]
    NoCharges,
    /// History holds no snapshot to restore (charge refunded)
    #[error("no snapshot available to rewind to")]
    NoSnapshot,
}

/// Hint generation failures; never reach the simulation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HintError {
    /// The level has no hint prompt configured
    #[error("level has no hint prompt")]
    MissingPrompt,
    /// The text service reported an error
    #[error("hint service error: {0}")]
    Service(String),
    /// The text service answered with nothing usable
    #[error("hint service returned no text")]
    Empty,
}
