//! Error types for the combat core.

use thiserror::Error;

use crate::handle::UnitHandle;
use crate::stats::UnitKind;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Top-level error type for all combat-core errors.
///
/// Simulation-internal failures (dead targets, blocked movement, pool
/// overflow) are policy, not errors, and never surface here; this enum
/// covers misuse of the API surface and malformed data files.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A handle referred to a unit that is not live.
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitHandle),

    /// No archetype is registered for a unit kind.
    #[error("No archetype registered for unit kind {0:?}")]
    UnknownArchetype(UnitKind),

    /// A command was issued to a unit that cannot execute it.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Invalid battle state.
    #[error("Invalid battle state: {0}")]
    InvalidState(String),
}
