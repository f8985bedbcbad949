//! Error types for roster, ballot, and reconciliation operations.

use thiserror::Error;

/// Errors produced by the core managers and their collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MusterError {
    /// Unknown event, poll, or option.
    #[error("not found: {0}")]
    NotFound(String),
    /// Roster is at capacity; counts are reported without mutation.
    #[error("roster full: {current}/{capacity}")]
    Full {
        /// Participants currently on the roster.
        current: usize,
        /// Fixed roster capacity.
        capacity: usize,
    },
    /// Poll no longer accepts options or votes.
    #[error("poll closed")]
    Closed,
    /// Option title collides with an existing one, ignoring case and surrounding whitespace.
    #[error("duplicate option: {0}")]
    Duplicate(String),
    /// Input rejected before touching storage.
    #[error("invalid input: {0}")]
    Invalid(String),
    /// Storage collaborator failure.
    #[error("storage error: {0}")]
    Storage(String),
    /// Notification collaborator failure.
    #[error("notification error: {0}")]
    Notify(String),
}

impl MusterError {
    /// Whether the error came from the storage collaborator.
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Result alias used throughout the crate.
pub type MusterResult<T> = Result<T, MusterError>;
