//! Scheduling service error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulingError {
    /// Network failure or timeout
    #[error("scheduling request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("scheduling service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Success status, but a field we rely on is missing
    #[error("unexpected scheduling response: {0}")]
    Malformed(String),

    /// The configured slug matches none of the account's event types.
    /// Configuration problem, not worth retrying.
    #[error("no active event type matches slug {0:?}")]
    EventTypeNotFound(String),
}

impl SchedulingError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::EventTypeNotFound(_))
    }
}
