//! # Error Types
//!
//! Top-level error hierarchy for the concierge platform, derived with
//! `thiserror`. Rejected status changes are not represented here; they are
//! `concierge_state::IllegalTransition`, which keeps the raw value pair.

use thiserror::Error;

/// Top-level error type for the concierge platform.
#[derive(Error, Debug)]
pub enum ConciergeError {
    /// Input failed validation (malformed identifier, timestamp, etc.).
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ConciergeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
