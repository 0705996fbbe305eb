//! Error taxonomy for ride replay operations

use thiserror::Error;

/// Errors surfaced by track sources, track validation and clock mutators
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplayError {
    /// The ride identifier does not resolve to a track
    #[error("ride '{ride_id}' not found")]
    NotFound { ride_id: String },

    /// The track violates a structural invariant and cannot be replayed
    #[error("ride '{ride_id}' has a malformed track: {reason}")]
    MalformedTrack { ride_id: String, reason: String },

    /// A mutator was called with an argument outside its domain
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Engine or server configuration failed validation
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl ReplayError {
    pub fn not_found(ride_id: impl Into<String>) -> Self {
        Self::NotFound {
            ride_id: ride_id.into(),
        }
    }

    pub fn malformed(ride_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedTrack {
            ride_id: ride_id.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReplayError>;
