//! Error taxonomy for key ceremonies

use std::fmt;

use thiserror::Error;

use crate::chain::Chain;

/// Result type for ceremony operations
pub type Result<T> = std::result::Result<T, CeremonyError>;

/// The ceremony a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CeremonyStage {
    /// Master ECDSA ceremony (always first)
    MasterEcdsa,
    /// Master EdDSA ceremony (bootstrapped from the ECDSA setup message)
    MasterEddsa,
    /// Per-chain ceremony
    Chain(Chain),
}

impl fmt::Display for CeremonyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MasterEcdsa => f.write_str("master ECDSA"),
            Self::MasterEddsa => f.write_str("master EdDSA"),
            Self::Chain(chain) => write!(f, "chain {}", chain),
        }
    }
}

/// Errors that can occur while coordinating a key ceremony
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CeremonyError {
    /// Client misuse, detected before any network call
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A peer or completion barrier exceeded its deadline
    #[error("Timed out with {joined_count} of {required_count} parties")]
    Timeout {
        joined_count: usize,
        required_count: usize,
    },

    /// Cancellation was observed; any in-progress result was discarded
    #[error("Ceremony aborted")]
    Aborted,

    /// The ceremony engine reported a terminal error
    #[error("{stage} ceremony failed: {reason}")]
    CeremonyFailed { stage: CeremonyStage, reason: String },

    /// Relay fault that outlived the caller's tolerance
    #[error("Network error: {0}")]
    Network(String),

    /// A pairing payload could not be parsed
    #[error("Invalid pairing payload: {0}")]
    InvalidPayload(String),
}

impl CeremonyError {
    /// Shorthand for a ceremony failure
    pub fn ceremony(stage: CeremonyStage, reason: impl Into<String>) -> Self {
        Self::CeremonyFailed {
            stage,
            reason: reason.into(),
        }
    }

    /// Whether a fresh attempt (with a brand-new session) may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Network(_))
    }
}
