//! Error types for relay operations

use thiserror::Error;

use tessera_core::CeremonyError;

/// Result type for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Errors that can occur talking to the relay
#[derive(Debug, Error)]
pub enum RelayError {
    /// Transport-level failure (connect, TLS, timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Relay answered with a non-success status
    #[error("Relay returned {status} for {url}")]
    Status { status: u16, url: String },

    /// Response body could not be decoded
    #[error("Malformed relay response: {0}")]
    Decode(String),

    /// Relay is unreachable (simulated or reported)
    #[error("Relay unavailable: {0}")]
    Unavailable(String),

    /// Client misconfiguration
    #[error("Relay configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        RelayError::Decode(e.to_string())
    }
}

impl From<RelayError> for CeremonyError {
    fn from(e: RelayError) -> Self {
        match e {
            RelayError::Config(msg) => CeremonyError::InvalidConfig(msg),
            other => CeremonyError::Network(other.to_string()),
        }
    }
}
