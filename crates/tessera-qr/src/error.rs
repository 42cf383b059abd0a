//! Error types for pairing payloads

use thiserror::Error;

use tessera_core::CeremonyError;

/// Result type for pairing operations
pub type Result<T> = std::result::Result<T, QrError>;

/// Errors that can occur encoding or decoding a pairing payload
#[derive(Debug, Error)]
pub enum QrError {
    /// URI does not start with the expected scheme
    #[error("Missing {0}:// prefix")]
    MissingScheme(String),

    /// URI carries no `jsonData` parameter
    #[error("Missing jsonData parameter")]
    MissingData,

    /// Base64 layer is malformed
    #[error("Base64 decode: {0}")]
    Base64(#[from] base64::DecodeError),

    /// LZMA compression failed
    #[error("Compression failed: {0}")]
    Compression(String),

    /// LZMA stream is malformed
    #[error("Decompression failed: {0}")]
    Decompression(String),

    /// Protobuf layer is malformed
    #[error("Protobuf decode: {0}")]
    Protobuf(#[from] prost::DecodeError),

    /// A decoded field is missing or invalid
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// QR image generation failed
    #[error("QR render: {0}")]
    Render(String),
}

impl From<QrError> for CeremonyError {
    fn from(e: QrError) -> Self {
        CeremonyError::InvalidPayload(e.to_string())
    }
}
