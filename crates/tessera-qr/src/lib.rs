//! Tessera QR - Pairing payloads for multi-device ceremonies
//!
//! The initiating device shows a QR code; a joining device scans it and
//! learns everything needed to enter the same relay session.
//!
//! # Wire format
//!
//! ```text
//! <scheme>://?type=NewVault&tssType=Keygen&jsonData=<urlencode(base64(lzma(protobuf)))>
//! ```
//!
//! The protobuf schema is fixed (see [`proto`]); compression keeps payloads
//! with long chain lists within a single QR code.
//!
//! # Example
//!
//! ```ignore
//! use tessera_qr::{PairingCodec, QrPairingPayload};
//!
//! let codec = PairingCodec::default();
//! let uri = codec.encode(&payload)?;
//! let scanned = codec.decode(&uri)?;
//! assert_eq!(scanned, payload);
//! ```

pub mod codec;
pub mod error;
pub mod payload;
pub mod proto;

#[cfg(feature = "render")]
pub mod render;

pub use codec::{PairingCodec, DEFAULT_SCHEME, MAX_PAYLOAD_SIZE};
pub use error::{QrError, Result};
pub use payload::QrPairingPayload;
