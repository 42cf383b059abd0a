//! Tessera Core - Shared types for threshold key ceremonies
//!
//! This crate provides the vocabulary every other Tessera crate speaks:
//! session descriptors, ceremony results, the supported chain table,
//! progress events, the cancellation signal and the error taxonomy.
//!
//! ## Ceremony Model
//!
//! A vault is produced by a strictly ordered series of ceremonies that all
//! share one relay session:
//!
//! ```text
//! master ECDSA ──setup message──► master EdDSA ──► chain[0] ──► chain[1] ──► ...
//! ```
//!
//! Every ceremony yields one `{public key, key share}` pair. Nothing here
//! performs threshold cryptography; that lives behind the ceremony engine
//! trait in `tessera-ceremony`.

pub mod cancel;
pub mod chain;
pub mod error;
pub mod events;
pub mod types;
pub mod vault;

pub use cancel::CancelSignal;
pub use chain::{Chain, ChainKeyRequest, SignatureAlgorithm, UnknownChain};
pub use error::{CeremonyError, CeremonyStage, Result};
pub use events::{
    CeremonyPhase, FnProgress, NoopProgress, PartyJoinEvent, ProgressEvent, ProgressSink,
};
pub use types::{
    CeremonyResult, CeremonySession, KeyShare, PartyId, SecretMaterial, SessionId, SetupMessage,
};
pub use vault::{CeremonyKind, MasterSecret, ThresholdPolicy, VaultRecord};

/// Minimum number of parties in any ceremony
pub const MIN_PARTY_COUNT: u16 = 2;

/// Size in bytes of a BIP32-style chain code
pub const CHAIN_CODE_SIZE: usize = 32;

/// Size in bytes of the symmetric key securing relay messages
pub const ENCRYPTION_KEY_SIZE: usize = 32;
