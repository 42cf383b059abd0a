//! Pairing payload exchanged between devices

use tessera_core::{CeremonyKind, Chain, PartyId, SessionId};

/// Session descriptor shown by the initiating device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrPairingPayload {
    pub session_id: SessionId,
    /// Hex key securing relay messages
    pub encryption_key: String,
    /// Hex chain code shared by the session's ceremonies
    pub chain_code: String,
    pub initiator_party_id: PartyId,
    pub vault_name: String,
    pub chains: Vec<Chain>,
    pub kind: CeremonyKind,
    /// Whether parties meet on the public relay (vs. a local one)
    pub use_relay: bool,
}

