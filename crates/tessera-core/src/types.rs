//! Session descriptors, identifiers and ceremony results

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{CeremonyError, Result};
use crate::MIN_PARTY_COUNT;

/// Identifier of one party in a ceremony (e.g. `"iphone-4821"`, `"Server-1172"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(String);

impl PartyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PartyId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PartyId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque relay session token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Topology parameters produced by the master ECDSA ceremony
///
/// Handed to the master EdDSA ceremony of the same session so both
/// algorithms share one party layout without a second discovery round.
#[derive(Clone, PartialEq, Eq)]
pub struct SetupMessage(Vec<u8>);

impl SetupMessage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SetupMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SetupMessage({} bytes)", self.0.len())
    }
}

/// Secret key share produced by one ceremony
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyShare {
    #[serde(with = "hex::serde")]
    data: Vec<u8>,
}

impl KeyShare {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for KeyShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyShare")
            .field("data", &"[REDACTED]")
            .field("len", &self.data.len())
            .finish()
    }
}

impl Zeroize for KeyShare {
    fn zeroize(&mut self) {
        self.data.zeroize();
    }
}

impl Drop for KeyShare {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Hex-encoded private key material supplied by an import flow
///
/// EdDSA material is expected pre-clamped by the upstream key deriver.
#[derive(Clone)]
pub struct SecretMaterial(String);

impl SecretMaterial {
    /// Wrap hex key material, rejecting empty or non-hex input
    pub fn from_hex(hex_key: impl Into<String>) -> Result<Self> {
        let hex_key = hex_key.into();
        if hex_key.is_empty() {
            return Err(CeremonyError::InvalidConfig(
                "Private key material is empty".to_string(),
            ));
        }
        if hex::decode(&hex_key).is_err() {
            return Err(CeremonyError::InvalidConfig(
                "Private key material is not valid hex".to_string(),
            ));
        }
        Ok(Self(hex_key))
    }

    pub fn expose_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretMaterial([REDACTED])")
    }
}

impl Zeroize for SecretMaterial {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Drop for SecretMaterial {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// One relay session shared by every ceremony of a vault attempt
///
/// Never reused: a failed attempt needs a brand-new session.
#[derive(Clone)]
pub struct CeremonySession {
    pub session_id: SessionId,
    pub relay_url: String,
    pub local_party_id: PartyId,
    pub required_party_count: u16,
    members: Vec<PartyId>,
    /// Hex symmetric key securing relay messages
    pub encryption_key: String,
    /// Hex chain code shared across the session's ceremonies
    pub chain_code: String,
}

impl CeremonySession {
    /// Create a session descriptor with only the local party as member
    pub fn new(
        session_id: SessionId,
        relay_url: impl Into<String>,
        local_party_id: PartyId,
        required_party_count: u16,
        encryption_key: impl Into<String>,
        chain_code: impl Into<String>,
    ) -> Result<Self> {
        if required_party_count < MIN_PARTY_COUNT {
            return Err(CeremonyError::InvalidConfig(format!(
                "Required party count must be >= {}, got {}",
                MIN_PARTY_COUNT, required_party_count
            )));
        }
        Ok(Self {
            session_id,
            relay_url: relay_url.into(),
            members: vec![local_party_id.clone()],
            local_party_id,
            required_party_count,
            encryption_key: encryption_key.into(),
            chain_code: chain_code.into(),
        })
    }

    /// Ordered member list (share indexing depends on this order)
    pub fn members(&self) -> &[PartyId] {
        &self.members
    }

    /// Members other than the local party, in member order
    pub fn peers(&self) -> Vec<PartyId> {
        self.members
            .iter()
            .filter(|m| **m != self.local_party_id)
            .cloned()
            .collect()
    }

    /// Replace the member list with the barrier's ordered result
    pub fn set_members(&mut self, members: Vec<PartyId>) -> Result<()> {
        let mut seen = HashSet::with_capacity(members.len());
        if !members.iter().all(|m| seen.insert(m)) {
            return Err(CeremonyError::InvalidConfig(
                "Member list contains duplicates".to_string(),
            ));
        }
        if !seen.contains(&self.local_party_id) {
            return Err(CeremonyError::InvalidConfig(format!(
                "Member list is missing local party {}",
                self.local_party_id
            )));
        }
        if members.len() < self.required_party_count as usize {
            return Err(CeremonyError::InvalidConfig(format!(
                "Member list has {} parties, need {}",
                members.len(),
                self.required_party_count
            )));
        }
        self.members = members;
        Ok(())
    }
}

impl fmt::Debug for CeremonySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CeremonySession")
            .field("session_id", &self.session_id)
            .field("relay_url", &self.relay_url)
            .field("local_party_id", &self.local_party_id)
            .field("required_party_count", &self.required_party_count)
            .field("members", &self.members)
            .field("encryption_key", &"[REDACTED]")
            .field("chain_code", &self.chain_code)
            .finish()
    }
}

/// Output of one ceremony
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CeremonyResult {
    /// Hex-encoded group public key
    pub public_key: String,
    /// This party's secret share
    pub key_share: KeyShare,
    /// Hex chain code confirmed or produced by the ceremony
    pub chain_code: String,
}
