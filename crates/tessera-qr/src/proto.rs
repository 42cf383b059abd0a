//! Fixed protobuf schema of the pairing message
//!
//! ```text
//! message PairingMessage {
//!   string session_id         = 1;
//!   string hex_chain_code     = 2;
//!   string initiator_party_id = 3;
//!   string encryption_key_hex = 4;
//!   bool   use_relay          = 5;
//!   string vault_name         = 6;
//!   PairingKind kind          = 7;
//!   repeated string chains    = 8;
//! }
//! ```
//!
//! Tags are part of the wire contract with other clients; never renumber.

/// Ceremony kind as carried on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum PairingKind {
    Keygen = 0,
    KeyImport = 1,
}

/// Pairing message body
#[derive(Clone, PartialEq, prost::Message)]
pub struct PairingMessage {
    #[prost(string, tag = "1")]
    pub session_id: String,
    #[prost(string, tag = "2")]
    pub hex_chain_code: String,
    #[prost(string, tag = "3")]
    pub initiator_party_id: String,
    #[prost(string, tag = "4")]
    pub encryption_key_hex: String,
    #[prost(bool, tag = "5")]
    pub use_relay: bool,
    #[prost(string, tag = "6")]
    pub vault_name: String,
    #[prost(enumeration = "PairingKind", tag = "7")]
    pub kind: i32,
    #[prost(string, repeated, tag = "8")]
    pub chains: Vec<String>,
}
