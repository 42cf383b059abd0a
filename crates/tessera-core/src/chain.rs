//! Supported chains and their signature algorithms

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::SecretMaterial;

/// Threshold signature algorithm backing a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// secp256k1 ECDSA (Bitcoin, EVM, Cosmos)
    Ecdsa,
    /// Ed25519 EdDSA (Solana, Sui, TON)
    Eddsa,
}

impl SignatureAlgorithm {
    /// Get the human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ecdsa => "ECDSA",
            Self::Eddsa => "EdDSA",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A blockchain a vault can hold a key for
///
/// The string form is the identifier exchanged with peers (pairing payloads,
/// vault records), so it must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Chain {
    Bitcoin,
    BitcoinCash,
    Litecoin,
    Dogecoin,
    Dash,
    Zcash,
    Ethereum,
    Arbitrum,
    Avalanche,
    Base,
    Blast,
    Bsc,
    CronosChain,
    Optimism,
    Polygon,
    Zksync,
    ThorChain,
    MayaChain,
    Cosmos,
    Osmosis,
    Dydx,
    Kujira,
    Terra,
    TerraClassic,
    Noble,
    Akash,
    Ripple,
    Tron,
    Solana,
    Sui,
    Polkadot,
    Ton,
    Cardano,
}

impl Chain {
    /// Every supported chain, in table order
    pub const ALL: &'static [Chain] = &[
        Chain::Bitcoin,
        Chain::BitcoinCash,
        Chain::Litecoin,
        Chain::Dogecoin,
        Chain::Dash,
        Chain::Zcash,
        Chain::Ethereum,
        Chain::Arbitrum,
        Chain::Avalanche,
        Chain::Base,
        Chain::Blast,
        Chain::Bsc,
        Chain::CronosChain,
        Chain::Optimism,
        Chain::Polygon,
        Chain::Zksync,
        Chain::ThorChain,
        Chain::MayaChain,
        Chain::Cosmos,
        Chain::Osmosis,
        Chain::Dydx,
        Chain::Kujira,
        Chain::Terra,
        Chain::TerraClassic,
        Chain::Noble,
        Chain::Akash,
        Chain::Ripple,
        Chain::Tron,
        Chain::Solana,
        Chain::Sui,
        Chain::Polkadot,
        Chain::Ton,
        Chain::Cardano,
    ];

    /// Canonical identifier used on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bitcoin => "Bitcoin",
            Self::BitcoinCash => "Bitcoin-Cash",
            Self::Litecoin => "Litecoin",
            Self::Dogecoin => "Dogecoin",
            Self::Dash => "Dash",
            Self::Zcash => "Zcash",
            Self::Ethereum => "Ethereum",
            Self::Arbitrum => "Arbitrum",
            Self::Avalanche => "Avalanche",
            Self::Base => "Base",
            Self::Blast => "Blast",
            Self::Bsc => "BSC",
            Self::CronosChain => "CronosChain",
            Self::Optimism => "Optimism",
            Self::Polygon => "Polygon",
            Self::Zksync => "Zksync",
            Self::ThorChain => "THORChain",
            Self::MayaChain => "MayaChain",
            Self::Cosmos => "Cosmos",
            Self::Osmosis => "Osmosis",
            Self::Dydx => "Dydx",
            Self::Kujira => "Kujira",
            Self::Terra => "Terra",
            Self::TerraClassic => "TerraClassic",
            Self::Noble => "Noble",
            Self::Akash => "Akash",
            Self::Ripple => "Ripple",
            Self::Tron => "Tron",
            Self::Solana => "Solana",
            Self::Sui => "Sui",
            Self::Polkadot => "Polkadot",
            Self::Ton => "Ton",
            Self::Cardano => "Cardano",
        }
    }

    /// Signature algorithm the chain's keys are generated under
    pub fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            Self::Solana | Self::Sui | Self::Polkadot | Self::Ton | Self::Cardano => {
                SignatureAlgorithm::Eddsa
            }
            _ => SignatureAlgorithm::Ecdsa,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a chain identifier is not in the table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown chain identifier: {0}")]
pub struct UnknownChain(pub String);

impl FromStr for Chain {
    type Err = UnknownChain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Chain::ALL
            .iter()
            .copied()
            .find(|chain| chain.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownChain(s.to_string()))
    }
}

impl TryFrom<String> for Chain {
    type Error = UnknownChain;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Chain> for String {
    fn from(chain: Chain) -> Self {
        chain.name().to_string()
    }
}

/// Request for one per-chain ceremony
#[derive(Debug, Clone)]
pub struct ChainKeyRequest {
    /// Target chain
    pub chain: Chain,
    /// Algorithm the chain key is generated under
    pub algorithm: SignatureAlgorithm,
    /// Chain private key (import flows only)
    pub private_key: Option<SecretMaterial>,
}

impl ChainKeyRequest {
    /// Request a freshly generated key for a chain
    pub fn keygen(chain: Chain) -> Self {
        Self {
            chain,
            algorithm: chain.algorithm(),
            private_key: None,
        }
    }

    /// Request the import of an existing chain private key
    pub fn import(chain: Chain, private_key: SecretMaterial) -> Self {
        Self {
            chain,
            algorithm: chain.algorithm(),
            private_key: Some(private_key),
        }
    }
}
