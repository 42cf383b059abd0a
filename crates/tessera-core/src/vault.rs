//! Vault records and the policy they are created under

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::error::{CeremonyError, Result};
use crate::types::{KeyShare, PartyId, SecretMaterial};
use crate::MIN_PARTY_COUNT;

/// Which kind of ceremony produced (or will produce) a vault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CeremonyKind {
    /// Fresh distributed key generation
    FreshKeygen,
    /// Distribution of externally supplied key material into shares
    KeyImport,
}

/// Threshold policy for a vault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    /// Minimum signers required
    pub threshold: u16,
    /// Total parties holding a share
    pub party_count: u16,
}

impl ThresholdPolicy {
    pub fn new(threshold: u16, party_count: u16) -> Self {
        Self {
            threshold,
            party_count,
        }
    }

    /// 2-of-2 between a device and a server
    pub fn two_of_two() -> Self {
        Self::new(2, 2)
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<()> {
        if self.party_count < MIN_PARTY_COUNT {
            return Err(CeremonyError::InvalidConfig(format!(
                "Party count must be >= {}, got {}",
                MIN_PARTY_COUNT, self.party_count
            )));
        }
        if self.threshold == 0 {
            return Err(CeremonyError::InvalidConfig(
                "Threshold must be >= 1".to_string(),
            ));
        }
        if self.threshold > self.party_count {
            return Err(CeremonyError::InvalidConfig(format!(
                "Threshold {} must be <= party count {}",
                self.threshold, self.party_count
            )));
        }
        Ok(())
    }

    /// Whether this is a device + server flow (short peer wait)
    pub fn is_two_party(&self) -> bool {
        self.party_count == 2
    }
}

/// Master key material for an import flow
#[derive(Debug, Clone)]
pub struct MasterSecret {
    /// secp256k1 master private key (hex)
    pub ecdsa: SecretMaterial,
    /// Ed25519 master scalar (hex, pre-clamped)
    pub eddsa: SecretMaterial,
    /// Root chain code from the deriver; generated when absent
    pub chain_code: Option<String>,
}

/// Output of a completed vault ceremony, ready for the vault codec
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultRecord {
    pub name: String,
    pub public_key_ecdsa: String,
    pub public_key_eddsa: String,
    pub hex_chain_code: String,
    pub ecdsa_share: KeyShare,
    pub eddsa_share: KeyShare,
    pub chain_public_keys: BTreeMap<Chain, String>,
    pub chain_key_shares: BTreeMap<Chain, KeyShare>,
    /// Member order used for share indexing
    pub signers: Vec<PartyId>,
    pub local_party_id: PartyId,
    pub threshold: u16,
    pub kind: CeremonyKind,
    pub created_at: DateTime<Utc>,
}

impl VaultRecord {
    /// Chains this vault holds a dedicated key for
    pub fn chains(&self) -> Vec<Chain> {
        self.chain_public_keys.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_validation() {
        assert!(ThresholdPolicy::two_of_two().validate().is_ok());
        assert!(ThresholdPolicy::new(2, 3).validate().is_ok());
        assert!(ThresholdPolicy::new(3, 2).validate().is_err());
        assert!(ThresholdPolicy::new(1, 1).validate().is_err());
        assert!(ThresholdPolicy::new(0, 3).validate().is_err());
    }

    #[test]
    fn test_vault_record_serializes_chain_names() {
        let mut chain_public_keys = BTreeMap::new();
        chain_public_keys.insert(Chain::Bitcoin, "02ab".to_string());
        let mut chain_key_shares = BTreeMap::new();
        chain_key_shares.insert(Chain::Bitcoin, KeyShare::new(vec![9, 9]));

        let record = VaultRecord {
            name: "Main".to_string(),
            public_key_ecdsa: "02aa".to_string(),
            public_key_eddsa: "bb".to_string(),
            hex_chain_code: "cc".to_string(),
            ecdsa_share: KeyShare::new(vec![1]),
            eddsa_share: KeyShare::new(vec![2]),
            chain_public_keys,
            chain_key_shares,
            signers: vec!["a".into(), "b".into()],
            local_party_id: "a".into(),
            threshold: 2,
            kind: CeremonyKind::KeyImport,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["chain_public_keys"]["Bitcoin"], "02ab");
        assert_eq!(json["chain_key_shares"]["Bitcoin"]["data"], "0909");
        assert_eq!(record.chains(), vec![Chain::Bitcoin]);
    }
}
