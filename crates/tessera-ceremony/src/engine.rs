//! Boundary to the threshold cryptography
//!
//! A [`CeremonyEngine`] runs the actual multi-round protocol for one
//! signature algorithm over the relay session. Engines are expected to
//! absorb transient relay faults themselves; whatever they return is final.

use async_trait::async_trait;
use thiserror::Error;

use tessera_core::{
    CeremonyResult, CeremonySession, CeremonyStage, PartyId, SecretMaterial, SetupMessage,
    SignatureAlgorithm,
};

/// Terminal failure reported by an engine
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Inputs of a fresh distributed key generation
#[derive(Debug, Clone, Copy)]
pub struct KeygenRequest<'a> {
    pub stage: CeremonyStage,
    pub session: &'a CeremonySession,
    /// Ordered members; share indices follow this order
    pub members: &'a [PartyId],
    pub encryption_key: &'a str,
    pub chain_code: &'a str,
    /// Topology from the master ECDSA ceremony (master EdDSA only)
    pub setup_message: Option<&'a SetupMessage>,
}

/// Inputs of a key import
#[derive(Debug, Clone, Copy)]
pub struct KeyImportRequest<'a> {
    pub stage: CeremonyStage,
    pub session: &'a CeremonySession,
    pub members: &'a [PartyId],
    pub encryption_key: &'a str,
    pub chain_code: &'a str,
    pub setup_message: Option<&'a SetupMessage>,
    /// Key material to split into shares
    pub private_key: &'a SecretMaterial,
}

/// What one ceremony produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CeremonyOutcome {
    pub result: CeremonyResult,
    /// Present when the ceremony established the session topology
    pub setup_message: Option<SetupMessage>,
}

impl CeremonyOutcome {
    pub fn new(result: CeremonyResult) -> Self {
        Self {
            result,
            setup_message: None,
        }
    }

    pub fn with_setup_message(mut self, setup_message: SetupMessage) -> Self {
        self.setup_message = Some(setup_message);
        self
    }
}

/// Threshold ceremony implementation for one signature algorithm
#[async_trait]
pub trait CeremonyEngine: Send + Sync {
    /// Algorithm this engine produces keys for
    fn algorithm(&self) -> SignatureAlgorithm;

    /// Run a distributed key generation
    async fn keygen(&self, request: KeygenRequest<'_>) -> Result<CeremonyOutcome, EngineError>;

    /// Split existing key material into shares
    async fn key_import(
        &self,
        request: KeyImportRequest<'_>,
    ) -> Result<CeremonyOutcome, EngineError>;
}
