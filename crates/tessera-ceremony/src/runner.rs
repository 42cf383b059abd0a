//! Single-ceremony invocation with output checks

use tokio::time::Instant;
use tracing::{debug, error, info};

use tessera_core::{
    CeremonyError, CeremonySession, CeremonyStage, Result, SecretMaterial, SetupMessage,
    SignatureAlgorithm,
};

use crate::engine::{CeremonyEngine, CeremonyOutcome, EngineError, KeyImportRequest, KeygenRequest};

/// Algorithm a stage must be run with
pub fn stage_algorithm(stage: CeremonyStage) -> SignatureAlgorithm {
    match stage {
        CeremonyStage::MasterEcdsa => SignatureAlgorithm::Ecdsa,
        CeremonyStage::MasterEddsa => SignatureAlgorithm::Eddsa,
        CeremonyStage::Chain(chain) => chain.algorithm(),
    }
}

/// Runs ceremonies for one algorithm through its engine
///
/// Adds no retries: an engine failure ends the ceremony.
pub struct CeremonyRunner<'a> {
    engine: &'a dyn CeremonyEngine,
    algorithm: SignatureAlgorithm,
}

impl<'a> CeremonyRunner<'a> {
    /// Bind a runner to `engine`, which must implement `algorithm`
    pub fn new(engine: &'a dyn CeremonyEngine, algorithm: SignatureAlgorithm) -> Result<Self> {
        if engine.algorithm() != algorithm {
            return Err(CeremonyError::InvalidConfig(format!(
                "{} runner was given an {} engine",
                algorithm,
                engine.algorithm()
            )));
        }
        Ok(Self { engine, algorithm })
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Distributed key generation for `stage`
    pub async fn run_keygen(
        &self,
        stage: CeremonyStage,
        session: &CeremonySession,
        chain_code: &str,
        setup_message: Option<&SetupMessage>,
    ) -> Result<CeremonyOutcome> {
        self.check_stage(stage)?;
        info!("Starting {} keygen in session {}", stage, session.session_id);
        let started = Instant::now();

        let request = KeygenRequest {
            stage,
            session,
            members: session.members(),
            encryption_key: &session.encryption_key,
            chain_code,
            setup_message,
        };
        let outcome = self.engine.keygen(request).await;

        self.finish(stage, chain_code, outcome, started)
    }

    /// Key import for `stage`
    pub async fn run_key_import(
        &self,
        stage: CeremonyStage,
        session: &CeremonySession,
        private_key: &SecretMaterial,
        chain_code: &str,
        setup_message: Option<&SetupMessage>,
    ) -> Result<CeremonyOutcome> {
        self.check_stage(stage)?;
        info!("Starting {} key import in session {}", stage, session.session_id);
        let started = Instant::now();

        let request = KeyImportRequest {
            stage,
            session,
            members: session.members(),
            encryption_key: &session.encryption_key,
            chain_code,
            setup_message,
            private_key,
        };
        let outcome = self.engine.key_import(request).await;

        self.finish(stage, chain_code, outcome, started)
    }

    fn check_stage(&self, stage: CeremonyStage) -> Result<()> {
        let expected = stage_algorithm(stage);
        if expected != self.algorithm {
            return Err(CeremonyError::ceremony(
                stage,
                format!("needs {} but runner is {}", expected, self.algorithm),
            ));
        }
        Ok(())
    }

    fn finish(
        &self,
        stage: CeremonyStage,
        chain_code: &str,
        outcome: std::result::Result<CeremonyOutcome, EngineError>,
        started: Instant,
    ) -> Result<CeremonyOutcome> {
        let mut outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("{} ceremony failed: {}", stage, e);
                return Err(CeremonyError::ceremony(stage, e.0));
            }
        };

        if let Err(reason) = check_outcome(&outcome) {
            error!("{} ceremony returned malformed output: {}", stage, reason);
            return Err(CeremonyError::ceremony(stage, reason));
        }

        if outcome.result.chain_code.is_empty() {
            debug!("{} ceremony kept the requested chain code", stage);
            outcome.result.chain_code = chain_code.to_string();
        }

        info!(
            "{} ceremony finished in {:?}, public key {}",
            stage,
            started.elapsed(),
            outcome.result.public_key
        );
        Ok(outcome)
    }
}

fn check_outcome(outcome: &CeremonyOutcome) -> std::result::Result<(), String> {
    let result = &outcome.result;
    if result.public_key.is_empty() {
        return Err("empty public key".to_string());
    }
    if hex::decode(&result.public_key).is_err() {
        return Err(format!("public key is not hex: {}", result.public_key));
    }
    if result.key_share.is_empty() {
        return Err("empty key share".to_string());
    }
    if !result.chain_code.is_empty() && hex::decode(&result.chain_code).is_err() {
        return Err("chain code is not hex".to_string());
    }
    Ok(())
}
