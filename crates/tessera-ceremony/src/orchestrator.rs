//! End-to-end vault creation and import
//!
//! ```text
//! validate ─► create/join session ─► peer barrier ─► master ECDSA
//!                                                        │ setup message
//!                                                        ▼
//!            vault record ◄─ completion ◄─ chains[..] ◄─ master EdDSA
//! ```
//!
//! Every step after validation is preceded by a cancellation checkpoint.
//! Any failure before the completion barrier ends the attempt without a
//! vault; the session is never reused.

use std::collections::{BTreeMap, HashSet};

use rand::RngCore;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use tessera_core::{
    CancelSignal, CeremonyError, CeremonyKind, CeremonyPhase, CeremonyResult, CeremonySession,
    CeremonyStage, Chain, ChainKeyRequest, KeyShare, MasterSecret, PartyId, ProgressSink, Result,
    SecretMaterial, SessionId, SetupMessage, SignatureAlgorithm, ThresholdPolicy, VaultRecord,
    CHAIN_CODE_SIZE, ENCRYPTION_KEY_SIZE,
};
use tessera_qr::QrPairingPayload;
use tessera_relay::{CompletionBarrier, MemberOrdering, PeerBarrier};

use crate::context::CoordinatorContext;
use crate::engine::CeremonyOutcome;
use crate::progress::{ProgressPlan, ProgressReporter};
use crate::runner::{stage_algorithm, CeremonyRunner};
use crate::sequence::CeremonySequence;

/// How the local party enters the session
#[derive(Debug, Clone)]
pub enum CeremonyRole {
    /// Creates the session and shows the pairing QR code
    Initiator,
    /// Joins the session described by a scanned QR code
    Joiner(QrPairingPayload),
}

impl CeremonyRole {
    /// Member ordering convention of this role
    pub fn ordering(&self) -> MemberOrdering {
        match self {
            Self::Initiator => MemberOrdering::LocalFirst,
            Self::Joiner(_) => MemberOrdering::Lexicographic,
        }
    }
}

/// Everything needed to produce one vault
#[derive(Debug, Clone)]
pub struct VaultRequest {
    pub vault_name: String,
    pub local_party_id: PartyId,
    pub policy: ThresholdPolicy,
    /// Present for key import, absent for fresh keygen
    pub master_secret: Option<MasterSecret>,
    /// Chain ceremonies, run in this order after the masters
    pub chains: Vec<ChainKeyRequest>,
    pub role: CeremonyRole,
}

impl VaultRequest {
    /// Fresh keygen as the initiator
    pub fn keygen(
        vault_name: impl Into<String>,
        local_party_id: PartyId,
        policy: ThresholdPolicy,
    ) -> Self {
        Self {
            vault_name: vault_name.into(),
            local_party_id,
            policy,
            master_secret: None,
            chains: Vec::new(),
            role: CeremonyRole::Initiator,
        }
    }

    /// Key import as the initiator
    pub fn import(
        vault_name: impl Into<String>,
        local_party_id: PartyId,
        policy: ThresholdPolicy,
        master_secret: MasterSecret,
    ) -> Self {
        Self {
            master_secret: Some(master_secret),
            ..Self::keygen(vault_name, local_party_id, policy)
        }
    }

    pub fn with_chains(mut self, chains: Vec<ChainKeyRequest>) -> Self {
        self.chains = chains;
        self
    }

    pub fn with_role(mut self, role: CeremonyRole) -> Self {
        self.role = role;
        self
    }

    pub fn kind(&self) -> CeremonyKind {
        if self.master_secret.is_some() {
            CeremonyKind::KeyImport
        } else {
            CeremonyKind::FreshKeygen
        }
    }

    /// Check the request before touching the network
    pub fn validate(&self) -> Result<()> {
        self.policy.validate()?;

        if self.vault_name.trim().is_empty() {
            return Err(invalid("Vault name must not be empty"));
        }
        if self.local_party_id.as_str().is_empty() {
            return Err(invalid("Local party id must not be empty"));
        }

        let kind = self.kind();
        let mut seen = HashSet::new();
        for request in &self.chains {
            if !seen.insert(request.chain) {
                return Err(invalid(format!("Chain {} requested twice", request.chain)));
            }
            if request.algorithm != request.chain.algorithm() {
                return Err(invalid(format!(
                    "Chain {} uses {}, not {}",
                    request.chain,
                    request.chain.algorithm(),
                    request.algorithm
                )));
            }
            match (kind, &request.private_key) {
                (CeremonyKind::KeyImport, None) => {
                    return Err(invalid(format!(
                        "Key import needs a private key for {}",
                        request.chain
                    )))
                }
                (CeremonyKind::FreshKeygen, Some(_)) => {
                    return Err(invalid(format!(
                        "Keygen must not carry a private key for {}",
                        request.chain
                    )))
                }
                _ => {}
            }
        }

        if let Some(chain_code) = self
            .master_secret
            .as_ref()
            .and_then(|secret| secret.chain_code.as_deref())
        {
            check_hex("Master chain code", chain_code, CHAIN_CODE_SIZE)?;
        }

        if let CeremonyRole::Joiner(payload) = &self.role {
            if payload.kind != kind {
                return Err(invalid(format!(
                    "Pairing code is for {:?}, request is {:?}",
                    payload.kind, kind
                )));
            }
            if payload.initiator_party_id == self.local_party_id {
                return Err(invalid("Joiner cannot reuse the initiator's party id"));
            }
            let requested: Vec<Chain> = self.chains.iter().map(|c| c.chain).collect();
            if requested != payload.chains {
                return Err(invalid(format!(
                    "Requested chains {:?} differ from the session's {:?}",
                    requested, payload.chains
                )));
            }
            check_hex("Session encryption key", &payload.encryption_key, ENCRYPTION_KEY_SIZE)?;
            check_hex("Session chain code", &payload.chain_code, CHAIN_CODE_SIZE)?;
        }

        Ok(())
    }
}

/// Key material produced by the ceremonies of one session
struct KeyMaterial {
    ecdsa: CeremonyResult,
    eddsa: CeremonyResult,
    chain_public_keys: BTreeMap<Chain, String>,
    chain_key_shares: BTreeMap<Chain, KeyShare>,
}

/// Drives one vault attempt from validation to the finished record
pub struct KeyCeremonyOrchestrator<'c> {
    ctx: &'c CoordinatorContext,
}

impl<'c> KeyCeremonyOrchestrator<'c> {
    pub fn new(ctx: &'c CoordinatorContext) -> Self {
        Self { ctx }
    }

    /// Run the full flow for `request`
    ///
    /// Fails with `InvalidConfig` before any network call, `Timeout` when
    /// peers never show up, `Aborted` once `cancel` fires and
    /// `CeremonyFailed` when an engine fails. Peers that never confirm
    /// completion only produce a warning.
    pub async fn run(
        &self,
        request: &VaultRequest,
        cancel: &CancelSignal,
        progress: &dyn ProgressSink,
    ) -> Result<VaultRecord> {
        let mut reporter = ProgressReporter::new(progress, ProgressPlan::new(request.chains.len()));

        reporter.report(CeremonyPhase::Validation, 0.0, "Validating request");
        request.validate()?;
        reporter.report(CeremonyPhase::Validation, 1.0, "Request is valid");

        cancel.check()?;
        let mut session = self.open_session(request, &mut reporter).await?;

        cancel.check()?;
        let members = self
            .await_peers(request, &session, cancel, &mut reporter)
            .await?;
        session.set_members(members)?;

        if matches!(request.role, CeremonyRole::Initiator) {
            self.publish_members(&session, request.policy.party_count, cancel)
                .await?;
        }

        let keys = self
            .run_ceremonies(request, &session, cancel, &mut reporter)
            .await?;

        cancel.check()?;
        reporter.report(CeremonyPhase::Finalization, 0.0, "Confirming with peers");
        let all_confirmed = self.confirm_completion(&session, cancel).await?;

        if matches!(request.role, CeremonyRole::Initiator) && self.ctx.config().end_session_on_finish
        {
            self.end_session(&session, all_confirmed, cancel).await;
        }

        let record = VaultRecord {
            name: request.vault_name.clone(),
            public_key_ecdsa: keys.ecdsa.public_key,
            public_key_eddsa: keys.eddsa.public_key,
            hex_chain_code: keys.ecdsa.chain_code,
            ecdsa_share: keys.ecdsa.key_share,
            eddsa_share: keys.eddsa.key_share,
            chain_public_keys: keys.chain_public_keys,
            chain_key_shares: keys.chain_key_shares,
            signers: session.members().to_vec(),
            local_party_id: session.local_party_id.clone(),
            threshold: request.policy.threshold,
            kind: request.kind(),
            created_at: chrono::Utc::now(),
        };

        reporter.report(CeremonyPhase::Complete, 1.0, "Vault ready");
        info!(
            "Vault '{}' ready: {} signers, {} chain keys",
            record.name,
            record.signers.len(),
            record.chain_public_keys.len()
        );
        Ok(record)
    }

    async fn open_session(
        &self,
        request: &VaultRequest,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<CeremonySession> {
        let relay_url = self.ctx.config().relay_url.clone();
        let relay = self.ctx.relay();

        match &request.role {
            CeremonyRole::Initiator => {
                let chain_code = request
                    .master_secret
                    .as_ref()
                    .and_then(|secret| secret.chain_code.clone())
                    .unwrap_or_else(|| random_hex(CHAIN_CODE_SIZE));
                let session = CeremonySession::new(
                    SessionId::new(Uuid::new_v4().to_string()),
                    relay_url,
                    request.local_party_id.clone(),
                    request.policy.party_count,
                    random_hex(ENCRYPTION_KEY_SIZE),
                    chain_code,
                )?;

                reporter.report(CeremonyPhase::SessionSetup, 0.0, "Creating relay session");
                relay
                    .create_session(&session.session_id, session.members())
                    .await?;
                info!("Created session {}", session.session_id);

                let payload = QrPairingPayload {
                    session_id: session.session_id.clone(),
                    encryption_key: session.encryption_key.clone(),
                    chain_code: session.chain_code.clone(),
                    initiator_party_id: session.local_party_id.clone(),
                    vault_name: request.vault_name.clone(),
                    chains: request.chains.iter().map(|c| c.chain).collect(),
                    kind: request.kind(),
                    use_relay: true,
                };
                let uri = self.ctx.pairing_codec().encode(&payload)?;
                reporter.report(CeremonyPhase::SessionSetup, 1.0, uri);
                Ok(session)
            }
            CeremonyRole::Joiner(payload) => {
                let session = CeremonySession::new(
                    payload.session_id.clone(),
                    relay_url,
                    request.local_party_id.clone(),
                    request.policy.party_count,
                    payload.encryption_key.clone(),
                    payload.chain_code.clone(),
                )?;

                reporter.report(CeremonyPhase::SessionSetup, 0.0, "Joining relay session");
                relay
                    .join_session(&session.session_id, &session.local_party_id)
                    .await?;
                info!(
                    "Joined session {} started by {}",
                    session.session_id, payload.initiator_party_id
                );
                reporter.report(
                    CeremonyPhase::SessionSetup,
                    1.0,
                    format!("Joined session {}", session.session_id),
                );
                Ok(session)
            }
        }
    }

    async fn await_peers(
        &self,
        request: &VaultRequest,
        session: &CeremonySession,
        cancel: &CancelSignal,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<Vec<PartyId>> {
        let required = usize::from(request.policy.party_count);
        reporter.report(
            CeremonyPhase::PeerDiscovery,
            1.0 / required as f64,
            format!("Waiting for {} parties", required),
        );

        let barrier = PeerBarrier::new(
            self.ctx.relay(),
            self.ctx.join_settings(request.policy.party_count),
        );
        barrier
            .wait(
                &session.session_id,
                &session.local_party_id,
                required,
                request.role.ordering(),
                cancel,
                |event| {
                    reporter.report(
                        CeremonyPhase::PeerDiscovery,
                        event.total_joined as f64 / event.required_count as f64,
                        format!(
                            "{} joined ({}/{})",
                            event.party_id, event.total_joined, event.required_count
                        ),
                    );
                },
            )
            .await
    }

    async fn run_ceremonies(
        &self,
        request: &VaultRequest,
        session: &CeremonySession,
        cancel: &CancelSignal,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<KeyMaterial> {
        let chains: Vec<Chain> = request.chains.iter().map(|c| c.chain).collect();
        let mut sequence = CeremonySequence::new(&chains);
        let secret = request.master_secret.as_ref();

        cancel.check()?;
        reporter.report(CeremonyPhase::MasterEcdsa, 0.0, "Generating master ECDSA key");
        let ecdsa = self
            .run_stage(
                &mut sequence,
                CeremonyStage::MasterEcdsa,
                session,
                secret.map(|s| &s.ecdsa),
                &session.chain_code,
                None,
            )
            .await?;
        let setup_message = ecdsa.setup_message.ok_or_else(|| {
            CeremonyError::ceremony(CeremonyStage::MasterEcdsa, "no setup message returned")
        })?;
        let ecdsa = ecdsa.result;
        reporter.report(CeremonyPhase::MasterEcdsa, 1.0, "Master ECDSA key ready");

        cancel.check()?;
        reporter.report(CeremonyPhase::MasterEddsa, 0.0, "Generating master EdDSA key");
        let eddsa = self
            .run_stage(
                &mut sequence,
                CeremonyStage::MasterEddsa,
                session,
                secret.map(|s| &s.eddsa),
                &ecdsa.chain_code,
                Some(&setup_message),
            )
            .await?
            .result;
        reporter.report(CeremonyPhase::MasterEddsa, 1.0, "Master EdDSA key ready");

        let mut chain_public_keys = BTreeMap::new();
        let mut chain_key_shares = BTreeMap::new();
        for (index, chain_request) in request.chains.iter().enumerate() {
            cancel.check()?;
            let chain = chain_request.chain;
            reporter.report_chain(index, chain, 0.0, format!("Generating {} key", chain));

            let master_chain_code = match chain_request.algorithm {
                SignatureAlgorithm::Ecdsa => &ecdsa.chain_code,
                SignatureAlgorithm::Eddsa => &eddsa.chain_code,
            };
            let CeremonyResult {
                public_key,
                key_share,
                ..
            } = self
                .run_stage(
                    &mut sequence,
                    CeremonyStage::Chain(chain),
                    session,
                    chain_request.private_key.as_ref(),
                    master_chain_code,
                    None,
                )
                .await?
                .result;

            chain_public_keys.insert(chain, public_key);
            chain_key_shares.insert(chain, key_share);
            reporter.report_chain(index, chain, 1.0, format!("{} key ready", chain));
        }

        debug!(
            "Ran {}/{} ceremonies in session {}",
            sequence.completed(),
            sequence.total(),
            session.session_id
        );
        Ok(KeyMaterial {
            ecdsa,
            eddsa,
            chain_public_keys,
            chain_key_shares,
        })
    }

    async fn run_stage(
        &self,
        sequence: &mut CeremonySequence,
        stage: CeremonyStage,
        session: &CeremonySession,
        private_key: Option<&SecretMaterial>,
        chain_code: &str,
        setup_message: Option<&SetupMessage>,
    ) -> Result<CeremonyOutcome> {
        let algorithm = stage_algorithm(stage);
        let runner = CeremonyRunner::new(self.ctx.engine(algorithm), algorithm)?;

        sequence.begin(stage)?;
        let outcome = match private_key {
            Some(key) => {
                runner
                    .run_key_import(stage, session, key, chain_code, setup_message)
                    .await?
            }
            None => {
                runner
                    .run_keygen(stage, session, chain_code, setup_message)
                    .await?
            }
        };
        sequence.finish(stage)?;
        Ok(outcome)
    }

    /// Publish the final member list, retrying relay faults until the join deadline
    async fn publish_members(
        &self,
        session: &CeremonySession,
        party_count: u16,
        cancel: &CancelSignal,
    ) -> Result<()> {
        let settings = self.ctx.join_settings(party_count);
        let deadline = Instant::now() + settings.timeout;

        loop {
            cancel.check()?;
            match self
                .ctx
                .relay()
                .start_session(&session.session_id, session.members())
                .await
            {
                Ok(()) => {
                    debug!("Published member list for {}", session.session_id);
                    return Ok(());
                }
                Err(e) if Instant::now() + settings.interval < deadline => {
                    warn!(
                        "Failed to start session {}, retrying: {}",
                        session.session_id, e
                    );
                }
                Err(e) => return Err(e.into()),
            }

            tokio::select! {
                _ = sleep(settings.interval) => {}
                _ = cancel.cancelled() => return Err(CeremonyError::Aborted),
            }
        }
    }

    /// Delete the relay session once every peer had time to see all signals
    ///
    /// Peers that confirmed may still be polling for the initiator's own
    /// signal, so deletion waits two poll intervals. A session with missing
    /// confirmations is left for the relay to expire.
    async fn end_session(
        &self,
        session: &CeremonySession,
        all_confirmed: bool,
        cancel: &CancelSignal,
    ) {
        if !all_confirmed {
            debug!(
                "Keeping session {} for peers still confirming",
                session.session_id
            );
            return;
        }

        tokio::select! {
            _ = sleep(self.ctx.config().poll_interval() * 2) => {}
            _ = cancel.cancelled() => return,
        }
        if let Err(e) = self.ctx.relay().end_session(&session.session_id).await {
            warn!("Failed to end session {}: {}", session.session_id, e);
        }
    }

    /// Signal completion and wait for peers; only cancellation is fatal here
    ///
    /// Returns whether every peer confirmed.
    async fn confirm_completion(
        &self,
        session: &CeremonySession,
        cancel: &CancelSignal,
    ) -> Result<bool> {
        let config = self.ctx.config();
        let barrier = CompletionBarrier::new(self.ctx.relay(), config.poll_interval());

        if let Err(e) = barrier
            .signal(&session.session_id, &session.local_party_id)
            .await
        {
            warn!("Could not signal completion: {}", e);
        }

        match barrier
            .wait_all(
                &session.session_id,
                &session.peers(),
                config.completion_timeout(),
                cancel,
            )
            .await
        {
            Ok(report) => {
                debug!("{} peers confirmed completion", report.confirmed.len());
                Ok(report.is_complete())
            }
            Err(CeremonyError::Aborted) => Err(CeremonyError::Aborted),
            Err(e) => {
                warn!(
                    "Peers did not confirm completion of {} ({}); keys are complete, continuing",
                    session.session_id, e
                );
                Ok(false)
            }
        }
    }
}

fn invalid(message: impl Into<String>) -> CeremonyError {
    CeremonyError::InvalidConfig(message.into())
}

fn check_hex(what: &str, value: &str, size: usize) -> Result<()> {
    match hex::decode(value) {
        Ok(bytes) if bytes.len() == size => Ok(()),
        Ok(bytes) => Err(invalid(format!(
            "{} must be {} bytes, got {}",
            what,
            size,
            bytes.len()
        ))),
        Err(_) => Err(invalid(format!("{} is not valid hex", what))),
    }
}

fn random_hex(size: usize) -> String {
    let mut bytes = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
