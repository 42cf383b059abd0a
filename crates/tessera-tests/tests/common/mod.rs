//! Shared fixtures: a recording ceremony engine and context builders

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tessera_ceremony::{
    stage_algorithm, CeremonyEngine, CeremonyOutcome, CoordinatorConfig, CoordinatorContext,
    EngineError, KeyImportRequest, KeygenRequest,
};
use tessera_core::{
    CancelSignal, CeremonyResult, CeremonyStage, KeyShare, PartyId, ProgressEvent, ProgressSink,
    SessionId, SetupMessage, SignatureAlgorithm,
};
use tessera_relay::{MemoryRelay, RelayError, Result as RelayResult, SessionClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Keygen,
    Import,
}

/// One engine invocation as seen by the spy
#[derive(Debug, Clone)]
pub struct EngineCall {
    pub stage: CeremonyStage,
    pub kind: CallKind,
    pub chain_code: String,
    pub setup_message: Option<SetupMessage>,
    pub members: Vec<PartyId>,
}

/// Chain code the fake master ECDSA ceremony reports
pub fn ecdsa_chain_code() -> String {
    "ec".repeat(32)
}

/// Chain code the fake master EdDSA ceremony reports
pub fn eddsa_chain_code() -> String {
    "ed".repeat(32)
}

/// Recording state shared by the ECDSA and EdDSA spy engines
#[derive(Default)]
pub struct Spy {
    calls: Mutex<Vec<EngineCall>>,
    active: AtomicUsize,
    overlapped: AtomicBool,
    latency: Mutex<Option<(StdRng, u64)>>,
    fail_on: Option<CeremonyStage>,
    hook: Option<(CeremonyStage, StageHook)>,
}

type StageHook = Box<dyn Fn() + Send + Sync>;

impl Spy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep a seeded random 0..=`max_ms` inside every ceremony
    pub fn with_latency(self, seed: u64, max_ms: u64) -> Self {
        *self.latency.lock().unwrap() = Some((StdRng::seed_from_u64(seed), max_ms));
        self
    }

    pub fn failing_on(mut self, stage: CeremonyStage) -> Self {
        self.fail_on = Some(stage);
        self
    }

    /// Run `hook` while the ceremony for `stage` is in progress
    pub fn on_stage(mut self, stage: CeremonyStage, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hook = Some((stage, Box::new(hook)));
        self
    }

    /// Fire `cancel` while the ceremony for `stage` is running
    pub fn cancelling_on(self, stage: CeremonyStage, cancel: CancelSignal) -> Self {
        self.on_stage(stage, move || cancel.cancel())
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn stages(&self) -> Vec<CeremonyStage> {
        self.calls().into_iter().map(|c| c.stage).collect()
    }

    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    fn next_latency(&self) -> Duration {
        match self.latency.lock().unwrap().as_mut() {
            Some((rng, max_ms)) => Duration::from_millis(rng.gen_range(0..=*max_ms)),
            None => Duration::ZERO,
        }
    }
}

/// Deterministic fake engine; every party derives the same public keys
pub struct SpyEngine {
    algorithm: SignatureAlgorithm,
    spy: Arc<Spy>,
}

impl SpyEngine {
    async fn run(&self, call: EngineCall) -> Result<CeremonyOutcome, EngineError> {
        assert_eq!(stage_algorithm(call.stage), self.algorithm);
        let stage = call.stage;

        if self.spy.active.fetch_add(1, Ordering::SeqCst) > 0 {
            self.spy.overlapped.store(true, Ordering::SeqCst);
        }
        self.spy.calls.lock().unwrap().push(call);
        if let Some((hook_stage, hook)) = &self.spy.hook {
            if *hook_stage == stage {
                hook();
            }
        }

        tokio::time::sleep(self.spy.next_latency()).await;
        self.spy.active.fetch_sub(1, Ordering::SeqCst);

        if self.spy.fail_on == Some(stage) {
            return Err(EngineError::new("peer dropped out in round 3"));
        }

        let chain_code = match stage {
            CeremonyStage::MasterEcdsa => ecdsa_chain_code(),
            CeremonyStage::MasterEddsa => eddsa_chain_code(),
            CeremonyStage::Chain(_) => String::new(),
        };
        let outcome = CeremonyOutcome::new(CeremonyResult {
            public_key: hex::encode(stage.to_string()),
            key_share: KeyShare::new(format!("share of {}", stage).into_bytes()),
            chain_code,
        });
        Ok(match stage {
            CeremonyStage::MasterEcdsa => {
                outcome.with_setup_message(SetupMessage::new(b"topology".to_vec()))
            }
            _ => outcome,
        })
    }
}

#[async_trait]
impl CeremonyEngine for SpyEngine {
    fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    async fn keygen(&self, request: KeygenRequest<'_>) -> Result<CeremonyOutcome, EngineError> {
        self.run(EngineCall {
            stage: request.stage,
            kind: CallKind::Keygen,
            chain_code: request.chain_code.to_string(),
            setup_message: request.setup_message.cloned(),
            members: request.members.to_vec(),
        })
        .await
    }

    async fn key_import(
        &self,
        request: KeyImportRequest<'_>,
    ) -> Result<CeremonyOutcome, EngineError> {
        assert!(!request.private_key.expose_hex().is_empty());
        self.run(EngineCall {
            stage: request.stage,
            kind: CallKind::Import,
            chain_code: request.chain_code.to_string(),
            setup_message: request.setup_message.cloned(),
            members: request.members.to_vec(),
        })
        .await
    }
}

pub fn test_config() -> CoordinatorConfig {
    CoordinatorConfig {
        relay_url: "memory://relay".to_string(),
        ..CoordinatorConfig::default()
    }
}

/// Context over `relay` whose engines record into `spy`
pub fn context(relay: &MemoryRelay, spy: &Arc<Spy>, config: CoordinatorConfig) -> CoordinatorContext {
    context_over(Arc::new(relay.clone()), spy, config)
}

/// Context over any session client
pub fn context_over(
    relay: Arc<dyn SessionClient>,
    spy: &Arc<Spy>,
    config: CoordinatorConfig,
) -> CoordinatorContext {
    CoordinatorContext::new(
        config,
        relay,
        Arc::new(SpyEngine {
            algorithm: SignatureAlgorithm::Ecdsa,
            spy: spy.clone(),
        }),
        Arc::new(SpyEngine {
            algorithm: SignatureAlgorithm::Eddsa,
            spy: spy.clone(),
        }),
    )
    .unwrap()
}

/// Relay whose `start_session` fails a set number of times
pub struct FlakyStart {
    inner: MemoryRelay,
    failures: AtomicUsize,
    attempts: AtomicUsize,
}

impl FlakyStart {
    pub fn new(inner: MemoryRelay, failures: usize) -> Self {
        Self {
            inner,
            failures: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn start_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionClient for FlakyStart {
    async fn create_session(&self, session_id: &SessionId, members: &[PartyId]) -> RelayResult<()> {
        self.inner.create_session(session_id, members).await
    }

    async fn join_session(&self, session_id: &SessionId, party_id: &PartyId) -> RelayResult<()> {
        self.inner.join_session(session_id, party_id).await
    }

    async fn list_members(&self, session_id: &SessionId) -> RelayResult<Vec<PartyId>> {
        self.inner.list_members(session_id).await
    }

    async fn start_session(&self, session_id: &SessionId, members: &[PartyId]) -> RelayResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RelayError::Unavailable("502 from relay".to_string()));
        }
        self.inner.start_session(session_id, members).await
    }

    async fn signal_complete(&self, session_id: &SessionId, party_id: &PartyId) -> RelayResult<()> {
        self.inner.signal_complete(session_id, party_id).await
    }

    async fn completed_parties(&self, session_id: &SessionId) -> RelayResult<Vec<PartyId>> {
        self.inner.completed_parties(session_id).await
    }

    async fn end_session(&self, session_id: &SessionId) -> RelayResult<()> {
        self.inner.end_session(session_id).await
    }
}

/// Progress sink keeping every event
#[derive(Default)]
pub struct Recorder(Mutex<Vec<ProgressEvent>>);

impl Recorder {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl ProgressSink for Recorder {
    fn on_progress(&self, event: ProgressEvent) {
        self.0.lock().unwrap().push(event);
    }
}
