//! Relay session client abstraction

use std::time::Duration;

use async_trait::async_trait;

use tessera_core::{CancelSignal, PartyId, SessionId};

use crate::completion::{CompletionBarrier, CompletionReport};
use crate::error::Result;

/// Poll cadence expected by relay servers
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Cadence and deadline of a polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollSettings {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Default cadence with the given deadline
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, timeout)
    }
}

/// Thin request/response operations against a relay server
///
/// Implementations do not retry; polling callers absorb transient faults.
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Register a new session with its initial member list
    async fn create_session(&self, session_id: &SessionId, members: &[PartyId]) -> Result<()>;

    /// Join an existing session (idempotent)
    async fn join_session(&self, session_id: &SessionId, party_id: &PartyId) -> Result<()>;

    /// Current members as reported by the relay; may contain duplicates
    async fn list_members(&self, session_id: &SessionId) -> Result<Vec<PartyId>>;

    /// Publish the final member list once the peer barrier is satisfied
    async fn start_session(&self, session_id: &SessionId, members: &[PartyId]) -> Result<()>;

    /// Record that a party finished every ceremony of the session
    async fn signal_complete(&self, session_id: &SessionId, party_id: &PartyId) -> Result<()>;

    /// Parties that signalled completion so far
    async fn completed_parties(&self, session_id: &SessionId) -> Result<Vec<PartyId>>;

    /// Best-effort session cleanup
    async fn end_session(&self, session_id: &SessionId) -> Result<()>;
}

impl<'c> dyn SessionClient + 'c {
    /// Wait until every peer signalled completion, polling at the default cadence
    pub async fn await_completion(
        &self,
        session_id: &SessionId,
        peers: &[PartyId],
        timeout: Duration,
    ) -> tessera_core::Result<CompletionReport> {
        CompletionBarrier::new(self, DEFAULT_POLL_INTERVAL)
            .wait_all(session_id, peers, timeout, &CancelSignal::new())
            .await
    }
}
