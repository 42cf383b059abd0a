//! In-process relay for tests and local development
//!
//! Mirrors the HTTP relay's semantics (append-only join log, unknown
//! sessions read as empty) and adds a few fault-injection knobs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use tessera_core::{PartyId, SessionId};

use crate::client::SessionClient;
use crate::error::{RelayError, Result};

#[derive(Debug, Default, Clone)]
struct RelaySession {
    /// Raw join log; duplicates are kept like the real relay does
    joined: Vec<PartyId>,
    started: Option<Vec<PartyId>>,
    completed: Vec<PartyId>,
}

/// Party that lives inside the relay, like a server co-signer
#[derive(Debug, Clone)]
struct SimulatedPeer {
    party: PartyId,
    confirms_completion: bool,
}

#[derive(Debug, Default)]
struct RelayState {
    sessions: HashMap<SessionId, RelaySession>,
    member_cap: Option<usize>,
    simulated: Vec<SimulatedPeer>,
}

impl RelayState {
    /// Session entry, created on first touch with every simulated peer joined
    fn session_mut(&mut self, session_id: &SessionId) -> &mut RelaySession {
        let simulated = &self.simulated;
        self.sessions
            .entry(session_id.clone())
            .or_insert_with(|| RelaySession {
                joined: simulated.iter().map(|p| p.party.clone()).collect(),
                ..RelaySession::default()
            })
    }
}

/// Shared in-memory relay; clones see the same sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryRelay {
    state: Arc<Mutex<RelayState>>,
    failures_pending: Arc<AtomicUsize>,
    requests: Arc<AtomicUsize>,
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` requests with [`RelayError::Unavailable`]
    pub fn fail_next(&self, count: usize) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    /// Never report more than `cap` members from `list_members`
    pub async fn cap_visible_members(&self, cap: Option<usize>) {
        self.state.lock().await.member_cap = cap;
    }

    /// Have `party` join every session as soon as it appears
    ///
    /// With `confirms_completion` the party also confirms completion right
    /// after any other member does.
    pub async fn add_simulated_peer(&self, party: PartyId, confirms_completion: bool) {
        self.state.lock().await.simulated.push(SimulatedPeer {
            party,
            confirms_completion,
        });
    }

    /// Sessions currently known to the relay
    pub async fn session_ids(&self) -> Vec<SessionId> {
        self.state.lock().await.sessions.keys().cloned().collect()
    }

    /// Total requests served (including injected failures)
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Member list published by `start_session`, if any
    pub async fn started_members(&self, session_id: &SessionId) -> Option<Vec<PartyId>> {
        self.state
            .lock()
            .await
            .sessions
            .get(session_id)
            .and_then(|s| s.started.clone())
    }

    /// Whether the session still exists (not ended)
    pub async fn has_session(&self, session_id: &SessionId) -> bool {
        self.state.lock().await.sessions.contains_key(session_id)
    }

    fn admit(&self, op: &str) -> Result<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            debug!("Injected relay failure for {}", op);
            return Err(RelayError::Unavailable(format!("injected failure ({})", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionClient for MemoryRelay {
    async fn create_session(&self, session_id: &SessionId, members: &[PartyId]) -> Result<()> {
        self.admit("create_session")?;
        let mut state = self.state.lock().await;
        let session = state.session_mut(session_id);
        session.joined.extend(members.iter().cloned());
        Ok(())
    }

    async fn join_session(&self, session_id: &SessionId, party_id: &PartyId) -> Result<()> {
        self.admit("join_session")?;
        let mut state = self.state.lock().await;
        state.session_mut(session_id).joined.push(party_id.clone());
        Ok(())
    }

    async fn list_members(&self, session_id: &SessionId) -> Result<Vec<PartyId>> {
        self.admit("list_members")?;
        let state = self.state.lock().await;
        let mut members = state
            .sessions
            .get(session_id)
            .map(|s| s.joined.clone())
            .unwrap_or_default();
        if let Some(cap) = state.member_cap {
            members.truncate(cap);
        }
        Ok(members)
    }

    async fn start_session(&self, session_id: &SessionId, members: &[PartyId]) -> Result<()> {
        self.admit("start_session")?;
        let mut state = self.state.lock().await;
        state.session_mut(session_id).started = Some(members.to_vec());
        Ok(())
    }

    async fn signal_complete(&self, session_id: &SessionId, party_id: &PartyId) -> Result<()> {
        self.admit("signal_complete")?;
        let mut state = self.state.lock().await;
        let confirming: Vec<PartyId> = state
            .simulated
            .iter()
            .filter(|p| p.confirms_completion && p.party != *party_id)
            .map(|p| p.party.clone())
            .collect();
        let session = state.session_mut(session_id);
        for party in std::iter::once(party_id.clone()).chain(confirming) {
            if !session.completed.contains(&party) {
                session.completed.push(party);
            }
        }
        Ok(())
    }

    async fn completed_parties(&self, session_id: &SessionId) -> Result<Vec<PartyId>> {
        self.admit("completed_parties")?;
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .get(session_id)
            .map(|s| s.completed.clone())
            .unwrap_or_default())
    }

    async fn end_session(&self, session_id: &SessionId) -> Result<()> {
        self.admit("end_session")?;
        self.state.lock().await.sessions.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_log_keeps_duplicates() {
        let relay = MemoryRelay::new();
        let sid = SessionId::from("s");
        relay.create_session(&sid, &["a".into()]).await.unwrap();
        relay.join_session(&sid, &"b".into()).await.unwrap();
        relay.join_session(&sid, &"b".into()).await.unwrap();

        let members = relay.list_members(&sid).await.unwrap();
        assert_eq!(members.len(), 3);
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let relay = MemoryRelay::new();
        let sid = SessionId::from("s");
        relay.fail_next(2);
        assert!(relay.list_members(&sid).await.is_err());
        assert!(relay.list_members(&sid).await.is_err());
        assert!(relay.list_members(&sid).await.is_ok());
        assert_eq!(relay.request_count(), 3);
    }

    #[tokio::test]
    async fn test_unknown_session_reads_empty() {
        let relay = MemoryRelay::new();
        let sid = SessionId::from("nope");
        assert!(relay.list_members(&sid).await.unwrap().is_empty());
        assert!(relay.completed_parties(&sid).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_simulated_peer_joins_and_confirms() {
        let relay = MemoryRelay::new();
        relay.add_simulated_peer("server".into(), true).await;
        let sid = SessionId::from("s");

        relay.create_session(&sid, &["a".into()]).await.unwrap();
        let members = relay.list_members(&sid).await.unwrap();
        assert_eq!(members, vec![PartyId::from("server"), PartyId::from("a")]);

        assert!(relay.completed_parties(&sid).await.unwrap().is_empty());
        relay.signal_complete(&sid, &"a".into()).await.unwrap();
        let completed = relay.completed_parties(&sid).await.unwrap();
        assert_eq!(completed, vec![PartyId::from("a"), PartyId::from("server")]);
        assert_eq!(relay.session_ids().await, vec![sid]);
    }

    #[tokio::test]
    async fn test_end_session_removes_state() {
        let relay = MemoryRelay::new();
        let sid = SessionId::from("s");
        relay.create_session(&sid, &["a".into()]).await.unwrap();
        assert!(relay.has_session(&sid).await);
        relay.end_session(&sid).await.unwrap();
        assert!(!relay.has_session(&sid).await);
    }
}
