//! Completion barrier
//!
//! Cross-device UX synchronisation after the ceremonies finished. Key
//! material is already valid at this point, so callers treat every failure
//! here as a warning.

use std::collections::HashSet;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use tessera_core::{CancelSignal, CeremonyError, PartyId, Result, SessionId};

use crate::client::SessionClient;

/// Peers that did and did not confirm completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    pub confirmed: Vec<PartyId>,
    pub missing: Vec<PartyId>,
}

impl CompletionReport {
    fn from_status(peers: &[PartyId], completed: &HashSet<PartyId>) -> Self {
        let (confirmed, missing) = peers.iter().cloned().partition(|p| completed.contains(p));
        Self { confirmed, missing }
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Signals local completion and waits for peers
pub struct CompletionBarrier<'a> {
    client: &'a dyn SessionClient,
    interval: Duration,
}

impl<'a> CompletionBarrier<'a> {
    pub fn new(client: &'a dyn SessionClient, interval: Duration) -> Self {
        Self { client, interval }
    }

    /// Tell the relay the local party finished
    pub async fn signal(&self, session_id: &SessionId, local_party_id: &PartyId) -> Result<()> {
        self.client
            .signal_complete(session_id, local_party_id)
            .await
            .map_err(CeremonyError::from)?;
        debug!("Signalled completion for {} in {}", local_party_id, session_id);
        Ok(())
    }

    /// Poll until every peer confirmed or the deadline passes
    pub async fn wait_all(
        &self,
        session_id: &SessionId,
        peers: &[PartyId],
        timeout: Duration,
        cancel: &CancelSignal,
    ) -> Result<CompletionReport> {
        let deadline = Instant::now() + timeout;
        let mut report = CompletionReport::from_status(peers, &HashSet::new());

        loop {
            cancel.check()?;

            match self.client.completed_parties(session_id).await {
                Ok(completed) => {
                    cancel.check()?;
                    let completed: HashSet<PartyId> = completed.into_iter().collect();
                    report = CompletionReport::from_status(peers, &completed);
                    if report.is_complete() {
                        info!("All {} peers confirmed completion", peers.len());
                        return Ok(report);
                    }
                }
                Err(e) => {
                    warn!("Failed to query completion of session {}: {}", session_id, e);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                if report.confirmed.is_empty() {
                    warn!(
                        "No peer confirmed completion of session {} within {:?}",
                        session_id, timeout
                    );
                } else {
                    warn!(
                        "Only {}/{} peers confirmed completion of session {}; missing {:?}",
                        report.confirmed.len(),
                        peers.len(),
                        session_id,
                        report.missing
                    );
                }
                return Err(CeremonyError::Timeout {
                    joined_count: report.confirmed.len(),
                    required_count: peers.len(),
                });
            }

            tokio::select! {
                _ = sleep_until((now + self.interval).min(deadline)) => {}
                _ = cancel.cancelled() => return Err(CeremonyError::Aborted),
            }
        }
    }
}
