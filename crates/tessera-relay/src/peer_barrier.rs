//! Peer discovery barrier
//!
//! Polls the relay until the required number of distinct parties joined the
//! session, then returns the member list in the order the caller's role
//! dictates.
//!
//! Two ordering conventions coexist on the wire and both must be reproduced
//! exactly, because every participant derives share indices from the member
//! order without further coordination:
//!
//! - the initiator lists itself first, then the other peers in discovery order
//! - joiners sort the deduplicated member set lexicographically

use std::collections::HashSet;

use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use tessera_core::{
    CancelSignal, CeremonyError, PartyId, PartyJoinEvent, Result, SessionId, MIN_PARTY_COUNT,
};

use crate::client::{PollSettings, SessionClient};

/// Member ordering convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberOrdering {
    /// `[local, ...peers in discovery order]` (session initiator)
    LocalFirst,
    /// `sort(unique members)` (session joiner)
    Lexicographic,
}

/// Deduplicating record of observed members
#[derive(Debug, Clone)]
pub struct MemberTracker {
    local: PartyId,
    discovered: Vec<PartyId>,
    seen: HashSet<PartyId>,
}

impl MemberTracker {
    /// Start tracking with the local party already counted
    pub fn new(local: PartyId) -> Self {
        let mut seen = HashSet::new();
        seen.insert(local.clone());
        Self {
            local,
            discovered: Vec::new(),
            seen,
        }
    }

    /// Fold in one relay listing; returns peers seen for the first time
    pub fn observe(&mut self, listing: &[PartyId]) -> Vec<PartyId> {
        let mut fresh = Vec::new();
        for party in listing {
            if self.seen.insert(party.clone()) {
                self.discovered.push(party.clone());
                fresh.push(party.clone());
            }
        }
        fresh
    }

    /// Distinct parties observed, local included
    pub fn len(&self) -> usize {
        self.discovered.len() + 1
    }

    /// Final member list under the given convention
    pub fn ordered(&self, ordering: MemberOrdering) -> Vec<PartyId> {
        let mut members = Vec::with_capacity(self.len());
        members.push(self.local.clone());
        members.extend(self.discovered.iter().cloned());
        if ordering == MemberOrdering::Lexicographic {
            members.sort();
        }
        members
    }
}

/// Blocks until enough parties joined a session
pub struct PeerBarrier<'a> {
    client: &'a dyn SessionClient,
    settings: PollSettings,
}

impl<'a> PeerBarrier<'a> {
    pub fn new(client: &'a dyn SessionClient, settings: PollSettings) -> Self {
        Self { client, settings }
    }

    /// Poll until `required_count` distinct parties are present
    ///
    /// `on_join` fires once per newly observed peer with the running total.
    /// Fails with [`CeremonyError::Timeout`] at the deadline and with
    /// [`CeremonyError::Aborted`] as soon as `cancel` fires.
    pub async fn wait<F>(
        &self,
        session_id: &SessionId,
        local_party_id: &PartyId,
        required_count: usize,
        ordering: MemberOrdering,
        cancel: &CancelSignal,
        mut on_join: F,
    ) -> Result<Vec<PartyId>>
    where
        F: FnMut(PartyJoinEvent),
    {
        if required_count < usize::from(MIN_PARTY_COUNT) {
            return Err(CeremonyError::InvalidConfig(format!(
                "A session needs at least {} parties, got {}",
                MIN_PARTY_COUNT, required_count
            )));
        }

        let deadline = Instant::now() + self.settings.timeout;
        let mut tracker = MemberTracker::new(local_party_id.clone());

        info!(
            "Waiting for {} parties in session {} ({:?})",
            required_count, session_id, ordering
        );

        loop {
            cancel.check()?;

            match self.client.list_members(session_id).await {
                Ok(listing) => {
                    // Result of a request that straddled cancellation is dropped
                    cancel.check()?;
                    for party in tracker.observe(&listing) {
                        debug!("Party {} joined session {}", party, session_id);
                        on_join(PartyJoinEvent {
                            party_id: party,
                            total_joined: tracker.len(),
                            required_count,
                        });
                    }
                }
                Err(e) => {
                    warn!("Failed to list members of session {}: {}", session_id, e);
                }
            }

            if tracker.len() >= required_count {
                let members = tracker.ordered(ordering);
                info!("All {} parties present: {:?}", members.len(), members);
                return Ok(members);
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    "Peer barrier timed out with {}/{} parties",
                    tracker.len(),
                    required_count
                );
                return Err(CeremonyError::Timeout {
                    joined_count: tracker.len(),
                    required_count,
                });
            }

            tokio::select! {
                _ = sleep_until((now + self.settings.interval).min(deadline)) => {}
                _ = cancel.cancelled() => return Err(CeremonyError::Aborted),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<PartyId> {
        names.iter().map(|n| PartyId::from(*n)).collect()
    }

    #[test]
    fn test_tracker_deduplicates() {
        let mut tracker = MemberTracker::new("me".into());
        let fresh = tracker.observe(&ids(&["me", "b", "b", "a"]));
        assert_eq!(fresh, ids(&["b", "a"]));
        assert_eq!(tracker.len(), 3);

        let fresh = tracker.observe(&ids(&["a", "c", "me"]));
        assert_eq!(fresh, ids(&["c"]));
        assert_eq!(tracker.len(), 4);
    }

    #[test]
    fn test_local_first_keeps_discovery_order() {
        let mut tracker = MemberTracker::new("m".into());
        tracker.observe(&ids(&["z", "a"]));
        tracker.observe(&ids(&["k"]));
        assert_eq!(
            tracker.ordered(MemberOrdering::LocalFirst),
            ids(&["m", "z", "a", "k"])
        );
    }

    #[test]
    fn test_lexicographic_sorts() {
        let mut tracker = MemberTracker::new("m".into());
        tracker.observe(&ids(&["z", "a", "k"]));
        assert_eq!(
            tracker.ordered(MemberOrdering::Lexicographic),
            ids(&["a", "k", "m", "z"])
        );
    }
}
