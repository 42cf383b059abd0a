//! Progress and membership events reported to the caller

use serde::Serialize;
use tokio::sync::mpsc;

use crate::chain::Chain;
use crate::types::PartyId;

/// Phase of a vault ceremony flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CeremonyPhase {
    Validation,
    SessionSetup,
    PeerDiscovery,
    MasterEcdsa,
    MasterEddsa,
    ChainKeys,
    Finalization,
    Complete,
}

/// Progress update from a ceremony flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub phase: CeremonyPhase,
    /// Percentage complete (0-100)
    pub percent: u8,
    pub message: String,
    /// Chain being processed during the per-chain phase
    pub chain: Option<Chain>,
}

impl ProgressEvent {
    pub fn new(phase: CeremonyPhase, percent: u8, message: impl Into<String>) -> Self {
        Self {
            phase,
            percent: percent.min(100),
            message: message.into(),
            chain: None,
        }
    }

    pub fn with_chain(mut self, chain: Chain) -> Self {
        self.chain = Some(chain);
        self
    }
}

/// A party newly observed in the relay session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartyJoinEvent {
    pub party_id: PartyId,
    /// Distinct parties observed so far, local party included
    pub total_joined: usize,
    pub required_count: usize,
}

/// Receiver of progress updates
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

/// Sink that discards every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn on_progress(&self, _event: ProgressEvent) {}
}

impl ProgressSink for mpsc::UnboundedSender<ProgressEvent> {
    fn on_progress(&self, event: ProgressEvent) {
        // Receiver may be gone; progress is advisory
        let _ = self.send(event);
    }
}

/// Adapter turning a closure into a [`ProgressSink`]
pub struct FnProgress<F>(pub F);

impl<F> ProgressSink for FnProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: ProgressEvent) {
        (self.0)(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_is_clamped() {
        let event = ProgressEvent::new(CeremonyPhase::Complete, 140, "done");
        assert_eq!(event.percent, 100);
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.on_progress(ProgressEvent::new(CeremonyPhase::Validation, 5, "checking"));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.phase, CeremonyPhase::Validation);
        assert_eq!(event.percent, 5);
    }
}
