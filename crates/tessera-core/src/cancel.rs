//! Cooperative cancellation signal
//!
//! The caller holds one clone and the ceremony flow holds another. The flow
//! checks [`CancelSignal::check`] before every phase transition and races
//! [`CancelSignal::cancelled`] against every poll sleep.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{CeremonyError, Result};

/// Cloneable, level-triggered cancellation flag
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Fail with [`CeremonyError::Aborted`] once cancellation was requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(CeremonyError::Aborted)
        } else {
            Ok(())
        }
    }

    /// Resolve once cancellation is requested
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            // The sender lives in `self`, so this only errors after drop
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_check() {
        let signal = CancelSignal::new();
        assert!(signal.check().is_ok());
        signal.clone().cancel();
        assert_eq!(signal.check(), Err(CeremonyError::Aborted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_preempts_sleep() {
        let signal = CancelSignal::new();
        let remote = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            remote.cancel();
        });

        let start = tokio::time::Instant::now();
        tokio::select! {
            _ = signal.cancelled() => {}
            _ = tokio::time::sleep(Duration::from_secs(60)) => panic!("sleep won the race"),
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
