//! Ordering of the ceremonies within one session
//!
//! ```text
//! MasterEcdsa -> MasterEddsa -> Chain(chains[0]) -> ... -> Chain(chains[n-1])
//! ```
//!
//! All ceremonies share one session's message stream, so a stage may only
//! begin once the previous one finished.

use tessera_core::{CeremonyError, CeremonyStage, Chain, Result};

/// Tracks which ceremony of a session may run next
#[derive(Debug, Clone)]
pub struct CeremonySequence {
    stages: Vec<CeremonyStage>,
    next: usize,
    in_progress: bool,
}

impl CeremonySequence {
    /// Plan the masters followed by `chains` in request order
    pub fn new(chains: &[Chain]) -> Self {
        let mut stages = vec![CeremonyStage::MasterEcdsa, CeremonyStage::MasterEddsa];
        stages.extend(chains.iter().copied().map(CeremonyStage::Chain));
        Self {
            stages,
            next: 0,
            in_progress: false,
        }
    }

    /// Mark `stage` as running; fails if it is not the next one due
    pub fn begin(&mut self, stage: CeremonyStage) -> Result<()> {
        if self.in_progress {
            return Err(CeremonyError::ceremony(
                stage,
                format!("{} has not finished", self.stages[self.next]),
            ));
        }
        match self.stages.get(self.next) {
            Some(expected) if *expected == stage => {
                self.in_progress = true;
                Ok(())
            }
            Some(expected) => Err(CeremonyError::ceremony(
                stage,
                format!("out of order, {} is due", expected),
            )),
            None => Err(CeremonyError::ceremony(
                stage,
                "every planned ceremony already ran",
            )),
        }
    }

    /// Mark the running stage as finished
    pub fn finish(&mut self, stage: CeremonyStage) -> Result<()> {
        if !self.in_progress || self.stages.get(self.next) != Some(&stage) {
            return Err(CeremonyError::ceremony(stage, "finished without running"));
        }
        self.in_progress = false;
        self.next += 1;
        Ok(())
    }

    /// Number of ceremonies finished so far
    pub fn completed(&self) -> usize {
        self.next
    }

    pub fn total(&self) -> usize {
        self.stages.len()
    }

    pub fn is_finished(&self) -> bool {
        self.next == self.stages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_sequence() {
        let mut seq = CeremonySequence::new(&[Chain::Bitcoin, Chain::Solana]);
        assert_eq!(seq.total(), 4);

        for stage in [
            CeremonyStage::MasterEcdsa,
            CeremonyStage::MasterEddsa,
            CeremonyStage::Chain(Chain::Bitcoin),
            CeremonyStage::Chain(Chain::Solana),
        ] {
            seq.begin(stage).unwrap();
            seq.finish(stage).unwrap();
        }
        assert!(seq.is_finished());
        assert!(seq.begin(CeremonyStage::MasterEcdsa).is_err());
    }

    #[test]
    fn test_eddsa_cannot_start_first() {
        let mut seq = CeremonySequence::new(&[]);
        let err = seq.begin(CeremonyStage::MasterEddsa).unwrap_err();
        assert!(matches!(
            err,
            CeremonyError::CeremonyFailed {
                stage: CeremonyStage::MasterEddsa,
                ..
            }
        ));
    }

    #[test]
    fn test_no_overlap() {
        let mut seq = CeremonySequence::new(&[]);
        seq.begin(CeremonyStage::MasterEcdsa).unwrap();
        assert!(seq.begin(CeremonyStage::MasterEddsa).is_err());
        seq.finish(CeremonyStage::MasterEcdsa).unwrap();
        assert!(seq.begin(CeremonyStage::MasterEddsa).is_ok());
    }

    #[test]
    fn test_chain_order_enforced() {
        let mut seq = CeremonySequence::new(&[Chain::Ethereum, Chain::Sui]);
        for stage in [CeremonyStage::MasterEcdsa, CeremonyStage::MasterEddsa] {
            seq.begin(stage).unwrap();
            seq.finish(stage).unwrap();
        }
        assert!(seq.begin(CeremonyStage::Chain(Chain::Sui)).is_err());
        assert_eq!(seq.completed(), 2);
    }
}
