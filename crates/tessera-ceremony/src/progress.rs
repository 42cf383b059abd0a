//! Progress weighting across the phases of a vault ceremony
//!
//! | Phase          | Band                                   |
//! |----------------|----------------------------------------|
//! | Validation     | 0-10                                   |
//! | Session setup  | 10-25                                  |
//! | Peer discovery | 25-45                                  |
//! | Master ECDSA   | 45-70                                  |
//! | Master EdDSA   | 70-90, or 70-80 when chains follow     |
//! | Chain keys     | 80-90, split evenly per chain          |
//! | Finalization   | 90-100                                 |

use tessera_core::{CeremonyPhase, Chain, ProgressEvent, ProgressSink};

/// Percent bands for a flow with a given number of chain ceremonies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressPlan {
    chain_count: usize,
}

impl ProgressPlan {
    pub fn new(chain_count: usize) -> Self {
        Self { chain_count }
    }

    /// `(start, end)` percent of a phase
    pub fn band(&self, phase: CeremonyPhase) -> (u8, u8) {
        match phase {
            CeremonyPhase::Validation => (0, 10),
            CeremonyPhase::SessionSetup => (10, 25),
            CeremonyPhase::PeerDiscovery => (25, 45),
            CeremonyPhase::MasterEcdsa => (45, 70),
            CeremonyPhase::MasterEddsa if self.chain_count > 0 => (70, 80),
            CeremonyPhase::MasterEddsa => (70, 90),
            CeremonyPhase::ChainKeys => (80, 90),
            CeremonyPhase::Finalization => (90, 100),
            CeremonyPhase::Complete => (100, 100),
        }
    }

    /// `(start, end)` percent of the chain ceremony at `index`
    pub fn chain_band(&self, index: usize) -> (u8, u8) {
        let (start, end) = self.band(CeremonyPhase::ChainKeys);
        let count = self.chain_count.max(1);
        let index = index.min(count - 1);
        let width = usize::from(end - start);
        let at = |i: usize| start + (width * i / count) as u8;
        (at(index), at(index + 1))
    }

    /// Percent at `fraction` (clamped to `0.0..=1.0`) through a band
    pub fn percent_in(band: (u8, u8), fraction: f64) -> u8 {
        let (start, end) = band;
        let fraction = fraction.clamp(0.0, 1.0);
        start + (f64::from(end - start) * fraction).floor() as u8
    }
}

/// Emits progress events that never move backwards
pub struct ProgressReporter<'s> {
    sink: &'s dyn ProgressSink,
    plan: ProgressPlan,
    last_percent: u8,
}

impl<'s> ProgressReporter<'s> {
    pub fn new(sink: &'s dyn ProgressSink, plan: ProgressPlan) -> Self {
        Self {
            sink,
            plan,
            last_percent: 0,
        }
    }

    pub fn plan(&self) -> ProgressPlan {
        self.plan
    }

    /// Report `fraction` of the way through `phase`
    pub fn report(&mut self, phase: CeremonyPhase, fraction: f64, message: impl Into<String>) {
        let percent = ProgressPlan::percent_in(self.plan.band(phase), fraction);
        let event = ProgressEvent::new(phase, self.advance(percent), message);
        self.sink.on_progress(event);
    }

    /// Report `fraction` of the way through the ceremony for the chain at `index`
    pub fn report_chain(
        &mut self,
        index: usize,
        chain: Chain,
        fraction: f64,
        message: impl Into<String>,
    ) {
        let percent = ProgressPlan::percent_in(self.plan.chain_band(index), fraction);
        let event = ProgressEvent::new(CeremonyPhase::ChainKeys, self.advance(percent), message)
            .with_chain(chain);
        self.sink.on_progress(event);
    }

    pub fn last_percent(&self) -> u8 {
        self.last_percent
    }

    fn advance(&mut self, percent: u8) -> u8 {
        self.last_percent = self.last_percent.max(percent);
        self.last_percent
    }
}
