//! Tessera Ceremony - Threshold key ceremony coordination
//!
//! Sequences relay sessions, peer discovery and the ordered ceremonies
//! that together produce a multi-party vault.
//!
//! ## Flow
//!
//! 1. Validate the request (no network on failure)
//! 2. Create the session (initiator) or join it from a QR payload (joiner)
//! 3. Wait for all parties; the initiator publishes the member list
//! 4. Master ECDSA, then master EdDSA seeded with the ECDSA setup message
//! 5. One ceremony per requested chain, in request order
//! 6. Exchange completion signals (tolerant) and return a [`VaultRecord`]
//!
//! The cryptography itself sits behind [`CeremonyEngine`].
//!
//! [`VaultRecord`]: tessera_core::VaultRecord

pub mod config;
pub mod context;
pub mod engine;
pub mod orchestrator;
pub mod progress;
pub mod runner;
pub mod sequence;

pub use config::CoordinatorConfig;
pub use context::CoordinatorContext;
pub use engine::{
    CeremonyEngine, CeremonyOutcome, EngineError, KeyImportRequest, KeygenRequest,
};
pub use orchestrator::{CeremonyRole, KeyCeremonyOrchestrator, VaultRequest};
pub use progress::{ProgressPlan, ProgressReporter};
pub use runner::{stage_algorithm, CeremonyRunner};
pub use sequence::CeremonySequence;
