//! Collaborators shared by the ceremonies of one caller

use std::sync::Arc;

use tessera_core::{CeremonyError, Result, SignatureAlgorithm};
use tessera_qr::PairingCodec;
use tessera_relay::{HttpSessionClient, PollSettings, SessionClient};

use crate::config::CoordinatorConfig;
use crate::engine::CeremonyEngine;

/// Configuration, relay client and engines for a coordinator
///
/// One context per logical SDK session; cheap to clone.
#[derive(Clone)]
pub struct CoordinatorContext {
    config: CoordinatorConfig,
    relay: Arc<dyn SessionClient>,
    ecdsa: Arc<dyn CeremonyEngine>,
    eddsa: Arc<dyn CeremonyEngine>,
}

impl CoordinatorContext {
    pub fn new(
        config: CoordinatorConfig,
        relay: Arc<dyn SessionClient>,
        ecdsa: Arc<dyn CeremonyEngine>,
        eddsa: Arc<dyn CeremonyEngine>,
    ) -> Result<Self> {
        config.validate()?;
        for (engine, expected) in [
            (&ecdsa, SignatureAlgorithm::Ecdsa),
            (&eddsa, SignatureAlgorithm::Eddsa),
        ] {
            if engine.algorithm() != expected {
                return Err(CeremonyError::InvalidConfig(format!(
                    "{} engine slot holds an {} engine",
                    expected,
                    engine.algorithm()
                )));
            }
        }
        Ok(Self {
            config,
            relay,
            ecdsa,
            eddsa,
        })
    }

    /// Context talking to the HTTP relay at `config.relay_url`
    pub fn with_http_relay(
        config: CoordinatorConfig,
        ecdsa: Arc<dyn CeremonyEngine>,
        eddsa: Arc<dyn CeremonyEngine>,
    ) -> Result<Self> {
        let relay = HttpSessionClient::new(config.relay_url.clone())?;
        Self::new(config, Arc::new(relay), ecdsa, eddsa)
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn relay(&self) -> &dyn SessionClient {
        self.relay.as_ref()
    }

    pub fn engine(&self, algorithm: SignatureAlgorithm) -> &dyn CeremonyEngine {
        match algorithm {
            SignatureAlgorithm::Ecdsa => self.ecdsa.as_ref(),
            SignatureAlgorithm::Eddsa => self.eddsa.as_ref(),
        }
    }

    pub fn pairing_codec(&self) -> PairingCodec {
        PairingCodec::new(self.config.pairing_scheme.clone())
    }

    /// Barrier settings for a vault with `party_count` parties
    pub fn join_settings(&self, party_count: u16) -> PollSettings {
        PollSettings::new(
            self.config.poll_interval(),
            self.config.join_timeout(party_count),
        )
    }
}
