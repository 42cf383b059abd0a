//! Coordinator configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use tessera_core::{CeremonyError, Result};

/// Coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Base URL of the relay server
    pub relay_url: String,

    /// Cadence of barrier polling (milliseconds)
    pub poll_interval_ms: u64,

    /// Peer wait for a device + server vault (seconds)
    pub two_party_join_timeout_secs: u64,

    /// Peer wait when several user devices must scan the QR code (seconds)
    pub multi_device_join_timeout_secs: u64,

    /// Completion wait after the last ceremony (seconds)
    pub completion_timeout_secs: u64,

    /// URI scheme of pairing QR codes
    pub pairing_scheme: String,

    /// Whether the initiator deletes the relay session once every peer
    /// confirmed completion
    pub end_session_on_finish: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            relay_url: "http://localhost:18080".to_string(),
            poll_interval_ms: 2000,
            two_party_join_timeout_secs: 30,
            multi_device_join_timeout_secs: 300,
            completion_timeout_secs: 60,
            pairing_scheme: tessera_qr::DEFAULT_SCHEME.to_string(),
            end_session_on_finish: false,
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CeremonyError::InvalidConfig(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            CeremonyError::InvalidConfig(format!("Cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| CeremonyError::InvalidConfig(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| {
            CeremonyError::InvalidConfig(format!("Cannot write {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.relay_url.trim().is_empty() {
            return Err(CeremonyError::InvalidConfig(
                "relay_url must not be empty".to_string(),
            ));
        }
        if self.pairing_scheme.trim().is_empty() {
            return Err(CeremonyError::InvalidConfig(
                "pairing_scheme must not be empty".to_string(),
            ));
        }
        let durations = [
            ("poll_interval_ms", self.poll_interval_ms),
            ("two_party_join_timeout_secs", self.two_party_join_timeout_secs),
            (
                "multi_device_join_timeout_secs",
                self.multi_device_join_timeout_secs,
            ),
            ("completion_timeout_secs", self.completion_timeout_secs),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, value)| *value == 0) {
            return Err(CeremonyError::InvalidConfig(format!(
                "{} must be greater than zero",
                name
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Peer wait for a vault with `party_count` parties
    pub fn join_timeout(&self, party_count: u16) -> Duration {
        if party_count <= 2 {
            Duration::from_secs(self.two_party_join_timeout_secs)
        } else {
            Duration::from_secs(self.multi_device_join_timeout_secs)
        }
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }
}
