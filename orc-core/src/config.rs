//! Typed configuration for the orchestrator core.
//!
//! Every tunable has an explicit default, applied via the struct-level
//! `#[serde(default)]` attribute so a caller can supply a partial JSON/TOML
//! document and still get sane values for the fields it omits.

use serde::{Deserialize, Serialize};

/// Tunables for the control-plane core. Transport-level settings (listen
/// address, log format) live on the `orc-server` binary's own config, not
/// here, since the core has no transport dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// How long a node may go without a heartbeat before it is marked
    /// unhealthy.
    pub heartbeat_timeout_secs: u64,

    /// Cadence of the liveness monitor's background tick.
    pub liveness_tick_secs: u64,

    /// Bounded retry count for a single pod placement under contention
    /// before giving up with `RaceLost`.
    pub reschedule_max_attempts: u32,

    /// Deterministic seed for `RandomFit`. `None` draws from OS entropy.
    pub random_seed: Option<u64>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout_secs: default_heartbeat_timeout_secs(),
            liveness_tick_secs: default_liveness_tick_secs(),
            reschedule_max_attempts: default_reschedule_max_attempts(),
            random_seed: None,
        }
    }
}

fn default_heartbeat_timeout_secs() -> u64 {
    15
}

fn default_liveness_tick_secs() -> u64 {
    5
}

fn default_reschedule_max_attempts() -> u32 {
    3
}

impl OrchestratorConfig {
    pub fn heartbeat_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.heartbeat_timeout_secs)
    }

    pub fn liveness_tick(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.liveness_tick_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.heartbeat_timeout_secs, 15);
        assert_eq!(config.liveness_tick_secs, 5);
        assert_eq!(config.reschedule_max_attempts, 3);
        assert_eq!(config.random_seed, None);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: OrchestratorConfig = serde_json::from_str(r#"{"random_seed": 42}"#).unwrap();
        assert_eq!(config.random_seed, Some(42));
        assert_eq!(config.heartbeat_timeout_secs, 15);
    }
}
