//! Demo configuration, overridable from the environment.

use evented_requests::CorrelatorConfig;
use std::time::Duration;
use tracing::{info, warn};

/// Default deadline for requests, in milliseconds.
pub const DEADLINE_VAR: &str = "EVENTED_DEADLINE_MS";
/// Delay before the simulated server pushes its reply, in milliseconds.
pub const SERVER_DELAY_VAR: &str = "EVENTED_SERVER_DELAY_MS";
/// `uuid` (default) or `sequential`.
pub const ID_STRATEGY_VAR: &str = "EVENTED_ID_STRATEGY";

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub correlator: CorrelatorConfig,
    pub server_delay: Duration,
    pub channel_capacity: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            correlator: CorrelatorConfig::default(),
            server_delay: Duration::from_secs(3),
            channel_capacity: 64,
        }
    }
}

impl DemoConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(ms) = millis(&lookup, DEADLINE_VAR) {
            config.correlator.default_deadline = ms;
        }
        if let Some(ms) = millis(&lookup, SERVER_DELAY_VAR) {
            config.server_delay = ms;
        }

        if let Some(strategy) = lookup(ID_STRATEGY_VAR) {
            match strategy.as_str() {
                "sequential" => {
                    config.correlator = config.correlator.with_sequential_ids("req-");
                    info!("Using sequential correlation ids");
                }
                "uuid" => {}
                other => warn!(value = other, "{} must be uuid or sequential", ID_STRATEGY_VAR),
            }
        }

        config
    }
}

fn millis(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(_) => {
            warn!(value = %raw, "{} must be a number of milliseconds", key);
            None
        }
    }
}
