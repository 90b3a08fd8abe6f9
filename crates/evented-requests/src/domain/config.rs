//! Correlator configuration with validation.
//!
//! One immutable value handed to the correlator at construction; per-call
//! [`FutureOptions`](crate::FutureOptions) override it without mutating it.

use serde::{Deserialize, Serialize};
use shared_types::{
    CorrelationIdGenerator, SequentialGenerator, UuidV7Generator, DEFAULT_REQUEST_FIELD,
};
use std::time::Duration;

/// How generated correlation ids are minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// Time-ordered UUID v7.
    #[default]
    UuidV7,
    /// Process-local counter, prefixed with `id_prefix`.
    Sequential,
}

/// Main correlator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelatorConfig {
    /// Deadline applied when a registration does not set one
    #[serde(with = "duration_serde")]
    pub default_deadline: Duration,
    /// Maximum number of simultaneously pending futures
    pub max_pending: usize,
    /// Id generation strategy
    pub id_strategy: IdStrategy,
    /// Prefix for sequential ids
    pub id_prefix: String,
    /// Request parameter that carries the correlation id to the server
    pub request_field: String,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            default_deadline: Duration::from_secs(10),
            max_pending: 10_000,
            id_strategy: IdStrategy::UuidV7,
            id_prefix: String::new(),
            request_field: DEFAULT_REQUEST_FIELD.to_owned(),
        }
    }
}

impl CorrelatorConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_deadline.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "default_deadline cannot be 0".into(),
            ));
        }

        if self.max_pending == 0 {
            return Err(ConfigError::InvalidLimit("max_pending cannot be 0".into()));
        }

        if self.request_field.trim().is_empty() {
            return Err(ConfigError::Invalid("request_field cannot be empty".into()));
        }

        Ok(())
    }

    /// Build the id generator selected by `id_strategy`.
    pub fn id_generator(&self) -> Box<dyn CorrelationIdGenerator> {
        match self.id_strategy {
            IdStrategy::UuidV7 => Box::new(UuidV7Generator),
            IdStrategy::Sequential => Box::new(SequentialGenerator::new(self.id_prefix.clone())),
        }
    }

    #[must_use]
    pub fn with_default_deadline(mut self, deadline: Duration) -> Self {
        self.default_deadline = deadline;
        self
    }

    #[must_use]
    pub fn with_request_field(mut self, field: impl Into<String>) -> Self {
        self.request_field = field.into();
        self
    }

    #[must_use]
    pub fn with_sequential_ids(mut self, prefix: impl Into<String>) -> Self {
        self.id_strategy = IdStrategy::Sequential;
        self.id_prefix = prefix.into();
        self
    }
}

/// Milliseconds for log fields, saturating at `u64::MAX`.
pub(crate) fn log_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Durations as `"250ms"`, `"10s"` or `"2m"`; a bare number means seconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            let m = mins.trim().parse::<u64>().map_err(|_| "invalid minutes")?;
            m.checked_mul(60)
                .map(Duration::from_secs)
                .ok_or("minutes out of range")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
