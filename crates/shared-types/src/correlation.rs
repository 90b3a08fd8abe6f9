//! Correlation ID for request/notification matching.
//!
//! The id travels out as a request parameter and comes back attached to the
//! push notification. It is treated as an opaque string on both legs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Opaque token linking an outbound request to its inbound notification.
///
/// Callers may supply their own value; otherwise one is minted by a
/// [`CorrelationIdGenerator`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Wrap an existing token.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh time-ordered id (UUID v7).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Borrow the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the raw token.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Empty tokens never correlate anything.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<Uuid> for CorrelationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Source of fresh correlation ids.
pub trait CorrelationIdGenerator: Send + Sync {
    /// Produce the next id. Implementations should not repeat within a process run.
    fn generate(&self) -> CorrelationId;
}

/// UUID v7 ids: time-ordered, random tail.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV7Generator;

impl CorrelationIdGenerator for UuidV7Generator {
    fn generate(&self) -> CorrelationId {
        CorrelationId::generate()
    }
}

/// Monotonic counter ids, optionally prefixed (`"req-1"`, `"req-2"`, ...).
#[derive(Debug)]
pub struct SequentialGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialGenerator {
    /// Counter starting at 1 with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialGenerator {
    fn default() -> Self {
        Self::new("")
    }
}

impl CorrelationIdGenerator for SequentialGenerator {
    fn generate(&self) -> CorrelationId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        CorrelationId(format!("{}{}", self.prefix, n))
    }
}
