//! Registration options and terminal outcomes of a pending future.
//!
//! A future is a time-bounded expectation that exactly one correlated event
//! arrives. Its options name the kinds that settle it and the callbacks that
//! receive the outcome.

use serde::Serialize;
use shared_types::{CorrelationId, EventKind, IncomingEvent};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

/// Callback receiving the event that settled a future.
pub type EventCallback = Box<dyn FnOnce(&IncomingEvent) + Send + 'static>;

/// Callback invoked when a future expires unresolved.
pub type TimeoutCallback = Box<dyn FnOnce() + Send + 'static>;

/// Which side of a registration an event kind settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Success,
    Error,
}

/// Terminal outcome of a future, for callers that await instead of using callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum FutureOutcome {
    /// An event from the success kinds arrived.
    Success(IncomingEvent),
    /// An event from the error kinds arrived (application-level failure).
    Error(IncomingEvent),
    /// No matching event arrived before the deadline.
    TimedOut,
}

impl FutureOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The settling event, if any.
    pub fn event(&self) -> Option<&IncomingEvent> {
        match self {
            Self::Success(event) | Self::Error(event) => Some(event),
            Self::TimedOut => None,
        }
    }
}

/// What the correlator did with a dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The event settled the future registered under `correlation_id`.
    Resolved {
        correlation_id: CorrelationId,
        resolution: Resolution,
    },
    /// A future is pending under the event's id but does not listen for this kind.
    Ignored,
    /// No correlation id, or none pending under it.
    Unmatched,
}

/// Per-call registration options.
///
/// Unset fields fall back to the correlator's configuration: the default
/// deadline, a no-op timeout callback, and a generated correlation id.
///
/// ```ignore
/// let options = FutureOptions::new()
///     .success_on("UserCreated")
///     .error_on("UserExists")
///     .deadline(Duration::from_secs(1))
///     .on_success(|event| println!("created: {}", event.payload))
///     .on_timeout(|| println!("timed out"));
/// ```
#[derive(Default)]
pub struct FutureOptions {
    pub(crate) success_kinds: HashSet<EventKind>,
    pub(crate) error_kinds: HashSet<EventKind>,
    pub(crate) on_success: Option<EventCallback>,
    pub(crate) on_error: Option<EventCallback>,
    pub(crate) on_timeout: Option<TimeoutCallback>,
    pub(crate) deadline: Option<Duration>,
    pub(crate) correlation_id: Option<CorrelationId>,
    pub(crate) timeout_only: bool,
}

impl FutureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// A future with no event kinds that can only time out (or be cancelled).
    pub fn timeout_only() -> Self {
        Self {
            timeout_only: true,
            ..Self::default()
        }
    }

    /// Settle as success when an event of `kind` arrives.
    #[must_use]
    pub fn success_on(mut self, kind: impl Into<EventKind>) -> Self {
        self.success_kinds.insert(kind.into());
        self
    }

    /// Settle as error when an event of `kind` arrives.
    #[must_use]
    pub fn error_on(mut self, kind: impl Into<EventKind>) -> Self {
        self.error_kinds.insert(kind.into());
        self
    }

    #[must_use]
    pub fn success_kinds<I, K>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<EventKind>,
    {
        self.success_kinds.extend(kinds.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn error_kinds<I, K>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<EventKind>,
    {
        self.error_kinds.extend(kinds.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn on_success(mut self, callback: impl FnOnce(&IncomingEvent) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_error(mut self, callback: impl FnOnce(&IncomingEvent) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_timeout(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_timeout = Some(Box::new(callback));
        self
    }

    /// Override the configured default deadline.
    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Use a caller-chosen id instead of a generated one.
    #[must_use]
    pub fn correlation_id(mut self, id: impl Into<CorrelationId>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn requested_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    /// Kinds present in both sets, sorted.
    pub(crate) fn overlapping_kinds(&self) -> Vec<EventKind> {
        let mut overlap: Vec<EventKind> = self
            .success_kinds
            .intersection(&self.error_kinds)
            .cloned()
            .collect();
        overlap.sort();
        overlap
    }
}

impl fmt::Debug for FutureOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutureOptions")
            .field("success_kinds", &self.success_kinds)
            .field("error_kinds", &self.error_kinds)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_timeout", &self.on_timeout.is_some())
            .field("deadline", &self.deadline)
            .field("correlation_id", &self.correlation_id)
            .field("timeout_only", &self.timeout_only)
            .finish()
    }
}
