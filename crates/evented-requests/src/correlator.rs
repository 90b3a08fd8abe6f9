//! Correlator - binds locally issued requests to pushed notifications.
//!
//! Flow:
//! 1. Caller registers a future (kinds, callbacks, deadline) and gets its id
//! 2. The request goes out carrying that id
//! 3. The push channel delivers an event echoing the id; `dispatch()` routes it
//!    through the `(kind, id)` table to exactly one future
//! 4. If nothing arrives, the deadline timer expires the future instead
//!
//! Whichever of step 3 or 4 removes the future from the table first owns the
//! terminal outcome. Removal happens under the table lock; callbacks run after
//! the lock is released, so they may call back into the correlator.

use crate::domain::config::{log_millis, ConfigError, CorrelatorConfig};
use crate::domain::error::CorrelatorError;
use crate::domain::future::{
    DispatchOutcome, EventCallback, FutureOptions, FutureOutcome, Resolution, TimeoutCallback,
};
use parking_lot::Mutex;
use serde::Serialize;
use shared_bus::NotificationSink;
use shared_types::{CorrelationId, CorrelationIdGenerator, EventKind, IncomingEvent};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Generated ids are retried this many times when they collide with a pending one.
const MAX_ID_ATTEMPTS: usize = 8;

/// Expiry used when a deadline does not fit in an `Instant` (roughly 30 years).
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Arena handle of one registration. Never reused within a correlator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Ticket(u64);

/// Two-level routing key: what happened, for which request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RouteKey {
    kind: EventKind,
    id: CorrelationId,
}

#[derive(Debug, Clone, Copy)]
struct Route {
    ticket: Ticket,
    resolution: Resolution,
}

/// One outstanding correlation.
struct PendingFuture {
    id: CorrelationId,
    success_kinds: HashSet<EventKind>,
    error_kinds: HashSet<EventKind>,
    on_success: Option<EventCallback>,
    on_error: Option<EventCallback>,
    on_timeout: Option<TimeoutCallback>,
    deadline: Duration,
    registered_at: Instant,
    /// Scheduled expiry; owned exclusively by this future.
    timer: Option<AbortHandle>,
}

impl PendingFuture {
    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[derive(Default)]
struct PendingTable {
    next_ticket: u64,
    futures: HashMap<Ticket, PendingFuture>,
    by_id: HashMap<CorrelationId, Ticket>,
    routes: HashMap<RouteKey, Route>,
}

impl PendingTable {
    /// Remove a future together with every route pointing at it.
    fn remove(&mut self, ticket: Ticket) -> Option<PendingFuture> {
        let future = self.futures.remove(&ticket)?;
        self.by_id.remove(&future.id);
        for kind in future.success_kinds.iter().chain(&future.error_kinds) {
            self.routes.remove(&RouteKey {
                kind: kind.clone(),
                id: future.id.clone(),
            });
        }
        Some(future)
    }
}

/// Statistics for the correlator
#[derive(Debug, Default)]
pub struct CorrelatorStats {
    /// Total futures registered
    pub total_registered: AtomicU64,
    /// Total futures resolved as success
    pub total_succeeded: AtomicU64,
    /// Total futures resolved as error
    pub total_failed: AtomicU64,
    /// Total futures timed out
    pub total_timeouts: AtomicU64,
    /// Total futures cancelled by the caller
    pub total_cancelled: AtomicU64,
    /// Correlated events with no pending future
    pub total_unmatched: AtomicU64,
    /// Events for a pending id whose kind was not awaited
    pub total_ignored: AtomicU64,
    /// Registrations rejected
    pub total_rejected: AtomicU64,
}

impl CorrelatorStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            registered: self.total_registered.load(Ordering::Relaxed),
            succeeded: self.total_succeeded.load(Ordering::Relaxed),
            failed: self.total_failed.load(Ordering::Relaxed),
            timed_out: self.total_timeouts.load(Ordering::Relaxed),
            cancelled: self.total_cancelled.load(Ordering::Relaxed),
            unmatched: self.total_unmatched.load(Ordering::Relaxed),
            ignored: self.total_ignored.load(Ordering::Relaxed),
            rejected: self.total_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`CorrelatorStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub registered: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub cancelled: u64,
    pub unmatched: u64,
    pub ignored: u64,
    pub rejected: u64,
}

struct Inner {
    config: CorrelatorConfig,
    sink: Arc<dyn NotificationSink>,
    generator: Box<dyn CorrelationIdGenerator>,
    table: Mutex<PendingTable>,
    stats: CorrelatorStats,
}

impl Inner {
    fn unused_id(&self, table: &PendingTable) -> Result<CorrelationId, CorrelatorError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.generator.generate();
            if !id.is_empty() && !table.by_id.contains_key(&id) {
                return Ok(id);
            }
            debug!(correlation_id = %id, "Generated correlation id already pending, retrying");
        }
        Err(CorrelatorError::IdGenerationExhausted {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    /// Timer path. Only the registration the timer was armed for can expire.
    fn expire(&self, ticket: Ticket) {
        let Some(mut future) = self.table.lock().remove(ticket) else {
            return;
        };
        // This task is the timer; nothing left to abort.
        future.timer = None;
        self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);

        warn!(
            correlation_id = %future.id,
            deadline_ms = log_millis(future.deadline),
            "Future timed out waiting for correlated event"
        );

        if let Some(on_timeout) = future.on_timeout.take() {
            on_timeout();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        for future in self.table.get_mut().futures.values_mut() {
            future.disarm();
        }
    }
}

/// Owns the table of pending futures and resolves them from inbound events.
///
/// Cheap to clone; clones share the same table.
#[derive(Clone)]
pub struct Correlator {
    inner: Arc<Inner>,
}

impl Correlator {
    /// Create a correlator that re-publishes every dispatched event to `sink`.
    pub fn new(
        config: CorrelatorConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, ConfigError> {
        let generator = config.id_generator();
        Self::with_generator(config, sink, generator)
    }

    /// Same as [`Correlator::new`] with a custom id generator.
    pub fn with_generator(
        config: CorrelatorConfig,
        sink: Arc<dyn NotificationSink>,
        generator: Box<dyn CorrelationIdGenerator>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                sink,
                generator,
                table: Mutex::new(PendingTable::default()),
                stats: CorrelatorStats::default(),
            }),
        })
    }

    pub fn config(&self) -> &CorrelatorConfig {
        &self.inner.config
    }

    /// Register a future and arm its deadline timer.
    ///
    /// Returns once the future is routable: an event dispatched after this
    /// call returns can resolve it. Must be called within a tokio runtime.
    pub fn register(&self, options: FutureOptions) -> Result<CorrelationId, CorrelatorError> {
        self.try_register(options).inspect_err(|err| {
            self.inner.stats.total_rejected.fetch_add(1, Ordering::Relaxed);
            debug!(error = %err, "Registration rejected");
        })
    }

    /// Register a future whose outcome is delivered through a oneshot channel.
    ///
    /// Any callbacks set on `options` are replaced.
    pub fn register_awaitable(
        &self,
        options: FutureOptions,
    ) -> Result<(CorrelationId, oneshot::Receiver<FutureOutcome>), CorrelatorError> {
        let (tx, rx) = oneshot::channel();
        let slot = Arc::new(Mutex::new(Some(tx)));
        let (on_success, on_error, on_timeout) = (slot.clone(), slot.clone(), slot);

        let options = options
            .on_success(move |event| deliver(&on_success, FutureOutcome::Success(event.clone())))
            .on_error(move |event| deliver(&on_error, FutureOutcome::Error(event.clone())))
            .on_timeout(move || deliver(&on_timeout, FutureOutcome::TimedOut));

        let id = self.register(options)?;
        Ok((id, rx))
    }

    fn try_register(&self, mut options: FutureOptions) -> Result<CorrelationId, CorrelatorError> {
        let overlap = options.overlapping_kinds();
        if !overlap.is_empty() {
            return Err(CorrelatorError::OverlappingKinds { kinds: overlap });
        }
        if options.success_kinds.is_empty() && options.error_kinds.is_empty() && !options.timeout_only
        {
            return Err(CorrelatorError::NoEventKinds);
        }
        if options.correlation_id.as_ref().is_some_and(CorrelationId::is_empty) {
            return Err(CorrelatorError::EmptyCorrelationId);
        }
        let runtime = Handle::try_current().map_err(|_| CorrelatorError::NoRuntime)?;

        let deadline = options.deadline.unwrap_or(self.inner.config.default_deadline);
        let registered_at = Instant::now();
        let expires_at = registered_at
            .checked_add(deadline)
            .unwrap_or_else(|| registered_at + FAR_FUTURE);

        let mut table = self.inner.table.lock();

        let limit = self.inner.config.max_pending;
        if table.futures.len() >= limit {
            return Err(CorrelatorError::CapacityExceeded { limit });
        }

        let id = match options.correlation_id.take() {
            Some(id) if table.by_id.contains_key(&id) => {
                return Err(CorrelatorError::DuplicateCorrelationId(id));
            }
            Some(id) => id,
            None => self.inner.unused_id(&table)?,
        };

        let ticket = Ticket(table.next_ticket);
        table.next_ticket += 1;

        for (kinds, resolution) in [
            (&options.success_kinds, Resolution::Success),
            (&options.error_kinds, Resolution::Error),
        ] {
            for kind in kinds {
                table.routes.insert(
                    RouteKey {
                        kind: kind.clone(),
                        id: id.clone(),
                    },
                    Route { ticket, resolution },
                );
            }
        }

        // The timer may run on another worker immediately; it blocks on the
        // table lock until the future below is inserted.
        let weak = Arc::downgrade(&self.inner);
        let timer = runtime.spawn(async move {
            tokio::time::sleep_until(expires_at).await;
            if let Some(inner) = weak.upgrade() {
                inner.expire(ticket);
            }
        });

        table.by_id.insert(id.clone(), ticket);
        table.futures.insert(
            ticket,
            PendingFuture {
                id: id.clone(),
                success_kinds: options.success_kinds,
                error_kinds: options.error_kinds,
                on_success: options.on_success,
                on_error: options.on_error,
                on_timeout: options.on_timeout,
                deadline,
                registered_at,
                timer: Some(timer.abort_handle()),
            },
        );
        drop(table);

        self.inner.stats.total_registered.fetch_add(1, Ordering::Relaxed);
        debug!(
            correlation_id = %id,
            deadline_ms = log_millis(deadline),
            "Registered pending future"
        );

        Ok(id)
    }

    /// Route an inbound event to its pending future, then re-publish it.
    ///
    /// The re-published notification carries no correlation id, so generic
    /// listeners observe every event regardless of whether it resolved
    /// anything.
    pub fn dispatch(&self, event: IncomingEvent) -> DispatchOutcome {
        let outcome = self.correlate(&event);

        let receivers = self.inner.sink.publish(event.to_notification());
        trace!(kind = %event.kind, receivers, "Re-published event for generic listeners");

        outcome
    }

    fn correlate(&self, event: &IncomingEvent) -> DispatchOutcome {
        let Some(id) = event.correlation_id.as_ref() else {
            return DispatchOutcome::Unmatched;
        };

        let key = RouteKey {
            kind: event.kind.clone(),
            id: id.clone(),
        };

        let mut table = self.inner.table.lock();
        let Some(route) = table.routes.get(&key).copied() else {
            let pending = table.by_id.contains_key(id);
            drop(table);

            if pending {
                self.inner.stats.total_ignored.fetch_add(1, Ordering::Relaxed);
                debug!(correlation_id = %id, kind = %event.kind, "Event kind not awaited by pending future");
                return DispatchOutcome::Ignored;
            }
            self.inner.stats.total_unmatched.fetch_add(1, Ordering::Relaxed);
            debug!(correlation_id = %id, kind = %event.kind, "Event for unknown or expired correlation ID");
            return DispatchOutcome::Unmatched;
        };
        let removed = table.remove(route.ticket);
        drop(table);

        // Routes and futures leave the table together.
        let Some(mut future) = removed else {
            return DispatchOutcome::Unmatched;
        };
        future.disarm();

        let elapsed_ms = log_millis(future.registered_at.elapsed());
        let callback = match route.resolution {
            Resolution::Success => {
                self.inner.stats.total_succeeded.fetch_add(1, Ordering::Relaxed);
                future.on_success.take()
            }
            Resolution::Error => {
                self.inner.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                future.on_error.take()
            }
        };
        debug!(
            correlation_id = %future.id,
            kind = %event.kind,
            resolution = ?route.resolution,
            elapsed_ms,
            "Resolved pending future"
        );

        if let Some(callback) = callback {
            callback(event);
        }

        DispatchOutcome::Resolved {
            correlation_id: future.id,
            resolution: route.resolution,
        }
    }

    /// Abandon a pending future: no callback fires, its timer is disarmed.
    ///
    /// Returns false if nothing is pending under `id`.
    pub fn cancel(&self, id: &CorrelationId) -> bool {
        let removed = {
            let mut table = self.inner.table.lock();
            let Some(ticket) = table.by_id.get(id).copied() else {
                return false;
            };
            table.remove(ticket)
        };

        match removed {
            Some(mut future) => {
                future.disarm();
                self.inner.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(correlation_id = %id, "Cancelled pending future");
                true
            }
            None => false,
        }
    }

    /// Check if a correlation id is pending
    pub fn is_pending(&self, id: &CorrelationId) -> bool {
        self.inner.table.lock().by_id.contains_key(id)
    }

    /// Get number of currently pending futures
    pub fn pending_count(&self) -> usize {
        self.inner.table.lock().futures.len()
    }

    /// Get statistics
    pub fn stats(&self) -> &CorrelatorStats {
        &self.inner.stats
    }
}

impl fmt::Debug for Correlator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Correlator")
            .field("config", &self.inner.config)
            .field("pending", &self.pending_count())
            .finish()
    }
}

fn deliver(slot: &Mutex<Option<oneshot::Sender<FutureOutcome>>>, outcome: FutureOutcome) {
    if let Some(tx) = slot.lock().take() {
        // The caller may have stopped waiting.
        let _ = tx.send(outcome);
    }
}
