//! # Notification Publisher
//!
//! Defines the publishing side of the notification bus.

use crate::filter::KindFilter;
use crate::subscriber::{NotificationStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use shared_types::Notification;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Write side of the notification surface.
///
/// Publishing is synchronous so that it can run inside the correlator's
/// dispatch step without yielding.
pub trait NotificationSink: Send + Sync {
    /// Publish a notification.
    ///
    /// # Returns
    ///
    /// The number of active subscribers that received the notification.
    fn publish(&self, notification: Notification) -> usize;

    /// Get the total number of notifications published.
    fn notifications_published(&self) -> u64;
}

/// In-memory implementation of the notification bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer semantics.
/// A slow listener lags and loses the oldest notifications; it never blocks
/// the publisher.
pub struct InMemoryNotificationBus {
    /// Broadcast sender for notifications.
    sender: broadcast::Sender<Notification>,

    /// Total notifications published.
    published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryNotificationBus {
    /// Create a new bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to notifications matching a filter.
    ///
    /// Only notifications published after this call are observed.
    #[must_use]
    pub fn subscribe(&self, filter: KindFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        debug!(
            kinds = filter.kinds.len(),
            generic_only = filter.generic_only,
            "New subscription created"
        );
        Subscription::new(receiver, filter)
    }

    /// Get a stream of notifications matching a filter.
    #[must_use]
    pub fn stream(&self, filter: KindFilter) -> NotificationStream {
        NotificationStream::new(self.subscribe(filter))
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryNotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for InMemoryNotificationBus {
    fn publish(&self, notification: Notification) -> usize {
        let kind = notification.kind.clone();
        let generic = notification.is_generic();

        self.published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(notification) {
            Ok(receivers) => {
                debug!(kind = %kind, generic, receivers, "Notification published");
                receivers
            }
            Err(_) => {
                // Nobody listening is the normal case for most kinds.
                trace!(kind = %kind, generic, "Notification dropped (no receivers)");
                0
            }
        }
    }

    fn notifications_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    fn publish(&self, notification: Notification) -> usize {
        (**self).publish(notification)
    }

    fn notifications_published(&self) -> u64 {
        (**self).notifications_published()
    }
}
