//! # Notification Subscriber
//!
//! Defines the subscription side of the notification bus.

use crate::filter::KindFilter;
use shared_types::Notification;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The notification bus was dropped.
    #[error("Notification bus closed")]
    Closed,
}

/// A subscription handle for receiving notifications.
///
/// Dropping it releases its slot on the broadcast channel.
pub struct Subscription {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<Notification>,

    /// Filter for this subscription.
    filter: KindFilter,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<Notification>, filter: KindFilter) -> Self {
        Self { receiver, filter }
    }

    /// Receive the next notification that matches the filter.
    ///
    /// # Returns
    ///
    /// - `Some(notification)` - The next matching notification
    /// - `None` - The channel was closed (bus dropped)
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            let notification = match self.receiver.recv().await {
                Ok(n) => n,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, some notifications dropped");
                    continue;
                }
            };

            if self.filter.matches(&notification) {
                return Some(notification);
            }
        }
    }

    /// Try to receive the next notification without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(notification))` - A notification was available and matched
    /// - `Ok(None)` - Nothing available (would block)
    /// - `Err(SubscriptionError::Closed)` - The channel was closed
    pub fn try_recv(&mut self) -> Result<Option<Notification>, SubscriptionError> {
        loop {
            let notification = match self.receiver.try_recv() {
                Ok(n) => n,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if self.filter.matches(&notification) {
                return Ok(Some(notification));
            }
        }
    }

    /// Drain everything currently buffered that matches the filter.
    pub fn drain(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(Some(notification)) = self.try_recv() {
            out.push(notification);
        }
        out
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &KindFilter {
        &self.filter
    }
}

/// A stream wrapper for subscriptions.
///
/// Implements `tokio_stream::Stream` for use with stream combinators.
pub struct NotificationStream {
    inner: BroadcastStream<Notification>,
    filter: KindFilter,
}

impl NotificationStream {
    /// Create a new stream from a subscription.
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        let Subscription { receiver, filter } = subscription;

        Self {
            inner: BroadcastStream::new(receiver),
            filter,
        }
    }

    /// Get the filter for this stream.
    #[must_use]
    pub fn filter(&self) -> &KindFilter {
        &self.filter
    }
}

impl Stream for NotificationStream {
    type Item = Notification;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(notification))) => {
                    if this.filter.matches(&notification) {
                        return Poll::Ready(Some(notification));
                    }
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(count)))) => {
                    debug!(lagged = count, "Stream lagged, some notifications dropped");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
