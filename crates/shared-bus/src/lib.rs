//! # Shared Bus - Notification Surface for Push Events
//!
//! Every event arriving on the push channel ends up here, where any number of
//! unrelated listeners can observe it by kind.
//!
//! ## Writers
//!
//! - The correlator's re-publish step (generic, correlation stripped)
//! - The push-channel transport's raw delivery step, when it chooses to
//!   publish directly
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────────┐  subscribe()  ┌──────────┐
//! │  Correlator  │ ────────────► │ NotificationBus  │ ────────────► │ Listener │
//! └──────────────┘               │  (broadcast)     │ ────────────► │ Listener │
//!                                └──────────────────┘               └──────────┘
//! ```
//!
//! Listeners never influence correlation: they only read.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod filter;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use filter::KindFilter;
pub use publisher::{InMemoryNotificationBus, NotificationSink};
pub use subscriber::{NotificationStream, Subscription, SubscriptionError};

/// Maximum notifications to buffer per subscriber before the slowest lags.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
