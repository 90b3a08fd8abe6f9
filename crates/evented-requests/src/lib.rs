//! Evented Requests - correlate fire-and-forget requests with pushed results.
//!
//! A request goes out over one channel (HTTP-like); its real result comes back
//! later over a shared, long-lived push channel that also carries every other
//! client's traffic. This crate binds each request to exactly one future
//! inbound event, or gives up cleanly when none arrives.
//!
//! # Architecture
//!
//! ```text
//!  caller
//!    │ send / request
//!    ▼
//! ┌───────────────────┐  register  ┌────────────────────────────┐
//! │ RequestDispatcher │ ─────────► │         Correlator         │
//! └─────────┬─────────┘            │  (kind, id) → ticket       │
//!           │ transmit             │  ticket → future + timer   │
//!           ▼                      └──────┬──────────────▲──────┘
//!   RequestTransport                      │ re-publish   │ dispatch
//!                                         ▼              │
//!                              NotificationBus     PushListener
//!                                                        ▲
//!                                                   PushChannel
//! ```
//!
//! # Guarantees
//!
//! - A future is routable before its request is transmitted
//! - Exactly one of success, error or timeout fires per future
//! - An event for id `X` never resolves a future registered under `Y`
//! - Every dispatched event is re-published for generic listeners
//!
//! # Usage
//!
//! ```ignore
//! use evented_requests::{EventedClient, CorrelatorConfig, FutureOptions};
//!
//! let mut client = EventedClient::new(CorrelatorConfig::default(), transport, push)?;
//! client.start();
//!
//! let outcome = client
//!     .request(
//!         OutboundRequest::post("/api/user/").param("username", "dummyuser"),
//!         FutureOptions::new().success_on("UserCreated").error_on("UserExists"),
//!     )
//!     .await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod correlator;
pub mod dispatcher;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports for public API
pub use adapters::{push_channel, ChannelPushChannel, ChannelTransport, PushListener, PushSender};
#[cfg(feature = "http")]
pub use adapters::{BodyEncoding, HttpTransport};
pub use correlator::{Correlator, CorrelatorStats, StatsSnapshot};
pub use dispatcher::RequestDispatcher;
pub use domain::config::{ConfigError, CorrelatorConfig, IdStrategy};
pub use domain::error::{CorrelatorError, DispatchError, PushError, TransportError};
pub use domain::future::{DispatchOutcome, FutureOptions, FutureOutcome, Resolution};
pub use ports::{PushChannel, RequestTransport, TransportAck};
pub use service::EventedClient;
pub use shared_types::{CorrelationId, EventKind, IncomingEvent, Notification, OutboundRequest};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
