//! Adapters for the evented request ports.
//!
//! In-memory channels for tests and local wiring, the push listener that
//! feeds the correlator, and an optional HTTP transport.

pub mod channel;
#[cfg(feature = "http")]
pub mod http;
pub mod push_listener;

pub use channel::{push_channel, ChannelPushChannel, ChannelTransport, PushSender};
#[cfg(feature = "http")]
pub use http::{BodyEncoding, HttpTransport};
pub use push_listener::PushListener;
