//! # Evented Demo
//!
//! Wiring for the demo binary: a simulated user-registration server that
//! answers over a push channel, and environment-driven configuration.
//!
//! ```text
//! EventedClient ──ChannelTransport──► SimulatedUserServer
//!       ▲                                    │ (after delay)
//!       └──────────── push_channel ◄─────────┘
//! ```

pub mod config;
pub mod server;

pub use config::DemoConfig;
pub use server::{reply_kind, SimulatedUserServer, EXISTING_USER};
