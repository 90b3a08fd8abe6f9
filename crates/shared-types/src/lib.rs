//! # Shared Types Crate
//!
//! Wire-level types exchanged between the request side, the push channel and
//! the notification bus.
//!
//! ## Design Principles
//!
//! - **Opaque correlation**: a [`CorrelationId`] is an uninterpreted token.
//!   The client mints it, the server echoes it, nobody parses it.
//! - **Verbatim payloads**: inbound messages keep their full JSON object as
//!   payload so callbacks see exactly what the server sent.
//! - **Explicit routing keys**: event kind and correlation id are separate
//!   fields, never concatenated into a namespaced string.

pub mod correlation;
pub mod errors;
pub mod event;
pub mod request;

pub use correlation::{CorrelationId, CorrelationIdGenerator, SequentialGenerator, UuidV7Generator};
pub use errors::WireError;
pub use event::{EventKind, IncomingEvent, Notification};
pub use request::OutboundRequest;

/// Field names accepted for the event kind on inbound messages, in lookup order.
pub const KIND_FIELDS: [&str; 2] = ["event", "kind"];

/// Field names accepted for the echoed correlation id on inbound messages.
pub const CORRELATION_FIELDS: [&str; 2] = ["clientMsgId", "correlationId"];

/// Default request parameter carrying the correlation id to the server.
pub const DEFAULT_REQUEST_FIELD: &str = "correlationId";
