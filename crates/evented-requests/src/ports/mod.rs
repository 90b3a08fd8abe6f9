//! Ports (hexagonal architecture): the collaborators the correlator talks to.
//!
//! - Outbound: [`RequestTransport`] carries the initial request.
//! - Inbound: [`PushChannel`] delivers raw frames from the shared push stream.

pub mod inbound;
pub mod outbound;

pub use inbound::PushChannel;
pub use outbound::{RequestTransport, TransportAck};
