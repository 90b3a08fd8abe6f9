//! In-memory adapters backed by tokio mpsc channels.
//!
//! Used by tests and the demo binary to stand in for a real HTTP client and
//! a real websocket connection.

use crate::domain::error::{PushError, TransportError};
use crate::ports::inbound::PushChannel;
use crate::ports::outbound::{RequestTransport, TransportAck};
use async_trait::async_trait;
use serde_json::Value;
use shared_types::OutboundRequest;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// Transport that hands every request to an mpsc receiver.
#[derive(Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<OutboundRequest>,
    ack: Value,
}

impl ChannelTransport {
    /// Create a transport and the receiving end a simulated server reads from.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OutboundRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx,
                ack: Value::Null,
            },
            rx,
        )
    }

    /// Body returned in every acknowledgement.
    #[must_use]
    pub fn with_ack(mut self, ack: Value) -> Self {
        self.ack = ack;
        self
    }
}

#[async_trait]
impl RequestTransport for ChannelTransport {
    async fn send(&self, request: OutboundRequest) -> Result<TransportAck, TransportError> {
        self.tx
            .send(request)
            .await
            .map_err(|_| TransportError::Closed)?;
        Ok(TransportAck::new(200, self.ack.clone()))
    }
}

/// Push channel fed through an mpsc sender.
pub struct ChannelPushChannel {
    frames: RwLock<mpsc::Receiver<String>>,
}

impl ChannelPushChannel {
    pub fn new(frames: mpsc::Receiver<String>) -> Self {
        Self {
            frames: RwLock::new(frames),
        }
    }
}

#[async_trait]
impl PushChannel for ChannelPushChannel {
    async fn receive(&self) -> Result<String, PushError> {
        let mut rx = self.frames.write().await;
        rx.recv().await.ok_or(PushError::ChannelClosed)
    }
}

/// Server side of a [`ChannelPushChannel`].
#[derive(Clone)]
pub struct PushSender {
    tx: mpsc::Sender<String>,
}

impl PushSender {
    /// Push a raw text frame.
    pub async fn push(&self, frame: impl Into<String>) -> Result<(), PushError> {
        self.tx
            .send(frame.into())
            .await
            .map_err(|_| PushError::ChannelClosed)
    }

    /// Push a JSON message as a text frame.
    pub async fn push_json(&self, message: &Value) -> Result<(), PushError> {
        debug!(message = %message, "Pushing frame");
        self.push(message.to_string()).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Create a connected push sender / push channel pair.
pub fn push_channel(capacity: usize) -> (PushSender, ChannelPushChannel) {
    let (tx, rx) = mpsc::channel(capacity);
    (PushSender { tx }, ChannelPushChannel::new(rx))
}
