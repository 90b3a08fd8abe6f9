//! Outbound ports.

use crate::domain::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::OutboundRequest;
use std::sync::Arc;

/// Immediate acknowledgement of a transmitted request.
///
/// This is the transport's own reply (e.g. `{"requestQueued": true}`), not
/// the correlated result, which arrives later on the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportAck {
    pub status: u16,
    pub body: Value,
}

impl TransportAck {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// 200 with an empty body.
    pub fn accepted() -> Self {
        Self::new(200, Value::Null)
    }
}

/// Sends requests to the server.
#[async_trait]
pub trait RequestTransport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<TransportAck, TransportError>;
}

#[async_trait]
impl<T: RequestTransport + ?Sized> RequestTransport for Arc<T> {
    async fn send(&self, request: OutboundRequest) -> Result<TransportAck, TransportError> {
        (**self).send(request).await
    }
}
