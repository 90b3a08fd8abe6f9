//! Inbound ports.

use crate::domain::error::PushError;
use async_trait::async_trait;

/// Receives raw text frames from the shared push stream.
///
/// Reconnection is the implementor's concern; returning
/// [`PushError::ChannelClosed`] means no further frames will ever arrive.
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Receive next frame (waits until one is available)
    async fn receive(&self) -> Result<String, PushError>;
}
