//! Push listener: drains the push channel into the correlator.

use crate::correlator::Correlator;
use crate::domain::error::PushError;
use crate::domain::future::DispatchOutcome;
use crate::ports::inbound::PushChannel;
use shared_types::IncomingEvent;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, trace, warn};

/// Reads frames from a [`PushChannel`] and dispatches them.
pub struct PushListener {
    correlator: Correlator,
    channel: Arc<dyn PushChannel>,
}

impl PushListener {
    pub fn new(correlator: Correlator, channel: Arc<dyn PushChannel>) -> Self {
        Self {
            correlator,
            channel,
        }
    }

    /// Run the listener loop until the channel closes.
    pub async fn run(self) {
        info!("Push listener started");

        loop {
            match self.channel.receive().await {
                Ok(frame) => self.handle_frame(&frame),
                Err(PushError::ChannelClosed) => {
                    warn!("Push channel closed, stopping listener");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Error receiving push frame");
                }
            }
        }
    }

    /// Spawn [`PushListener::run`] onto the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    fn handle_frame(&self, frame: &str) {
        let event = match IncomingEvent::from_json(frame) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, frame_len = frame.len(), "Dropping malformed push frame");
                return;
            }
        };

        let kind = event.kind.clone();
        match self.correlator.dispatch(event) {
            DispatchOutcome::Resolved { correlation_id, .. } => {
                trace!(correlation_id = %correlation_id, kind = %kind, "Push frame resolved a future");
            }
            DispatchOutcome::Ignored | DispatchOutcome::Unmatched => {
                trace!(kind = %kind, "Push frame passed through");
            }
        }
    }
}
