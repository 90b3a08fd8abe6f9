//! Request dispatcher: the entry point that arms a future, then transmits.
//!
//! Registration completes before the transport is touched, so a reply that
//! overtakes the request's own acknowledgement still finds its future.

use crate::correlator::Correlator;
use crate::domain::error::DispatchError;
use crate::domain::future::{FutureOptions, FutureOutcome};
use crate::ports::outbound::{RequestTransport, TransportAck};
use shared_types::{CorrelationId, OutboundRequest};
use std::sync::Arc;
use tracing::{debug, warn};

/// Glues request issuance to correlator registration.
pub struct RequestDispatcher {
    correlator: Correlator,
    transport: Arc<dyn RequestTransport>,
}

impl RequestDispatcher {
    pub fn new(correlator: Correlator, transport: Arc<dyn RequestTransport>) -> Self {
        Self {
            correlator,
            transport,
        }
    }

    pub fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    /// Register `options`, then send `request` carrying the correlation id.
    ///
    /// Outcomes are delivered through the callbacks in `options`. If the
    /// transport fails the future stays pending and times out unless the
    /// caller cancels it with the id carried by the error.
    pub async fn send(
        &self,
        request: OutboundRequest,
        options: FutureOptions,
    ) -> Result<CorrelationId, DispatchError> {
        let correlation_id = self.correlator.register(options)?;
        self.transmit(&correlation_id, request).await?;
        Ok(correlation_id)
    }

    /// Send `request` and wait for its terminal outcome.
    ///
    /// Callbacks set on `options` are ignored. A transport failure cancels the
    /// future, since nothing would be left to observe it.
    pub async fn request(
        &self,
        request: OutboundRequest,
        options: FutureOptions,
    ) -> Result<FutureOutcome, DispatchError> {
        let (correlation_id, outcome) = self.correlator.register_awaitable(options)?;

        if let Err(err) = self.transmit(&correlation_id, request).await {
            self.correlator.cancel(&correlation_id);
            return Err(err);
        }

        outcome
            .await
            .map_err(|_| DispatchError::Abandoned(correlation_id))
    }

    async fn transmit(
        &self,
        correlation_id: &CorrelationId,
        mut request: OutboundRequest,
    ) -> Result<TransportAck, DispatchError> {
        request.attach_correlation(&self.correlator.config().request_field, correlation_id);

        debug!(
            correlation_id = %correlation_id,
            method = %request.method,
            path = %request.path,
            "Sending request"
        );

        match self.transport.send(request).await {
            Ok(ack) => {
                debug!(correlation_id = %correlation_id, status = ack.status, "Request acknowledged");
                Ok(ack)
            }
            Err(source) => {
                warn!(correlation_id = %correlation_id, error = %source, "Request transport failed");
                Err(DispatchError::Transport {
                    correlation_id: correlation_id.clone(),
                    source,
                })
            }
        }
    }
}
