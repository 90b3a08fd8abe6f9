//! Evented client service - wires bus, correlator, dispatcher and listener.
//!
//! ```text
//! caller ──send()──► RequestDispatcher ──register──► Correlator
//!                          │                             ▲
//!                          ▼                             │ dispatch
//!                   RequestTransport              PushListener ◄── PushChannel
//!                                                        │
//!                                                        ▼ re-publish
//!                                               InMemoryNotificationBus ──► listeners
//! ```

use crate::correlator::Correlator;
use crate::dispatcher::RequestDispatcher;
use crate::domain::config::{log_millis, ConfigError, CorrelatorConfig};
use crate::domain::error::DispatchError;
use crate::domain::future::{FutureOptions, FutureOutcome};
use crate::adapters::push_listener::PushListener;
use crate::ports::{PushChannel, RequestTransport};
use shared_bus::{InMemoryNotificationBus, KindFilter, NotificationStream, Subscription};
use shared_types::{CorrelationId, OutboundRequest};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Client-side entry point.
pub struct EventedClient {
    bus: Arc<InMemoryNotificationBus>,
    dispatcher: RequestDispatcher,
    push: Arc<dyn PushChannel>,
    listener: Option<JoinHandle<()>>,
}

impl EventedClient {
    /// Create a client with its own notification bus.
    pub fn new(
        config: CorrelatorConfig,
        transport: Arc<dyn RequestTransport>,
        push: Arc<dyn PushChannel>,
    ) -> Result<Self, ConfigError> {
        Self::with_bus(config, Arc::new(InMemoryNotificationBus::new()), transport, push)
    }

    /// Create a client re-publishing onto an existing bus.
    pub fn with_bus(
        config: CorrelatorConfig,
        bus: Arc<InMemoryNotificationBus>,
        transport: Arc<dyn RequestTransport>,
        push: Arc<dyn PushChannel>,
    ) -> Result<Self, ConfigError> {
        let correlator = Correlator::new(config, bus.clone())?;
        let dispatcher = RequestDispatcher::new(correlator, transport);

        Ok(Self {
            bus,
            dispatcher,
            push,
            listener: None,
        })
    }

    /// Start listening on the push channel. No-op if already running.
    pub fn start(&mut self) {
        if self.is_running() {
            warn!("Evented client already started");
            return;
        }

        let listener = PushListener::new(self.correlator().clone(), Arc::clone(&self.push));
        self.listener = Some(listener.spawn());
        info!(
            default_deadline_ms = log_millis(self.correlator().config().default_deadline),
            "Evented client started"
        );
    }

    /// Stop the push listener. Pending futures keep their timers.
    pub async fn shutdown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
            // Cancellation is the expected outcome here.
            let _ = listener.await;
            info!(
                pending = self.correlator().pending_count(),
                "Evented client stopped"
            );
        }
    }

    pub fn is_running(&self) -> bool {
        self.listener
            .as_ref()
            .is_some_and(|listener| !listener.is_finished())
    }

    /// See [`RequestDispatcher::send`].
    pub async fn send(
        &self,
        request: OutboundRequest,
        options: FutureOptions,
    ) -> Result<CorrelationId, DispatchError> {
        self.dispatcher.send(request, options).await
    }

    /// See [`RequestDispatcher::request`].
    pub async fn request(
        &self,
        request: OutboundRequest,
        options: FutureOptions,
    ) -> Result<FutureOutcome, DispatchError> {
        self.dispatcher.request(request, options).await
    }

    /// Listen to every pushed event of the given kinds, correlated or not.
    pub fn subscribe(&self, filter: KindFilter) -> Subscription {
        self.bus.subscribe(filter)
    }

    pub fn stream(&self, filter: KindFilter) -> NotificationStream {
        self.bus.stream(filter)
    }

    pub fn correlator(&self) -> &Correlator {
        self.dispatcher.correlator()
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    pub fn bus(&self) -> &Arc<InMemoryNotificationBus> {
        &self.bus
    }
}

impl Drop for EventedClient {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}
