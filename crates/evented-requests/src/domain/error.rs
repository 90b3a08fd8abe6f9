//! Error types for registration, dispatch and the transport collaborators.
//!
//! Terminal outcomes of a future (success, application error, timeout) are
//! never errors here: they travel through callbacks or
//! [`FutureOutcome`](crate::FutureOutcome). These types cover what can fail
//! synchronously at the call site.

use shared_types::{CorrelationId, EventKind};
use thiserror::Error;

/// Registration rejected by the correlator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelatorError {
    /// The same kind would settle the future as both success and error.
    #[error("event kinds registered as both success and error: {kinds:?}")]
    OverlappingKinds { kinds: Vec<EventKind> },

    /// Neither success nor error kinds given and timeout-only was not requested.
    #[error("registration listens for no event kinds")]
    NoEventKinds,

    /// A future is already pending under this id.
    #[error("correlation id already pending: {0}")]
    DuplicateCorrelationId(CorrelationId),

    /// Caller-supplied id is empty.
    #[error("correlation id cannot be empty")]
    EmptyCorrelationId,

    /// The generator kept producing ids that are already pending.
    #[error("could not generate an unused correlation id after {attempts} attempts")]
    IdGenerationExhausted { attempts: usize },

    /// Too many outstanding futures.
    #[error("pending futures limit reached ({limit})")]
    CapacityExceeded { limit: usize },

    /// Deadline timers need a tokio runtime.
    #[error("register called outside a tokio runtime")]
    NoRuntime,
}

/// Failure of the request transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("request rejected with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not encode request: {0}")]
    Encoding(String),
    #[error("transport closed")]
    Closed,
}

/// Failure of the push-channel collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushError {
    #[error("push channel closed")]
    ChannelClosed,
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// Errors from the request dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Registration failed; nothing was transmitted.
    #[error("registration failed: {0}")]
    Register(#[from] CorrelatorError),

    /// The transport failed after the future was registered.
    ///
    /// For [`RequestDispatcher::send`](crate::RequestDispatcher::send) the
    /// future stays pending and will time out unless cancelled.
    #[error("transport failed for {correlation_id}: {source}")]
    Transport {
        correlation_id: CorrelationId,
        #[source]
        source: TransportError,
    },

    /// The future was cancelled or the correlator dropped before an outcome.
    #[error("future {0} abandoned before resolution")]
    Abandoned(CorrelationId),
}

impl DispatchError {
    /// Id of the registered future, when registration succeeded.
    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        match self {
            Self::Register(_) => None,
            Self::Transport { correlation_id, .. } | Self::Abandoned(correlation_id) => {
                Some(correlation_id)
            }
        }
    }
}
