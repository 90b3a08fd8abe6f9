//! Domain types for evented requests.
//!
//! Configuration, registration options, outcomes and errors. The stateful
//! pieces (correlator, dispatcher) live at the crate root.

pub mod config;
pub mod error;
pub mod future;

// Re-exports for convenience
pub use config::{ConfigError, CorrelatorConfig, IdStrategy};
pub use error::{CorrelatorError, DispatchError, PushError, TransportError};
pub use future::{
    DispatchOutcome, EventCallback, FutureOptions, FutureOutcome, Resolution, TimeoutCallback,
};
