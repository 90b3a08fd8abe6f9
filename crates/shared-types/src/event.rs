//! # Inbound Events
//!
//! Events raised by the push channel and the notifications the bus carries.
//!
//! ## Inbound contract
//!
//! ```text
//! { "event": "UserCreated", "clientMsgId": "1286891234567", "timestamp": "..." }
//!     │                          │                             │
//!     kind (or "kind")           correlation (or               passed through
//!                                "correlationId"), optional    verbatim
//! ```

use crate::correlation::CorrelationId;
use crate::errors::WireError;
use crate::{CORRELATION_FIELDS, KIND_FIELDS};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Borrow;
use std::fmt;

/// Label classifying an inbound notification, e.g. `"UserCreated"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventKind(String);

impl EventKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventKind {
    fn from(kind: &str) -> Self {
        Self(kind.to_owned())
    }
}

impl From<String> for EventKind {
    fn from(kind: String) -> Self {
        Self(kind)
    }
}

impl Borrow<str> for EventKind {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A `(kind, correlation_id?, payload)` triple delivered from the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingEvent {
    /// Event type label.
    pub kind: EventKind,
    /// Echo of the client's correlation id; absent for uncorrelated events.
    pub correlation_id: Option<CorrelationId>,
    /// Full message as sent by the server.
    pub payload: Value,
}

impl IncomingEvent {
    /// Event tied to a specific client request.
    pub fn correlated(
        kind: impl Into<EventKind>,
        correlation_id: impl Into<CorrelationId>,
        payload: Value,
    ) -> Self {
        Self {
            kind: kind.into(),
            correlation_id: Some(correlation_id.into()),
            payload,
        }
    }

    /// Event not tied to any request.
    pub fn broadcast(kind: impl Into<EventKind>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            correlation_id: None,
            payload,
        }
    }

    /// Decode a raw push-channel text frame.
    pub fn from_json(frame: &str) -> Result<Self, WireError> {
        let value: Value = serde_json::from_str(frame)?;
        Self::from_value(value)
    }

    /// Decode an already-parsed push-channel message.
    ///
    /// The whole object becomes the payload; kind and correlation id are read
    /// from it without being removed.
    pub fn from_value(value: Value) -> Result<Self, WireError> {
        let object = match &value {
            Value::Object(map) => map,
            other => {
                return Err(WireError::NotAnObject {
                    found: json_type_name(other),
                })
            }
        };

        let kind = KIND_FIELDS
            .iter()
            .find_map(|field| object.get(*field).and_then(Value::as_str))
            .filter(|kind| !kind.is_empty())
            .map(EventKind::from)
            .ok_or(WireError::MissingKind)?;

        let mut correlation_id = None;
        for field in CORRELATION_FIELDS {
            match object.get(field) {
                None | Some(Value::Null) => continue,
                Some(Value::String(s)) if s.is_empty() => continue,
                Some(Value::String(s)) => correlation_id = Some(CorrelationId::new(s.clone())),
                Some(Value::Number(n)) => correlation_id = Some(CorrelationId::new(n.to_string())),
                Some(_) => return Err(WireError::InvalidCorrelationId { field }),
            }
            break;
        }

        Ok(Self {
            kind,
            correlation_id,
            payload: value,
        })
    }

    /// Strip the correlation qualifier for generic re-publication.
    pub fn to_notification(&self) -> Notification {
        Notification {
            kind: self.kind.clone(),
            correlation_id: None,
            payload: self.payload.clone(),
        }
    }
}

/// What the notification bus carries to listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: EventKind,
    /// Set only on raw correlated deliveries; generic re-publication clears it.
    pub correlation_id: Option<CorrelationId>,
    pub payload: Value,
}

impl Notification {
    pub fn new(kind: impl Into<EventKind>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            correlation_id: None,
            payload,
        }
    }

    /// True when no specific request is attached.
    pub fn is_generic(&self) -> bool {
        self.correlation_id.is_none()
    }
}

impl From<IncomingEvent> for Notification {
    fn from(event: IncomingEvent) -> Self {
        Self {
            kind: event.kind,
            correlation_id: event.correlation_id,
            payload: event.payload,
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
