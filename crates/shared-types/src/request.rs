//! Outbound requests sent over the request/response channel.

use crate::correlation::CorrelationId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A fire-and-forget request whose real result arrives on the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    /// HTTP-style verb, `"POST"` by default.
    pub method: String,
    /// Resource path, e.g. `"/api/user/"`.
    pub path: String,
    /// Request parameters.
    pub params: Map<String, Value>,
}

impl OutboundRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            params: Map::new(),
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new("POST", path)
    }

    /// Add a parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Attach the correlation id under `field`, replacing any previous value.
    pub fn attach_correlation(&mut self, field: &str, id: &CorrelationId) {
        self.params
            .insert(field.to_owned(), Value::String(id.as_str().to_owned()));
    }

    /// Read back the correlation id stored under `field`.
    pub fn correlation(&self, field: &str) -> Option<CorrelationId> {
        self.params
            .get(field)
            .and_then(Value::as_str)
            .map(CorrelationId::from)
    }
}
