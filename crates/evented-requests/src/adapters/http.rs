//! HTTP request transport built on `reqwest`.
//!
//! Parameters travel as a form body by default, which is what browser-side
//! callers of comet-style servers send. JSON bodies are available for
//! servers that expect them. `GET` requests carry parameters in the query.

use crate::domain::error::TransportError;
use crate::ports::outbound::{RequestTransport, TransportAck};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared_types::OutboundRequest;
use tracing::debug;

/// How request parameters are encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyEncoding {
    /// `application/x-www-form-urlencoded`
    #[default]
    Form,
    /// `application/json`
    Json,
}

/// Sends requests to `base_url + path`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    encoding: BodyEncoding,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Reuse an existing client (connection pool, timeouts, TLS settings).
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            encoding: BodyEncoding::default(),
        }
    }

    #[must_use]
    pub fn encoding(mut self, encoding: BodyEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl RequestTransport for HttpTransport {
    async fn send(&self, request: OutboundRequest) -> Result<TransportAck, TransportError> {
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| TransportError::Encoding(e.to_string()))?;
        let url = self.url(&request.path);

        let builder = self.client.request(method.clone(), &url);
        let builder = if method == Method::GET {
            builder.query(&form_fields(&request.params))
        } else {
            match self.encoding {
                BodyEncoding::Form => builder.form(&form_fields(&request.params)),
                BodyEncoding::Json => builder.json(&request.params),
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        debug!(url = %url, status = status.as_u16(), "HTTP request completed");

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(TransportAck::new(status.as_u16(), parse_body(text)))
    }
}

/// Flatten parameters to string pairs. Strings are sent unquoted.
fn form_fields(params: &Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

fn parse_body(text: String) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
