//! Simulated user-registration server.
//!
//! Accepts `POST /api/user/` requests, acknowledges them at once and pushes
//! the real result on the shared push channel after a fixed delay:
//! `UserExists` for the reserved name, `UserCreated` for anything else.

use chrono::Utc;
use evented_requests::{OutboundRequest, PushSender};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Username the server treats as already taken.
pub const EXISTING_USER: &str = "existinguser";

const USER_PATH: &str = "/api/user";

/// Push event kind the server answers `username` with.
pub fn reply_kind(username: &str) -> &'static str {
    if username == EXISTING_USER {
        "UserExists"
    } else {
        "UserCreated"
    }
}

pub struct SimulatedUserServer {
    requests: mpsc::Receiver<OutboundRequest>,
    push: PushSender,
    delay: Duration,
    correlation_field: String,
}

impl SimulatedUserServer {
    pub fn new(
        requests: mpsc::Receiver<OutboundRequest>,
        push: PushSender,
        delay: Duration,
        correlation_field: impl Into<String>,
    ) -> Self {
        Self {
            requests,
            push,
            delay,
            correlation_field: correlation_field.into(),
        }
    }

    /// Serve until the request channel closes.
    pub async fn run(mut self) {
        let connected = json!({"sid": 1, "event": "connected", "timestamp": timestamp()});
        if let Err(e) = self.push.push_json(&connected).await {
            warn!(error = %e, "Push channel unavailable, simulated server not starting");
            return;
        }

        while let Some(request) = self.requests.recv().await {
            self.handle(request);
        }

        info!("Request channel closed, simulated server stopping");
    }

    fn handle(&self, request: OutboundRequest) {
        if request.path.trim_end_matches('/') != USER_PATH {
            warn!(path = %request.path, "No route for request");
            return;
        }

        let client_msg_id = request
            .params
            .get(&self.correlation_field)
            .cloned()
            .unwrap_or(Value::Null);
        let username = request
            .params
            .get("username")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let event = reply_kind(&username);

        info!(username = %username, client_msg_id = %client_msg_id, reply = event, "Request queued");

        let push = self.push.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let message = json!({
                "event": event,
                "clientMsgId": client_msg_id,
                "username": username,
                "timestamp": timestamp(),
            });
            if let Err(e) = push.push_json(&message).await {
                warn!(error = %e, "Could not push reply");
            }
        });
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339()
}
