//! # Evented Demo
//!
//! Registers users against a simulated server whose answers arrive later on
//! a shared push channel.
//!
//! ## Flow
//!
//! 1. Load configuration (defaults, then `EVENTED_*` environment overrides)
//! 2. Start the simulated server and the client's push listener
//! 3. Issue requests: one per outcome (created, exists, timed out), plus one
//!    callback-driven request
//! 4. Report outcomes and correlator statistics, then shut down

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use evented_demo::{DemoConfig, SimulatedUserServer, EXISTING_USER};
use evented_requests::{
    push_channel, ChannelTransport, EventedClient, FutureOptions, FutureOutcome, OutboundRequest,
};
use futures::StreamExt;
use serde_json::json;
use shared_bus::KindFilter;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn user_request(username: &str) -> OutboundRequest {
    OutboundRequest::post("/api/user/").param("username", username)
}

fn user_options() -> FutureOptions {
    FutureOptions::new()
        .success_on("UserCreated")
        .error_kinds(["UserCreationFailed", "UserExists"])
}

async fn register_user(client: &EventedClient, username: &str, deadline: Option<Duration>) {
    let mut options = user_options();
    if let Some(deadline) = deadline {
        options = options.deadline(deadline);
    }

    match client.request(user_request(username), options).await {
        Ok(FutureOutcome::Success(event)) => {
            info!(username, payload = %event.payload, "User created");
        }
        Ok(FutureOutcome::Error(event)) => {
            warn!(username, kind = %event.kind, "User registration rejected");
        }
        Ok(FutureOutcome::TimedOut) => {
            warn!(username, "No answer before the deadline");
        }
        Err(e) => {
            warn!(username, error = %e, "Request failed");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config = DemoConfig::from_env();
    let millis = |d: Duration| u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
    info!(
        deadline_ms = millis(config.correlator.default_deadline),
        server_delay_ms = millis(config.server_delay),
        "Starting evented demo"
    );

    // Simulated server on the far side of both channels
    let (transport, requests) = ChannelTransport::new(config.channel_capacity);
    let transport = transport.with_ack(json!({"requestQueued": true, "url": "/api/user"}));
    let (pusher, push) = push_channel(config.channel_capacity);
    let server = SimulatedUserServer::new(
        requests,
        pusher,
        config.server_delay,
        config.correlator.request_field.clone(),
    );
    let server_task = tokio::spawn(server.run());

    let mut client = EventedClient::new(
        config.correlator.clone(),
        Arc::new(transport),
        Arc::new(push),
    )
    .context("invalid correlator configuration")?;

    // Generic listener: sees every event, correlated or not
    let mut everything = client.stream(KindFilter::all());
    let watcher = tokio::spawn(async move {
        while let Some(notification) = everything.next().await {
            info!(kind = %notification.kind, "Generic listener observed event");
        }
    });

    client.start();

    // Callback style
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let (on_created, on_rejected, on_timeout) = (done_tx.clone(), done_tx.clone(), done_tx);
    let options = user_options()
        .on_success(move |event| {
            let _ = on_created.send(format!("created ({})", event.payload["username"]));
        })
        .on_error(move |event| {
            let _ = on_rejected.send(format!("rejected with {}", event.kind));
        })
        .on_timeout(move || {
            let _ = on_timeout.send("timed out".to_owned());
        });
    let id = client
        .send(user_request("callbackuser"), options)
        .await
        .context("callback request failed")?;
    info!(correlation_id = %id, "Callback request sent");

    // Awaitable style, one request per outcome
    tokio::join!(
        register_user(&client, "dummyuser", None),
        register_user(&client, EXISTING_USER, None),
        register_user(&client, "slowuser", Some(config.server_delay / 2)),
    );

    if let Some(summary) = done_rx.recv().await {
        info!(correlation_id = %id, outcome = %summary, "Callback request finished");
    }

    let stats = client.correlator().stats().snapshot();
    info!(
        registered = stats.registered,
        succeeded = stats.succeeded,
        failed = stats.failed,
        timed_out = stats.timed_out,
        unmatched = stats.unmatched,
        "Correlator statistics"
    );

    // Graceful shutdown
    client.shutdown().await;
    drop(client);
    server_task.await.context("simulated server panicked")?;
    watcher.abort();

    info!("Shutdown complete");
    Ok(())
}
