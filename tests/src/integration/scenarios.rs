//! # Request Lifecycle Scenarios
//!
//! Full path for each scenario: dispatcher → transport → (test plays the
//! server) → push channel frame → listener → correlator → callback, with the
//! bus observing everything.
//!
//! 1. **Created**: reply before the deadline resolves as success
//! 2. **Silence**: no reply times out at the deadline
//! 3. **Exists**: an error kind resolves as error with the server payload
//! 4. **Two requests, one reply**: only the addressed future resolves
//! 5. **Stranger's reply**: unknown id fires nothing, listeners still see it

#[cfg(test)]
mod tests {
    use crate::integration::support::{settle, Fired, Harness, Tally};
    use evented_requests::{CorrelationId, CorrelatorConfig, FutureOptions, OutboundRequest};
    use serde_json::json;
    use shared_bus::KindFilter;
    use std::time::Duration;
    use tokio::time::sleep;

    fn create_user(username: &str) -> OutboundRequest {
        OutboundRequest::post("/api/user/").param("username", username)
    }

    fn user_options(tally: &Tally) -> FutureOptions {
        tally.watch(
            FutureOptions::new()
                .success_on("UserCreated")
                .error_kinds(["UserCreationFailed", "UserExists"])
                .deadline(Duration::from_millis(1000)),
        )
    }

    /// Read the next request off the transport and return the id it carries.
    async fn next_request_id(harness: &mut Harness) -> CorrelationId {
        let request = harness.requests.recv().await.expect("request sent");
        request
            .correlation("correlationId")
            .expect("correlation id attached")
    }

    // =============================================================================
    // SCENARIO A: SUCCESS BEFORE DEADLINE
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_created_before_deadline() {
        let mut harness = Harness::start(CorrelatorConfig::default());
        let tally = Tally::new();

        let id = harness
            .client
            .send(create_user("dummyuser"), user_options(&tally))
            .await
            .unwrap();
        assert_eq!(next_request_id(&mut harness).await, id);

        sleep(Duration::from_millis(200)).await;
        harness
            .push(json!({"event": "UserCreated", "clientMsgId": id.as_str()}))
            .await;

        let fired = tally.fired_at();
        assert_eq!(fired.len(), 1);
        assert!(matches!(fired[0].0, Fired::Success(_)));
        assert!(fired[0].1 >= Duration::from_millis(200));
        assert!(fired[0].1 < Duration::from_millis(210));

        // Well past the deadline: the timer was disarmed.
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(tally.fired().len(), 1);
    }

    // =============================================================================
    // SCENARIO B: SILENCE TIMES OUT
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_silence_times_out_at_deadline() {
        let mut harness = Harness::start(CorrelatorConfig::default());
        let tally = Tally::new();

        let id = harness
            .client
            .send(create_user("dummyuser"), user_options(&tally))
            .await
            .unwrap();
        next_request_id(&mut harness).await;

        sleep(Duration::from_millis(999)).await;
        assert!(tally.fired().is_empty());

        sleep(Duration::from_millis(5)).await;
        let fired = tally.fired_at();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, Fired::Timeout);
        assert!(fired[0].1 >= Duration::from_millis(1000));
        assert!(!harness.client.correlator().is_pending(&id));
    }

    // =============================================================================
    // SCENARIO C: APPLICATION ERROR
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_user_exists_reports_error_payload() {
        let mut harness = Harness::start(CorrelatorConfig::default());
        let tally = Tally::new();

        let id = harness
            .client
            .send(create_user("existinguser"), user_options(&tally))
            .await
            .unwrap();
        next_request_id(&mut harness).await;

        harness
            .push(json!({
                "event": "UserExists",
                "clientMsgId": id.as_str(),
                "username": "existinguser",
                "timestamp": "2011-04-01T12:00:00Z"
            }))
            .await;

        match tally.fired().as_slice() {
            [Fired::Error(event)] => {
                assert_eq!(event.kind.as_str(), "UserExists");
                assert_eq!(event.payload["username"], "existinguser");
                assert_eq!(event.payload["timestamp"], "2011-04-01T12:00:00Z");
            }
            other => panic!("expected one error, got {:?}", other),
        }
    }

    // =============================================================================
    // SCENARIO D: ISOLATION
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_reply_reaches_only_its_request() {
        let mut harness = Harness::start(CorrelatorConfig::default());
        let (tally_x, tally_y) = (Tally::new(), Tally::new());

        let x = harness
            .client
            .send(create_user("x"), user_options(&tally_x))
            .await
            .unwrap();
        let y = harness
            .client
            .send(create_user("y"), user_options(&tally_y))
            .await
            .unwrap();
        next_request_id(&mut harness).await;
        next_request_id(&mut harness).await;

        harness
            .push(json!({"event": "UserCreated", "clientMsgId": y.as_str()}))
            .await;

        assert!(tally_x.fired().is_empty());
        assert_eq!(tally_y.fired().len(), 1);
        assert!(harness.client.correlator().is_pending(&x));
    }

    // =============================================================================
    // SCENARIO E: UNKNOWN ID
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_stranger_reply_is_only_broadcast() {
        let mut harness = Harness::start(CorrelatorConfig::default());
        let tally = Tally::new();
        let mut listener = harness.client.subscribe(KindFilter::kinds(["UserCreated"]));

        harness
            .client
            .send(create_user("dummyuser"), user_options(&tally))
            .await
            .unwrap();
        next_request_id(&mut harness).await;

        harness
            .push(json!({"event": "UserCreated", "clientMsgId": "someone-else", "username": "z"}))
            .await;

        assert!(tally.fired().is_empty());
        let seen = listener.drain();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].is_generic());
        assert_eq!(seen[0].payload["username"], "z");
        assert_eq!(harness.client.correlator().stats().snapshot().unmatched, 1);
    }

    // =============================================================================
    // WIRE VARIANTS
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_numeric_echo_and_alternate_field_names() {
        let mut harness = Harness::start(CorrelatorConfig::default());
        let (numeric, renamed) = (Tally::new(), Tally::new());

        harness
            .client
            .send(
                create_user("a"),
                user_options(&numeric).correlation_id("1302350000000"),
            )
            .await
            .unwrap();
        let renamed_id = harness
            .client
            .send(create_user("b"), user_options(&renamed))
            .await
            .unwrap();
        next_request_id(&mut harness).await;
        next_request_id(&mut harness).await;

        harness
            .push(json!({"event": "UserCreated", "clientMsgId": 1302350000000u64}))
            .await;
        harness
            .push(json!({"kind": "UserExists", "correlationId": renamed_id.as_str()}))
            .await;

        assert!(matches!(numeric.fired().as_slice(), [Fired::Success(_)]));
        assert!(matches!(renamed.fired().as_slice(), [Fired::Error(_)]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_events_pass_through() {
        let harness = Harness::start(CorrelatorConfig::default());
        let mut lifecycle = harness.client.subscribe(KindFilter::kinds(["connected", "closed"]));

        harness.push(json!({"sid": 7, "event": "connected"})).await;
        harness.push(json!({"sid": 7, "event": "closed"})).await;
        harness.push(json!({"sid": 7})).await;
        settle().await;

        let kinds: Vec<String> = lifecycle
            .drain()
            .into_iter()
            .map(|n| n.kind.as_str().to_owned())
            .collect();
        assert_eq!(kinds, vec!["connected", "closed"]);
        assert_eq!(harness.client.correlator().pending_count(), 0);
    }
}
