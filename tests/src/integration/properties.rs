//! # Correlation Properties
//!
//! Invariants that must hold across interleavings, checked directly against
//! the correlator and dispatcher:
//!
//! - **Exactly-once**: one terminal callback per future, whatever races
//! - **Ordering race immunity**: a reply that beats the send still resolves
//! - **Isolation**: ids never cross, even with a shared kind
//! - **Timeout cleanup**: late replies are unmatched and fire nothing
//! - **Re-broadcast**: resolving events still reach generic listeners

#[cfg(test)]
mod tests {
    use crate::integration::support::{Fired, Tally};
    use async_trait::async_trait;
    use evented_requests::{
        CorrelationId, Correlator, CorrelatorConfig, DispatchOutcome, FutureOptions,
        IncomingEvent, OutboundRequest, RequestDispatcher, RequestTransport, TransportAck,
        TransportError,
    };
    use futures::StreamExt;
    use serde_json::json;
    use shared_bus::{InMemoryNotificationBus, KindFilter};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::sleep;

    fn correlator() -> (Correlator, Arc<InMemoryNotificationBus>) {
        let bus = Arc::new(InMemoryNotificationBus::new());
        let correlator = Correlator::new(CorrelatorConfig::default(), bus.clone()).unwrap();
        (correlator, bus)
    }

    // =============================================================================
    // EXACTLY-ONCE RESOLUTION
    // =============================================================================

    /// Reply scheduled just before, exactly at, and just after the deadline.
    #[tokio::test(start_paused = true)]
    async fn test_reply_racing_the_deadline_fires_once() {
        let (correlator, _bus) = correlator();
        let deadline = Duration::from_millis(500);

        for offset_ms in [499u64, 500, 501] {
            let tally = Tally::new();
            let id = correlator
                .register(tally.watch(FutureOptions::new().success_on("Done").deadline(deadline)))
                .unwrap();

            let replier = correlator.clone();
            let reply_id = id.clone();
            let reply = tokio::spawn(async move {
                sleep(Duration::from_millis(offset_ms)).await;
                replier.dispatch(IncomingEvent::correlated("Done", reply_id, json!({})));
            });
            reply.await.unwrap();
            sleep(Duration::from_millis(50)).await;

            let fired = tally.fired();
            assert_eq!(fired.len(), 1, "offset {}ms fired {:?}", offset_ms, fired);
            if offset_ms < 500 {
                assert!(matches!(fired[0], Fired::Success(_)));
            }
            if offset_ms > 500 {
                assert_eq!(fired[0], Fired::Timeout);
            }
            assert!(!correlator.is_pending(&id));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_and_error_replies_fire_once() {
        let (correlator, _bus) = correlator();
        let tally = Tally::new();

        let id = correlator
            .register(tally.watch(FutureOptions::new().success_on("Ok").error_on("Failed")))
            .unwrap();

        let first = correlator.dispatch(IncomingEvent::correlated("Failed", id.clone(), json!({})));
        let second = correlator.dispatch(IncomingEvent::correlated("Ok", id.clone(), json!({})));
        let third = correlator.dispatch(IncomingEvent::correlated("Failed", id, json!({})));

        assert!(matches!(first, DispatchOutcome::Resolved { .. }));
        assert_eq!(second, DispatchOutcome::Unmatched);
        assert_eq!(third, DispatchOutcome::Unmatched);
        assert_eq!(tally.fired().len(), 1);
    }

    /// Many threads dispatching duplicate replies while timers expire.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_exactly_once_under_parallel_dispatch() {
        const FUTURES: usize = 400;

        let (correlator, _bus) = correlator();
        let counts: Arc<Vec<AtomicUsize>> =
            Arc::new((0..FUTURES).map(|_| AtomicUsize::new(0)).collect());

        let mut ids = Vec::with_capacity(FUTURES);
        for i in 0..FUTURES {
            let (ok, err, timeout) = (counts.clone(), counts.clone(), counts.clone());
            let options = FutureOptions::new()
                .success_on("Ok")
                .error_on("Failed")
                .deadline(Duration::from_millis(150))
                .on_success(move |_| {
                    ok[i].fetch_add(1, Ordering::SeqCst);
                })
                .on_error(move |_| {
                    err[i].fetch_add(1, Ordering::SeqCst);
                })
                .on_timeout(move || {
                    timeout[i].fetch_add(1, Ordering::SeqCst);
                });
            ids.push(correlator.register(options).unwrap());
        }
        let ids = Arc::new(ids);

        // Every even future receives two success and two error replies, one
        // per worker. Odd futures are left to time out.
        let mut workers = Vec::new();
        for kind in ["Ok", "Failed", "Ok", "Failed"] {
            let correlator = correlator.clone();
            let ids = ids.clone();
            workers.push(tokio::spawn(async move {
                for (i, id) in ids.iter().enumerate() {
                    if i % 2 == 0 {
                        correlator.dispatch(IncomingEvent::correlated(kind, id.clone(), json!({})));
                    }
                    if i % 16 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            }));
        }
        for worker in workers {
            worker.await.unwrap();
        }

        sleep(Duration::from_millis(400)).await;

        for (i, count) in counts.iter().enumerate() {
            assert_eq!(count.load(Ordering::SeqCst), 1, "future {} fired wrong", i);
        }
        assert_eq!(correlator.pending_count(), 0);

        let stats = correlator.stats().snapshot();
        assert_eq!(stats.registered, FUTURES as u64);
        assert_eq!(
            stats.succeeded + stats.failed + stats.timed_out,
            FUTURES as u64
        );
        assert!(stats.timed_out >= (FUTURES / 2) as u64);
    }

    // =============================================================================
    // ORDERING RACE IMMUNITY
    // =============================================================================

    /// Server that pushes the reply from another task before acknowledging.
    struct OvertakingServer {
        correlator: Correlator,
    }

    #[async_trait]
    impl RequestTransport for OvertakingServer {
        async fn send(&self, request: OutboundRequest) -> Result<TransportAck, TransportError> {
            let id = request
                .correlation("correlationId")
                .ok_or_else(|| TransportError::Encoding("no correlation id".into()))?;
            let correlator = self.correlator.clone();
            tokio::spawn(async move {
                correlator.dispatch(IncomingEvent::correlated("UserCreated", id, json!({})));
            })
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;
            Ok(TransportAck::accepted())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reply_before_ack_still_resolves() {
        let (correlator, _bus) = correlator();
        let transport = Arc::new(OvertakingServer {
            correlator: correlator.clone(),
        });
        let dispatcher = RequestDispatcher::new(correlator.clone(), transport);

        for _ in 0..50 {
            let tally = Tally::new();
            let id = dispatcher
                .send(
                    OutboundRequest::post("/api/user/"),
                    tally.watch(FutureOptions::new().success_on("UserCreated")),
                )
                .await
                .unwrap();

            assert!(matches!(tally.fired().as_slice(), [Fired::Success(_)]));
            assert!(!correlator.is_pending(&id));
        }
    }

    // =============================================================================
    // ISOLATION
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_ids_never_cross() {
        let (correlator, _bus) = correlator();

        let tallies: Vec<(CorrelationId, Tally)> = (0..20)
            .map(|_| {
                let tally = Tally::new();
                let id = correlator
                    .register(tally.watch(FutureOptions::new().success_on("UserCreated")))
                    .unwrap();
                (id, tally)
            })
            .collect();

        // Resolve in reverse, only odd positions.
        for (i, (id, _)) in tallies.iter().enumerate().rev() {
            if i % 2 == 1 {
                let event = IncomingEvent::correlated("UserCreated", id.clone(), json!({"i": i}));
                correlator.dispatch(event);
            }
        }

        for (i, (id, tally)) in tallies.iter().enumerate() {
            match tally.fired().as_slice() {
                [Fired::Success(event)] => {
                    assert_eq!(i % 2, 1);
                    assert_eq!(event.correlation_id.as_ref(), Some(id));
                    assert_eq!(event.payload["i"], i);
                }
                [] => assert_eq!(i % 2, 0),
                other => panic!("future {} fired {:?}", i, other),
            }
        }
        assert_eq!(correlator.pending_count(), 10);
    }

    // =============================================================================
    // TIMEOUT CLEANUP
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_late_reply_is_unmatched() {
        let (correlator, bus) = correlator();
        let tally = Tally::new();
        let mut listener = bus.subscribe(KindFilter::all());

        let id = correlator
            .register(tally.watch(
                FutureOptions::new()
                    .success_on("UserCreated")
                    .deadline(Duration::from_millis(100)),
            ))
            .unwrap();

        sleep(Duration::from_millis(101)).await;
        assert_eq!(tally.fired(), vec![Fired::Timeout]);
        // Timeouts publish nothing.
        assert!(listener.drain().is_empty());

        let late = correlator.dispatch(IncomingEvent::correlated("UserCreated", id, json!({})));
        assert_eq!(late, DispatchOutcome::Unmatched);
        assert_eq!(tally.fired(), vec![Fired::Timeout]);
        assert_eq!(listener.drain().len(), 1);
    }

    // =============================================================================
    // RE-BROADCAST
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_resolved_events_reach_generic_streams() {
        let (correlator, bus) = correlator();
        let mut created = bus.stream(KindFilter::kinds(["UserCreated"]).generic());
        let mut exists = bus.stream(KindFilter::kinds(["UserExists"]));

        let a = correlator
            .register(FutureOptions::new().success_on("UserCreated"))
            .unwrap();
        let b = correlator
            .register(FutureOptions::new().success_on("UserCreated").error_on("UserExists"))
            .unwrap();

        correlator.dispatch(IncomingEvent::correlated("UserCreated", a, json!({"n": 1})));
        correlator.dispatch(IncomingEvent::correlated("UserExists", b, json!({"n": 2})));

        let first = created.next().await.unwrap();
        assert_eq!(first.payload["n"], 1);
        assert!(first.correlation_id.is_none());

        let second = exists.next().await.unwrap();
        assert_eq!(second.payload["n"], 2);
        assert!(second.is_generic());
    }
}
