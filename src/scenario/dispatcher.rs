//! Write request dispatcher
//!
//! Issues `move_dataset` calls at an even cadence: request `i` is due at
//! `start + i / rate` seconds. Deadlines are computed from the request index in
//! integer nanoseconds, so rounding never accumulates into drift.
//!
//! Every request runs in its own task inside a [`JoinSet`]. A request that
//! never completes only occupies its slot in the set; it does not hold up the
//! next dispatch, which is what lets outstanding requests pile up visibly when
//! the cluster falls behind. Dropping the dispatcher aborts whatever is still
//! in flight.

use crate::control::{ControlService, Dataset};
use crate::error::ControlError;
use crate::stats::{LatencyHistogram, RateMeasurer};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, trace};
use uuid::Uuid;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Outcome of one write request
#[derive(Debug)]
pub struct Completion {
    pub sent_at: Instant,
    pub result: Result<(), ControlError>,
}

/// Paced issuer of write requests against one dataset
pub struct RequestDispatcher<C> {
    client: Arc<C>,
    primary: Uuid,
    dataset_id: Uuid,
    request_rate: u32,
    started_at: Instant,
    dispatched: u64,
    in_flight: JoinSet<Completion>,
    latency: LatencyHistogram,
}

impl<C: ControlService> RequestDispatcher<C> {
    /// Create a dispatcher whose first request is due immediately
    ///
    /// Requests keep `dataset` on its current primary, so each one is a
    /// configuration write that does not move any data.
    pub fn new(client: Arc<C>, dataset: &Dataset, request_rate: u32) -> Self {
        Self {
            client,
            primary: dataset.primary,
            dataset_id: dataset.dataset_id,
            request_rate: request_rate.max(1),
            started_at: Instant::now(),
            dispatched: 0,
            in_flight: JoinSet::new(),
            latency: LatencyHistogram::new(),
        }
    }

    /// When the next request is due
    pub fn next_deadline(&self) -> Instant {
        let offset = u128::from(self.dispatched) * NANOS_PER_SEC / u128::from(self.request_rate);
        self.started_at + Duration::from_nanos(offset as u64)
    }

    /// Issue one request now
    pub fn dispatch(&mut self, measurer: &mut RateMeasurer) {
        measurer.send_request();
        self.dispatched += 1;

        let client = Arc::clone(&self.client);
        let (primary, dataset_id) = (self.primary, self.dataset_id);
        let sent_at = Instant::now();
        self.in_flight.spawn(async move {
            let result = client
                .move_dataset(primary, dataset_id, None)
                .await
                .map(|_| ());
            Completion { sent_at, result }
        });
    }

    /// Wait for the next request to finish
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn join_next(&mut self) -> Option<Result<Completion, JoinError>> {
        self.in_flight.join_next().await
    }

    /// Account for a finished request
    pub fn complete(&mut self, joined: Result<Completion, JoinError>, measurer: &mut RateMeasurer) {
        match joined {
            Ok(Completion { sent_at, result }) => {
                self.latency.record(sent_at.elapsed());
                if let Err(ref e) = result {
                    trace!(error = %e, "write request failed");
                }
                measurer.receive_request(result.is_ok());
            }
            // A panicking client call still finished
            Err(e) if e.is_panic() => {
                debug!("write request task panicked");
                measurer.receive_request(false);
            }
            // Aborted by us; the measurer no longer matters
            Err(_) => {}
        }
    }

    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Cancel every request still in flight
    pub fn abort_all(&mut self) {
        self.in_flight.abort_all();
    }

    pub fn latency(&self) -> &LatencyHistogram {
        &self.latency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::fake::{DropPolicy, FakeControlService};
    use crate::control::CreateDataset;
    use tokio::time::{advance, sleep_until};

    async fn fixture(rate: u32) -> (FakeControlService, RequestDispatcher<FakeControlService>) {
        let fake = FakeControlService::with_addresses(["10.0.0.1".parse().unwrap()]);
        let node = fake.nodes()[0].uuid;
        let dataset = fake.create_dataset(CreateDataset::on(node)).await.unwrap();
        let dispatcher = RequestDispatcher::new(Arc::new(fake.clone()), &dataset, rate);
        (fake, dispatcher)
    }

    async fn drain(dispatcher: &mut RequestDispatcher<FakeControlService>, measurer: &mut RateMeasurer) {
        tokio::task::yield_now().await;
        while dispatcher.in_flight.len() > 0 {
            match tokio::time::timeout(Duration::from_millis(1), dispatcher.join_next()).await {
                Ok(Some(joined)) => dispatcher.complete(joined, measurer),
                _ => break,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadlines_are_evenly_spaced() {
        let (_fake, mut dispatcher) = fixture(3).await;
        let mut measurer = RateMeasurer::new(1);
        let start = dispatcher.next_deadline();

        for _ in 0..3 {
            dispatcher.dispatch(&mut measurer);
        }

        // Three requests per second: the fourth is due exactly one second in
        assert_eq!(dispatcher.next_deadline() - start, Duration::from_secs(1));
        assert_eq!(dispatcher.dispatched(), 3);
        assert_eq!(measurer.sent_total(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completions_are_measured() {
        let (_fake, mut dispatcher) = fixture(5).await;
        let mut measurer = RateMeasurer::new(1);

        for _ in 0..5 {
            sleep_until(dispatcher.next_deadline()).await;
            dispatcher.dispatch(&mut measurer);
        }
        drain(&mut dispatcher, &mut measurer).await;

        assert_eq!(measurer.received_total(), 5);
        assert_eq!(measurer.outstanding(), 0);
        assert_eq!(dispatcher.latency().len(), 5);
        assert!(!dispatcher.has_in_flight());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_requests_stay_outstanding() {
        let (fake, mut dispatcher) = fixture(10).await;
        fake.set_drop_policy(DropPolicy::Alternate);
        let mut measurer = RateMeasurer::new(1);

        for _ in 0..10 {
            dispatcher.dispatch(&mut measurer);
        }
        drain(&mut dispatcher, &mut measurer).await;

        assert_eq!(measurer.sent_total(), 10);
        assert_eq!(measurer.received_total(), 5);
        assert_eq!(measurer.outstanding(), 5);
        assert_eq!(dispatcher.in_flight(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_requests_still_complete() {
        let (fake, mut dispatcher) = fixture(4).await;
        fake.set_fail_moves(true);
        let mut measurer = RateMeasurer::new(1);

        for _ in 0..4 {
            dispatcher.dispatch(&mut measurer);
        }
        drain(&mut dispatcher, &mut measurer).await;

        assert_eq!(measurer.received_total(), 4);
        assert_eq!(measurer.errors(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_all_cancels_in_flight() {
        let (fake, mut dispatcher) = fixture(2).await;
        fake.set_latency(Duration::from_secs(10));
        let mut measurer = RateMeasurer::new(1);

        dispatcher.dispatch(&mut measurer);
        dispatcher.dispatch(&mut measurer);
        tokio::task::yield_now().await;
        dispatcher.abort_all();
        advance(Duration::from_secs(20)).await;

        while let Some(joined) = dispatcher.join_next().await {
            assert!(joined.as_ref().unwrap_err().is_cancelled());
            dispatcher.complete(joined, &mut measurer);
        }
        assert_eq!(measurer.received_total(), 0);
        assert_eq!(measurer.outstanding(), 2);
    }
}
