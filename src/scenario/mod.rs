//! Write request load scenario
//!
//! Drives a constant rate of dataset-configuration writes against a cluster's
//! control service and watches whether the cluster keeps up.
//!
//! # Lifecycle
//!
//! ```text
//! NotStarted -> CreatingDataset -> EstablishingRate -> Monitoring -> Stopped
//!                     |                  |                 |
//!                     +------------------+-----------------+---> Failed
//! ```
//!
//! - **CreatingDataset**: pick a node and create the one dataset every request
//!   will target, within `timeout`.
//! - **EstablishingRate**: dispatch at the requested rate and sample once per
//!   second. The scenario moves on as soon as a sample reaches the target. If
//!   the ramp-up boundary passes first, it fails with `RequestRateNotReached`.
//! - **Monitoring**: every sample must stay at or above the target and the
//!   number of outstanding requests must stay within `max_outstanding`.
//!
//! Reaching the rate and keeping it are reported separately: `start()`
//! resolves with the setup/ramp-up outcome, `maintained()` only ever with a
//! failure.
//!
//! # Execution model
//!
//! One driver task owns the measurer, the dispatcher and the state machine.
//! It multiplexes the stop signal, request completions, the one-second sampling
//! tick and the next dispatch deadline, in that priority. Completions that land
//! before a tick are counted in that tick. All timing goes through tokio's
//! clock, so tests run the whole lifecycle on paused time.
//!
//! # Example
//!
//! ```
//! use writepulse::cluster::BenchmarkCluster;
//! use writepulse::config::ScenarioConfig;
//! use writepulse::control::fake::FakeControlService;
//! use writepulse::scenario::{ScenarioState, WriteRequestLoadScenario};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().start_paused(true).build().unwrap().block_on(async {
//! let node = "10.0.0.1".parse().unwrap();
//! let cluster = BenchmarkCluster::new(node, move || FakeControlService::with_addresses([node]), [node]);
//!
//! let mut scenario = WriteRequestLoadScenario::new(&cluster, ScenarioConfig::new(5, 3));
//! scenario.start().await.unwrap();
//! assert_eq!(scenario.state(), ScenarioState::Monitoring);
//!
//! let report = scenario.stop().await;
//! assert_eq!(report.state, ScenarioState::Stopped);
//! # });
//! ```

pub mod dispatcher;
pub mod report;

pub use dispatcher::RequestDispatcher;
pub use report::{FailureReport, ScenarioReport};

use crate::cluster::BenchmarkCluster;
use crate::config::ScenarioConfig;
use crate::control::{ControlService, CreateDataset, Dataset};
use crate::error::ScenarioError;
use crate::stats::RateMeasurer;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::future::{self, Future};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

const SAMPLE_PERIOD: Duration = Duration::from_secs(1);

/// Metadata attached to the benchmark dataset
const PURPOSE_KEY: &str = "purpose";
const PURPOSE_VALUE: &str = "write-request-load";

/// Scenario lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    NotStarted,
    CreatingDataset,
    EstablishingRate,
    Monitoring,
    Stopped,
    Failed,
}

impl ScenarioState {
    /// No further transitions happen from this state
    pub fn is_terminal(self) -> bool {
        matches!(self, ScenarioState::Stopped | ScenarioState::Failed)
    }
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScenarioState::NotStarted => "not started",
            ScenarioState::CreatingDataset => "creating dataset",
            ScenarioState::EstablishingRate => "establishing rate",
            ScenarioState::Monitoring => "monitoring",
            ScenarioState::Stopped => "stopped",
            ScenarioState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State published by the driver
#[derive(Debug, Clone)]
struct Status {
    state: ScenarioState,
    /// The requested rate was reached at least once
    established: bool,
    failure: Option<ScenarioError>,
}

/// Constant-rate write load against one dataset
pub struct WriteRequestLoadScenario<C> {
    control_service: Arc<C>,
    node_addresses: BTreeSet<IpAddr>,
    config: ScenarioConfig,
    status: Arc<watch::Sender<Status>>,
    stop_tx: Option<oneshot::Sender<()>>,
    driver: Option<JoinHandle<ScenarioReport>>,
    report: Option<ScenarioReport>,
}

impl<C: ControlService> WriteRequestLoadScenario<C> {
    pub fn new(cluster: &BenchmarkCluster<C>, config: ScenarioConfig) -> Self {
        let (status, _) = watch::channel(Status {
            state: ScenarioState::NotStarted,
            established: false,
            failure: None,
        });
        Self {
            control_service: cluster.control_service(),
            node_addresses: cluster.node_addresses().clone(),
            config,
            status: Arc::new(status),
            stop_tx: None,
            driver: None,
            report: None,
        }
    }

    pub fn state(&self) -> ScenarioState {
        self.status.borrow().state
    }

    /// Error the scenario failed with, if it did
    pub fn failure(&self) -> Option<ScenarioError> {
        self.status.borrow().failure.clone()
    }

    /// Dataset-creation timeout
    pub fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    pub fn max_outstanding(&self) -> u64 {
        self.config.max_outstanding()
    }

    /// Start generating load
    ///
    /// The load starts when this is called, not when the returned future is
    /// first polled. The future resolves once the requested rate is reached,
    /// or with the setup/ramp-up failure. It resolves with
    /// [`ScenarioError::Cancelled`] if the scenario is stopped first. Calling
    /// `start` again does not restart anything; it just waits for the same
    /// outcome.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> impl Future<Output = Result<(), ScenarioError>> + Send + 'static {
        if self.state() == ScenarioState::NotStarted {
            self.spawn_driver();
        }

        let rx = self.status.subscribe();
        async move {
            let status = settle(rx, |s| s.established || s.state.is_terminal()).await;
            if status.established {
                Ok(())
            } else {
                Err(status.failure.unwrap_or(ScenarioError::Cancelled))
            }
        }
    }

    /// Resolves with the error the scenario fails with
    ///
    /// Stays pending while the rate holds, and forever once the scenario is
    /// stopped without a failure.
    pub fn maintained(&self) -> impl Future<Output = Result<(), ScenarioError>> + Send + 'static {
        let rx = self.status.subscribe();
        async move {
            let status = settle(rx, |s| s.state.is_terminal()).await;
            match status.failure {
                Some(err) => Err(err),
                None => future::pending().await,
            }
        }
    }

    /// Stop generating load and return the run's report
    ///
    /// Cancels the dispatch and sampling loops and every request still in
    /// flight. Safe to call in any state and any number of times; a failed
    /// scenario stays failed.
    pub async fn stop(&mut self) -> ScenarioReport {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The driver may already have exited after a failure
            let _ = stop_tx.send(());
        }

        if let Some(driver) = self.driver.take() {
            match driver.await {
                Ok(report) => self.report = Some(report),
                Err(e) => error!(error = %e, "scenario driver did not shut down cleanly"),
            }
        }

        self.status.send_if_modified(|status| {
            if status.state.is_terminal() {
                return false;
            }
            status.state = ScenarioState::Stopped;
            true
        });

        let state = self.state();
        match self.report {
            Some(ref report) => report.clone(),
            None => ScenarioReport::idle(&self.config, state),
        }
    }

    fn spawn_driver(&mut self) {
        let (stop_tx, stop_rx) = oneshot::channel();
        let driver = Driver {
            client: Arc::clone(&self.control_service),
            node_addresses: self.node_addresses.clone(),
            config: self.config.clone(),
            status: Arc::clone(&self.status),
            measurer: RateMeasurer::new(self.config.interval),
            samples: 0,
            dataset: None,
            clock_start: Instant::now(),
            started_at: Utc::now(),
        };

        self.stop_tx = Some(stop_tx);
        self.driver = Some(tokio::spawn(driver.run(stop_rx)));
    }
}

/// Wait until `done` holds for the published status
async fn settle(mut rx: watch::Receiver<Status>, done: impl FnMut(&Status) -> bool) -> Status {
    let settled = rx.wait_for(done).await.map(|status| Status::clone(&status));
    // The sender only goes away with the scenario; report what it last said
    settled.unwrap_or_else(|_| rx.borrow().clone())
}

/// Owner of all per-run state, running on its own task
struct Driver<C> {
    client: Arc<C>,
    node_addresses: BTreeSet<IpAddr>,
    config: ScenarioConfig,
    status: Arc<watch::Sender<Status>>,
    measurer: RateMeasurer,
    samples: u64,
    dataset: Option<Dataset>,
    clock_start: Instant,
    started_at: DateTime<Utc>,
}

impl<C: ControlService> Driver<C> {
    async fn run(mut self, mut stop_rx: oneshot::Receiver<()>) -> ScenarioReport {
        self.transition(ScenarioState::CreatingDataset);

        let timeout = self.config.timeout();
        let setup = tokio::select! {
            biased;
            _ = &mut stop_rx => return self.finish(None),
            setup = time::timeout(timeout, self.create_dataset()) => setup,
        };
        let dataset = match setup {
            Ok(Ok(dataset)) => dataset,
            Ok(Err(e)) => return self.fail(e, None),
            Err(_) => return self.fail(ScenarioError::DatasetCreationTimeout { timeout }, None),
        };
        info!(
            dataset_id = %dataset.dataset_id,
            primary = %dataset.primary,
            "benchmark dataset created"
        );

        self.transition(ScenarioState::EstablishingRate);
        let mut dispatcher =
            RequestDispatcher::new(Arc::clone(&self.client), &dataset, self.config.request_rate);
        self.dataset = Some(dataset);

        let mut sampling = time::interval_at(Instant::now() + SAMPLE_PERIOD, SAMPLE_PERIOD);
        loop {
            let deadline = dispatcher.next_deadline();
            tokio::select! {
                biased;
                _ = &mut stop_rx => break,
                Some(joined) = dispatcher.join_next(), if dispatcher.has_in_flight() => {
                    dispatcher.complete(joined, &mut self.measurer);
                }
                _ = sampling.tick() => {
                    if let Err(e) = self.sample() {
                        return self.fail(e, Some(dispatcher));
                    }
                }
                _ = time::sleep_until(deadline) => dispatcher.dispatch(&mut self.measurer),
            }
        }

        self.finish(Some(dispatcher))
    }

    /// Pick a target node and create the benchmark dataset on it
    async fn create_dataset(&self) -> Result<Dataset, ScenarioError> {
        let nodes = self
            .client
            .list_nodes()
            .await
            .map_err(ScenarioError::DatasetCreationFailed)?;

        let candidates: Vec<_> = nodes
            .into_iter()
            .filter(|n| self.node_addresses.is_empty() || self.node_addresses.contains(&n.public_address))
            .collect();
        let node = candidates
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(ScenarioError::NoTargetNode)?;
        debug!(node = %node.uuid, address = %node.public_address, "creating benchmark dataset");

        let mut request = CreateDataset::on(node.uuid);
        request.maximum_size = self.config.dataset_size;
        request
            .metadata
            .insert(PURPOSE_KEY.to_string(), PURPOSE_VALUE.to_string());

        self.client
            .create_dataset(request)
            .await
            .map_err(ScenarioError::DatasetCreationFailed)
    }

    /// Take one sample and apply the checks of the current phase
    fn sample(&mut self) -> Result<(), ScenarioError> {
        self.samples += 1;
        self.measurer.update_rate();

        let rate = self.measurer.rate();
        let target = f64::from(self.config.request_rate);
        let outstanding = self.measurer.outstanding();
        debug!(sample = self.samples, rate, outstanding, "rate sample");

        let state = self.status.borrow().state;
        match state {
            ScenarioState::EstablishingRate => {
                if rate >= target {
                    info!(rate, samples = self.samples, "requested rate established");
                    self.status.send_modify(|status| {
                        status.state = ScenarioState::Monitoring;
                        status.established = true;
                    });
                } else if self.samples >= self.config.ramp_up_ticks() {
                    return Err(ScenarioError::RequestRateNotReached {
                        rate,
                        target: self.config.request_rate,
                    });
                }
            }
            ScenarioState::Monitoring => {
                if rate < target {
                    return Err(ScenarioError::RequestRateTooLow {
                        rate,
                        target: self.config.request_rate,
                    });
                }
                let max_outstanding = self.config.max_outstanding();
                if outstanding > max_outstanding {
                    return Err(ScenarioError::RequestOverload {
                        outstanding,
                        max_outstanding,
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn transition(&self, state: ScenarioState) {
        debug!(%state, "scenario state change");
        self.status.send_modify(|status| status.state = state);
    }

    fn fail(self, err: ScenarioError, dispatcher: Option<RequestDispatcher<C>>) -> ScenarioReport {
        warn!(error = %err, kind = err.kind(), "write load scenario failed");
        let report = self.report(ScenarioState::Failed, Some(&err), dispatcher);
        self.status.send_modify(|status| {
            status.state = ScenarioState::Failed;
            status.failure = Some(err);
        });
        report
    }

    fn finish(self, dispatcher: Option<RequestDispatcher<C>>) -> ScenarioReport {
        info!(
            sent = self.measurer.sent_total(),
            received = self.measurer.received_total(),
            "write load scenario stopped"
        );
        let report = self.report(ScenarioState::Stopped, None, dispatcher);
        self.status.send_modify(|status| status.state = ScenarioState::Stopped);
        report
    }

    fn report(
        &self,
        state: ScenarioState,
        failure: Option<&ScenarioError>,
        dispatcher: Option<RequestDispatcher<C>>,
    ) -> ScenarioReport {
        if let Some(mut dispatcher) = dispatcher {
            debug!(in_flight = dispatcher.in_flight(), "aborting in-flight requests");
            dispatcher.abort_all();
            return ScenarioReport::build(&self.config, state, failure, self.totals(Some(&dispatcher)));
        }
        ScenarioReport::build(&self.config, state, failure, self.totals(None))
    }

    fn totals<'a>(&'a self, dispatcher: Option<&'a RequestDispatcher<C>>) -> report::RunTotals<'a> {
        report::RunTotals {
            measurer: &self.measurer,
            latency: dispatcher.map(RequestDispatcher::latency),
            samples: self.samples,
            elapsed: self.clock_start.elapsed(),
            dataset_id: self.dataset.as_ref().map(|d| d.dataset_id),
            started_at: self.started_at,
        }
    }
}
