//! End-of-run scenario summary

use super::ScenarioState;
use crate::config::ScenarioConfig;
use crate::error::ScenarioError;
use crate::stats::{LatencyHistogram, LatencySummary, RateMeasurer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Why a scenario failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub kind: String,
    pub message: String,
}

impl From<&ScenarioError> for FailureReport {
    fn from(err: &ScenarioError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Summary of one scenario run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub state: ScenarioState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReport>,
    pub requested_rate: u32,
    /// Rate over the last sample window
    pub achieved_rate: f64,
    pub sample_size: usize,
    /// One-second ticks taken
    pub samples: u64,
    pub sent: u64,
    pub received: u64,
    pub errors: u64,
    pub outstanding: u64,
    pub max_outstanding: u64,
    pub elapsed_secs: f64,
    pub latency: LatencySummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<Uuid>,
    pub host: String,
    pub started_at: DateTime<Utc>,
}

/// Counters gathered by the scenario driver
pub(crate) struct RunTotals<'a> {
    pub measurer: &'a RateMeasurer,
    pub latency: Option<&'a LatencyHistogram>,
    pub samples: u64,
    pub elapsed: Duration,
    pub dataset_id: Option<Uuid>,
    pub started_at: DateTime<Utc>,
}

impl ScenarioReport {
    pub(crate) fn build(
        config: &ScenarioConfig,
        state: ScenarioState,
        failure: Option<&ScenarioError>,
        totals: RunTotals<'_>,
    ) -> Self {
        let measurer = totals.measurer;
        Self {
            state,
            failure: failure.map(FailureReport::from),
            requested_rate: config.request_rate,
            achieved_rate: measurer.rate(),
            sample_size: measurer.sample_size(),
            samples: totals.samples,
            sent: measurer.sent_total(),
            received: measurer.received_total(),
            errors: measurer.errors(),
            outstanding: measurer.outstanding(),
            max_outstanding: config.max_outstanding(),
            elapsed_secs: totals.elapsed.as_secs_f64(),
            latency: totals.latency.map(LatencyHistogram::summary).unwrap_or_default(),
            dataset_id: totals.dataset_id,
            host: local_hostname(),
            started_at: totals.started_at,
        }
    }

    /// Report for a scenario that never ran
    pub(crate) fn idle(config: &ScenarioConfig, state: ScenarioState) -> Self {
        let measurer = RateMeasurer::new(config.interval);
        Self::build(
            config,
            state,
            None,
            RunTotals {
                measurer: &measurer,
                latency: None,
                samples: 0,
                elapsed: Duration::ZERO,
                dataset_id: None,
                started_at: Utc::now(),
            },
        )
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
