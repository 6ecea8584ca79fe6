//! Error types
//!
//! Two failure families are kept apart:
//!
//! - [`ControlError`]: a single control-service call failed. These are absorbed
//!   by the dispatcher and only counted; they never end a scenario by themselves.
//! - [`ScenarioError`]: the scenario as a whole failed. Each variant is a
//!   distinct failure kind because each needs a different remediation.

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Failure of one control-service call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// The dataset does not exist (or was deleted)
    #[error("dataset {0} not found")]
    DatasetNotFound(Uuid),

    /// A dataset with this id already exists
    #[error("dataset {0} already exists")]
    DatasetAlreadyExists(Uuid),

    /// The node is not part of the cluster
    #[error("node {0} is not known to the control service")]
    UnknownNode(Uuid),

    /// The control service rejected the request
    #[error("control service rejected request: {0}")]
    Rejected(String),

    /// The request never reached the control service or its response was lost
    #[error("control service transport error: {0}")]
    Transport(String),
}

/// Scenario-level failure
///
/// Setup and ramp-up failures are reported through `start()`; steady-state
/// failures through `maintained()`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScenarioError {
    /// Setup did not finish within the allotted time
    #[error("dataset creation did not complete within {}s", .timeout.as_secs())]
    DatasetCreationTimeout { timeout: Duration },

    /// The control service refused to create the benchmark dataset
    #[error("dataset creation failed: {0}")]
    DatasetCreationFailed(#[source] ControlError),

    /// None of the cluster's nodes is known to the control service
    #[error("no cluster node is available to host the benchmark dataset")]
    NoTargetNode,

    /// Ramp-up elapsed without reaching the requested rate
    #[error("request rate not reached: {rate:.2} req/s after ramp-up, wanted {target} req/s")]
    RequestRateNotReached { rate: f64, target: u32 },

    /// The established rate dropped below the requested rate
    #[error("request rate too low: {rate:.2} req/s, wanted {target} req/s")]
    RequestRateTooLow { rate: f64, target: u32 },

    /// More requests are in flight than the configured ceiling
    #[error("request overload: {outstanding} outstanding requests, limit is {max_outstanding}")]
    RequestOverload { outstanding: u64, max_outstanding: u64 },

    /// The scenario was stopped before the awaited outcome was known
    #[error("scenario was stopped")]
    Cancelled,
}

impl ScenarioError {
    /// Short stable name of the failure kind, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            ScenarioError::DatasetCreationTimeout { .. } => "dataset_creation_timeout",
            ScenarioError::DatasetCreationFailed(_) => "dataset_creation_failed",
            ScenarioError::NoTargetNode => "no_target_node",
            ScenarioError::RequestRateNotReached { .. } => "request_rate_not_reached",
            ScenarioError::RequestRateTooLow { .. } => "request_rate_too_low",
            ScenarioError::RequestOverload { .. } => "request_overload",
            ScenarioError::Cancelled => "cancelled",
        }
    }
}
