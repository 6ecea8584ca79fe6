//! WritePulse - control-plane write load generator
//!
//! WritePulse drives a constant rate of dataset-configuration writes against a
//! cluster's control service and checks that the cluster keeps up.
//!
//! # Architecture
//!
//! - **Control service**: async trait for the cluster's control API, with an
//!   in-process simulated cluster for tests and dry runs
//! - **Rate measurement**: sliding window of per-second send/receive counts
//! - **Scenario**: dataset setup, paced dispatch, ramp-up and steady-state
//!   monitoring with distinct failure kinds
//! - **Reporting**: latency histograms, text and JSON run reports

pub mod cluster;
pub mod config;
pub mod control;
pub mod error;
pub mod output;
pub mod scenario;
pub mod stats;
pub mod util;

// Re-export commonly used types
pub use cluster::BenchmarkCluster;
pub use config::Config;
pub use control::ControlService;
pub use error::{ControlError, ScenarioError};
pub use scenario::{ScenarioReport, ScenarioState, WriteRequestLoadScenario};

/// Result type used throughout WritePulse
pub type Result<T> = anyhow::Result<T>;
