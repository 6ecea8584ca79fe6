//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//! The scenario itself only ever sees plain values: everything read from the
//! command line, the environment or a file is resolved here first.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default dataset-creation timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 45;

/// Default outstanding-request ceiling, as a multiple of the requested rate
pub const DEFAULT_OUTSTANDING_FACTOR: u64 = 10;

/// Complete benchmark configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub scenario: ScenarioConfig,
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Write-load scenario parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Requested write rate (requests/second)
    pub request_rate: u32,
    /// Length of the rate sample window in seconds
    #[serde(default = "default_interval")]
    pub interval: usize,
    /// Outstanding-request ceiling (default: 10 × request_rate)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_outstanding: Option<u64>,
    /// Dataset-creation timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Seconds allowed to reach the requested rate (default: interval + 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ramp_up_secs: Option<u64>,
    /// Maximum size of the benchmark dataset in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_size: Option<u64>,
}

fn default_interval() -> usize {
    crate::stats::DEFAULT_SAMPLE_SIZE
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ScenarioConfig {
    /// Scenario with default timeouts and ceiling
    pub fn new(request_rate: u32, interval: usize) -> Self {
        Self {
            request_rate,
            interval,
            max_outstanding: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            ramp_up_secs: None,
            dataset_size: None,
        }
    }

    pub fn with_max_outstanding(mut self, max_outstanding: u64) -> Self {
        self.max_outstanding = Some(max_outstanding);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_ramp_up(mut self, ramp_up: Duration) -> Self {
        self.ramp_up_secs = Some(ramp_up.as_secs());
        self
    }

    /// Effective outstanding-request ceiling
    pub fn max_outstanding(&self) -> u64 {
        self.max_outstanding
            .unwrap_or(DEFAULT_OUTSTANDING_FACTOR * u64::from(self.request_rate))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Number of one-second ticks before the one-shot "rate reached" check
    ///
    /// A full window only reflects completed seconds, so the default leaves
    /// one tick past the window for requests still in flight at its end.
    pub fn ramp_up_ticks(&self) -> u64 {
        self.ramp_up_secs.unwrap_or(self.interval as u64 + 1)
    }
}

/// Cluster under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Address of the control node
    pub control_node: IpAddr,
    /// Nodes eligible to host the benchmark dataset (empty: every node)
    #[serde(default)]
    pub nodes: Vec<IpAddr>,
    /// Directory with the cluster's client certificates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_directory: Option<PathBuf>,
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON report file path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_output: Option<PathBuf>,
    /// Show latency percentiles in the text report
    #[serde(default)]
    pub show_latency: bool,
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// How long to hold the load once established (seconds, 0 = until failure)
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
    /// Response latency of the simulated cluster (milliseconds)
    #[serde(default)]
    pub simulated_latency_ms: u64,
    /// Validate configuration and exit
    #[serde(default)]
    pub dry_run: bool,
    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

fn default_duration_secs() -> u64 {
    60
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_duration_secs(),
            simulated_latency_ms: 0,
            dry_run: false,
            debug: false,
        }
    }
}

impl RuntimeConfig {
    /// Hold duration, `None` meaning "until the scenario fails"
    pub fn duration(&self) -> Option<Duration> {
        (self.duration_secs > 0).then(|| Duration::from_secs(self.duration_secs))
    }
}

// Display trait implementations

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration:")?;
        writeln!(f, "  Scenario: {}", self.scenario)?;
        writeln!(f, "  Cluster: {}", self.cluster)?;
        writeln!(f, "  Runtime: {}", self.runtime)?;
        Ok(())
    }
}

impl fmt::Display for ScenarioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} req/s, window={}s, ramp_up={}s, max_outstanding={}, timeout={}s",
            self.request_rate,
            self.interval,
            self.ramp_up_ticks(),
            self.max_outstanding(),
            self.timeout_secs
        )?;
        if let Some(size) = self.dataset_size {
            write!(f, ", dataset_size={}", size)?;
        }
        Ok(())
    }
}

impl fmt::Display for ClusterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "control={}", self.control_node)?;
        if self.nodes.is_empty() {
            write!(f, ", nodes=any")?;
        } else {
            let nodes: Vec<String> = self.nodes.iter().map(|n| n.to_string()).collect();
            write!(f, ", nodes=[{}]", nodes.join(", "))?;
        }
        if let Some(ref dir) = self.cert_directory {
            write!(f, ", certs={}", dir.display())?;
        }
        Ok(())
    }
}

impl fmt::Display for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.duration() {
            Some(d) => write!(f, "hold={}s", d.as_secs())?,
            None => write!(f, "hold=until failure")?,
        }
        if self.simulated_latency_ms > 0 {
            write!(f, ", simulated_latency={}ms", self.simulated_latency_ms)?;
        }
        Ok(())
    }
}
