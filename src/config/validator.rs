//! Configuration validation

use super::*;
use anyhow::Result;
use std::collections::HashSet;

/// Largest accepted request rate (requests/second)
const MAX_REQUEST_RATE: u32 = 100_000;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_scenario(&config.scenario)?;
    validate_cluster(&config.cluster)?;
    validate_output(&config.output)?;

    Ok(())
}

/// Validate scenario parameters
pub fn validate_scenario(scenario: &ScenarioConfig) -> Result<()> {
    if scenario.request_rate == 0 {
        anyhow::bail!("request_rate must be at least 1");
    }
    if scenario.request_rate > MAX_REQUEST_RATE {
        anyhow::bail!(
            "request_rate must be at most {}, got {}",
            MAX_REQUEST_RATE,
            scenario.request_rate
        );
    }

    if scenario.interval == 0 {
        anyhow::bail!("interval must be at least 1 second");
    }

    // A full window of completed seconds is only available one tick past it
    if let Some(ramp_up) = scenario.ramp_up_secs {
        if ramp_up <= scenario.interval as u64 {
            anyhow::bail!(
                "ramp_up ({}s) must be longer than the sample window ({}s)",
                ramp_up,
                scenario.interval
            );
        }
    }

    if scenario.max_outstanding == Some(0) {
        anyhow::bail!("max_outstanding must be greater than 0 if specified");
    }

    if scenario.timeout_secs == 0 {
        anyhow::bail!("timeout must be greater than 0");
    }

    if scenario.dataset_size == Some(0) {
        anyhow::bail!("dataset_size must be greater than 0 if specified");
    }

    Ok(())
}

/// Validate cluster addresses and credentials
pub fn validate_cluster(cluster: &ClusterConfig) -> Result<()> {
    if cluster.control_node.is_unspecified() {
        anyhow::bail!("control_node must be a concrete address, got {}", cluster.control_node);
    }

    let mut seen = HashSet::new();
    for node in &cluster.nodes {
        if node.is_unspecified() {
            anyhow::bail!("node address must be a concrete address, got {}", node);
        }
        if !seen.insert(node) {
            anyhow::bail!("node {} listed more than once", node);
        }
    }

    if let Some(ref dir) = cluster.cert_directory {
        if !dir.is_dir() {
            anyhow::bail!("cert_directory does not exist: {}", dir.display());
        }
    }

    Ok(())
}

/// Validate output configuration
pub fn validate_output(output: &OutputConfig) -> Result<()> {
    if let Some(ref path) = output.json_output {
        if path.is_dir() {
            anyhow::bail!("json_output must be a file path, got directory {}", path.display());
        }
    }

    Ok(())
}
