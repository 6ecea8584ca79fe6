//! CLI to Config conversion utilities

use crate::config::cli::Cli;
use crate::config::{ClusterConfig, Config, OutputConfig, RuntimeConfig, ScenarioConfig};
use anyhow::{Context, Result};

/// Parse a size string (e.g., "1G", "100M", "4k") to bytes
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if s.ends_with('k') || s.ends_with("kb") {
        (s.trim_end_matches("kb").trim_end_matches('k'), 1024u64)
    } else if s.ends_with('m') || s.ends_with("mb") {
        (s.trim_end_matches("mb").trim_end_matches('m'), 1024 * 1024)
    } else if s.ends_with('g') || s.ends_with("gb") {
        (s.trim_end_matches("gb").trim_end_matches('g'), 1024 * 1024 * 1024)
    } else if s.ends_with('t') || s.ends_with("tb") {
        (s.trim_end_matches("tb").trim_end_matches('t'), 1024 * 1024 * 1024 * 1024)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str
        .parse()
        .with_context(|| format!("Invalid size format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Size out of range: {}", s))
}

/// Parse a duration string (e.g., "60s", "5m", "1h") to seconds
pub fn parse_duration(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if s.ends_with("sec") || s.ends_with('s') {
        (s.trim_end_matches("sec").trim_end_matches('s'), 1u64)
    } else if s.ends_with("min") || s.ends_with('m') {
        (s.trim_end_matches("min").trim_end_matches('m'), 60)
    } else if s.ends_with("hr") || s.ends_with('h') {
        (s.trim_end_matches("hr").trim_end_matches('h'), 3600)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str
        .parse()
        .with_context(|| format!("Invalid duration format: {}", s))?;

    Ok(num * multiplier)
}

/// Parse a time string (e.g., "500us", "5ms", "1s") to milliseconds
///
/// Sub-millisecond values round down.
pub fn parse_time_ms(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier, divisor) = if s.ends_with("us") {
        (s.trim_end_matches("us"), 1u64, 1000u64)
    } else if s.ends_with("ms") {
        (s.trim_end_matches("ms"), 1, 1)
    } else if s.ends_with('s') {
        (s.trim_end_matches('s'), 1000, 1)
    } else {
        (s.as_str(), 1, 1)
    };

    let num: u64 = num_str
        .parse()
        .with_context(|| format!("Invalid time format: {}", s))?;

    Ok(num * multiplier / divisor)
}

/// Build a configuration from CLI arguments alone
pub fn config_from_cli(cli: &Cli) -> Result<Config> {
    let control_node = cli
        .control_node
        .context("--control-node is required without --config")?;
    let request_rate = cli
        .request_rate
        .context("--request-rate is required without --config")?;

    let mut config = Config {
        scenario: ScenarioConfig::new(
            request_rate,
            cli.interval.unwrap_or(crate::stats::DEFAULT_SAMPLE_SIZE),
        ),
        cluster: ClusterConfig {
            control_node,
            nodes: Vec::new(),
            cert_directory: None,
        },
        output: OutputConfig::default(),
        runtime: RuntimeConfig::default(),
    };

    apply_cli_overrides(cli, &mut config)?;
    Ok(config)
}

/// Apply every CLI argument that was given on top of `config`
pub fn apply_cli_overrides(cli: &Cli, config: &mut Config) -> Result<()> {
    // Scenario
    if let Some(rate) = cli.request_rate {
        config.scenario.request_rate = rate;
    }
    if let Some(interval) = cli.interval {
        config.scenario.interval = interval;
    }
    if let Some(max) = cli.max_outstanding {
        config.scenario.max_outstanding = Some(max);
    }
    if let Some(ref timeout) = cli.timeout {
        config.scenario.timeout_secs = parse_duration(timeout)?;
    }
    if let Some(ref ramp_up) = cli.ramp_up {
        config.scenario.ramp_up_secs = Some(parse_duration(ramp_up)?);
    }
    if let Some(ref size) = cli.dataset_size {
        config.scenario.dataset_size = Some(parse_size(size)?);
    }

    // Cluster
    if let Some(control_node) = cli.control_node {
        config.cluster.control_node = control_node;
    }
    if !cli.nodes.is_empty() {
        config.cluster.nodes = cli.nodes.clone();
    }
    if let Some(ref dir) = cli.cert_directory {
        config.cluster.cert_directory = Some(dir.clone());
    }

    // Output
    if let Some(ref path) = cli.json_output {
        config.output.json_output = Some(path.clone());
    }
    if cli.show_latency {
        config.output.show_latency = true;
    }

    // Runtime
    if let Some(ref duration) = cli.duration {
        config.runtime.duration_secs = parse_duration(duration)?;
    }
    if let Some(ref latency) = cli.latency {
        config.runtime.simulated_latency_ms = parse_time_ms(latency)?;
    }
    if cli.dry_run {
        config.runtime.dry_run = true;
    }
    if cli.debug {
        config.runtime.debug = true;
    }

    Ok(())
}
