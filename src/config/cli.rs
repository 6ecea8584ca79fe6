//! CLI argument parsing using clap

use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;

/// WritePulse - control-plane write load generator
#[derive(Parser, Debug)]
#[command(name = "writepulse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    // === Configuration File ===
    /// TOML configuration file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    // === Cluster Options ===
    /// Address of the cluster's control node
    #[arg(long, env = "WRITEPULSE_CONTROL_NODE")]
    pub control_node: Option<IpAddr>,

    /// Node eligible to host the benchmark dataset (repeatable, comma-separated)
    ///
    /// Without any, every node the control service reports is eligible.
    #[arg(long = "node", value_delimiter = ',')]
    pub nodes: Vec<IpAddr>,

    /// Directory holding the cluster's client certificates
    #[arg(long, env = "WRITEPULSE_CERT_DIRECTORY")]
    pub cert_directory: Option<PathBuf>,

    // === Scenario Options ===
    /// Requested write rate (requests per second)
    #[arg(short = 'r', long, env = "WRITEPULSE_REQUEST_RATE")]
    pub request_rate: Option<u32>,

    /// Rate sample window in seconds
    #[arg(short = 'i', long, env = "WRITEPULSE_INTERVAL")]
    pub interval: Option<usize>,

    /// Outstanding-request ceiling (default: 10 x request rate)
    #[arg(long)]
    pub max_outstanding: Option<u64>,

    /// Dataset-creation timeout (e.g., 45s, 2m)
    #[arg(long)]
    pub timeout: Option<String>,

    /// Time allowed to reach the requested rate (e.g., 30s; default: interval + 1s)
    #[arg(long)]
    pub ramp_up: Option<String>,

    /// Maximum size of the benchmark dataset (e.g., 1G, 100M)
    #[arg(long)]
    pub dataset_size: Option<String>,

    // === Runtime Options ===
    /// How long to hold the load once established (e.g., 60s, 5m; 0 = until failure)
    #[arg(short = 'd', long)]
    pub duration: Option<String>,

    /// Response latency of the simulated cluster (e.g., 5ms, 1s)
    #[arg(long)]
    pub latency: Option<String>,

    // === Output Options ===
    /// JSON report file path
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Show latency percentiles
    #[arg(long)]
    pub show_latency: bool,

    /// Dry run - validate configuration without executing
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments that do not depend on a config file
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.config.is_none() {
            if self.control_node.is_none() {
                anyhow::bail!("--control-node is required without --config");
            }
            if self.request_rate.is_none() {
                anyhow::bail!("--request-rate is required without --config");
            }
        }
        if self.request_rate == Some(0) {
            anyhow::bail!("request_rate must be at least 1");
        }
        if self.interval == Some(0) {
            anyhow::bail!("interval must be at least 1 second");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("writepulse").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_minimal() {
        let cli = parse(&["--control-node", "10.0.0.1", "-r", "50"]);
        assert_eq!(cli.control_node, Some("10.0.0.1".parse().unwrap()));
        assert_eq!(cli.request_rate, Some(50));
        assert!(cli.nodes.is_empty());
        cli.validate().unwrap();
    }

    #[test]
    fn test_parse_nodes() {
        let cli = parse(&[
            "--control-node",
            "10.0.0.1",
            "-r",
            "5",
            "--node",
            "10.0.0.2,10.0.0.3",
            "--node",
            "10.0.0.4",
        ]);
        assert_eq!(cli.nodes.len(), 3);
    }

    #[test]
    fn test_malformed_address_rejected() {
        let result = Cli::try_parse_from(["writepulse", "--control-node", "not-an-address"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_requires_cluster_without_config() {
        let cli = parse(&["-r", "5"]);
        assert!(cli.validate().is_err());

        let cli = parse(&["-c", "bench.toml"]);
        cli.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_rate() {
        let cli = parse(&["--control-node", "10.0.0.1", "-r", "0"]);
        assert!(cli.validate().is_err());
    }
}
