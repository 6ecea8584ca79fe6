//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use crate::config::cli_convert::apply_cli_overrides;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    apply_cli_overrides(cli, &mut config)?;
    Ok(config)
}

/// Resolve the effective configuration for this invocation
///
/// With `--config`, the file is loaded and CLI arguments override it;
/// otherwise the CLI alone must describe the run.
pub fn load_config(cli: &Cli) -> Result<Config> {
    match cli.config {
        Some(ref path) => merge_cli_with_config(cli, parse_toml_file(path)?),
        None => cli_convert::config_from_cli(cli),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use std::net::IpAddr;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[scenario]
request_rate = 50
interval = 10
max_outstanding = 200

[cluster]
control_node = "10.0.0.1"
nodes = ["10.0.0.2", "10.0.0.3"]
"#;

    #[test]
    fn test_parse_toml_basic() {
        let config = parse_toml_string(BASIC).unwrap();
        assert_eq!(config.scenario.request_rate, 50);
        assert_eq!(config.scenario.interval, 10);
        assert_eq!(config.scenario.max_outstanding(), 200);
        assert_eq!(config.scenario.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.cluster.nodes.len(), 2);
        assert_eq!(config.output, OutputConfig::default());
        assert_eq!(config.runtime, RuntimeConfig::default());
    }

    #[test]
    fn test_parse_toml_full() {
        let toml = r#"
[scenario]
request_rate = 5
timeout_secs = 90
ramp_up_secs = 20
dataset_size = 1073741824

[cluster]
control_node = "192.168.1.10"
cert_directory = "/etc/cluster/certs"

[output]
json_output = "report.json"
show_latency = true

[runtime]
duration_secs = 0
simulated_latency_ms = 5
"#;

        let config = parse_toml_string(toml).unwrap();
        assert_eq!(config.scenario.interval, crate::stats::DEFAULT_SAMPLE_SIZE);
        assert_eq!(config.scenario.timeout(), Duration::from_secs(90));
        assert_eq!(config.scenario.ramp_up_ticks(), 20);
        assert_eq!(config.scenario.dataset_size, Some(1 << 30));
        assert!(config.cluster.cert_directory.is_some());
        assert!(config.output.show_latency);
        assert_eq!(config.runtime.duration(), None);
        assert_eq!(config.runtime.simulated_latency_ms, 5);
    }

    #[test]
    fn test_parse_toml_missing_rate() {
        let toml = r#"
[scenario]
interval = 5

[cluster]
control_node = "10.0.0.1"
"#;
        assert!(parse_toml_string(toml).is_err());
    }

    #[test]
    fn test_parse_toml_bad_address() {
        let toml = r#"
[scenario]
request_rate = 5

[cluster]
control_node = "control.example"
"#;
        assert!(parse_toml_string(toml).is_err());
    }

    #[test]
    fn test_load_config_file_with_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(BASIC.as_bytes()).unwrap();
        let path = file.path().to_str().unwrap();

        let cli = Cli::try_parse_from(["writepulse", "-c", path, "-r", "75", "--node", "10.0.0.9"]).unwrap();
        let config = load_config(&cli).unwrap();

        assert_eq!(config.scenario.request_rate, 75);
        assert_eq!(config.scenario.interval, 10);
        assert_eq!(config.cluster.nodes, vec!["10.0.0.9".parse::<IpAddr>().unwrap()]);
    }

    #[test]
    fn test_load_config_missing_file() {
        let cli = Cli::try_parse_from(["writepulse", "-c", "/nonexistent/writepulse.toml"]).unwrap();
        let err = load_config(&cli).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
