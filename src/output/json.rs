//! JSON output formatting
//!
//! One document per run: tool identification, the resolved configuration and
//! the scenario report.

use crate::config::Config;
use crate::scenario::ScenarioReport;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Complete JSON document written for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRunOutput {
    pub tool: String,
    pub version: String,
    pub config: Config,
    pub report: ScenarioReport,
}

impl JsonRunOutput {
    pub fn new(config: &Config, report: &ScenarioReport) -> Self {
        Self {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            config: config.clone(),
            report: report.clone(),
        }
    }
}

/// Write JSON output to file
pub fn write_json_output(output_path: &Path, output: &JsonRunOutput, pretty: bool) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON output: {}", output_path.display()))?;
    let writer = BufWriter::new(file);

    if pretty {
        serde_json::to_writer_pretty(writer, output)?;
    } else {
        serde_json::to_writer(writer, output)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClusterConfig, OutputConfig, RuntimeConfig, ScenarioConfig};
    use crate::scenario::ScenarioState;

    fn config() -> Config {
        Config {
            scenario: ScenarioConfig::new(5, 3),
            cluster: ClusterConfig {
                control_node: "10.0.0.1".parse().unwrap(),
                nodes: vec![],
                cert_directory: None,
            },
            output: OutputConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }

    #[test]
    fn test_write_json_output() {
        let config = config();
        let report = ScenarioReport::idle(&config.scenario, ScenarioState::Stopped);
        let output = JsonRunOutput::new(&config, &report);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_json_output(&path, &output, true).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["tool"], "writepulse");
        assert_eq!(value["report"]["state"], "stopped");
        assert_eq!(value["config"]["scenario"]["request_rate"], 5);
        assert!(value["report"].get("failure").is_none());

        let parsed: JsonRunOutput = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, output);
    }

    #[test]
    fn test_write_json_output_bad_path() {
        let config = config();
        let report = ScenarioReport::idle(&config.scenario, ScenarioState::Stopped);
        let output = JsonRunOutput::new(&config, &report);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.json");
        assert!(write_json_output(&path, &output, false).is_err());
    }
}
