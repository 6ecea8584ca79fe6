//! WritePulse CLI entry point

use anyhow::{Context, Result};
use std::future;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use writepulse::config::{cli::Cli, toml::load_config, validator, Config};
use writepulse::control::fake::FakeControlService;
use writepulse::output::json::{write_json_output, JsonRunOutput};
use writepulse::output::text::print_report;
use writepulse::{BenchmarkCluster, ScenarioReport, WriteRequestLoadScenario};

fn main() -> Result<()> {
    println!("WritePulse v{}", env!("CARGO_PKG_VERSION"));
    println!("Control-plane write load generator");
    println!();

    let cli = Cli::parse_args();
    cli.validate()?;

    let config = load_config(&cli)?;
    init_tracing(config.runtime.debug);

    validator::validate_config(&config).context("Configuration validation failed")?;
    print!("{}", config);

    if config.runtime.dry_run {
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    println!();
    println!("Starting write load...");
    println!();

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let report = runtime.block_on(run_scenario(&config));

    println!();
    print_report(&report, &config.output);

    if let Some(ref path) = config.output.json_output {
        write_json_output(path, &JsonRunOutput::new(&config, &report), true)?;
        println!("JSON report written to {}", path.display());
    }

    if let Some(failure) = report.failure {
        anyhow::bail!("write load scenario failed: {}", failure.message);
    }
    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default: info, or debug with `--debug`)
fn init_tracing(debug: bool) {
    let default = if debug { "writepulse=debug" } else { "writepulse=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Stand up the simulated cluster described by `config`
fn simulated_cluster(config: &Config) -> BenchmarkCluster<FakeControlService> {
    let cluster = &config.cluster;
    let addresses: Vec<IpAddr> = if cluster.nodes.is_empty() {
        vec![cluster.control_node]
    } else {
        cluster.nodes.clone()
    };

    let fake = FakeControlService::with_addresses(addresses);
    fake.set_latency(Duration::from_millis(config.runtime.simulated_latency_ms));
    info!(
        control_node = %cluster.control_node,
        nodes = fake.nodes().len(),
        latency_ms = config.runtime.simulated_latency_ms,
        "simulated cluster ready"
    );

    BenchmarkCluster::new(cluster.control_node, move || fake.clone(), cluster.nodes.iter().copied())
}

/// Run the scenario until it fails, the hold period ends or Ctrl-C
async fn run_scenario(config: &Config) -> ScenarioReport {
    let cluster = simulated_cluster(config);
    let mut scenario = WriteRequestLoadScenario::new(&cluster, config.scenario.clone());

    println!(
        "Establishing {} req/s (ramp-up {}s)...",
        config.scenario.request_rate,
        config.scenario.ramp_up_ticks()
    );
    let established = tokio::select! {
        result = scenario.start() => result,
        _ = tokio::signal::ctrl_c() => {
            println!("Interrupted");
            return scenario.stop().await;
        }
    };
    if let Err(e) = established {
        warn!(error = %e, "requested rate was not established");
        return scenario.stop().await;
    }
    println!("Requested rate established, monitoring");

    let hold = async {
        match config.runtime.duration() {
            Some(duration) => tokio::time::sleep(duration).await,
            None => future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = scenario.maintained() => {
            if let Err(e) = result {
                warn!(error = %e, "requested rate was not maintained");
            }
        }
        _ = hold => println!("Hold period complete"),
        _ = tokio::signal::ctrl_c() => println!("Interrupted"),
    }

    scenario.stop().await
}
