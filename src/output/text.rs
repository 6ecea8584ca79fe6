//! Human-readable text output

use crate::config::OutputConfig;
use crate::scenario::ScenarioReport;
use crate::stats::LatencySummary;
use crate::util::time::{calculate_rate, format_duration, format_micros, format_rate};
use std::fmt::Write;
use std::time::Duration;

const RULE: &str = "═══════════════════════════════════════════════════════════";

/// Print the scenario report to the console
pub fn print_report(report: &ScenarioReport, output: &OutputConfig) {
    print!("{}", render_report(report, output.show_latency));
}

/// Render the scenario report
///
/// Covers the outcome, achieved versus requested rate, request counters and,
/// with `show_latency`, the request latency percentiles.
pub fn render_report(report: &ScenarioReport, show_latency: bool) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_report(&mut out, report, show_latency);
    out
}

fn write_report(out: &mut String, report: &ScenarioReport, show_latency: bool) -> std::fmt::Result {
    let elapsed = Duration::from_secs_f64(report.elapsed_secs);

    writeln!(out, "{}", RULE)?;
    writeln!(out, "                  WRITE LOAD RESULTS")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out)?;

    match report.failure {
        Some(ref failure) => writeln!(out, "Outcome: FAILED ({})", failure.message)?,
        None => writeln!(out, "Outcome: {}", report.state)?,
    }
    if let Some(ref dataset_id) = report.dataset_id {
        writeln!(out, "Dataset: {}", dataset_id)?;
    }
    writeln!(out, "Host: {}", report.host)?;
    writeln!(out, "Elapsed Time: {}", format_duration(elapsed))?;
    writeln!(out)?;

    writeln!(out, "Rate:")?;
    writeln!(out, "  Requested: {} req/s", format_rate(f64::from(report.requested_rate)))?;
    writeln!(
        out,
        "  Achieved:  {} req/s (last {}s window, {} samples)",
        format_rate(report.achieved_rate),
        report.sample_size,
        report.samples
    )?;
    writeln!(
        out,
        "  Overall:   {} req/s",
        format_rate(calculate_rate(report.received, elapsed))
    )?;
    writeln!(out)?;

    writeln!(out, "Requests:")?;
    writeln!(out, "  Sent:        {}", format_number(report.sent))?;
    writeln!(out, "  Received:    {}", format_number(report.received))?;
    if report.errors > 0 {
        writeln!(out, "  Errors:      {}", format_number(report.errors))?;
    }
    writeln!(
        out,
        "  Outstanding: {} (max {})",
        format_number(report.outstanding),
        format_number(report.max_outstanding)
    )?;

    if show_latency {
        writeln!(out)?;
        write_latency(out, &report.latency)?;
    }

    writeln!(out)?;
    writeln!(out, "{}", RULE)
}

fn write_latency(out: &mut String, latency: &LatencySummary) -> std::fmt::Result {
    writeln!(out, "Latency ({} requests):", format_number(latency.count))?;
    let rows = [
        ("min", latency.min_us),
        ("mean", latency.mean_us),
        ("p50", latency.p50_us),
        ("p90", latency.p90_us),
        ("p99", latency.p99_us),
        ("max", latency.max_us),
    ];
    for (label, value) in rows {
        if let Some(us) = value {
            writeln!(out, "  {:<5} {}", label, format_micros(us))?;
        }
    }
    Ok(())
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{FailureReport, ScenarioState};
    use chrono::Utc;

    fn report() -> ScenarioReport {
        ScenarioReport {
            state: ScenarioState::Stopped,
            failure: None,
            requested_rate: 50,
            achieved_rate: 49.8,
            sample_size: 5,
            samples: 60,
            sent: 3000,
            received: 2990,
            errors: 0,
            outstanding: 10,
            max_outstanding: 500,
            elapsed_secs: 60.0,
            latency: LatencySummary {
                count: 2990,
                min_us: Some(150),
                mean_us: Some(2_000),
                p50_us: Some(1_800),
                p90_us: Some(3_500),
                p99_us: Some(9_000),
                max_us: Some(20_000),
            },
            dataset_id: None,
            host: "bench-01".to_string(),
            started_at: Utc::now(),
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn test_render_success() {
        let text = render_report(&report(), false);
        assert!(text.contains("Outcome: stopped"));
        assert!(text.contains("Requested: 50.0 req/s"));
        assert!(text.contains("Achieved:  49.8 req/s"));
        assert!(text.contains("Sent:        3,000"));
        assert!(!text.contains("Errors"));
        assert!(!text.contains("Latency"));
    }

    #[test]
    fn test_render_failure_with_latency() {
        let mut report = report();
        report.state = ScenarioState::Failed;
        report.errors = 3;
        report.failure = Some(FailureReport {
            kind: "request_rate_too_low".to_string(),
            message: "request rate dropped".to_string(),
        });

        let text = render_report(&report, true);
        assert!(text.contains("Outcome: FAILED (request rate dropped)"));
        assert!(text.contains("Errors:      3"));
        assert!(text.contains("p99   9.00ms"));
    }
}
