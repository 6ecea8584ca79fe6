//! Request latency histogram using HdrHistogram
//!
//! Tracks dispatch-to-completion latency of write requests. Values are
//! recorded in microseconds from 1µs to 1 hour with 3 significant digits.
//!
//! # Example
//!
//! ```
//! use writepulse::stats::histogram::LatencyHistogram;
//! use std::time::Duration;
//!
//! let mut hist = LatencyHistogram::new();
//! hist.record(Duration::from_millis(2));
//! hist.record(Duration::from_millis(4));
//!
//! assert_eq!(hist.len(), 2);
//! assert!(hist.percentile(50.0).is_some());
//! ```

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_LATENCY_MICROS: u64 = 3_600_000_000;

/// Latency histogram wrapper
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    histogram: Histogram<u64>,
}

impl LatencyHistogram {
    /// Create an empty histogram
    pub fn new() -> Self {
        // - Minimum value: 1µs
        // - Maximum value: 1 hour in microseconds
        // - Significant digits: 3 (0.1% precision)
        let histogram = Histogram::new_with_bounds(1, MAX_LATENCY_MICROS, 3)
            .expect("Failed to create histogram with valid bounds");

        Self { histogram }
    }

    /// Record a latency sample, clamped to the histogram's range
    #[inline]
    pub fn record(&mut self, latency: Duration) {
        let micros = latency.as_micros() as u64;
        let value = micros.clamp(1, MAX_LATENCY_MICROS);
        let _ = self.histogram.record(value);
    }

    /// Latency at `percentile` (0.0 - 100.0), or `None` when empty
    pub fn percentile(&self, percentile: f64) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_micros(self.histogram.value_at_percentile(percentile)))
    }

    pub fn min(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_micros(self.histogram.min()))
    }

    pub fn max(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_micros(self.histogram.max()))
    }

    pub fn mean(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_micros(self.histogram.mean() as u64))
    }

    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.len() == 0
    }

    /// Condensed view used by reports
    pub fn summary(&self) -> LatencySummary {
        LatencySummary {
            count: self.len(),
            min_us: self.min().map(as_micros),
            mean_us: self.mean().map(as_micros),
            p50_us: self.percentile(50.0).map(as_micros),
            p90_us: self.percentile(90.0).map(as_micros),
            p99_us: self.percentile(99.0).map(as_micros),
            max_us: self.max().map(as_micros),
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

fn as_micros(d: Duration) -> u64 {
    d.as_micros() as u64
}

/// Latency percentiles in microseconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_us: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_us: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p50_us: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p90_us: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p99_us: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_us: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_histogram() {
        let hist = LatencyHistogram::new();
        assert_eq!(hist.len(), 0);
        assert!(hist.is_empty());
        assert!(hist.percentile(50.0).is_none());
    }

    #[test]
    fn test_percentile() {
        let mut hist = LatencyHistogram::new();
        for i in 1..=100 {
            hist.record(Duration::from_micros(i * 10));
        }

        let p50 = hist.percentile(50.0).unwrap();
        let p99 = hist.percentile(99.0).unwrap();

        assert!(p50.as_micros() >= 450 && p50.as_micros() <= 550);
        assert!(p99.as_micros() >= 940 && p99.as_micros() <= 1040);
    }

    #[test]
    fn test_min_max() {
        let mut hist = LatencyHistogram::new();
        hist.record(Duration::from_micros(100));
        hist.record(Duration::from_micros(500));
        hist.record(Duration::from_micros(200));

        let min = hist.min().unwrap();
        let max = hist.max().unwrap();
        assert!(min.as_micros() >= 99 && min.as_micros() <= 101);
        assert!(max.as_micros() >= 499 && max.as_micros() <= 501);
    }

    #[test]
    fn test_zero_latency_is_clamped() {
        let mut hist = LatencyHistogram::new();
        hist.record(Duration::ZERO);
        assert_eq!(hist.len(), 1);
        assert_eq!(hist.min(), Some(Duration::from_micros(1)));
    }

    #[test]
    fn test_summary() {
        let empty = LatencyHistogram::new().summary();
        assert_eq!(empty, LatencySummary::default());

        let mut hist = LatencyHistogram::new();
        hist.record(Duration::from_millis(1));
        hist.record(Duration::from_millis(3));

        let summary = hist.summary();
        assert_eq!(summary.count, 2);
        assert!(summary.p50_us.is_some());
        assert!(summary.max_us.unwrap() >= 2_990);
    }
}
