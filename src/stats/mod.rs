//! Statistics collection
//!
//! - `rate`: sliding-window request rate and outstanding-request accounting
//! - `histogram`: per-request latency distribution

pub mod histogram;
pub mod rate;

pub use histogram::{LatencyHistogram, LatencySummary};
pub use rate::{RateMeasurer, Sample, DEFAULT_SAMPLE_SIZE};
