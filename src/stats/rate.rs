//! Sliding-window request rate measurement
//!
//! The measurer turns raw send/receive events into a requests-per-second rate.
//! Once per second the owner calls [`RateMeasurer::update_rate`], which pushes
//! the deltas observed since the previous tick into a fixed-capacity window.
//!
//! The rate is the sum of received requests in the window divided by the
//! window's *capacity*, not by the number of samples collected so far, and is
//! truncated to whole requests per second. A cold start therefore under-reports
//! until the window is full, so a short burst cannot fake a sustained rate.
//!
//! # Example
//!
//! ```
//! use writepulse::stats::rate::RateMeasurer;
//!
//! let mut measurer = RateMeasurer::new(2);
//! for _ in 0..2 {
//!     for _ in 0..10 {
//!         measurer.send_request();
//!         measurer.receive_request(true);
//!     }
//!     measurer.update_rate();
//! }
//! assert_eq!(measurer.rate(), 10.0);
//! assert_eq!(measurer.outstanding(), 0);
//! ```

use std::collections::VecDeque;

/// Default number of one-second samples in the window
pub const DEFAULT_SAMPLE_SIZE: usize = 5;

/// Requests sent and received during one sampling second
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sample {
    pub sent: u64,
    pub received: u64,
}

/// Sliding-window rate measurer
#[derive(Debug, Clone)]
pub struct RateMeasurer {
    sample_size: usize,
    window: VecDeque<Sample>,

    sent_total: u64,
    received_total: u64,
    errors_total: u64,

    // Totals at the previous tick, used to compute per-second deltas
    last_sent: u64,
    last_received: u64,

    rate: f64,
}

impl RateMeasurer {
    /// Create a measurer with a window of `sample_size` seconds
    ///
    /// A zero sample size is treated as one.
    pub fn new(sample_size: usize) -> Self {
        let sample_size = sample_size.max(1);
        Self {
            sample_size,
            window: VecDeque::with_capacity(sample_size),
            sent_total: 0,
            received_total: 0,
            errors_total: 0,
            last_sent: 0,
            last_received: 0,
            rate: 0.0,
        }
    }

    /// Record one dispatched request
    #[inline]
    pub fn send_request(&mut self) {
        self.sent_total += 1;
    }

    /// Record one completed request
    ///
    /// Failed requests still complete, so they count as received. They are
    /// additionally tallied in [`errors`](Self::errors).
    #[inline]
    pub fn receive_request(&mut self, succeeded: bool) {
        self.received_total += 1;
        if !succeeded {
            self.errors_total += 1;
        }
    }

    /// Close the current second and recompute the rate
    pub fn update_rate(&mut self) {
        let sample = Sample {
            sent: self.sent_total - self.last_sent,
            received: self.received_total - self.last_received,
        };
        self.last_sent = self.sent_total;
        self.last_received = self.received_total;

        if self.window.len() == self.sample_size {
            self.window.pop_front();
        }
        self.window.push_back(sample);

        let received: u64 = self.window.iter().map(|s| s.received).sum();
        self.rate = (received / self.sample_size as u64) as f64;
    }

    /// Most recently computed rate in requests/second
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Requests sent but not yet completed
    pub fn outstanding(&self) -> u64 {
        self.sent_total - self.received_total
    }

    pub fn sent_total(&self) -> u64 {
        self.sent_total
    }

    pub fn received_total(&self) -> u64 {
        self.received_total
    }

    /// Completed requests whose call failed
    pub fn errors(&self) -> u64 {
        self.errors_total
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Samples currently held, oldest first
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.window.iter()
    }

    pub fn is_window_full(&self) -> bool {
        self.window.len() == self.sample_size
    }
}

impl Default for RateMeasurer {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_SIZE)
    }
}
