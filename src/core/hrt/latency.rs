//! Compare-interrupt latency histogram
//!
//! On every compare firing the dispatcher records the difference between
//! the armed compare value and the counter value actually observed in the
//! interrupt handler. The distribution is the primary fidelity diagnostic
//! of the timing core: a healthy system keeps nearly all firings in the
//! lowest buckets.

use core::sync::atomic::{AtomicU32, Ordering};

/// Number of bounded histogram buckets (one overflow bucket follows)
pub const LATENCY_BUCKET_COUNT: usize = 8;

/// Upper bounds of the bounded buckets, in ticks
pub const LATENCY_BUCKETS: [u32; LATENCY_BUCKET_COUNT] = [1, 2, 5, 10, 20, 50, 100, 1000];

/// Latency histogram with lock-free counters
///
/// Counters only ever increment during normal operation, so readers need
/// nothing stronger than relaxed atomic loads; recording never blocks and
/// never allocates.
#[derive(Debug)]
pub struct LatencyHistogram {
    counters: [AtomicU32; LATENCY_BUCKET_COUNT + 1],
}

impl LatencyHistogram {
    pub const fn new() -> Self {
        Self {
            counters: [const { AtomicU32::new(0) }; LATENCY_BUCKET_COUNT + 1],
        }
    }

    /// Count one compare firing with the given latency in ticks
    ///
    /// Increments the first bucket whose bound is `>= latency`; values
    /// beyond every bound land in the trailing overflow bucket.
    pub fn record(&self, latency_ticks: u32) {
        for (bucket, bound) in self.counters.iter().zip(LATENCY_BUCKETS.iter()) {
            if latency_ticks <= *bound {
                bucket.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }

        self.counters[LATENCY_BUCKET_COUNT].fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of all bucket counters, overflow bucket last
    pub fn counts(&self) -> [u32; LATENCY_BUCKET_COUNT + 1] {
        core::array::from_fn(|i| self.counters[i].load(Ordering::Relaxed))
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}
