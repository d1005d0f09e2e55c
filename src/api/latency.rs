//! In-memory latency histograms for listing fetches.
//! The monitor and the price-check handler record, the API reads.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

use crate::types::Source;

/// Values stored in microseconds.
pub struct LatencyStats {
    inner: Mutex<hdrhistogram::Histogram<u64>>,
}

impl LatencyStats {
    /// Create a new histogram. Tracks 1us to 100s, 3 significant figures.
    pub fn new() -> Self {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, 100_000_000, 3)
            .expect("valid histogram bounds");
        Self {
            inner: Mutex::new(histogram),
        }
    }

    pub fn record_us(&self, us: u64) {
        if let Ok(mut h) = self.inner.lock() {
            let _ = h.record(us.max(1));
        }
    }

    pub fn record(&self, d: Duration) {
        let us = d.as_micros().min(u128::from(u64::MAX)) as u64;
        self.record_us(us);
    }

    /// Return (p50_us, p95_us, p99_us). None if no samples.
    pub fn percentiles(&self) -> (Option<u64>, Option<u64>, Option<u64>) {
        let Ok(h) = self.inner.lock() else {
            return (None, None, None);
        };
        if h.len() == 0 {
            return (None, None, None);
        }
        let p50 = h.value_at_quantile(0.5);
        let p95 = h.value_at_quantile(0.95);
        let p99 = h.value_at_quantile(0.99);
        (Some(p50), Some(p95), Some(p99))
    }

    pub fn len(&self) -> u64 {
        self.inner.lock().map(|h| h.len()).unwrap_or(0)
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct LatencySummary {
    pub samples: u64,
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

/// One histogram per listing source.
#[derive(Default)]
pub struct FetchLatency {
    bazaar: LatencyStats,
    item_market: LatencyStats,
}

impl FetchLatency {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_source(&self, source: Source) -> &LatencyStats {
        match source {
            Source::Bazaar => &self.bazaar,
            Source::ItemMarket => &self.item_market,
        }
    }

    pub fn summary(&self, source: Source) -> LatencySummary {
        let stats = self.for_source(source);
        let (p50, p95, p99) = stats.percentiles();
        let ms = |us: Option<u64>| us.map(|v| v as f64 / 1_000.0);
        LatencySummary {
            samples: stats.len(),
            p50_ms: ms(p50),
            p95_ms: ms(p95),
            p99_ms: ms(p99),
        }
    }
}
