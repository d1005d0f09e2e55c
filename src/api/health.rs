//! Shared health state for the /health endpoint.
//! Updated by the price monitor, read by the API.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

#[derive(Default)]
pub struct HealthState {
    /// True while the monitor loop task is alive.
    pub monitor_running: AtomicBool,
    pub cycles_completed: AtomicU64,
    /// Unix seconds of the last completed cycle (0 = none yet).
    pub last_cycle_at_secs: AtomicU64,
    pub alerts_sent: AtomicU64,
    /// Item groups whose processing failed, across all cycles.
    pub failed_groups: AtomicU64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub monitor_running: bool,
    pub cycles_completed: u64,
    pub last_cycle_at_secs: u64,
    pub alerts_sent: u64,
    pub failed_groups: u64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_monitor_running(&self, v: bool) {
        self.monitor_running.store(v, Ordering::Relaxed);
    }

    pub fn record_cycle(&self, at_secs: u64, alerts: u64, failed: u64) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.last_cycle_at_secs.store(at_secs, Ordering::Relaxed);
        self.alerts_sent.fetch_add(alerts, Ordering::Relaxed);
        self.failed_groups.fetch_add(failed, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            monitor_running: self.monitor_running.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            last_cycle_at_secs: self.last_cycle_at_secs.load(Ordering::Relaxed),
            alerts_sent: self.alerts_sent.load(Ordering::Relaxed),
            failed_groups: self.failed_groups.load(Ordering::Relaxed),
        }
    }
}
