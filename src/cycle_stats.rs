//! Counters describing the sampler's own behavior across cycles.
//!
//! Updated lock-free from rayon workers during a cycle; a `snapshot` can be
//! taken at any time for logging.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default, Debug, PartialEq, Serialize)]
pub struct RunningStat {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            *self = RunningStat {
                count: 1,
                sum: value,
                min: value,
                max: value,
                last: value,
            };
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    pub fn snapshot(&self) -> RunningStat {
        self.inner.lock().map(|s| *s).unwrap_or_default()
    }
}

/// Per-engine cycle counters.
#[derive(Default)]
pub struct CycleStats {
    pub cycles_total: AtomicU64,
    pub cycle_failures: AtomicU64,
    pub processes_reported: AtomicU64,
    pub pids_filtered: AtomicU64,
    pub pids_skipped: AtomicU64,
    pub permission_denied: AtomicU64,
    pub registry_pruned: AtomicU64,
    pub cycle_duration_ms: Stat,
}

/// Point-in-time copy of `CycleStats`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CycleStatsSnapshot {
    pub cycles_total: u64,
    pub cycle_failures: u64,
    pub processes_reported: u64,
    pub pids_filtered: u64,
    pub pids_skipped: u64,
    pub permission_denied: u64,
    pub registry_pruned: u64,
    pub cycle_duration_ms: RunningStat,
}

impl CycleStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&self, reported: u64, duration_ms: f64) {
        self.cycles_total.fetch_add(1, Ordering::Relaxed);
        self.processes_reported.fetch_add(reported, Ordering::Relaxed);
        self.cycle_duration_ms.add_sample(duration_ms);
    }

    pub fn record_cycle_failure(&self) {
        self.cycle_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_filtered(&self) {
        self.pids_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.pids_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_permission_denied(&self) {
        self.permission_denied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pruned(&self, count: u64) {
        self.registry_pruned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CycleStatsSnapshot {
        CycleStatsSnapshot {
            cycles_total: self.cycles_total.load(Ordering::Relaxed),
            cycle_failures: self.cycle_failures.load(Ordering::Relaxed),
            processes_reported: self.processes_reported.load(Ordering::Relaxed),
            pids_filtered: self.pids_filtered.load(Ordering::Relaxed),
            pids_skipped: self.pids_skipped.load(Ordering::Relaxed),
            permission_denied: self.permission_denied.load(Ordering::Relaxed),
            registry_pruned: self.registry_pruned.load(Ordering::Relaxed),
            cycle_duration_ms: self.cycle_duration_ms.snapshot(),
        }
    }
}
