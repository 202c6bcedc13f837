//! Top-N process selection by CPU and by resident memory.

use ahash::AHashSet as HashSet;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::process::state::ProcState;

/// Which processes survive a cycle: the union of the top `by_cpu` and top
/// `by_memory` processes, when enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeTopConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, alias = "by-cpu")]
    pub by_cpu: usize,
    #[serde(default, alias = "by-memory")]
    pub by_memory: usize,
}

impl IncludeTopConfig {
    /// True when selection would actually drop processes.
    pub fn is_active(&self) -> bool {
        self.enabled && (self.by_cpu > 0 || self.by_memory > 0)
    }
}

/// Descending order with absent values last. Ties keep input order.
fn desc_absent_last<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Pids of the first `n` processes when ordered by `compare`.
fn top_pids<F>(procs: &[ProcState], n: usize, compare: F) -> impl Iterator<Item = i32> + '_
where
    F: Fn(&ProcState, &ProcState) -> Ordering,
{
    let mut sorted: Vec<&ProcState> = procs.iter().collect();
    sorted.sort_by(|a, b| compare(a, b));
    sorted.truncate(n);
    sorted.into_iter().map(ProcState::pid)
}

/// Applies top-N selection to one cycle's processes.
///
/// Returns the input untouched when selection is disabled or both counts are
/// zero. Otherwise each process selected by either criterion appears once, in
/// input order.
pub fn include_top_processes(procs: Vec<ProcState>, cfg: &IncludeTopConfig) -> Vec<ProcState> {
    if !cfg.is_active() {
        return procs;
    }

    let mut selected: HashSet<i32> = HashSet::new();

    if cfg.by_cpu > 0 {
        selected.extend(top_pids(&procs, cfg.by_cpu, |a, b| {
            desc_absent_last(a.cpu.total.pct, b.cpu.total.pct)
        }));
    }

    if cfg.by_memory > 0 {
        selected.extend(top_pids(&procs, cfg.by_memory, |a, b| {
            desc_absent_last(a.memory.rss.bytes, b.memory.rss.bytes)
        }));
    }

    let mut emitted: HashSet<i32> = HashSet::with_capacity(selected.len());
    procs
        .into_iter()
        .filter(|p| selected.contains(&p.pid()) && emitted.insert(p.pid()))
        .collect()
}
