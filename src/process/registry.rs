//! Per-pid sample registry.
//!
//! The registry keeps the most recent `ProcState` of every tracked pid so the
//! next cycle can compute rates against it and reuse its cached identity.
//! It is backed by a sharded `DashMap`: operations on different pids do not
//! contend, and `update` holds the shard lock of one pid across its
//! read-compute-write so two concurrent samplers cannot interleave on it.

use ahash::AHashSet as HashSet;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::process::state::ProcState;

#[derive(Default)]
pub struct ProcessRegistry {
    procs: DashMap<i32, ProcState>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the stored state for `pid`.
    pub fn get(&self, pid: i32) -> Option<ProcState> {
        self.procs.get(&pid).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, pid: i32) -> bool {
        self.procs.contains_key(&pid)
    }

    /// Inserts or replaces the state for `pid`.
    pub fn set(&self, pid: i32, state: ProcState) {
        self.procs.insert(pid, state);
    }

    pub fn remove(&self, pid: i32) -> Option<ProcState> {
        self.procs.remove(&pid).map(|(_, state)| state)
    }

    /// Atomically replaces the state for `pid` with the result of `compute`,
    /// which receives the previous state (if any).
    ///
    /// `compute` runs while the pid's shard is locked; it must not block.
    pub fn update<F>(&self, pid: i32, compute: F) -> ProcState
    where
        F: FnOnce(Option<&ProcState>) -> ProcState,
    {
        match self.procs.entry(pid) {
            Entry::Occupied(mut entry) => {
                let next = compute(Some(entry.get()));
                entry.insert(next.clone());
                next
            }
            Entry::Vacant(entry) => {
                let next = compute(None);
                entry.insert(next.clone());
                next
            }
        }
    }

    /// All currently tracked pids.
    pub fn snapshot_pids(&self) -> Vec<i32> {
        self.procs.iter().map(|entry| *entry.key()).collect()
    }

    /// Drops every entry whose pid is not in `alive`. Returns the number removed.
    pub fn prune(&self, alive: &HashSet<i32>) -> usize {
        let before = self.procs.len();
        self.procs.retain(|pid, _| alive.contains(pid));
        before.saturating_sub(self.procs.len())
    }

    pub fn len(&self) -> usize {
        self.procs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }
}
