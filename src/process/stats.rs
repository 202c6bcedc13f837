//! The sampling engine.
//!
//! `Stats` drives one sampling cycle at a time: enumerate pids, drop the ones
//! whose name does not match, read counters for the rest in parallel, compute
//! rates against the registry, apply top-N selection and prune the registry.

use ahash::AHashSet as HashSet;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::SamplerConfig;
use crate::cycle_stats::CycleStats;
use crate::error::{ConfigError, CycleError, SampleError};
use crate::process::cgroup::{CgroupOptions, ProcCgroupReader};
use crate::process::matcher::Matcher;
use crate::process::network::filter_network_counters;
use crate::process::provider::{CgroupReader, NetworkProvider, ProcessProvider};
use crate::process::rate::{cpu_percentage, memory_percentage};
use crate::process::registry::ProcessRegistry;
use crate::process::state::{ProcIdentity, ProcListEntry, ProcState, ProcStatus};
use crate::process::top::{include_top_processes, IncludeTopConfig};
use crate::resolve::Resolver;
use crate::system::HostInfo;

/// Process sampling engine. One instance owns one registry.
pub struct Stats {
    procs: Matcher,
    env_whitelist: Matcher,
    network_metrics: Option<Matcher>,
    cache_cmdline: bool,
    cpu_ticks: bool,
    include_top: IncludeTopConfig,
    provider: Arc<dyn ProcessProvider>,
    network: Option<Arc<dyn NetworkProvider>>,
    cgroups: Option<Arc<dyn CgroupReader>>,
    registry: ProcessRegistry,
    cycle_stats: CycleStats,
}

impl Stats {
    /// Builds an engine with the platform's default collaborators, reading
    /// under `config.hostfs`.
    pub fn new(config: &SamplerConfig) -> Result<Self, ConfigError> {
        let resolver = Resolver::new(&config.hostfs);

        #[cfg(target_os = "linux")]
        let mut stats = {
            let procfs = Arc::new(crate::process::procfs::ProcFs::new(resolver.clone()));
            let mut stats = Self::with_provider(config, procfs.clone())?;
            if config.enable_network {
                stats = stats.with_network(procfs);
            }
            stats
        };

        #[cfg(not(target_os = "linux"))]
        let mut stats = {
            let mut stats = Self::with_provider(
                config,
                Arc::new(crate::process::provider::UnsupportedProvider),
            )?;
            if config.enable_network {
                warn!("Per-process network counters are only available on Linux");
                stats.network = None;
            }
            stats
        };

        if config.enable_cgroups {
            stats = stats.with_cgroups(Arc::new(ProcCgroupReader::new(CgroupOptions {
                rootfs: resolver,
                ignore_root_cgroups: config.cgroups.ignore_root_cgroups,
            })));
        }

        Ok(stats)
    }

    /// Builds an engine around an explicit process provider. Network and
    /// cgroup collaborators are attached with `with_network`/`with_cgroups`.
    pub fn with_provider(
        config: &SamplerConfig,
        provider: Arc<dyn ProcessProvider>,
    ) -> Result<Self, ConfigError> {
        let network_metrics = config
            .network_metrics
            .as_ref()
            .map(|m| Matcher::new("network_metrics", m))
            .transpose()?;

        Ok(Self {
            procs: Matcher::new("procs", &config.procs)?,
            env_whitelist: Matcher::new("env_whitelist", &config.env_whitelist)?,
            network_metrics,
            cache_cmdline: config.cache_cmdline,
            cpu_ticks: config.cpu_ticks,
            include_top: config.include_top,
            provider,
            network: None,
            cgroups: None,
            registry: ProcessRegistry::new(),
            cycle_stats: CycleStats::new(),
        })
    }

    pub fn with_network(mut self, network: Arc<dyn NetworkProvider>) -> Self {
        self.network = Some(network);
        self
    }

    pub fn with_cgroups(mut self, cgroups: Arc<dyn CgroupReader>) -> Self {
        self.cgroups = Some(cgroups);
        self
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub fn cycle_stats(&self) -> &CycleStats {
        &self.cycle_stats
    }

    /// True if `name` passes the process-name patterns.
    pub fn match_process(&self, name: &str) -> bool {
        self.procs.matches(name)
    }

    /// Runs one full sampling cycle and returns the selected processes.
    ///
    /// Per-pid failures only drop that pid; an enumeration failure fails the
    /// whole cycle.
    #[instrument(skip(self))]
    pub fn get(&self) -> Result<Vec<ProcState>, CycleError> {
        let start = Instant::now();

        let pids = match self.provider.pids() {
            Ok(pids) => pids,
            Err(e) => {
                warn!("Process enumeration failed: {}", e);
                self.cycle_stats.record_cycle_failure();
                return Err(e);
            }
        };
        debug!("Enumerated {} processes", pids.len());

        let host = self.provider.host();

        let procs: Vec<ProcState> = pids
            .par_iter()
            .filter_map(|&pid| match self.sample_matching(pid, &host) {
                Ok(Some(state)) => Some(state),
                Ok(None) => {
                    self.cycle_stats.record_filtered();
                    None
                }
                Err(e) => {
                    self.handle_pid_error(pid, &e);
                    None
                }
            })
            .collect();

        let matched = procs.len();
        let mut selected = include_top_processes(procs, &self.include_top);
        if !self.cpu_ticks {
            selected.iter_mut().for_each(ProcState::strip_ticks);
        }

        let alive: HashSet<i32> = pids.iter().copied().collect();
        let pruned = self.registry.prune(&alive);
        if pruned > 0 {
            debug!("Pruned {} exited processes from registry", pruned);
            self.cycle_stats.record_pruned(pruned as u64);
        }

        if selected.is_empty() {
            warn!("No processes matched filters");
        }

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.cycle_stats
            .record_cycle(selected.len() as u64, duration_ms);

        info!(
            "Sampling cycle completed: {} reported, {} matched, {} enumerated, {:.2}ms",
            selected.len(),
            matched,
            pids.len(),
            duration_ms
        );

        Ok(selected)
    }

    /// Samples a single pid, bypassing name filtering and top-N selection.
    pub fn get_one(&self, pid: i32) -> Result<ProcState, SampleError> {
        let host = self.provider.host();
        let result = self
            .provider
            .status(pid)
            .and_then(|status| self.fill_status(status, &host));
        match result {
            Ok(mut state) => {
                if !self.cpu_ticks {
                    state.strip_ticks();
                }
                Ok(state)
            }
            Err(e) => {
                if e.is_gone() {
                    self.registry.remove(pid);
                }
                Err(e)
            }
        }
    }

    /// Samples the sampler's own process.
    pub fn get_self(&self) -> Result<ProcState, SampleError> {
        self.get_one(std::process::id() as i32)
    }

    /// Lists pid and run state of every process matching the name patterns.
    /// An empty pattern list matches everything. No rates are computed and
    /// the registry is not touched.
    pub fn list_states(&self) -> Result<Vec<ProcListEntry>, CycleError> {
        let pids = self.provider.pids()?;
        Ok(pids
            .into_iter()
            .filter_map(|pid| {
                let status = match self.provider.status(pid) {
                    Ok(s) => s,
                    Err(e) => {
                        debug!("Skipping process {} in list: {}", pid, e);
                        return None;
                    }
                };
                self.procs
                    .matches_or_empty(&status.name)
                    .then_some(ProcListEntry {
                        pid,
                        state: status.state,
                    })
            })
            .collect())
    }

    fn handle_pid_error(&self, pid: i32, err: &SampleError) {
        debug!("Skipping process {}: {}", pid, err);
        self.cycle_stats.record_skipped();
        match err {
            SampleError::PermissionDenied(_) => self.cycle_stats.record_permission_denied(),
            e if e.is_gone() => {
                self.registry.remove(pid);
            }
            _ => {}
        }
    }

    /// Fetches identity, falling back to an empty placeholder (flagged
    /// incomplete) when it cannot be read for a live process.
    fn fetch_identity(&self, pid: i32) -> Result<(ProcIdentity, bool), SampleError> {
        let (mut identity, complete) = match self.provider.identity(pid) {
            Ok(identity) => (identity, true),
            Err(e) if e.is_gone() => return Err(e),
            Err(e) => {
                debug!("Identity unavailable for process {}: {}", pid, e);
                (ProcIdentity::default(), false)
            }
        };
        identity.filter_env(&self.env_whitelist);
        Ok((identity, complete))
    }

    /// Reuses the cached identity when the registry holds the same process
    /// and its identity was read successfully.
    fn identity_for(&self, status: &ProcStatus) -> Result<(ProcIdentity, bool), SampleError> {
        if self.cache_cmdline {
            if let Some(prev) = self.registry.get(status.pid) {
                if prev.same_process(status) {
                    if prev.identity_complete {
                        return Ok((prev.identity, true));
                    }
                    return self.fetch_identity(status.pid);
                }
                debug!(
                    "Process {} was replaced ({} -> {}), dropping cached identity",
                    status.pid, prev.status.name, status.name
                );
            }
        }
        self.fetch_identity(status.pid)
    }

    /// Samples `pid` if its name passes the process patterns.
    fn sample_matching(&self, pid: i32, host: &HostInfo) -> Result<Option<ProcState>, SampleError> {
        let status = self.provider.status(pid)?;
        if !self.procs.matches(&status.name) {
            return Ok(None);
        }
        self.fill_status(status, host).map(Some)
    }

    fn fill_status(&self, status: ProcStatus, host: &HostInfo) -> Result<ProcState, SampleError> {
        let pid = status.pid;
        let sample = self.provider.sample(pid)?;
        let (identity, identity_complete) = self.identity_for(&status)?;

        let mut state = ProcState::new(status, identity, sample);
        state.identity_complete = identity_complete;

        if let Some(network) = &self.network {
            match network.network(pid) {
                Ok(mut counters) => {
                    if let Some(whitelist) = &self.network_metrics {
                        filter_network_counters(&mut counters, whitelist);
                    }
                    state.network = Some(counters);
                }
                Err(e) => debug!("Network counters unavailable for process {}: {}", pid, e),
            }
        }

        if let Some(cgroups) = &self.cgroups {
            match cgroups.read(pid) {
                Ok(info) => state.cgroup = info,
                Err(e) => debug!("Cgroup data unavailable for process {}: {}", pid, e),
            }
        }

        let num_cpus = host.num_cpus;
        let total_memory = host.total_memory_bytes;

        let state = self.registry.update(pid, move |prev| {
            if let Some(prev) = prev.filter(|p| p.same_process(&state.status)) {
                state.cpu = cpu_percentage(&prev.as_sample(), &state.as_sample(), num_cpus);
                state.memory.rss.pct = memory_percentage(state.memory.rss.bytes, total_memory);
            }
            state
        });

        Ok(state)
    }
}
