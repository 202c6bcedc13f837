//! In-memory process table used by the integration tests.
//!
//! The clock is controlled by the test, so rates are deterministic.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use herakles_proc_sampler::error::{CycleError, SampleError};
use herakles_proc_sampler::process::provider::{CgroupReader, NetworkProvider, ProcessProvider};
use herakles_proc_sampler::process::{
    CgroupInfo, CpuTicks, NetworkCounters, PidState, ProcCpuInfo, ProcIdentity, ProcMemInfo,
    ProcStatus, ProcessSample, MemBytePct,
};
use herakles_proc_sampler::HostInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// The process exits between enumeration and reading.
    Gone,
    /// Counters are not readable by the sampler.
    PermissionDenied,
}

#[derive(Debug, Clone)]
pub struct FakeProc {
    pub pid: i32,
    pub name: String,
    pub state: PidState,
    pub start_ticks: u64,
    pub user_ms: u64,
    pub system_ms: u64,
    pub rss: Option<u64>,
    pub env: BTreeMap<String, String>,
    pub fail: Option<Failure>,
}

impl FakeProc {
    pub fn new(pid: i32, name: &str) -> Self {
        Self {
            pid,
            name: name.to_string(),
            state: PidState::Running,
            start_ticks: 1000 + pid as u64,
            user_ms: 0,
            system_ms: 0,
            rss: Some(4096),
            env: BTreeMap::from([
                ("PATH".to_string(), "/usr/bin".to_string()),
                ("HOME".to_string(), "/root".to_string()),
                ("TOKEN".to_string(), "secret".to_string()),
            ]),
            fail: None,
        }
    }

    pub fn rss(mut self, bytes: u64) -> Self {
        self.rss = Some(bytes);
        self
    }

    pub fn state(mut self, state: PidState) -> Self {
        self.state = state;
        self
    }
}

pub struct FakeProvider {
    procs: Mutex<BTreeMap<i32, FakeProc>>,
    clock: Mutex<DateTime<Utc>>,
    enumeration_fails: AtomicBool,
    identity_calls: AtomicUsize,
    identity_failures: AtomicUsize,
    pub num_cpus: usize,
    pub total_memory: Option<u64>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            procs: Mutex::new(BTreeMap::new()),
            clock: Mutex::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            enumeration_fails: AtomicBool::new(false),
            identity_calls: AtomicUsize::new(0),
            identity_failures: AtomicUsize::new(0),
            num_cpus: 4,
            total_memory: Some(1_000_000),
        }
    }

    pub fn with_procs(procs: impl IntoIterator<Item = FakeProc>) -> Self {
        let provider = Self::new();
        for p in procs {
            provider.add(p);
        }
        provider
    }

    pub fn add(&self, proc: FakeProc) {
        self.procs.lock().unwrap().insert(proc.pid, proc);
    }

    pub fn remove(&self, pid: i32) {
        self.procs.lock().unwrap().remove(&pid);
    }

    /// Adds CPU time (milliseconds) to a process.
    pub fn burn(&self, pid: i32, user_ms: u64, system_ms: u64) {
        let mut procs = self.procs.lock().unwrap();
        let p = procs.get_mut(&pid).unwrap();
        p.user_ms += user_ms;
        p.system_ms += system_ms;
    }

    pub fn set_ticks(&self, pid: i32, user_ms: u64, system_ms: u64) {
        let mut procs = self.procs.lock().unwrap();
        let p = procs.get_mut(&pid).unwrap();
        p.user_ms = user_ms;
        p.system_ms = system_ms;
    }

    pub fn set_failure(&self, pid: i32, fail: Option<Failure>) {
        self.procs.lock().unwrap().get_mut(&pid).unwrap().fail = fail;
    }

    pub fn fail_enumeration(&self, fail: bool) {
        self.enumeration_fails.store(fail, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: i64) {
        *self.clock.lock().unwrap() += Duration::milliseconds(ms);
    }

    /// Makes the next `n` identity reads fail with an I/O error.
    pub fn fail_identity_reads(&self, n: usize) {
        self.identity_failures.store(n, Ordering::SeqCst);
    }

    pub fn identity_calls(&self) -> usize {
        self.identity_calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, pid: i32) -> Result<FakeProc, SampleError> {
        let procs = self.procs.lock().unwrap();
        match procs.get(&pid) {
            Some(p) if p.fail == Some(Failure::Gone) => Err(SampleError::NotFound(pid)),
            Some(p) => Ok(p.clone()),
            None => Err(SampleError::NotFound(pid)),
        }
    }
}

impl ProcessProvider for FakeProvider {
    fn pids(&self) -> Result<Vec<i32>, CycleError> {
        if self.enumeration_fails.load(Ordering::SeqCst) {
            return Err(CycleError::Enumeration {
                path: PathBuf::from("/proc"),
                source: io::Error::new(io::ErrorKind::Other, "proc is gone"),
            });
        }
        Ok(self.procs.lock().unwrap().keys().copied().collect())
    }

    fn status(&self, pid: i32) -> Result<ProcStatus, SampleError> {
        let p = self.lookup(pid)?;
        Ok(ProcStatus {
            pid,
            ppid: Some(1),
            pgid: Some(pid),
            name: p.name,
            state: p.state,
            start_ticks: Some(p.start_ticks),
        })
    }

    fn sample(&self, pid: i32) -> Result<ProcessSample, SampleError> {
        let p = self.lookup(pid)?;
        if p.fail == Some(Failure::PermissionDenied) {
            return Err(SampleError::PermissionDenied(pid));
        }
        Ok(ProcessSample {
            cpu: ProcCpuInfo {
                user: CpuTicks::with_ticks(p.user_ms),
                system: CpuTicks::with_ticks(p.system_ms),
                total: CpuTicks::with_ticks(p.user_ms + p.system_ms),
                start_time: None,
            },
            memory: ProcMemInfo {
                size: p.rss.map(|r| r * 2),
                rss: MemBytePct {
                    bytes: p.rss,
                    pct: None,
                },
                share: None,
            },
            sample_time: *self.clock.lock().unwrap(),
        })
    }

    fn identity(&self, pid: i32) -> Result<ProcIdentity, SampleError> {
        let p = self.lookup(pid)?;
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .identity_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(SampleError::Io {
                pid,
                source: io::Error::new(io::ErrorKind::Other, "read interrupted"),
            });
        }
        Ok(ProcIdentity {
            username: Some("root".to_string()),
            cwd: Some("/".to_string()),
            args: vec![p.name.clone(), "--flag".to_string()],
            cmdline: Some(format!("{} --flag", p.name)),
            env: Some(p.env),
        })
    }

    fn host(&self) -> HostInfo {
        HostInfo {
            total_memory_bytes: self.total_memory,
            num_cpus: self.num_cpus,
        }
    }
}

/// Same counters for every pid: one `ip` and one `tcp_ext` section.
pub struct FakeNetwork;

impl NetworkProvider for FakeNetwork {
    fn network(&self, _pid: i32) -> Result<NetworkCounters, SampleError> {
        Ok(NetworkCounters::from([
            (
                "ip".to_string(),
                BTreeMap::from([
                    ("Forwarding".to_string(), 1),
                    ("DefaultTTL".to_string(), 64),
                ]),
            ),
            (
                "tcp_ext".to_string(),
                BTreeMap::from([("SyncookiesSent".to_string(), 0)]),
            ),
        ]))
    }
}

/// Places every pid in a fixed cgroup.
pub struct FakeCgroups;

impl CgroupReader for FakeCgroups {
    fn read(&self, _pid: i32) -> Result<Option<CgroupInfo>, SampleError> {
        Ok(Some(herakles_proc_sampler::process::cgroup::parse_cgroup_file(
            "0::/system.slice/test.service\n",
        )))
    }
}
