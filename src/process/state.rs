//! Per-process data model.
//!
//! Every numeric field that a platform may not provide, or that cannot be
//! computed yet (percentages on the first sample of a pid), is an `Option`
//! and is skipped when serialized. Absent never means zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::process::cgroup::CgroupInfo;
use crate::process::matcher::Matcher;
use crate::process::network::NetworkCounters;

/// Scheduler state of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PidState {
    Running,
    Sleeping,
    DiskSleep,
    Idle,
    Stopped,
    Zombie,
    Dead,
    Unknown,
}

impl PidState {
    /// Maps the state character of `/proc/<pid>/stat`.
    pub fn from_proc_char(c: char) -> Self {
        match c {
            'R' => PidState::Running,
            'S' => PidState::Sleeping,
            'D' => PidState::DiskSleep,
            'I' => PidState::Idle,
            'T' | 't' => PidState::Stopped,
            'Z' => PidState::Zombie,
            'X' | 'x' => PidState::Dead,
            _ => PidState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PidState::Running => "running",
            PidState::Sleeping => "sleeping",
            PidState::DiskSleep => "disk_sleep",
            PidState::Idle => "idle",
            PidState::Stopped => "stopped",
            PidState::Zombie => "zombie",
            PidState::Dead => "dead",
            PidState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PidState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cheap per-cycle facts, read before the name filter is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcStatus {
    pub pid: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ppid: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pgid: Option<i32>,
    pub name: String,
    pub state: PidState,
    /// Start time in clock ticks since boot; identifies a process across pid reuse.
    #[serde(skip)]
    pub start_ticks: Option<u64>,
}

/// Expensive identity fields, cached for the lifetime of a process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcIdentity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmdline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
}

impl ProcIdentity {
    /// Keeps only environment variables whose name matches the whitelist.
    /// An empty whitelist drops the environment entirely.
    pub fn filter_env(&mut self, whitelist: &Matcher) {
        if whitelist.is_empty() {
            self.env = None;
            return;
        }
        if let Some(env) = self.env.as_mut() {
            env.retain(|key, _| whitelist.matches(key));
        }
    }
}

/// Tick count plus the percentages derived from it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuTicks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticks: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub norm_pct: Option<f64>,
}

impl CpuTicks {
    pub fn with_ticks(ticks: u64) -> Self {
        Self {
            ticks: Some(ticks),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcCpuInfo {
    pub user: CpuTicks,
    pub system: CpuTicks,
    pub total: CpuTicks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemBytePct {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pct: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcMemInfo {
    /// Virtual memory size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub rss: MemBytePct,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share: Option<u64>,
}

/// One cycle's raw counters for a process. Ticks are in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSample {
    pub cpu: ProcCpuInfo,
    pub memory: ProcMemInfo,
    pub sample_time: DateTime<Utc>,
}

/// Everything known about a process in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcState {
    #[serde(flatten)]
    pub status: ProcStatus,
    #[serde(flatten)]
    pub identity: ProcIdentity,
    pub cpu: ProcCpuInfo,
    pub memory: ProcMemInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkCounters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cgroup: Option<CgroupInfo>,
    pub sample_time: DateTime<Utc>,
    /// False when the identity read failed and `identity` is a placeholder.
    #[serde(skip)]
    pub identity_complete: bool,
}

impl ProcState {
    pub fn new(status: ProcStatus, identity: ProcIdentity, sample: ProcessSample) -> Self {
        Self {
            status,
            identity,
            cpu: sample.cpu,
            memory: sample.memory,
            network: None,
            cgroup: None,
            sample_time: sample.sample_time,
            identity_complete: true,
        }
    }

    pub fn pid(&self) -> i32 {
        self.status.pid
    }

    /// The raw counters this state was built from.
    pub fn as_sample(&self) -> ProcessSample {
        ProcessSample {
            cpu: self.cpu,
            memory: self.memory,
            sample_time: self.sample_time,
        }
    }

    /// True when `status` describes the same process as this state, i.e. the
    /// pid was not recycled by the OS in between.
    pub fn same_process(&self, status: &ProcStatus) -> bool {
        if self.status.pid != status.pid || self.status.name != status.name {
            return false;
        }
        match (self.status.start_ticks, status.start_ticks) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }

    /// Removes raw tick counts, keeping the derived percentages.
    pub fn strip_ticks(&mut self) {
        self.cpu.user.ticks = None;
        self.cpu.system.ticks = None;
        self.cpu.total.ticks = None;
    }
}

/// Result row of the list-only enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcListEntry {
    pub pid: i32,
    pub state: PidState,
}
