//! Process sampling: data model, /proc readers, rate computation and the
//! `Stats` engine that ties them together.
//!
//! This module provides:
//! - `matcher`: Regex lists for process names, env vars and network counters
//! - `state`: Per-process data model
//! - `provider`: Traits for OS-specific data sources
//! - `procfs`: Linux `/proc` implementation of the providers
//! - `network`: Per-namespace protocol counters
//! - `cgroup`: Cgroup membership reader
//! - `rate`: CPU and memory percentages
//! - `registry`: Per-pid store of the previous sample
//! - `top`: Top-N selection
//! - `stats`: The sampling engine

pub mod cgroup;
pub mod matcher;
pub mod network;
#[cfg(target_os = "linux")]
pub mod procfs;
pub mod provider;
pub mod rate;
pub mod registry;
pub mod state;
pub mod stats;
pub mod top;

// Re-export commonly used types
pub use cgroup::{CgroupInfo, CgroupOptions, ProcCgroupReader};
pub use matcher::Matcher;
pub use network::NetworkCounters;
#[cfg(target_os = "linux")]
pub use procfs::ProcFs;
pub use provider::{CgroupReader, NetworkProvider, ProcessProvider, UnsupportedProvider};
pub use rate::{cpu_percentage, memory_percentage, round4};
pub use registry::ProcessRegistry;
pub use state::{
    CpuTicks, MemBytePct, PidState, ProcCpuInfo, ProcIdentity, ProcListEntry, ProcMemInfo,
    ProcState, ProcStatus, ProcessSample,
};
pub use stats::Stats;
pub use top::{include_top_processes, IncludeTopConfig};
