//! Interfaces to the OS-specific data sources consumed by the sampler.
//!
//! Each platform implements only what it can; fields a platform cannot
//! provide stay `None` in the returned structures.

use crate::error::{CycleError, SampleError};
use crate::process::cgroup::CgroupInfo;
use crate::process::network::NetworkCounters;
use crate::process::state::{ProcIdentity, ProcStatus, ProcessSample};
use crate::system::HostInfo;

/// Raw per-process counters and identity.
pub trait ProcessProvider: Send + Sync {
    /// All process ids currently visible on the host.
    fn pids(&self) -> Result<Vec<i32>, CycleError>;

    /// Name, parents, run state and start time. Cheap enough to call for every pid.
    fn status(&self, pid: i32) -> Result<ProcStatus, SampleError>;

    /// CPU ticks (milliseconds) and memory, stamped with the read time.
    fn sample(&self, pid: i32) -> Result<ProcessSample, SampleError>;

    /// Username, cwd, arguments and the full unfiltered environment.
    fn identity(&self, pid: i32) -> Result<ProcIdentity, SampleError>;

    /// Host totals used for normalization.
    fn host(&self) -> HostInfo;
}

/// Network protocol counters for the namespace of a process.
pub trait NetworkProvider: Send + Sync {
    fn network(&self, pid: i32) -> Result<NetworkCounters, SampleError>;
}

/// Cgroup membership of a process. `None` means nothing worth reporting.
pub trait CgroupReader: Send + Sync {
    fn read(&self, pid: i32) -> Result<Option<CgroupInfo>, SampleError>;
}

/// Provider for platforms without a process table reader.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedProvider;

impl ProcessProvider for UnsupportedProvider {
    fn pids(&self) -> Result<Vec<i32>, CycleError> {
        Err(CycleError::Unsupported)
    }

    fn status(&self, _pid: i32) -> Result<ProcStatus, SampleError> {
        Err(SampleError::Unsupported)
    }

    fn sample(&self, _pid: i32) -> Result<ProcessSample, SampleError> {
        Err(SampleError::Unsupported)
    }

    fn identity(&self, _pid: i32) -> Result<ProcIdentity, SampleError> {
        Err(SampleError::Unsupported)
    }

    fn host(&self) -> HostInfo {
        HostInfo {
            total_memory_bytes: None,
            num_cpus: crate::system::num_cpus(),
        }
    }
}
