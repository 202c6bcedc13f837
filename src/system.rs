//! Host-wide facts needed by the rate engine.
//!
//! This module reads system totals (physical memory, boot time) from the
//! `/proc` filesystem under a `Resolver`, and exposes runtime constants such as
//! clock ticks per second, page size and the logical CPU count.

use once_cell::sync::Lazy;
use std::fs;

use crate::resolve::Resolver;

/// Get system clock ticks per second (usually 100, but can vary).
fn get_clk_tck() -> u64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_CLK_TCK
        // Returns -1 on error, 0 if undefined - both are handled by the > 0 check
        unsafe {
            let tck = libc::sysconf(libc::_SC_CLK_TCK);
            if tck > 0 {
                return tck as u64;
            }
        }
    }
    100
}

fn get_page_size() -> u64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_PAGESIZE
        unsafe {
            let size = libc::sysconf(libc::_SC_PAGESIZE);
            if size > 0 {
                return size as u64;
            }
        }
    }
    4096
}

/// System clock ticks per second (for CPU time conversion).
pub static CLK_TCK: Lazy<u64> = Lazy::new(get_clk_tck);

/// Memory page size in bytes (for /proc/<pid>/statm conversion).
pub static PAGE_SIZE: Lazy<u64> = Lazy::new(get_page_size);

/// Number of logical CPUs currently online.
pub fn num_cpus() -> usize {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_NPROCESSORS_ONLN
        unsafe {
            let n = libc::sysconf(libc::_SC_NPROCESSORS_ONLN);
            if n > 0 {
                return n as usize;
            }
        }
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Host totals used for normalizing per-process values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostInfo {
    pub total_memory_bytes: Option<u64>,
    pub num_cpus: usize,
}

/// Reads MemTotal from /proc/meminfo, in bytes.
pub fn read_total_memory(resolver: &Resolver) -> Result<u64, String> {
    let path = resolver.resolve("/proc/meminfo");
    let content = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    for line in content.lines() {
        if let Some(value) = line.strip_prefix("MemTotal:") {
            let kb: u64 = value
                .split_whitespace()
                .next()
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| format!("Invalid MemTotal line: {}", line))?;
            return Ok(kb * 1024);
        }
    }

    Err("MemTotal not found in /proc/meminfo".to_string())
}

/// Reads the boot time (seconds since epoch) from the `btime` line of /proc/stat.
pub fn read_boot_time(resolver: &Resolver) -> Result<u64, String> {
    let path = resolver.resolve("/proc/stat");
    let content = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    content
        .lines()
        .find_map(|line| line.strip_prefix("btime "))
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| "btime not found in /proc/stat".to_string())
}
