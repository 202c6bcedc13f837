//! `/proc` based process provider.
//!
//! Reads per-process data from `<root>/proc/<pid>/{stat,statm,status,cmdline,environ,cwd}`.
//! CPU times are converted from clock ticks to milliseconds so that the rate
//! engine can divide them by elapsed wall-clock milliseconds directly.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{CycleError, SampleError};
use crate::process::network::{read_network_counters, NetworkCounters};
use crate::process::provider::{NetworkProvider, ProcessProvider};
use crate::process::state::{
    CpuTicks, MemBytePct, PidState, ProcCpuInfo, ProcIdentity, ProcMemInfo, ProcStatus,
    ProcessSample,
};
use crate::resolve::Resolver;
use crate::system::{self, HostInfo, CLK_TCK, PAGE_SIZE};

/// Fields of `/proc/<pid>/stat` the sampler uses.
#[derive(Debug, Clone, PartialEq)]
pub struct StatFields {
    pub name: String,
    pub state: char,
    pub ppid: i32,
    pub pgrp: i32,
    pub utime: u64,
    pub stime: u64,
    pub starttime: u64,
}

/// Parses `/proc/<pid>/stat`. The command name may contain spaces and
/// parentheses, so it is delimited by the first `(` and the last `)`.
pub fn parse_stat(content: &str) -> Option<StatFields> {
    let open = content.find('(')?;
    let close = content.rfind(')')?;
    if close < open {
        return None;
    }
    let name = content[open + 1..close].to_string();

    // rest[0] is field 3 (state); field N lives at rest[N - 3]
    let rest: Vec<&str> = content[close + 1..].split_whitespace().collect();
    if rest.len() <= 19 {
        return None;
    }

    Some(StatFields {
        name,
        state: rest[0].chars().next()?,
        ppid: rest[1].parse().ok()?,
        pgrp: rest[2].parse().ok()?,
        utime: rest[11].parse().ok()?,
        stime: rest[12].parse().ok()?,
        starttime: rest[19].parse().ok()?,
    })
}

/// Converts clock ticks to milliseconds.
pub fn ticks_to_millis(ticks: u64, clk_tck: u64) -> u64 {
    ticks.saturating_mul(1000) / clk_tck.max(1)
}

/// Parses `/proc/<pid>/statm` into (size, resident, shared) bytes.
pub fn parse_statm(content: &str, page_size: u64) -> Option<(u64, u64, u64)> {
    let mut parts = content.split_whitespace();
    let size: u64 = parts.next()?.parse().ok()?;
    let resident: u64 = parts.next()?.parse().ok()?;
    let shared: u64 = parts.next()?.parse().ok()?;
    Some((
        size.saturating_mul(page_size),
        resident.saturating_mul(page_size),
        shared.saturating_mul(page_size),
    ))
}

/// Real uid from the `Uid:` line of `/proc/<pid>/status`.
pub fn parse_status_uid(content: &str) -> Option<u32> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("Uid:"))
        .and_then(|v| v.split_whitespace().next())
        .and_then(|v| v.parse().ok())
}

/// Splits a NUL-separated buffer, dropping the trailing empty element.
fn split_nul(content: &[u8]) -> impl Iterator<Item = String> + '_ {
    content
        .split(|&b| b == 0u8)
        .filter(|s| !s.is_empty())
        .map(|s| String::from_utf8_lossy(s).into_owned())
}

/// Parses `/proc/<pid>/environ` into a map.
pub fn parse_environ(content: &[u8]) -> BTreeMap<String, String> {
    split_nul(content)
        .filter_map(|kv| {
            let (k, v) = kv.split_once('=')?;
            Some((k.to_string(), v.to_string()))
        })
        .collect()
}

fn lookup_username(uid: u32) -> Option<String> {
    match nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid)) {
        Ok(Some(user)) => Some(user.name),
        Ok(None) => Some(uid.to_string()),
        Err(e) => {
            debug!("Failed to look up user for uid {}: {}", uid, e);
            Some(uid.to_string())
        }
    }
}

/// Reads the scheduler state of a single pid.
pub fn pid_state(resolver: &Resolver, pid: i32) -> Result<PidState, SampleError> {
    let content = fs::read_to_string(resolver.proc_dir(pid).join("stat"))
        .map_err(|e| SampleError::from_io(pid, e))?;
    let stat = parse_stat(&content).ok_or(SampleError::Parse { pid, what: "stat" })?;
    Ok(PidState::from_proc_char(stat.state))
}

/// Process provider backed by a (possibly relocated) `/proc` tree.
pub struct ProcFs {
    resolver: Resolver,
    clk_tck: u64,
    page_size: u64,
    boot_time: Option<u64>,
}

impl ProcFs {
    pub fn new(resolver: Resolver) -> Self {
        let boot_time = match system::read_boot_time(&resolver) {
            Ok(t) => Some(t),
            Err(e) => {
                debug!("Boot time unavailable, process start times disabled: {}", e);
                None
            }
        };
        Self {
            resolver,
            clk_tck: *CLK_TCK,
            page_size: *PAGE_SIZE,
            boot_time,
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    fn read_stat(&self, pid: i32, proc_path: &Path) -> Result<StatFields, SampleError> {
        let content =
            fs::read_to_string(proc_path.join("stat")).map_err(|e| SampleError::from_io(pid, e))?;
        parse_stat(&content).ok_or(SampleError::Parse { pid, what: "stat" })
    }

    fn start_time(&self, starttime_ticks: u64) -> Option<DateTime<Utc>> {
        let boot = self.boot_time?;
        let millis = ticks_to_millis(starttime_ticks, self.clk_tck);
        let secs = boot as i64 + (millis / 1000) as i64;
        let nanos = ((millis % 1000) * 1_000_000) as u32;
        DateTime::from_timestamp(secs, nanos)
    }
}

impl ProcessProvider for ProcFs {
    fn pids(&self) -> Result<Vec<i32>, CycleError> {
        let root = self.resolver.resolve("/proc");
        let entries = fs::read_dir(&root).map_err(|source| CycleError::Enumeration {
            path: root.clone(),
            source,
        })?;

        let mut out = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !name.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            if let Ok(pid) = name.parse::<i32>() {
                out.push(pid);
            }
        }
        Ok(out)
    }

    fn status(&self, pid: i32) -> Result<ProcStatus, SampleError> {
        let stat = self.read_stat(pid, &self.resolver.proc_dir(pid))?;
        Ok(ProcStatus {
            pid,
            ppid: Some(stat.ppid),
            pgid: Some(stat.pgrp),
            name: stat.name,
            state: PidState::from_proc_char(stat.state),
            start_ticks: Some(stat.starttime),
        })
    }

    fn sample(&self, pid: i32) -> Result<ProcessSample, SampleError> {
        let proc_path = self.resolver.proc_dir(pid);
        let sample_time = Utc::now();
        let stat = self.read_stat(pid, &proc_path)?;

        let statm = fs::read_to_string(proc_path.join("statm"))
            .map_err(|e| SampleError::from_io(pid, e))?;
        let (size, rss, share) =
            parse_statm(&statm, self.page_size).ok_or(SampleError::Parse { pid, what: "statm" })?;

        let user = ticks_to_millis(stat.utime, self.clk_tck);
        let system = ticks_to_millis(stat.stime, self.clk_tck);

        Ok(ProcessSample {
            cpu: ProcCpuInfo {
                user: CpuTicks::with_ticks(user),
                system: CpuTicks::with_ticks(system),
                total: CpuTicks::with_ticks(user + system),
                start_time: self.start_time(stat.starttime),
            },
            memory: ProcMemInfo {
                size: Some(size),
                rss: MemBytePct {
                    bytes: Some(rss),
                    pct: None,
                },
                share: Some(share),
            },
            sample_time,
        })
    }

    fn identity(&self, pid: i32) -> Result<ProcIdentity, SampleError> {
        let proc_path = self.resolver.proc_dir(pid);

        // cmdline is world-readable; failure here means the process is gone
        let cmdline_raw =
            fs::read(proc_path.join("cmdline")).map_err(|e| SampleError::from_io(pid, e))?;
        let args: Vec<String> = split_nul(&cmdline_raw).collect();
        let cmdline = if args.is_empty() {
            None
        } else {
            Some(args.join(" "))
        };

        let username = fs::read_to_string(proc_path.join("status"))
            .ok()
            .and_then(|s| parse_status_uid(&s))
            .and_then(lookup_username);

        let cwd = match fs::read_link(proc_path.join("cwd")) {
            Ok(p) => Some(p.to_string_lossy().into_owned()),
            Err(e) => {
                debug!("Cannot read cwd of pid {}: {}", pid, e);
                None
            }
        };

        let env = match fs::read(proc_path.join("environ")) {
            Ok(raw) => Some(parse_environ(&raw)),
            Err(e) => {
                debug!("Cannot read environment of pid {}: {}", pid, e);
                None
            }
        };

        Ok(ProcIdentity {
            username,
            cwd,
            args,
            cmdline,
            env,
        })
    }

    fn host(&self) -> HostInfo {
        let total_memory_bytes = match system::read_total_memory(&self.resolver) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!("Total memory unavailable: {}", e);
                None
            }
        };
        HostInfo {
            total_memory_bytes,
            num_cpus: system::num_cpus(),
        }
    }
}

impl NetworkProvider for ProcFs {
    fn network(&self, pid: i32) -> Result<NetworkCounters, SampleError> {
        read_network_counters(&self.resolver.proc_dir(pid)).map_err(|e| SampleError::from_io(pid, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const STAT: &str = "1234 (my (weird) proc) S 1 1234 1234 0 -1 4194304 100 0 0 0 1000 500 0 0 20 0 1 0 12345 12345678 1234 18446744073709551615 4194304 4238788 140736466511168 0 0 0 0 0 0 0 0 0 17 1 0 0 0 0 0";

    fn fake_proc(root: &Path, pid: i32) -> std::path::PathBuf {
        let dir = root.join("proc").join(pid.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("stat"), STAT).unwrap();
        fs::write(dir.join("statm"), "1000 200 50 10 0 300 0\n").unwrap();
        fs::write(dir.join("status"), "Name:\tproc\nUid:\t0\t0\t0\t0\n").unwrap();
        fs::write(dir.join("cmdline"), b"/usr/bin/proc\0--flag\0value\0").unwrap();
        fs::write(dir.join("environ"), b"PATH=/bin\0HOME=/root\0EMPTY=\0").unwrap();
        fs::write(
            root.join("proc/meminfo"),
            "MemTotal:       1000 kB\nMemFree:         10 kB\n",
        )
        .unwrap();
        fs::write(root.join("proc/stat"), "cpu 1 2 3 4\nbtime 1700000000\n").unwrap();
        fs::create_dir_all(root.join("proc/self")).unwrap();
        dir
    }

    #[test]
    fn test_parse_stat_with_parenthesized_name() {
        let stat = parse_stat(STAT).unwrap();
        assert_eq!(stat.name, "my (weird) proc");
        assert_eq!(stat.state, 'S');
        assert_eq!(stat.ppid, 1);
        assert_eq!(stat.pgrp, 1234);
        assert_eq!(stat.utime, 1000);
        assert_eq!(stat.stime, 500);
        assert_eq!(stat.starttime, 12345);
    }

    #[test]
    fn test_parse_stat_invalid() {
        assert!(parse_stat("1234 (test) S 1 2 3").is_none());
        assert!(parse_stat("garbage").is_none());
    }

    #[test]
    fn test_ticks_to_millis() {
        assert_eq!(ticks_to_millis(1500, 100), 15000);
        assert_eq!(ticks_to_millis(1, 100), 10);
        assert_eq!(ticks_to_millis(7, 0), 7000);
    }

    #[test]
    fn test_parse_statm() {
        assert_eq!(
            parse_statm("1000 200 50 10 0 300 0", 4096),
            Some((1000 * 4096, 200 * 4096, 50 * 4096))
        );
        assert_eq!(parse_statm("12", 4096), None);
        // Corrupt page counts saturate instead of overflowing
        assert_eq!(
            parse_statm("18446744073709551615 1 1", 4096),
            Some((u64::MAX, 4096, 4096))
        );
    }

    #[test]
    fn test_parse_environ() {
        let env = parse_environ(b"A=1\0B=x=y\0NOEQUALS\0\0");
        assert_eq!(env.len(), 2);
        assert_eq!(env["A"], "1");
        assert_eq!(env["B"], "x=y");
    }

    #[test]
    fn test_provider_reads_fake_proc() {
        let dir = tempdir().expect("Failed to create temp dir");
        fake_proc(dir.path(), 1234);
        fs::create_dir_all(dir.path().join("proc/sys")).unwrap();

        let procfs = ProcFs::new(Resolver::new(dir.path()));

        let pids = procfs.pids().unwrap();
        assert_eq!(pids, vec![1234]);

        let status = procfs.status(1234).unwrap();
        assert_eq!(status.name, "my (weird) proc");
        assert_eq!(status.state, PidState::Sleeping);
        assert_eq!(status.ppid, Some(1));
        assert_eq!(status.start_ticks, Some(12345));

        let sample = procfs.sample(1234).unwrap();
        let clk = *CLK_TCK;
        assert_eq!(sample.cpu.user.ticks, Some(ticks_to_millis(1000, clk)));
        assert_eq!(
            sample.cpu.total.ticks,
            Some(ticks_to_millis(1000, clk) + ticks_to_millis(500, clk))
        );
        assert_eq!(sample.memory.rss.bytes, Some(200 * *PAGE_SIZE));
        assert_eq!(sample.memory.share, Some(50 * *PAGE_SIZE));
        assert!(sample.cpu.start_time.is_some());

        let identity = procfs.identity(1234).unwrap();
        assert_eq!(identity.args, vec!["/usr/bin/proc", "--flag", "value"]);
        assert_eq!(identity.cmdline.as_deref(), Some("/usr/bin/proc --flag value"));
        assert_eq!(identity.env.as_ref().unwrap()["HOME"], "/root");
        assert!(identity.username.is_some());

        let host = procfs.host();
        assert_eq!(host.total_memory_bytes, Some(1000 * 1024));
        assert!(host.num_cpus >= 1);

        assert_eq!(
            pid_state(&Resolver::new(dir.path()), 1234).unwrap(),
            PidState::Sleeping
        );
    }

    #[test]
    fn test_provider_missing_pid_is_not_found() {
        let dir = tempdir().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("proc")).unwrap();
        let procfs = ProcFs::new(Resolver::new(dir.path()));

        assert!(matches!(procfs.status(42), Err(SampleError::NotFound(42))));
        assert!(matches!(procfs.sample(42), Err(SampleError::NotFound(42))));
        assert!(matches!(procfs.identity(42), Err(SampleError::NotFound(42))));
    }

    #[test]
    fn test_enumeration_failure_is_cycle_error() {
        let dir = tempdir().expect("Failed to create temp dir");
        let procfs = ProcFs::new(Resolver::new(dir.path().join("does-not-exist")));
        assert!(matches!(
            procfs.pids(),
            Err(CycleError::Enumeration { .. })
        ));
    }
}
