//! Cgroup membership of a process.
//!
//! Only the membership listed in `/proc/<pid>/cgroup` is read here; controller
//! accounting (memory.stat, cpu.stat, ...) is left to dedicated cgroup
//! tooling. The data is opaque to the rest of the sampler.

use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::SampleError;
use crate::process::provider::CgroupReader;
use crate::resolve::Resolver;

/// One line of `/proc/<pid>/cgroup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CgroupEntry {
    pub hierarchy_id: u32,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub controllers: Vec<String>,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CgroupInfo {
    pub entries: Vec<CgroupEntry>,
}

impl CgroupInfo {
    /// The unified (v2) path if present, else the first hierarchy's path.
    pub fn primary_path(&self) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.hierarchy_id == 0 && e.controllers.is_empty())
            .or_else(|| self.entries.first())
            .map(|e| e.path.as_str())
    }

    /// True when every hierarchy places the process in the root cgroup.
    pub fn is_root_only(&self) -> bool {
        self.entries.iter().all(|e| e.path == "/")
    }
}

/// Options for reading cgroup membership.
#[derive(Debug, Clone)]
pub struct CgroupOptions {
    /// Root under which `/proc` is inspected.
    pub rootfs: Resolver,
    /// Report nothing for processes that only live in root cgroups.
    pub ignore_root_cgroups: bool,
}

impl Default for CgroupOptions {
    fn default() -> Self {
        Self {
            rootfs: Resolver::default(),
            ignore_root_cgroups: true,
        }
    }
}

/// Parses the content of `/proc/<pid>/cgroup`. Malformed lines are skipped.
pub fn parse_cgroup_file(content: &str) -> CgroupInfo {
    let entries = content
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, ':');
            let hierarchy_id = parts.next()?.parse().ok()?;
            let controllers = parts
                .next()?
                .split(',')
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
            let path = parts.next()?.to_string();
            Some(CgroupEntry {
                hierarchy_id,
                controllers,
                path,
            })
        })
        .collect();
    CgroupInfo { entries }
}

/// Reads cgroup membership from `/proc/<pid>/cgroup` under the configured root.
pub struct ProcCgroupReader {
    opts: CgroupOptions,
}

impl ProcCgroupReader {
    pub fn new(opts: CgroupOptions) -> Self {
        Self { opts }
    }
}

impl CgroupReader for ProcCgroupReader {
    fn read(&self, pid: i32) -> Result<Option<CgroupInfo>, SampleError> {
        let path = self.opts.rootfs.proc_dir(pid).join("cgroup");
        let content = fs::read_to_string(path).map_err(|e| SampleError::from_io(pid, e))?;
        let info = parse_cgroup_file(&content);

        if info.entries.is_empty() || (self.opts.ignore_root_cgroups && info.is_root_only()) {
            return Ok(None);
        }
        Ok(Some(info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const V1: &str = "\
12:memory:/docker/abc123
11:cpu,cpuacct:/docker/abc123
1:name=systemd:/docker/abc123
0::/system.slice/docker.service
";

    #[test]
    fn test_parse_cgroup_file() {
        let info = parse_cgroup_file(V1);
        assert_eq!(info.entries.len(), 4);
        assert_eq!(info.entries[1].controllers, vec!["cpu", "cpuacct"]);
        assert_eq!(info.entries[0].path, "/docker/abc123");
        assert_eq!(info.primary_path(), Some("/system.slice/docker.service"));
        assert!(!info.is_root_only());
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let info = parse_cgroup_file("garbage\nx:y:z\n0::/\n");
        assert_eq!(info.entries.len(), 1);
        assert!(info.is_root_only());
    }

    fn write_cgroup(root: &std::path::Path, pid: i32, content: &str) {
        let dir = root.join("proc").join(pid.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("cgroup"), content).unwrap();
    }

    #[test]
    fn test_reader_ignores_root_cgroup() {
        let dir = tempdir().expect("Failed to create temp dir");
        write_cgroup(dir.path(), 1, "0::/\n");
        write_cgroup(dir.path(), 2, V1);

        let reader = ProcCgroupReader::new(CgroupOptions {
            rootfs: Resolver::new(dir.path()),
            ignore_root_cgroups: true,
        });
        assert_eq!(reader.read(1).unwrap(), None);
        assert_eq!(reader.read(2).unwrap().unwrap().entries.len(), 4);

        let keep_root = ProcCgroupReader::new(CgroupOptions {
            rootfs: Resolver::new(dir.path()),
            ignore_root_cgroups: false,
        });
        assert!(keep_root.read(1).unwrap().is_some());
    }

    #[test]
    fn test_reader_missing_process() {
        let dir = tempdir().expect("Failed to create temp dir");
        let reader = ProcCgroupReader::new(CgroupOptions {
            rootfs: Resolver::new(dir.path()),
            ignore_root_cgroups: true,
        });
        assert!(matches!(reader.read(99), Err(SampleError::NotFound(99))));
    }
}
