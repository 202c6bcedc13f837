//! Host filesystem path resolution.
//!
//! When the sampler runs in a container the host's `/proc` and `/sys` are
//! usually bind-mounted somewhere else (e.g. `/hostfs/proc`). The `Resolver`
//! maps a logical inspection path onto that alternate root.

use std::path::{Path, PathBuf};

/// Maps logical paths like `/proc` under a configurable root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolver {
    root: PathBuf,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Resolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The configured root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True when a non-`/` root is in effect.
    pub fn is_set(&self) -> bool {
        self.root != Path::new("/")
    }

    /// Resolves an absolute logical path under the root.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        let relative = path.strip_prefix("/").unwrap_or(path);
        self.root.join(relative)
    }

    /// Shortcut for `/proc/<pid>` under the root.
    pub fn proc_dir(&self, pid: i32) -> PathBuf {
        self.resolve("/proc").join(pid.to_string())
    }
}
