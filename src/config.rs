//! Configuration for the process sampler.
//!
//! This module handles loading and validating the sampler configuration from
//! YAML, JSON or TOML files. CLI overrides are merged by the binary.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ConfigError;
use crate::process::matcher::Matcher;
use crate::process::top::IncludeTopConfig;

// Default configuration constants
pub const DEFAULT_INTERVAL_SECONDS: u64 = 10;
pub const DEFAULT_HOSTFS: &str = "/";

/// Default config file locations, tried in order.
pub const DEFAULT_CONFIG_PATHS: [&str; 5] = [
    "/etc/herakles/proc-sampler.yaml",
    "/etc/herakles/proc-sampler.yml",
    "/etc/herakles/proc-sampler.json",
    "./herakles-proc-sampler.yaml",
    "./herakles-proc-sampler.json",
];

/// Cgroup reader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CgroupConfig {
    /// Report nothing for processes living only in root cgroups (default: true)
    #[serde(default = "default_true", alias = "ignore-root-cgroups")]
    pub ignore_root_cgroups: bool,
}

impl Default for CgroupConfig {
    fn default() -> Self {
        Self {
            ignore_root_cgroups: true,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_procs() -> Vec<String> {
    vec![".*".to_string()]
}
fn default_interval_seconds() -> u64 {
    DEFAULT_INTERVAL_SECONDS
}
fn default_hostfs() -> PathBuf {
    PathBuf::from(DEFAULT_HOSTFS)
}

/// Sampler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Regex patterns for process names to sample
    #[serde(default = "default_procs")]
    pub procs: Vec<String>,

    /// Regex patterns for environment variable names to capture
    #[serde(default, alias = "env-whitelist")]
    pub env_whitelist: Vec<String>,

    /// Fetch command line and environment only once per process
    #[serde(default = "default_true", alias = "cache-cmdline")]
    pub cache_cmdline: bool,

    /// Include raw CPU tick counts in reported states
    #[serde(default, alias = "cpu-ticks")]
    pub cpu_ticks: bool,

    #[serde(default, alias = "enable-network")]
    pub enable_network: bool,

    /// Regex patterns for network counter names; unset keeps all counters
    #[serde(default, alias = "network-metrics")]
    pub network_metrics: Option<Vec<String>>,

    #[serde(default, alias = "enable-cgroups")]
    pub enable_cgroups: bool,

    /// Root under which /proc is inspected (for containerized deployments)
    #[serde(default = "default_hostfs")]
    pub hostfs: PathBuf,

    /// Seconds between sampling cycles in `run` mode
    #[serde(default = "default_interval_seconds", alias = "interval-seconds")]
    pub interval_seconds: u64,

    #[serde(default, alias = "log-level")]
    pub log_level: Option<String>,

    // Nested tables stay last so the TOML serializer can emit them.
    #[serde(default, alias = "include-top")]
    pub include_top: IncludeTopConfig,

    #[serde(default)]
    pub cgroups: CgroupConfig,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            procs: default_procs(),
            env_whitelist: Vec::new(),
            cache_cmdline: true,
            cpu_ticks: false,
            include_top: IncludeTopConfig::default(),
            enable_network: false,
            network_metrics: None,
            enable_cgroups: false,
            cgroups: CgroupConfig::default(),
            hostfs: default_hostfs(),
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            log_level: Some("info".into()),
        }
    }
}

impl SamplerConfig {
    /// Validates the configuration (used by --check-config and at startup).
    /// The engine itself only compiles the pattern lists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Matcher::new("procs", &self.procs)?;
        Matcher::new("env_whitelist", &self.env_whitelist)?;
        if let Some(metrics) = &self.network_metrics {
            Matcher::new("network_metrics", metrics)?;
        }

        if self.interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "interval_seconds",
                reason: "must be greater than zero".into(),
            });
        }

        if self.include_top.enabled && self.include_top.by_cpu == 0 && self.include_top.by_memory == 0
        {
            info!("include_top is enabled without by_cpu/by_memory limits; all processes are reported");
        }

        Ok(())
    }
}

/// Parses configuration content, choosing the format by file extension.
pub fn parse_config(path: &Path, content: &str) -> Result<SamplerConfig, ConfigError> {
    let parse_err = |reason: String| ConfigError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        Some("toml") => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
        // Default to YAML
        _ => serde_yaml::from_str(content).map_err(|e| parse_err(e.to_string())),
    }
}

/// Loads configuration from `path`, or from the first existing default
/// location. Falls back to defaults when no file is found.
pub fn load_config(path: Option<&Path>) -> Result<SamplerConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match DEFAULT_CONFIG_PATHS.iter().find(|p| Path::new(p).exists()) {
            Some(p) => PathBuf::from(p),
            None => return Ok(SamplerConfig::default()),
        },
    };

    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let config = parse_config(&path, &content)?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}
