//! CLI arguments and subcommands for herakles-proc-sampler.
//!
//! This module defines the command-line interface structure using the clap library,
//! and merges CLI overrides on top of the loaded configuration file.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::Level;

use herakles_proc_sampler::{load_config, ConfigError, SamplerConfig};

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parses the `log_level` string of a config file.
    pub fn from_config(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }

    /// Tracing level, or `None` when logging is off.
    pub fn as_tracing_level(&self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-proc-sampler",
    about = "Per-process CPU and memory sampler",
    long_about = "Per-process CPU and memory sampler.\n\n\
                  Periodically samples processes matching configurable name patterns, \
                  computes CPU percentages from successive samples and optionally keeps \
                  only the top processes by CPU and memory.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version = "0.1.0",
    propagate_version = true,
    after_help = "Project: https://github.com/cansp-dev/herakles-proc-sampler — More info: https://www.herakles.now — Support: exporter@herakles.now"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level (overrides the config file)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Root under which /proc is read (e.g. /hostfs in a container)
    #[arg(long)]
    pub hostfs: Option<PathBuf>,

    /// Process name patterns to sample (comma-separated regexes)
    #[arg(long)]
    pub procs: Option<String>,

    /// Keep only the top N processes by CPU (enables top-N selection)
    #[arg(long)]
    pub top_cpu: Option<usize>,

    /// Keep only the top N processes by resident memory (enables top-N selection)
    #[arg(long)]
    pub top_memory: Option<usize>,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample continuously, printing one JSON line per process per cycle
    Run {
        /// Seconds between cycles (overrides config)
        #[arg(short = 'i', long)]
        interval: Option<u64>,
    },

    /// Sample twice one second apart and print the second cycle
    Once {
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Sample a single process
    Pid {
        /// Process id to sample
        pid: i32,
    },

    /// List matching processes with their run state
    List,

    /// Validate /proc access and configuration
    Check,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Resolves the effective configuration: CLI > config file > defaults.
pub fn resolve_config(args: &Args) -> Result<SamplerConfig, ConfigError> {
    let mut config = if args.no_config {
        SamplerConfig::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(hostfs) = &args.hostfs {
        config.hostfs = hostfs.clone();
    }

    if let Some(procs) = &args.procs {
        config.procs = split_list(procs);
    }

    if args.top_cpu.is_some() || args.top_memory.is_some() {
        config.include_top.enabled = true;
        if let Some(n) = args.top_cpu {
            config.include_top.by_cpu = n;
        }
        if let Some(n) = args.top_memory {
            config.include_top.by_memory = n;
        }
    }

    if let Some(Commands::Run {
        interval: Some(interval),
    }) = &args.command
    {
        config.interval_seconds = *interval;
    }

    Ok(config)
}

/// Effective log level: CLI > config file > info.
pub fn resolve_log_level(args: &Args, config: &SamplerConfig) -> LogLevel {
    args.log_level
        .or_else(|| config.log_level.as_deref().and_then(LogLevel::from_config))
        .unwrap_or(LogLevel::Info)
}

/// Prints the effective configuration in the requested format.
pub fn show_config(config: &SamplerConfig, format: ConfigFormat) -> anyhow::Result<()> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    println!("{output}");
    Ok(())
}
