//! Herakles Process Sampler Library
//!
//! Periodically samples per-process CPU and memory counters, turns successive
//! samples into CPU percentages and memory shares, and reports the processes
//! that pass name filters and optional top-N selection.
//!
//! # Features
//!
//! - **Name Filtering**: Regex lists select which processes are sampled
//! - **Rate Computation**: CPU percentages from tick deltas, normalized by CPU count
//! - **Top-N Selection**: Keep only the heaviest processes by CPU and/or memory
//! - **Field Filtering**: Environment variables and network counters are whitelisted
//! - **Thread-Safe Registry**: Concurrent sampling of the same pid never interleaves
//!
//! # Usage
//!
//! ```no_run
//! use herakles_proc_sampler::{SamplerConfig, Stats};
//!
//! let config = SamplerConfig {
//!     procs: vec!["^nginx".to_string()],
//!     ..SamplerConfig::default()
//! };
//! let stats = Stats::new(&config).expect("invalid configuration");
//!
//! // The first cycle only records baselines; percentages appear from the second.
//! let _ = stats.get();
//! std::thread::sleep(std::time::Duration::from_secs(1));
//!
//! for proc in stats.get().expect("cannot enumerate processes") {
//!     println!("{} {:?}", proc.status.name, proc.cpu.total.pct);
//! }
//! ```

pub mod config;
pub mod cycle_stats;
pub mod error;
pub mod process;
pub mod resolve;
pub mod system;

// Re-export main types for convenience
pub use config::{load_config, parse_config, CgroupConfig, SamplerConfig};
pub use cycle_stats::{CycleStats, CycleStatsSnapshot};
pub use error::{ConfigError, CycleError, SampleError};
pub use process::{IncludeTopConfig, ProcListEntry, ProcState, Stats};
pub use resolve::Resolver;
pub use system::HostInfo;
