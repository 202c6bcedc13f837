//! Check command implementation.
//!
//! Validates /proc access under the configured root and the configuration.

use herakles_proc_sampler::resolve::Resolver;
use herakles_proc_sampler::system::{num_cpus, read_total_memory};
use herakles_proc_sampler::{SamplerConfig, Stats};

/// Validates system requirements and configuration.
pub fn command_check(config: &SamplerConfig) -> anyhow::Result<()> {
    println!("🔍 Herakles Process Sampler - System Check");
    println!("===========================================");

    let mut all_ok = true;
    let resolver = Resolver::new(&config.hostfs);

    println!("\n⚙️  Checking configuration...");
    let stats = match Stats::new(config) {
        Ok(stats) => {
            println!("   ✅ Configuration is valid");
            Some(stats)
        }
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
            None
        }
    };

    println!("\n📁 Checking /proc filesystem...");
    let proc_root = resolver.resolve("/proc");
    if proc_root.exists() {
        println!("   ✅ {} accessible", proc_root.display());
    } else {
        println!("   ❌ {} not found", proc_root.display());
        all_ok = false;
    }

    match read_total_memory(&resolver) {
        Ok(total) => println!("   ✅ Total memory: {} MB", total / 1024 / 1024),
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }
    println!("   ✅ Logical CPUs: {}", num_cpus());

    if let Some(stats) = &stats {
        println!("\n🧪 Checking process sampling...");
        match stats.list_states() {
            Ok(entries) => println!("   ✅ Enumerated {} matching processes", entries.len()),
            Err(e) => {
                println!("   ❌ Cannot enumerate processes: {}", e);
                all_ok = false;
            }
        }

        // Our own pid is only visible when hostfs points at this host's /proc.
        if !resolver.is_set() {
            match stats.get_self() {
                Ok(state) => println!(
                    "   ✅ Sampled self: {} (PID: {}, state: {})",
                    state.status.name, state.status.pid, state.status.state
                ),
                Err(e) => {
                    println!("   ❌ Cannot sample own process: {}", e);
                    all_ok = false;
                }
            }
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}
