//! List command implementation.

use anyhow::Context;

use herakles_proc_sampler::Stats;

/// Prints pid and run state of every matching process.
pub fn command_list(stats: &Stats) -> anyhow::Result<()> {
    let entries = stats.list_states().context("Failed to list processes")?;

    println!("{:>8}  STATE", "PID");
    for entry in &entries {
        println!("{:>8}  {}", entry.pid, entry.state);
    }
    println!("\n{} processes", entries.len());
    Ok(())
}
