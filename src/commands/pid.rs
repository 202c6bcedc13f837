//! Pid command implementation.

use anyhow::Context;

use herakles_proc_sampler::Stats;

use super::RATE_SAMPLE_DELAY;

/// Samples one process twice and prints the second sample.
pub async fn command_pid(stats: &Stats, pid: i32) -> anyhow::Result<()> {
    stats
        .get_one(pid)
        .with_context(|| format!("Failed to sample process {pid}"))?;

    tokio::time::sleep(RATE_SAMPLE_DELAY).await;

    let state = stats
        .get_one(pid)
        .with_context(|| format!("Failed to sample process {pid}"))?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
