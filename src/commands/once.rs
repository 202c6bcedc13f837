//! Once command implementation.

use anyhow::Context;
use tracing::debug;

use herakles_proc_sampler::Stats;

use super::RATE_SAMPLE_DELAY;

/// Samples twice so rates are available and prints the second cycle as a
/// JSON array.
pub async fn command_once(stats: &Stats, pretty: bool) -> anyhow::Result<()> {
    let baseline = stats.get().context("Failed to sample processes")?;
    debug!("Baseline cycle recorded {} processes", baseline.len());

    tokio::time::sleep(RATE_SAMPLE_DELAY).await;

    let states = stats.get().context("Failed to sample processes")?;
    let output = if pretty {
        serde_json::to_string_pretty(&states)?
    } else {
        serde_json::to_string(&states)?
    };
    println!("{output}");
    Ok(())
}
