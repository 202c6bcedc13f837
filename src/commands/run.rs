//! Run command implementation.
//!
//! Samples on a fixed interval until Ctrl-C, writing one JSON object per
//! selected process per cycle to stdout.

use anyhow::Context;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use herakles_proc_sampler::{ProcState, Stats};

fn write_cycle(states: &[ProcState]) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for state in states {
        serde_json::to_writer(&mut out, state).context("Failed to serialize process state")?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Runs the sampling loop.
pub async fn command_run(stats: Arc<Stats>, period: Duration) -> anyhow::Result<()> {
    info!("Starting sampling loop every {}s", period.as_secs());

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let stats = Arc::clone(&stats);
                let result = tokio::task::spawn_blocking(move || stats.get())
                    .await
                    .context("Sampling task panicked")?;

                match result {
                    Ok(states) => write_cycle(&states)?,
                    Err(e) => error!("Sampling cycle failed: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, shutting down");
                break;
            }
        }
    }

    let snap = stats.cycle_stats().snapshot();
    info!(
        "Sampled {} cycles ({} failed), {} process reports, avg cycle {:.2}ms",
        snap.cycles_total,
        snap.cycle_failures,
        snap.processes_reported,
        snap.cycle_duration_ms.avg()
    );

    Ok(())
}
