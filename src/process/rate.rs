//! CPU and memory percentage computation.
//!
//! CPU ticks are expressed in milliseconds of consumed CPU time, so the ratio
//! of a tick delta to the elapsed wall-clock milliseconds is directly the
//! share of one logical core (1.0 == one core fully busy).

use crate::process::state::{CpuTicks, ProcCpuInfo, ProcessSample};

/// Rounds to four decimal places.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Elapsed wall-clock milliseconds from `prev` to `curr`, or `None` when the
/// clock did not move forward.
fn elapsed_millis(prev: &ProcessSample, curr: &ProcessSample) -> Option<f64> {
    let micros = (curr.sample_time - prev.sample_time).num_microseconds()?;
    if micros <= 0 {
        return None;
    }
    Some(micros as f64 / 1000.0)
}

fn tick_pct(prev: Option<u64>, curr: Option<u64>, elapsed_ms: f64, num_cpus: usize) -> CpuTicks {
    let (Some(prev), Some(curr)) = (prev, curr) else {
        return CpuTicks {
            ticks: curr,
            ..CpuTicks::default()
        };
    };

    // Counter went backwards (wrap or unnoticed pid reuse): report idle.
    let delta = curr.saturating_sub(prev);
    let pct = delta as f64 / elapsed_ms;
    let norm_pct = pct / num_cpus.max(1) as f64;

    CpuTicks {
        ticks: Some(curr),
        pct: Some(round4(pct)),
        norm_pct: Some(round4(norm_pct)),
    }
}

/// Computes user, system and total CPU percentages of `curr` against `prev`.
///
/// Returns `curr`'s CPU info unchanged (no percentages) when elapsed time is
/// zero or negative.
pub fn cpu_percentage(prev: &ProcessSample, curr: &ProcessSample, num_cpus: usize) -> ProcCpuInfo {
    let Some(elapsed_ms) = elapsed_millis(prev, curr) else {
        return curr.cpu;
    };

    ProcCpuInfo {
        user: tick_pct(prev.cpu.user.ticks, curr.cpu.user.ticks, elapsed_ms, num_cpus),
        system: tick_pct(prev.cpu.system.ticks, curr.cpu.system.ticks, elapsed_ms, num_cpus),
        total: tick_pct(prev.cpu.total.ticks, curr.cpu.total.ticks, elapsed_ms, num_cpus),
        start_time: curr.cpu.start_time,
    }
}

/// Resident memory as a fraction of total physical memory.
pub fn memory_percentage(rss_bytes: Option<u64>, total_memory_bytes: Option<u64>) -> Option<f64> {
    let rss = rss_bytes?;
    match total_memory_bytes {
        Some(total) if total > 0 => Some(round4(rss as f64 / total as f64)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::state::ProcMemInfo;
    use chrono::{Duration, Utc};

    fn sample(user: u64, system: u64, total: u64, at: chrono::DateTime<Utc>) -> ProcessSample {
        ProcessSample {
            cpu: ProcCpuInfo {
                user: CpuTicks::with_ticks(user),
                system: CpuTicks::with_ticks(system),
                total: CpuTicks::with_ticks(total),
                start_time: None,
            },
            memory: ProcMemInfo::default(),
            sample_time: at,
        }
    }

    #[test]
    fn test_cpu_percentage_one_second() {
        let t0 = Utc::now();
        let p1 = sample(11345, 37, 11382, t0);
        let p2 = sample(14794, 47, 14841, t0 + Duration::seconds(1));

        let cpu = cpu_percentage(&p1, &p2, 48);
        assert_eq!(cpu.total.pct, Some(3.459));
        assert_eq!(cpu.total.norm_pct, Some(0.0721));
        assert_eq!(cpu.user.pct, Some(3.449));
        assert_eq!(cpu.system.pct, Some(0.01));
        assert_eq!(cpu.total.ticks, Some(14841));
    }

    #[test]
    fn test_cpu_percentage_normalization_by_core_count() {
        let t0 = Utc::now();
        let p1 = sample(0, 0, 0, t0);
        let p2 = sample(1000, 1000, 2000, t0 + Duration::seconds(1));

        let cpu = cpu_percentage(&p1, &p2, 4);
        assert_eq!(cpu.total.pct, Some(2.0));
        assert_eq!(cpu.total.norm_pct, Some(0.5));
    }

    #[test]
    fn test_cpu_percentage_zero_elapsed_is_absent() {
        let t0 = Utc::now();
        let p1 = sample(10, 10, 20, t0);
        let p2 = sample(20, 20, 40, t0);

        let cpu = cpu_percentage(&p1, &p2, 2);
        assert_eq!(cpu.total.pct, None);
        assert_eq!(cpu.total.norm_pct, None);
        assert_eq!(cpu.total.ticks, Some(40));
    }

    #[test]
    fn test_cpu_percentage_reversed_time_is_absent() {
        let t0 = Utc::now();
        let p1 = sample(10, 10, 20, t0);
        let p2 = sample(20, 20, 40, t0 - Duration::seconds(1));

        assert_eq!(cpu_percentage(&p1, &p2, 2).total.pct, None);
    }

    #[test]
    fn test_cpu_percentage_counter_decrease_clamps_to_zero() {
        let t0 = Utc::now();
        let p1 = sample(5000, 500, 5500, t0);
        let p2 = sample(100, 10, 110, t0 + Duration::seconds(2));

        let cpu = cpu_percentage(&p1, &p2, 2);
        assert_eq!(cpu.total.pct, Some(0.0));
        assert_eq!(cpu.total.norm_pct, Some(0.0));
        assert_eq!(cpu.user.pct, Some(0.0));
    }

    #[test]
    fn test_cpu_percentage_missing_ticks_stay_absent() {
        let t0 = Utc::now();
        let mut p1 = sample(10, 10, 20, t0);
        let mut p2 = sample(20, 20, 40, t0 + Duration::seconds(1));
        p1.cpu.system.ticks = None;
        p2.cpu.system.ticks = None;

        let cpu = cpu_percentage(&p1, &p2, 1);
        assert_eq!(cpu.system.pct, None);
        assert!(cpu.total.pct.is_some());
    }

    #[test]
    fn test_memory_percentage() {
        assert_eq!(memory_percentage(Some(1416), Some(10000)), Some(0.1416));
        assert_eq!(memory_percentage(Some(1416), Some(0)), None);
        assert_eq!(memory_percentage(Some(1416), None), None);
        assert_eq!(memory_percentage(None, Some(10000)), None);
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.0720625), 0.0721);
        assert_eq!(round4(1.0), 1.0);
    }
}
