//! Downscale advisor (C8): a safe-downscale shape proposal, computed
//! unconditionally for every database whose display snapshot is fully
//! healthy. Execution is out of scope — this only
//! recommends.

use serde::Serialize;

use crate::pricing::UnitPrice;
use crate::types::{MetricsWindow, OkFlags};

const MEMORY_BUCKETS: [f64; 3] = [100.0, 500.0, 1024.0];
const MEMORY_MULTIPLE: f64 = 1024.0;
const THROUGHPUT_BUCKETS: [f64; 3] = [100.0, 500.0, 1000.0];
const THROUGHPUT_MULTIPLE: f64 = 1000.0;

/// The raw proposed shape, before a price lookup (which needs region/cloud
/// context the advisor itself doesn't have).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownscaleProposal {
    pub memory_mib: u64,
    pub throughput_ops: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownscaleRecommendation {
    pub downscale_memory_mb: u64,
    pub downscale_throughput_ops: u64,
    pub downscale_price_suggestion: Option<UnitPrice>,
}

/// Buckets `used` to the smallest of `small_buckets` that keeps
/// `used / bucket < 0.8`, else the next multiple of `multiple` at or above
/// `used / 0.8`; if that bucket still yields `used / bucket >= 0.8`, the
/// bucket is promoted once.
fn nice_step(used: f64, small_buckets: [f64; 3], multiple: f64) -> f64 {
    let headroom_target = used / 0.8;

    let mut bucket = small_buckets
        .into_iter()
        .find(|&b| b >= headroom_target)
        .unwrap_or_else(|| (headroom_target / multiple).ceil().max(1.0) * multiple);

    if used / bucket >= 0.8 {
        bucket = promote(bucket, small_buckets, multiple);
    }

    bucket
}

fn promote(bucket: f64, small_buckets: [f64; 3], multiple: f64) -> f64 {
    if bucket == small_buckets[0] {
        small_buckets[1]
    } else if bucket == small_buckets[1] {
        small_buckets[2]
    } else if bucket == small_buckets[2] {
        small_buckets[2] + multiple
    } else {
        bucket + multiple
    }
}

/// `nice_memory_step(used_bytes)`: returns MiB.
pub fn nice_memory_step(used_bytes: f64) -> u64 {
    let used_mib = (used_bytes / (1024.0 * 1024.0)).max(0.0);
    if used_mib == 0.0 {
        return MEMORY_BUCKETS[0] as u64;
    }
    nice_step(used_mib, MEMORY_BUCKETS, MEMORY_MULTIPLE).round() as u64
}

/// `nice_throughput_step(used_ops)`: returns ops/sec.
pub fn nice_throughput_step(used_ops: f64) -> u64 {
    let used_ops = used_ops.max(0.0);
    if used_ops == 0.0 {
        return THROUGHPUT_BUCKETS[0] as u64;
    }
    nice_step(used_ops, THROUGHPUT_BUCKETS, THROUGHPUT_MULTIPLE).round() as u64
}

/// Computed for every database whose display snapshot is fully healthy
/// (all five ok-flags true); `None` when either dimension's metric is
/// absent.
pub fn propose_downscale(display: &MetricsWindow, ok: &OkFlags) -> Option<DownscaleProposal> {
    if !ok.all_ok() {
        return None;
    }
    let used_memory_bytes = display.used_memory_bytes?;
    let used_throughput_ops = display.throughput_ops?;

    Some(DownscaleProposal {
        memory_mib: nice_memory_step(used_memory_bytes),
        throughput_ops: nice_throughput_step(used_throughput_ops),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nice_memory_step_keeps_utilization_under_80_percent() {
        for used_mb in [1.0, 50.0, 99.0, 400.0, 900.0, 1000.0, 3000.0, 10_000.0] {
            let used_bytes = used_mb * 1024.0 * 1024.0;
            let step = nice_memory_step(used_bytes);
            assert!(
                used_mb / step as f64 < 0.8,
                "used={used_mb} step={step} ratio={}",
                used_mb / step as f64
            );
        }
    }

    #[test]
    fn nice_throughput_step_keeps_utilization_under_80_percent() {
        for used in [1.0, 50.0, 99.0, 400.0, 900.0, 1000.0, 3000.0, 10_000.0] {
            let step = nice_throughput_step(used);
            assert!(used / step as f64 < 0.8, "used={used} step={step}");
        }
    }

    #[test]
    fn nice_memory_step_small_usage_buckets_to_100() {
        assert_eq!(nice_memory_step(50.0 * 1024.0 * 1024.0), 100);
    }

    #[test]
    fn propose_downscale_none_when_not_all_ok() {
        let window = MetricsWindow {
            used_memory_bytes: Some(1.0),
            throughput_ops: Some(1.0),
            ..Default::default()
        };
        let ok = OkFlags {
            throughput_ok: false,
            memory_ok: true,
            cpu_ok: true,
            latency_ok: true,
            payload_size_ok: true,
        };
        assert!(propose_downscale(&window, &ok).is_none());
    }

    #[test]
    fn propose_downscale_matches_scenario_6() {
        let window = MetricsWindow {
            used_memory_bytes: Some(600.0 * 1024.0 * 1024.0),
            throughput_ops: Some(400.0),
            ..Default::default()
        };
        let ok = OkFlags {
            throughput_ok: true,
            memory_ok: true,
            cpu_ok: true,
            latency_ok: true,
            payload_size_ok: true,
        };
        let proposal = propose_downscale(&window, &ok).unwrap();
        assert_eq!(proposal.memory_mib, 1024);
        assert_eq!(proposal.throughput_ops, 1000);
    }
}
