//! Decision engine (C5): given a metrics snapshot, thresholds, and a
//! database's max-scale envelope, decides whether scaling is needed and
//! computes the target shape.

use crate::types::{Envelope, MetricsWindow, PartialShape, Shape, Thresholds, ThroughputMeasurement};

/// Per-dimension scale-up need, computed against the autoscale window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScalingNeed {
    pub memory: bool,
    pub throughput: bool,
}

impl ScalingNeed {
    pub fn any(&self) -> bool {
        self.memory || self.throughput
    }
}

/// Whether the autoscale window's usage crosses the configured threshold
/// and the database still has headroom under its envelope. Mirrors
/// `is_autoscale_needed`: note this reads the *configured* thresholds,
/// unlike `compute_target` below which hardcodes 0.8 for both dimensions.
pub fn needs_scaling(window: &MetricsWindow, thresholds: &Thresholds, envelope: &Envelope) -> ScalingNeed {
    let mut need = ScalingNeed::default();

    if window.throughput_limit > 0 {
        if let Some(throughput) = window.throughput_ops {
            if throughput >= thresholds.throughput_threshold * window.throughput_limit as f64
                && (window.throughput_limit as u64) < envelope.max_throughput_ops
            {
                need.throughput = true;
            }
        }
    }

    if window.memory_limit_bytes > 0.0 {
        if let Some(memory) = window.used_memory_bytes {
            if memory >= thresholds.memory_threshold * window.memory_limit_bytes
                && (window.memory_limit_bytes / (1024.0 * 1024.0 * 1024.0)) < envelope.max_memory_gb
            {
                need.memory = true;
            }
        }
    }

    need
}

/// Scale up by at least `scaling_percentage`, capped at the envelope. The
/// 0.8 trigger here is a fixed constant independent of `Thresholds`: the
/// configured thresholds decide *whether* to scale, this constant decides
/// the sizing target once scaling is already underway.
const TARGET_MEMORY_TRIGGER: f64 = 0.8;
const TARGET_THROUGHPUT_TRIGGER: f64 = 0.8;

pub struct ScalingPercentages {
    pub memory_pct: f64,
    pub throughput_pct: f64,
}

/// Compute the partial shape update to send to the provider. Only
/// dimensions that need scaling are populated; an empty result means no
/// action should be taken even if `needs_scaling` flagged something (the
/// two functions use different trigger semantics by design).
pub fn compute_target(
    shape: &Shape,
    window: &MetricsWindow,
    envelope: &Envelope,
    pct: &ScalingPercentages,
) -> PartialShape {
    let mut result = PartialShape::default();

    let current_memory_gb = window.memory_limit_bytes / (1024.0 * 1024.0 * 1024.0);
    let used_memory_gb = window.used_memory_bytes.unwrap_or(0.0) / (1024.0 * 1024.0 * 1024.0);

    if used_memory_gb >= TARGET_MEMORY_TRIGGER * current_memory_gb && current_memory_gb < envelope.max_memory_gb {
        let scaling_factor = 1.0 + pct.memory_pct / 100.0;
        let min_increase = current_memory_gb * scaling_factor;
        let mut new_total_memory_gb = envelope.max_memory_gb.min(min_increase);
        new_total_memory_gb = round_to_tenth(new_total_memory_gb).max(0.1);

        let mut new_dataset_size_gb = if shape.replication {
            new_total_memory_gb / 2.0
        } else {
            new_total_memory_gb
        };
        new_dataset_size_gb = round_to_tenth(new_dataset_size_gb).max(0.1);

        result.dataset_size_in_gb = Some(new_dataset_size_gb);
    }

    let current_throughput = window.throughput_limit as f64;
    let used_throughput = window.throughput_ops.unwrap_or(0.0);

    if used_throughput >= TARGET_THROUGHPUT_TRIGGER * current_throughput
        && (window.throughput_limit as u64) < envelope.max_throughput_ops
    {
        let scaling_factor = 1.0 + pct.throughput_pct / 100.0;
        let usage_based = if used_throughput > 0.0 {
            (used_throughput * scaling_factor) as i64
        } else {
            0
        };
        let config_based = (current_throughput * scaling_factor) as i64;
        let mut new_throughput = usage_based.max(config_based);

        new_throughput = new_throughput.min(envelope.max_throughput_ops as i64);
        new_throughput = ((new_throughput as f64 / 100.0).round() * 100.0) as i64;

        result.throughput_measurement = Some(ThroughputMeasurement {
            by: "operations-per-second".to_string(),
            value: new_throughput.max(0) as u64,
        });
    }

    result
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(used_memory_gb: f64, memory_limit_gb: f64, throughput: f64, throughput_limit: u64) -> MetricsWindow {
        MetricsWindow {
            throughput_ops: Some(throughput),
            used_memory_bytes: Some(used_memory_gb * 1024.0 * 1024.0 * 1024.0),
            throughput_limit,
            memory_limit_bytes: memory_limit_gb * 1024.0 * 1024.0 * 1024.0,
            ..Default::default()
        }
    }

    #[test]
    fn needs_scaling_flags_memory_over_threshold_with_headroom() {
        let envelope = Envelope {
            max_memory_gb: 50.0,
            max_throughput_ops: 50_000,
        };
        let w = window(9.0, 10.0, 1000.0, 25_000);
        let need = needs_scaling(&w, &Thresholds::default(), &envelope);
        assert!(need.memory);
    }

    #[test]
    fn needs_scaling_false_at_envelope_ceiling() {
        let envelope = Envelope {
            max_memory_gb: 10.0,
            max_throughput_ops: 50_000,
        };
        let w = window(9.0, 10.0, 1000.0, 25_000);
        let need = needs_scaling(&w, &Thresholds::default(), &envelope);
        assert!(!need.memory, "no headroom left under the envelope");
    }

    #[test]
    fn compute_target_memory_scales_by_percentage_and_rounds_to_tenth() {
        let shape = Shape {
            memory_gb: 10.0,
            throughput_ops: 1000,
            shards: 1,
            replication: false,
        };
        let envelope = Envelope {
            max_memory_gb: 50.0,
            max_throughput_ops: 50_000,
        };
        let pct = ScalingPercentages {
            memory_pct: 20.0,
            throughput_pct: 20.0,
        };
        let w = window(9.0, 10.0, 100.0, 25_000);
        let target = compute_target(&shape, &w, &envelope, &pct);
        // 10 * 1.2 = 12.0, rounded to tenth
        assert_eq!(target.dataset_size_in_gb, Some(12.0));
    }

    #[test]
    fn compute_target_memory_halves_dataset_size_with_replication() {
        let shape = Shape {
            memory_gb: 10.0,
            throughput_ops: 1000,
            shards: 1,
            replication: true,
        };
        let envelope = Envelope {
            max_memory_gb: 50.0,
            max_throughput_ops: 50_000,
        };
        let pct = ScalingPercentages {
            memory_pct: 20.0,
            throughput_pct: 20.0,
        };
        let w = window(9.0, 10.0, 100.0, 25_000);
        let target = compute_target(&shape, &w, &envelope, &pct);
        assert_eq!(target.dataset_size_in_gb, Some(6.0));
    }

    #[test]
    fn compute_target_memory_caps_at_envelope() {
        let shape = Shape {
            memory_gb: 45.0,
            throughput_ops: 1000,
            shards: 1,
            replication: false,
        };
        let envelope = Envelope {
            max_memory_gb: 50.0,
            max_throughput_ops: 50_000,
        };
        let pct = ScalingPercentages {
            memory_pct: 20.0,
            throughput_pct: 20.0,
        };
        let w = window(44.0, 45.0, 100.0, 25_000);
        let target = compute_target(&shape, &w, &envelope, &pct);
        // 45 * 1.2 = 54, capped to 50
        assert_eq!(target.dataset_size_in_gb, Some(50.0));
    }

    #[test]
    fn compute_target_throughput_uses_max_of_usage_and_config_based() {
        let shape = Shape {
            memory_gb: 1.0,
            throughput_ops: 1000,
            shards: 1,
            replication: false,
        };
        let envelope = Envelope {
            max_memory_gb: 50.0,
            max_throughput_ops: 50_000,
        };
        let pct = ScalingPercentages {
            memory_pct: 20.0,
            throughput_pct: 20.0,
        };
        let w = window(0.1, 50.0, 24_000.0, 25_000);
        let target = compute_target(&shape, &w, &envelope, &pct);
        let tm = target.throughput_measurement.expect("throughput should scale");
        // usage_based = 24000*1.2=28800, config_based=25000*1.2=30000 -> max=30000, rounded to 100
        assert_eq!(tm.value, 30_000);
        assert_eq!(tm.by, "operations-per-second");
    }

    #[test]
    fn compute_target_empty_when_no_dimension_needs_scaling() {
        let shape = Shape {
            memory_gb: 1.0,
            throughput_ops: 1000,
            shards: 1,
            replication: false,
        };
        let envelope = Envelope {
            max_memory_gb: 50.0,
            max_throughput_ops: 50_000,
        };
        let pct = ScalingPercentages {
            memory_pct: 20.0,
            throughput_pct: 20.0,
        };
        let w = window(1.0, 50.0, 100.0, 25_000);
        let target = compute_target(&shape, &w, &envelope, &pct);
        assert!(target.is_empty());
    }
}
