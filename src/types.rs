//! Core domain types shared across the control plane.
//!
//! Identifiers are normalized to strings at the boundary (the provider may
//! return numeric subscription/database ids, while the HTTP opt-in endpoints
//! always receive strings) so that every downstream comparison is a plain
//! string equality, per the opt-in registry's documented contract.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<i64> for $name {
            fn from(n: i64) -> Self {
                Self(n.to_string())
            }
        }

        impl From<u64> for $name {
            fn from(n: u64) -> Self {
                Self(n.to_string())
            }
        }
    };
}

string_id!(SubscriptionId);
string_id!(DatabaseId);
string_id!(TaskId);

/// A database's current `(memory, throughput, shards, replication)` tuple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub memory_gb: f64,
    pub throughput_ops: u64,
    pub shards: u32,
    pub replication: bool,
}

/// The `(max_memory_gb, max_throughput_ops)` ceiling derived from a shape's
/// shard count and replication flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub max_memory_gb: f64,
    pub max_throughput_ops: u64,
}

impl Envelope {
    /// `max_memory_gb = shards * 25 * (2 if replication else 1)`
    /// `max_throughput_ops = shards * 25000`
    pub fn from_shape(shape: &Shape) -> Self {
        let replication_multiplier = if shape.replication { 2 } else { 1 };
        Envelope {
            max_memory_gb: shape.shards as f64 * 25.0 * replication_multiplier as f64,
            max_throughput_ops: shape.shards as u64 * 25_000,
        }
    }
}

/// Fractional/absolute thresholds used both for ok-flag computation and for
/// gating `needs_scaling`. Defaults and §6.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub throughput_threshold: f64,
    pub memory_threshold: f64,
    pub cpu_threshold: f64,
    pub latency_threshold_ms: f64,
    pub payload_size_threshold_kb: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            throughput_threshold: 0.8,
            memory_threshold: 0.8,
            cpu_threshold: 0.6,
            latency_threshold_ms: 3.0,
            payload_size_threshold_kb: 3.0,
        }
    }
}

/// One window's worth of per-database metrics. Any field may be absent to
/// denote "monitoring backend had no data".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsWindow {
    pub throughput_ops: Option<f64>,
    pub used_memory_bytes: Option<f64>,
    pub cpu_pct: Option<f64>,
    pub latency_ms: Option<f64>,
    pub payload_size_bytes: Option<f64>,
    /// The database's configured throughput limit at the time of the query,
    /// carried alongside the observed metrics so the decision engine doesn't
    /// need a second lookup.
    pub throughput_limit: u64,
    pub memory_limit_bytes: f64,
}

/// Two parallel sub-snapshots for one database at one poll tick: the UI
/// window and the (independently configurable) autoscale window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub display: MetricsWindow,
    pub autoscale: MetricsWindow,
}

/// Per-dimension "is this database healthy" flags, computed per Invariant 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OkFlags {
    pub throughput_ok: bool,
    pub memory_ok: bool,
    pub cpu_ok: bool,
    pub latency_ok: bool,
    pub payload_size_ok: bool,
}

impl OkFlags {
    pub fn all_ok(&self) -> bool {
        self.throughput_ok && self.memory_ok && self.cpu_ok && self.latency_ok && self.payload_size_ok
    }
}

/// Compute ok-flags for one metrics window against thresholds and limits,
/// per Invariant 1: missing latency/payload is vacuously ok, missing
/// throughput/memory/cpu is vacuously *not* ok.
pub fn ok_flags(window: &MetricsWindow, thresholds: &Thresholds) -> OkFlags {
    let throughput_ok = window
        .throughput_ops
        .map(|v| v < thresholds.throughput_threshold * window.throughput_limit as f64)
        .unwrap_or(false);
    let memory_ok = window
        .used_memory_bytes
        .map(|v| v < thresholds.memory_threshold * window.memory_limit_bytes)
        .unwrap_or(false);
    let cpu_ok = window.cpu_pct.map(|v| v < thresholds.cpu_threshold * 100.0).unwrap_or(false);
    let latency_ok = window.latency_ms.map(|v| v < thresholds.latency_threshold_ms).unwrap_or(true);
    let payload_size_ok = window
        .payload_size_bytes
        .map(|v| v < thresholds.payload_size_threshold_kb * 1024.0)
        .unwrap_or(true);

    OkFlags {
        throughput_ok,
        memory_ok,
        cpu_ok,
        latency_ok,
        payload_size_ok,
    }
}

/// Process-local lifecycle state for one database's autoscaling action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingStatus {
    Idle,
    InProgress,
    Done,
}

impl Default for ScalingStatus {
    fn default() -> Self {
        ScalingStatus::Idle
    }
}

impl fmt::Display for ScalingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScalingStatus::Idle => "idle",
            ScalingStatus::InProgress => "in_progress",
            ScalingStatus::Done => "done",
        };
        write!(f, "{}", s)
    }
}

/// Terminal and non-terminal states a provider task handle can report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Completed,
    Success,
    Failed,
    Error,
    Other(String),
}

impl TaskStatus {
    pub fn from_str(s: &str) -> Self {
        match s {
            "completed" => TaskStatus::Completed,
            "success" => TaskStatus::Success,
            "failed" => TaskStatus::Failed,
            "error" => TaskStatus::Error,
            other => TaskStatus::Other(other.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::Error)
    }
}

/// A partial shape update, sent to the provider with only the dimensions
/// that changed (§4.1's "send only changed fields" rule).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialShape {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_size_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput_measurement: Option<ThroughputMeasurement>,
}

impl PartialShape {
    pub fn is_empty(&self) -> bool {
        self.dataset_size_in_gb.is_none() && self.throughput_measurement.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputMeasurement {
    pub by: String,
    pub value: u64,
}

/// A single priced line item from a subscription's pricing table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLineItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "typeDetails")]
    pub type_details: Option<String>,
    pub quantity: Option<u32>,
    #[serde(rename = "pricePerUnit")]
    pub price_per_unit: Option<f64>,
}

/// A cloud-provider-hosted database.
#[derive(Debug, Clone, PartialEq)]
pub struct Database {
    pub id: DatabaseId,
    pub subscription_id: SubscriptionId,
    pub name: String,
    pub region: Option<String>,
    pub shape: Shape,
    pub status: String,
    pub active_active: bool,
    pub cluster: Option<String>,
    pub private_endpoint: Option<String>,
    pub cloud_tag: Option<String>,
}

impl Database {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }

    pub fn envelope(&self) -> Envelope {
        Envelope::from_shape(&self.shape)
    }

    /// The `cluster` field if present, else the substring of
    /// `privateEndpoint` between `.internal.` and the next `:`, else empty.
    pub fn cluster_label(&self) -> String {
        if let Some(cluster) = &self.cluster {
            return cluster.clone();
        }
        if let Some(endpoint) = &self.private_endpoint {
            if let Some(after) = endpoint.split_once(".internal.") {
                return after.1.split(':').next().unwrap_or("").to_string();
            }
        }
        String::new()
    }
}

/// A cloud-provider subscription, owning one or more databases.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub name: String,
    pub cloud: Option<String>,
    pub pricing: Vec<PriceLineItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_from_shape_doubles_memory_with_replication() {
        let shape = Shape {
            memory_gb: 1.0,
            throughput_ops: 1000,
            shards: 2,
            replication: true,
        };
        let envelope = Envelope::from_shape(&shape);
        assert_eq!(envelope.max_memory_gb, 100.0);
        assert_eq!(envelope.max_throughput_ops, 50_000);
    }

    #[test]
    fn envelope_from_shape_single_without_replication() {
        let shape = Shape {
            memory_gb: 1.0,
            throughput_ops: 1000,
            shards: 1,
            replication: false,
        };
        let envelope = Envelope::from_shape(&shape);
        assert_eq!(envelope.max_memory_gb, 25.0);
        assert_eq!(envelope.max_throughput_ops, 25_000);
    }

    #[test]
    fn ok_flags_missing_latency_is_vacuously_ok() {
        let window = MetricsWindow {
            latency_ms: None,
            ..Default::default()
        };
        let flags = ok_flags(&window, &Thresholds::default());
        assert!(flags.latency_ok);
        assert!(flags.payload_size_ok);
    }

    #[test]
    fn ok_flags_missing_throughput_is_not_ok() {
        let window = MetricsWindow {
            throughput_ops: None,
            throughput_limit: 1000,
            ..Default::default()
        };
        let flags = ok_flags(&window, &Thresholds::default());
        assert!(!flags.throughput_ok);
    }

    #[test]
    fn ok_flags_strict_less_than() {
        let thresholds = Thresholds::default();
        let window = MetricsWindow {
            throughput_ops: Some(800.0),
            throughput_limit: 1000,
            ..Default::default()
        };
        // 800 >= 0.8 * 1000 -> not ok (strict less-than required)
        let flags = ok_flags(&window, &thresholds);
        assert!(!flags.throughput_ok);
    }

    #[test]
    fn cluster_label_falls_back_to_private_endpoint() {
        let db = Database {
            id: "1".into(),
            subscription_id: "1".into(),
            name: "db".to_string(),
            region: None,
            shape: Shape {
                memory_gb: 1.0,
                throughput_ops: 1000,
                shards: 1,
                replication: false,
            },
            status: "active".to_string(),
            active_active: false,
            cluster: None,
            private_endpoint: Some("redis-12345.internal.cluster1.example.com:6379".to_string()),
            cloud_tag: None,
        };
        assert_eq!(db.cluster_label(), "cluster1.example.com");
    }

    #[test]
    fn cluster_label_empty_without_private_endpoint() {
        let db = Database {
            id: "1".into(),
            subscription_id: "1".into(),
            name: "db".to_string(),
            region: None,
            shape: Shape {
                memory_gb: 1.0,
                throughput_ops: 1000,
                shards: 1,
                replication: false,
            },
            status: "active".to_string(),
            active_active: false,
            cluster: None,
            private_endpoint: None,
            cloud_tag: None,
        };
        assert_eq!(db.cluster_label(), "");
    }
}
