//! Metrics gather (C4): batched, parallel collection of display-window and
//! autoscale-window metrics for every known database.

use futures::stream::{self, StreamExt};
use std::time::Duration;

use crate::monitoring::{MetricQuery, MetricsClient};
use crate::types::{Database, MetricsSnapshot};

/// Bound on concurrent in-flight monitoring queries.
const WORKER_POOL_SIZE: usize = 10;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Clone, Copy)]
enum Slot {
    DisplayThroughput,
    DisplayMemory,
    DisplayCpu,
    DisplayLatency,
    DisplayIngress,
    DisplayEgress,
    AutoscaleThroughput,
    AutoscaleMemory,
    AutoscaleCpu,
    AutoscaleLatency,
    AutoscaleIngress,
    AutoscaleEgress,
}

struct PlannedQuery {
    db_index: usize,
    slot: Slot,
    query: MetricQuery,
}

fn label_selector(bdb: &str, cluster: &str) -> String {
    if cluster.is_empty() {
        format!("{{bdb=\"{bdb}\"}}")
    } else {
        format!("{{bdb=\"{bdb}\",cluster=\"{cluster}\"}}")
    }
}

fn range_query(metric: &str, bdb: &str, cluster: &str, window: Duration) -> MetricQuery {
    MetricQuery {
        promql: format!("max_over_time({metric}{}[{}s])", label_selector(bdb, cluster), window.as_secs()),
        bdb: Some(bdb.to_string()),
        cluster: (!cluster.is_empty()).then(|| cluster.to_string()),
    }
}

fn instant_query(metric: &str, bdb: &str, cluster: &str) -> MetricQuery {
    MetricQuery {
        promql: format!("{metric}{}", label_selector(bdb, cluster)),
        bdb: Some(bdb.to_string()),
        cluster: (!cluster.is_empty()).then(|| cluster.to_string()),
    }
}

fn build_plan(databases: &[Database], display_window: Duration, autoscale_window: Duration) -> Vec<PlannedQuery> {
    let mut plan = Vec::with_capacity(databases.len() * 12);

    for (db_index, db) in databases.iter().enumerate() {
        let bdb = db.id.as_str();
        let cluster = db.cluster_label();

        let pairs = [
            (Slot::DisplayThroughput, "bdb_total_req_max", display_window),
            (Slot::DisplayMemory, "bdb_used_memory", display_window),
            (Slot::DisplayCpu, "bdb_shard_cpu_user_max", display_window),
            (Slot::DisplayLatency, "bdb_avg_latency_max", display_window),
            (Slot::DisplayIngress, "bdb_ingress_bytes_max", display_window),
            (Slot::DisplayEgress, "bdb_egress_bytes_max", display_window),
            (Slot::AutoscaleThroughput, "bdb_total_req_max", autoscale_window),
            (Slot::AutoscaleMemory, "bdb_used_memory", autoscale_window),
            (Slot::AutoscaleCpu, "bdb_shard_cpu_user_max", autoscale_window),
            (Slot::AutoscaleLatency, "bdb_avg_latency_max", autoscale_window),
        ];
        for (slot, metric, window) in pairs {
            plan.push(PlannedQuery {
                db_index,
                slot,
                query: range_query(metric, bdb, &cluster, window),
            });
        }

        // Autoscale-window ingress/egress are instantaneous, not ranged:
        // the decision engine only needs the current rate, not a series.
        plan.push(PlannedQuery {
            db_index,
            slot: Slot::AutoscaleIngress,
            query: instant_query("bdb_ingress_bytes_max", bdb, &cluster),
        });
        plan.push(PlannedQuery {
            db_index,
            slot: Slot::AutoscaleEgress,
            query: instant_query("bdb_egress_bytes_max", bdb, &cluster),
        });
    }

    plan
}

fn payload_size(ingress: Option<f64>, egress: Option<f64>, throughput: Option<f64>) -> Option<f64> {
    let throughput = throughput?;
    if throughput <= 0.0 {
        return None;
    }
    Some((ingress? + egress?) / throughput)
}

/// Runs the full query plan for `databases` concurrently (bounded by
/// [`WORKER_POOL_SIZE`]) and assembles one [`MetricsSnapshot`] per
/// database, in input order. A failed individual query degrades to `None`
/// (per [`MetricsClient::query`]'s contract) rather than failing the
/// whole gather.
pub async fn gather_all<M: MetricsClient>(
    metrics: &M,
    databases: &[Database],
    display_window: Duration,
    autoscale_window: Duration,
) -> Vec<MetricsSnapshot> {
    let plan = build_plan(databases, display_window, autoscale_window);

    let mut display_ingress = vec![None; databases.len()];
    let mut display_egress = vec![None; databases.len()];
    let mut autoscale_ingress = vec![None; databases.len()];
    let mut autoscale_egress = vec![None; databases.len()];
    let mut snapshots: Vec<MetricsSnapshot> = databases.iter().map(|_| MetricsSnapshot::default()).collect();

    let results: Vec<(usize, Slot, Option<f64>)> = stream::iter(plan)
        .map(|planned| async move {
            let value = metrics.query(&planned.query).await.unwrap_or(None);
            (planned.db_index, planned.slot, value)
        })
        .buffer_unordered(WORKER_POOL_SIZE)
        .collect()
        .await;

    for (db_index, slot, value) in results {
        let snapshot = &mut snapshots[db_index];
        match slot {
            Slot::DisplayThroughput => snapshot.display.throughput_ops = value,
            Slot::DisplayMemory => snapshot.display.used_memory_bytes = value,
            Slot::DisplayCpu => snapshot.display.cpu_pct = value,
            Slot::DisplayLatency => snapshot.display.latency_ms = value,
            Slot::DisplayIngress => display_ingress[db_index] = value,
            Slot::DisplayEgress => display_egress[db_index] = value,
            Slot::AutoscaleThroughput => snapshot.autoscale.throughput_ops = value,
            Slot::AutoscaleMemory => snapshot.autoscale.used_memory_bytes = value,
            Slot::AutoscaleCpu => snapshot.autoscale.cpu_pct = value,
            Slot::AutoscaleLatency => snapshot.autoscale.latency_ms = value,
            Slot::AutoscaleIngress => autoscale_ingress[db_index] = value,
            Slot::AutoscaleEgress => autoscale_egress[db_index] = value,
        }
    }

    for (i, db) in databases.iter().enumerate() {
        let snapshot = &mut snapshots[i];

        snapshot.display.payload_size_bytes =
            payload_size(display_ingress[i], display_egress[i], snapshot.display.throughput_ops);
        snapshot.autoscale.payload_size_bytes =
            payload_size(autoscale_ingress[i], autoscale_egress[i], snapshot.autoscale.throughput_ops);

        let memory_limit_bytes = db.shape.memory_gb * GIB;
        snapshot.display.memory_limit_bytes = memory_limit_bytes;
        snapshot.autoscale.memory_limit_bytes = memory_limit_bytes;
        snapshot.display.throughput_limit = db.shape.throughput_ops;
        snapshot.autoscale.throughput_limit = db.shape.throughput_ops;
    }

    snapshots
}
