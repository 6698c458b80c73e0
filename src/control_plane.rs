//! The control plane: aggregates C1–C8 behind one `run_cycle` entry point
//! shared by the reactive HTTP trigger and the optional background ticker
//!.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::actuator::Actuator;
use crate::advisor::{self, DownscaleRecommendation};
use crate::cache::InventoryCache;
use crate::config::Config;
use crate::decision::ScalingPercentages;
use crate::error::Result;
use crate::gather;
use crate::monitoring::MetricsClient;
use crate::pricing::PricingCatalog;
use crate::provider::ProviderClient;
use crate::registry::{OptInRegistry, ScalingStatusTable};
use crate::types::{ok_flags, Database, DatabaseId, Envelope, MetricsSnapshot, OkFlags, PriceLineItem, ScalingStatus, SubscriptionId, Thresholds};

/// One database's record in the `/api/metrics` response: the per-tick
/// metrics/threshold assembly plus identifying fields (`status`, `region`,
/// `active_active`) an operator needs to locate the database without a
/// second lookup.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseRecord {
    pub subscription_id: SubscriptionId,
    pub database_id: DatabaseId,
    pub name: String,
    pub region: Option<String>,
    pub status: String,
    pub active_active: bool,
    pub display: crate::types::MetricsWindow,
    pub autoscale: crate::types::MetricsWindow,
    pub ok: OkFlags,
    pub envelope: Envelope,
    pub downscale: Option<DownscaleRecommendation>,
    pub hourly_price: Option<f64>,
    pub minimum_price: Option<f64>,
    pub scaling_status: ScalingStatus,
    pub opted_in: bool,
}

impl DatabaseRecord {
    /// Fallback record for a database whose assembly step failed: all
    /// metrics null and all ok-flags false, so one bad database never
    /// drops a whole `/api/metrics` response.
    fn skeleton(database: &Database, scaling_status: ScalingStatus, opted_in: bool) -> Self {
        DatabaseRecord {
            subscription_id: database.subscription_id.clone(),
            database_id: database.id.clone(),
            name: database.name.clone(),
            region: database.region.clone(),
            status: database.status.clone(),
            active_active: database.active_active,
            display: crate::types::MetricsWindow::default(),
            autoscale: crate::types::MetricsWindow::default(),
            ok: OkFlags::default(),
            envelope: database.envelope(),
            downscale: None,
            hourly_price: None,
            minimum_price: None,
            scaling_status,
            opted_in,
        }
    }
}

/// The first `Shards` pricing row matching `quantity == shards`, falling
/// back to the first `Shards` row when no exact quantity match exists. See
/// DESIGN.md for why quantity-matching alone is the resolved behavior here.
fn hourly_price(pricing: &[PriceLineItem], shards: u32) -> Option<f64> {
    pricing
        .iter()
        .find(|p| p.kind == "Shards" && p.quantity == Some(shards))
        .or_else(|| pricing.iter().find(|p| p.kind == "Shards"))
        .and_then(|p| p.price_per_unit)
}

fn minimum_price(pricing: &[PriceLineItem]) -> Option<f64> {
    pricing.iter().find(|p| p.kind == "MinimumPrice").and_then(|p| p.price_per_unit)
}

/// Aggregates C1–C8 behind one struct. Generic over the provider and
/// monitoring client implementations so tests can substitute mocks
/// without a trait object.
pub struct ControlPlane<P: ProviderClient, M: MetricsClient> {
    pub provider: P,
    pub metrics: M,
    pub config: Config,
    pub inventory: InventoryCache,
    pub pricing: PricingCatalog,
    pub opt_in: OptInRegistry,
    pub status: ScalingStatusTable,
    pub actuator: Actuator,
}

impl<P: ProviderClient, M: MetricsClient> ControlPlane<P, M> {
    pub fn new(provider: P, metrics: M, config: Config) -> Self {
        ControlPlane {
            provider,
            metrics,
            config,
            inventory: InventoryCache::new(),
            pricing: PricingCatalog::new(),
            opt_in: OptInRegistry::new(),
            status: ScalingStatusTable::new(),
            actuator: Actuator::new(),
        }
    }

    fn thresholds(&self) -> Thresholds {
        Thresholds {
            throughput_threshold: self.config.throughput_threshold,
            memory_threshold: self.config.memory_threshold,
            cpu_threshold: self.config.cpu_threshold,
            latency_threshold_ms: self.config.latency_threshold_ms,
            payload_size_threshold_kb: self.config.payload_size_threshold_kb,
        }
    }

    fn percentages(&self) -> ScalingPercentages {
        ScalingPercentages {
            memory_pct: self.config.memory_scaling_percentage,
            throughput_pct: self.config.throughput_scaling_percentage,
        }
    }

    /// One full poll tick: gather metrics for every known database, act on
    /// opted-in ones whose autoscale window crosses threshold, and compute
    /// an unconditional downscale recommendation. Shared by the HTTP
    /// `/api/metrics` handler and the background ticker.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self, display_window_override: Option<Duration>) -> Result<Vec<DatabaseRecord>> {
        let opted_in_nonempty = !self.opt_in.is_empty();
        let inventory = self.inventory.get(&self.provider, opted_in_nonempty).await?;

        let cloud_by_subscription: HashMap<SubscriptionId, Option<String>> = inventory
            .subscriptions
            .iter()
            .map(|s| (s.id.clone(), s.cloud.clone()))
            .collect();
        let pricing_by_subscription: HashMap<SubscriptionId, Vec<PriceLineItem>> = inventory
            .subscriptions
            .iter()
            .map(|s| (s.id.clone(), s.pricing.clone()))
            .collect();

        let all_databases: Vec<Database> = inventory.databases.values().flatten().cloned().collect();
        // Active-active databases are excluded from the entire autoscaling
        // path: their capacity is managed across regions, not by this
        // single-region controller.
        let scoped_databases: Vec<Database> = all_databases.iter().filter(|d| !d.active_active).cloned().collect();

        let display_window = display_window_override.unwrap_or(self.config.prometheus_query_period);
        let autoscale_window = self.config.autoscale_query_period;
        let snapshots = gather::gather_all(&self.metrics, &scoped_databases, display_window, autoscale_window).await;

        let thresholds = self.thresholds();
        let pct = self.percentages();

        let mut records = Vec::with_capacity(scoped_databases.len());
        for (database, snapshot) in scoped_databases.iter().zip(snapshots.iter()) {
            let opted_in = self.opt_in.is_enabled(&database.subscription_id, &database.id);

            if opted_in {
                if let Err(e) = self
                    .actuator
                    .autoscale(
                        &self.provider,
                        &self.status,
                        database,
                        &snapshot.autoscale,
                        &thresholds,
                        &database.envelope(),
                        &pct,
                        &all_databases,
                    )
                    .await
                {
                    warn!(database_id = %database.id, error = %e, "autoscale action failed");
                }
            }

            match self
                .assemble_record(database, snapshot, &thresholds, &cloud_by_subscription, &pricing_by_subscription, opted_in)
                .await
            {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(database_id = %database.id, error = %e, "metrics assembly failed; using skeleton record");
                    records.push(DatabaseRecord::skeleton(database, self.status.get(&database.id), opted_in));
                }
            }
        }

        info!(databases = records.len(), "completed metrics gather/actuate cycle");
        Ok(records)
    }

    async fn assemble_record(
        &self,
        database: &Database,
        snapshot: &MetricsSnapshot,
        thresholds: &Thresholds,
        cloud_by_subscription: &HashMap<SubscriptionId, Option<String>>,
        pricing_by_subscription: &HashMap<SubscriptionId, Vec<PriceLineItem>>,
        opted_in: bool,
    ) -> Result<DatabaseRecord> {
        let envelope = database.envelope();
        let display_ok = ok_flags(&snapshot.display, thresholds);
        let autoscale_ok = ok_flags(&snapshot.autoscale, thresholds);

        let downscale = if let Some(proposal) = advisor::propose_downscale(&snapshot.display, &display_ok) {
            let region = database.region.clone().unwrap_or_default();
            let cloud = cloud_by_subscription
                .get(&database.subscription_id)
                .cloned()
                .flatten()
                .or_else(|| database.cloud_tag.clone())
                .unwrap_or_default();
            let price = self
                .pricing
                .best_unit_price(
                    &self.provider,
                    &region,
                    &cloud,
                    proposal.memory_mib as f64,
                    proposal.throughput_ops,
                    database.shape.replication,
                )
                .await?;
            Some(DownscaleRecommendation {
                downscale_memory_mb: proposal.memory_mib,
                downscale_throughput_ops: proposal.throughput_ops,
                downscale_price_suggestion: price,
            })
        } else {
            None
        };

        let pricing = pricing_by_subscription.get(&database.subscription_id).cloned().unwrap_or_default();

        Ok(DatabaseRecord {
            subscription_id: database.subscription_id.clone(),
            database_id: database.id.clone(),
            name: database.name.clone(),
            region: database.region.clone(),
            status: database.status.clone(),
            active_active: database.active_active,
            display: snapshot.display,
            autoscale: snapshot.autoscale,
            ok: autoscale_ok_or_display(display_ok, autoscale_ok),
            envelope,
            downscale,
            hourly_price: hourly_price(&pricing, database.shape.shards),
            minimum_price: minimum_price(&pricing),
            scaling_status: self.status.get(&database.id),
            opted_in,
        })
    }

    pub fn invalidate_inventory(&self) {
        self.inventory.invalidate();
    }

    pub fn autoscale_query_interval(&self) -> Duration {
        Duration::from_secs(self.config.cloud_api_query_interval_seconds_autoscale)
    }
}

/// The HTTP response surfaces the *display*-window ok-flags — that's the
/// window operators actually see rendered — the
/// autoscale-window flags remain internal to the decision engine.
fn autoscale_ok_or_display(display_ok: OkFlags, _autoscale_ok: OkFlags) -> OkFlags {
    display_ok
}
