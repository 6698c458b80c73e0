//! Pricing catalog (C2): the shard-type catalog + price matrix, fetched
//! once and retained indefinitely, plus `best_unit_price`.
//!
//! Per-subscription pricing itself is not re-cached here: it travels with
//! `Subscription` as returned by the inventory cache (C3), which already
//! applies its own TTL — see DESIGN.md for why a second cache over the
//! same data would just duplicate C3's invalidation logic.

use parking_lot::RwLock;
use serde::Serialize;

use crate::error::Result;
use crate::provider::{ProviderClient, ShardType, ShardTypePricing};

/// Result of `best_unit_price`: the cheapest shard type (and how many
/// units of it) that covers the requested memory/throughput.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitPrice {
    pub price: f64,
    pub unit_type: String,
    pub units_needed: u64,
}

struct ShardCatalog {
    types: Vec<ShardType>,
    pricings: Vec<ShardTypePricing>,
}

#[derive(Default)]
pub struct PricingCatalog {
    catalog: RwLock<Option<ShardCatalog>>,
}

impl PricingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    async fn ensure_loaded<P: ProviderClient>(&self, provider: &P) -> Result<()> {
        if self.catalog.read().is_some() {
            return Ok(());
        }
        let types = provider.shard_types().await?;
        let pricings = provider.shard_type_pricings().await?;
        // A double-populate race here is harmless: the last
        // writer wins and both fetched the same upstream data.
        *self.catalog.write() = Some(ShardCatalog { types, pricings });
        Ok(())
    }

    /// Enumerates shard types matching `(region, cloud)`, computes the
    /// units of each needed to cover `mem_mb`/`throughput_ops`, and returns
    /// the cheapest (doubled when `ha`). `None` when no entry matches.
    pub async fn best_unit_price<P: ProviderClient>(
        &self,
        provider: &P,
        region: &str,
        cloud: &str,
        mem_mb: f64,
        throughput_ops: u64,
        ha: bool,
    ) -> Result<Option<UnitPrice>> {
        self.ensure_loaded(provider).await?;

        let guard = self.catalog.read();
        let catalog = guard.as_ref().expect("ensure_loaded populates the catalog");

        let mut best: Option<UnitPrice> = None;
        for pricing in &catalog.pricings {
            if pricing.region != region || pricing.cloud != cloud {
                continue;
            }
            let Some(shard_type) = catalog.types.iter().find(|t| t.id == pricing.shard_type_id) else {
                continue;
            };
            if shard_type.memory_gb <= 0.0 || shard_type.throughput_ops == 0 {
                continue;
            }

            let mem_units = (mem_mb / (shard_type.memory_gb * 1024.0)).ceil();
            let throughput_units = (throughput_ops as f64 / shard_type.throughput_ops as f64).ceil();
            let units = mem_units.max(throughput_units).max(1.0) as u64;

            let mut total = units as f64 * pricing.price;
            if ha {
                total *= 2.0;
            }

            if best.as_ref().map(|b| total < b.price).unwrap_or(true) {
                best = Some(UnitPrice {
                    price: total,
                    unit_type: shard_type.name.clone(),
                    units_needed: units,
                });
            }
        }

        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProviderClient;

    fn shard_type(id: i64, name: &str, mem_gb: f64, throughput: u64) -> ShardType {
        ShardType {
            id,
            name: name.to_string(),
            memory_gb: mem_gb,
            throughput_ops: throughput,
        }
    }

    fn pricing(id: i64, region: &str, cloud: &str, price: f64) -> ShardTypePricing {
        ShardTypePricing {
            shard_type_id: id,
            region: region.to_string(),
            cloud: cloud.to_string(),
            price,
        }
    }

    #[tokio::test]
    async fn best_unit_price_picks_cheapest_matching_region_and_cloud() {
        let provider = MockProviderClient::new()
            .with_shard_types(vec![shard_type(1, "small", 1.0, 1000), shard_type(2, "large", 4.0, 4000)])
            .with_shard_pricings(vec![
                pricing(1, "us-east-1", "AWS", 1.0),
                pricing(2, "us-east-1", "AWS", 3.0),
                pricing(1, "eu-west-1", "AWS", 0.5),
            ]);
        let catalog = PricingCatalog::new();

        // 2 GiB needed => small needs 2 units (2.0), large needs 1 unit (3.0). Small wins.
        let result = catalog
            .best_unit_price(&provider, "us-east-1", "AWS", 2048.0, 500, false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.unit_type, "small");
        assert_eq!(result.units_needed, 2);
        assert_eq!(result.price, 2.0);
    }

    #[tokio::test]
    async fn best_unit_price_doubles_for_ha() {
        let provider = MockProviderClient::new()
            .with_shard_types(vec![shard_type(1, "small", 1.0, 1000)])
            .with_shard_pricings(vec![pricing(1, "us-east-1", "AWS", 1.0)]);
        let catalog = PricingCatalog::new();

        let result = catalog
            .best_unit_price(&provider, "us-east-1", "AWS", 1024.0, 500, true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.price, 2.0);
    }

    #[tokio::test]
    async fn best_unit_price_none_when_no_region_match() {
        let provider = MockProviderClient::new()
            .with_shard_types(vec![shard_type(1, "small", 1.0, 1000)])
            .with_shard_pricings(vec![pricing(1, "us-east-1", "AWS", 1.0)]);
        let catalog = PricingCatalog::new();

        let result = catalog
            .best_unit_price(&provider, "ap-south-1", "AWS", 1024.0, 500, false)
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
