//! Inventory cache (C3): a two-TTL cache of subscriptions and of databases
//! per subscription, bounding upstream load from the provider's management
//! API.
//!
//! The TTL choice (60s vs 3600s) depends on whether the opt-in registry
//! (C7) is non-empty. That dependency is wired as an explicit accessor
//! rather than a compile-time import —
//! callers pass `opted_in_nonempty` in on every call rather than this
//! module importing [`crate::registry::OptInRegistry`] directly.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::error::Result;
use crate::provider::ProviderClient;
use crate::types::{Database, Subscription, SubscriptionId};

const TTL_WHEN_OPTED_IN: Duration = Duration::from_secs(60);
const TTL_WHEN_NONE_OPTED_IN: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub subscriptions: Vec<Subscription>,
    pub databases: HashMap<SubscriptionId, Vec<Database>>,
}

struct CacheState {
    inventory: Option<Inventory>,
    last_fetch: Option<Instant>,
}

pub struct InventoryCache {
    state: RwLock<CacheState>,
}

impl Default for InventoryCache {
    fn default() -> Self {
        InventoryCache {
            state: RwLock::new(CacheState {
                inventory: None,
                last_fetch: None,
            }),
        }
    }
}

impl InventoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached inventory if it's still within TTL, else
    /// refreshes from `provider`. Refreshing always repopulates both the
    /// subscriptions and the per-subscription databases together, so a
    /// subscriptions refresh can never leave a stale databases cache
    /// behind.
    pub async fn get<P: ProviderClient>(&self, provider: &P, opted_in_nonempty: bool) -> Result<Inventory> {
        let ttl = if opted_in_nonempty {
            TTL_WHEN_OPTED_IN
        } else {
            TTL_WHEN_NONE_OPTED_IN
        };

        {
            let state = self.state.read();
            if let (Some(inventory), Some(last_fetch)) = (&state.inventory, state.last_fetch) {
                if last_fetch.elapsed() < ttl {
                    return Ok(inventory.clone());
                }
            }
        }

        let subscriptions = provider.list_subscriptions().await?;
        let mut databases = HashMap::with_capacity(subscriptions.len());
        for subscription in &subscriptions {
            let dbs = provider.list_databases(&subscription.id).await?;
            databases.insert(subscription.id.clone(), dbs);
        }

        let inventory = Inventory { subscriptions, databases };

        let mut state = self.state.write();
        state.inventory = Some(inventory.clone());
        state.last_fetch = Some(Instant::now());
        Ok(inventory)
    }

    /// Drops the cached inventory unconditionally (`/api/refresh-cloud`).
    pub fn invalidate(&self) {
        let mut state = self.state.write();
        state.inventory = None;
        state.last_fetch = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProviderClient;
    use crate::types::{DatabaseId, Shape};

    fn sample_database(id: &str, sub: &str) -> Database {
        Database {
            id: DatabaseId::from(id),
            subscription_id: SubscriptionId::from(sub),
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
        }
    }

    #[tokio::test]
    async fn caches_inventory_until_invalidated() {
        let sub = SubscriptionId::from("1");
        let provider = MockProviderClient::new()
            .with_subscription(Subscription {
                id: sub.clone(),
                name: "sub".to_string(),
                cloud: None,
                pricing: vec![],
            })
            .with_databases(&sub, vec![sample_database("2", "1")]);
        let cache = InventoryCache::new();

        let first = cache.get(&provider, false).await.unwrap();
        assert_eq!(first.subscriptions.len(), 1);

        // A second get within TTL should not need the provider to have
        // anything new — cached value returned verbatim.
        let second = cache.get(&provider, false).await.unwrap();
        assert_eq!(second.subscriptions.len(), 1);

        cache.invalidate();
        let third = cache.get(&provider, false).await.unwrap();
        assert_eq!(third.databases.get(&sub).unwrap().len(), 1);
    }
}
