//! Provider client (C1): the cloud provider's subscription/database/task
//! management API, abstracted behind a trait so the control plane can be
//! exercised against a mock in tests (production `reqwest` impl + an
//! in-memory mock impl).

pub mod mock;
pub mod models;
pub mod reqwest_client;

use std::future::Future;

use crate::error::Result;
use crate::types::{Database, DatabaseId, PartialShape, PriceLineItem, Shape, Subscription, SubscriptionId, TaskId, TaskStatus};
use models::DatabaseDto;

pub use mock::MockProviderClient;
pub use reqwest_client::ReqwestProviderClient;

/// Generic over the implementation rather than a trait object, so call
/// sites are monomorphized and async fns need no boxing. Every method
/// spells out `-> impl Future<..> + Send` rather than using bare `async
/// fn`: native async-fn-in-trait sugar can't express a `Send` bound on the
/// opaque per-call future, and both `ControlPlane`'s generic methods and
/// `tokio::spawn`/axum's `Handler` blanket impl need that bound proven.
pub trait ProviderClient: Send + Sync + 'static {
    fn list_subscriptions(&self) -> impl Future<Output = Result<Vec<Subscription>>> + Send;
    fn list_databases(&self, subscription_id: &SubscriptionId) -> impl Future<Output = Result<Vec<Database>>> + Send;
    fn get_database(
        &self,
        subscription_id: &SubscriptionId,
        database_id: &DatabaseId,
    ) -> impl Future<Output = Result<Option<Database>>> + Send;

    /// Issue a partial scale-up update. Returns `None` if `update` is empty
    /// (nothing to send).
    fn update_database(
        &self,
        subscription_id: &SubscriptionId,
        database_id: &DatabaseId,
        update: &PartialShape,
    ) -> impl Future<Output = Result<Option<crate::provider::models::UpdateOutcome>>> + Send;

    fn task_status(&self, task_id: &TaskId) -> impl Future<Output = Result<TaskStatus>> + Send;

    fn shard_types(&self) -> impl Future<Output = Result<Vec<ShardType>>> + Send;
    fn shard_type_pricings(&self) -> impl Future<Output = Result<Vec<ShardTypePricing>>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShardType {
    pub id: i64,
    pub name: String,
    pub memory_gb: f64,
    pub throughput_ops: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShardTypePricing {
    pub shard_type_id: i64,
    pub region: String,
    pub cloud: String,
    pub price: f64,
}

/// Converts a wire DTO into the domain type, resolving the id/status/cloud
/// fallback chains (the provider API omits some of these fields on
/// certain database states).
pub fn database_from_dto(dto: DatabaseDto) -> Database {
    let status = dto
        .db_status
        .filter(|s| !s.is_empty())
        .or(dto.status)
        .unwrap_or_default()
        .to_lowercase();

    let active_active = dto.active_active_redis.unwrap_or(false) && !dto.crdb_databases.unwrap_or_default().is_empty();

    let cloud_tag = dto.provider.or(dto.cloud_provider).or(dto.cloud);

    let memory_limit_in_gb = dto.memory_limit_in_gb.unwrap_or(0.0);
    let throughput_ops = dto
        .throughput_measurement
        .and_then(|t| t.value)
        .unwrap_or(0);
    let shards = dto
        .clustering
        .and_then(|c| c.number_of_shards)
        .unwrap_or(1);

    Database {
        id: DatabaseId::from(dto.database_id),
        subscription_id: dto
            .subscription_id
            .map(SubscriptionId::from)
            .unwrap_or_else(|| SubscriptionId::from(String::new())),
        name: dto.name.unwrap_or_default(),
        region: dto.region,
        shape: Shape {
            memory_gb: memory_limit_in_gb,
            throughput_ops,
            shards,
            replication: dto.replication.unwrap_or(false),
        },
        status,
        active_active,
        cluster: dto.cluster,
        private_endpoint: dto.private_endpoint,
        cloud_tag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::models::{ClusteringDto, ThroughputMeasurementDto};

    #[test]
    fn database_from_dto_falls_back_status_field() {
        let dto = DatabaseDto {
            database_id: 1,
            subscription_id: Some(10),
            name: Some("db".to_string()),
            region: None,
            status: Some("Active".to_string()),
            db_status: None,
            active_active_redis: None,
            crdb_databases: None,
            memory_limit_in_gb: Some(1.0),
            throughput_measurement: Some(ThroughputMeasurementDto { value: Some(1000) }),
            replication: Some(false),
            clustering: Some(ClusteringDto { number_of_shards: Some(2) }),
            cluster: None,
            private_endpoint: None,
            provider: None,
            cloud_provider: None,
            cloud: None,
        };
        let db = database_from_dto(dto);
        assert_eq!(db.status, "active");
        assert_eq!(db.shape.shards, 2);
    }

    #[test]
    fn database_from_dto_active_active_requires_nonempty_crdb() {
        let dto = DatabaseDto {
            database_id: 1,
            subscription_id: Some(10),
            name: None,
            region: None,
            status: Some("active".to_string()),
            db_status: None,
            active_active_redis: Some(true),
            crdb_databases: Some(vec![]),
            memory_limit_in_gb: Some(1.0),
            throughput_measurement: None,
            replication: None,
            clustering: None,
            cluster: None,
            private_endpoint: None,
            provider: None,
            cloud_provider: None,
            cloud: None,
        };
        let db = database_from_dto(dto);
        assert!(!db.active_active);
    }
}
