//! Wire DTOs for the cloud provider's management API. Every field the
//! upstream may omit is modeled as `Option`, per §9 "Dynamic field
//! presence" — no positional/untyped JSON access anywhere in this crate.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionDto {
    pub id: i64,
    pub name: Option<String>,
    #[serde(rename = "cloudDetails")]
    pub cloud_details: Option<Vec<CloudDetailsDto>>,
    pub pricing: Option<Vec<PriceLineItemDto>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudDetailsDto {
    pub provider: Option<String>,
    pub region: Option<Vec<RegionDto>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionDto {
    pub region: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceLineItemDto {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "typeDetails")]
    pub type_details: Option<String>,
    pub quantity: Option<u32>,
    #[serde(rename = "pricePerUnit")]
    pub price_per_unit: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseDto {
    #[serde(alias = "databaseId", alias = "database_id")]
    pub database_id: i64,
    #[serde(rename = "subscriptionId", alias = "subscription_id")]
    pub subscription_id: Option<i64>,
    pub name: Option<String>,
    pub region: Option<String>,
    pub status: Option<String>,
    #[serde(alias = "db_status")]
    pub db_status: Option<String>,
    #[serde(rename = "activeActiveRedis")]
    pub active_active_redis: Option<bool>,
    #[serde(rename = "crdbDatabases")]
    pub crdb_databases: Option<Vec<serde_json::Value>>,
    #[serde(rename = "memoryLimitInGb")]
    pub memory_limit_in_gb: Option<f64>,
    #[serde(rename = "throughputMeasurement")]
    pub throughput_measurement: Option<ThroughputMeasurementDto>,
    pub replication: Option<bool>,
    pub clustering: Option<ClusteringDto>,
    pub cluster: Option<String>,
    #[serde(rename = "privateEndpoint")]
    pub private_endpoint: Option<String>,
    pub provider: Option<String>,
    #[serde(rename = "cloudProvider")]
    pub cloud_provider: Option<String>,
    pub cloud: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThroughputMeasurementDto {
    pub value: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusteringDto {
    #[serde(rename = "numberOfShards")]
    pub number_of_shards: Option<u32>,
}

/// What `update_database` returned: an immediate result (HTTP 200), or an
/// asynchronous task handle (HTTP 202).
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    Immediate,
    Task { task_id: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskResponseDto {
    #[serde(rename = "taskId")]
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatusDto {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShardTypeDto {
    pub id: i64,
    pub name: Option<String>,
    pub memory_size_gb: Option<f64>,
    pub throughput: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShardTypePricingDto {
    pub shard_type_id: Option<i64>,
    pub region_name: Option<String>,
    pub cloud_name: Option<String>,
    pub price: Option<f64>,
}

/// Outbound body for `PUT /subscriptions/{id}/databases/{id}` — only the
/// changed fields are serialized (via `skip_serializing_if` on the domain
/// type), matching the original's "send only changed fields" rule.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateDatabaseRequest {
    #[serde(skip_serializing_if = "Option::is_none", rename = "datasetSizeInGb")]
    pub dataset_size_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "throughputMeasurement")]
    pub throughput_measurement: Option<ThroughputMeasurementRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThroughputMeasurementRequest {
    pub by: String,
    pub value: u64,
}
