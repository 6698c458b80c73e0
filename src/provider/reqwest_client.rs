//! Production `ProviderClient` backed by `reqwest`: a shared client with a
//! fixed base URL and the two auth headers attached to every request.

use reqwest::Client;
use std::time::Duration;

use crate::config::Secrets;
use crate::error::{Error, ProviderError, Result};
use crate::types::{Database, DatabaseId, PartialShape, SubscriptionId, TaskId, TaskStatus};

use super::models::{
    DatabaseDto, ShardTypeDto, ShardTypePricingDto, SubscriptionDto, TaskResponseDto, TaskStatusDto,
    ThroughputMeasurementRequest, UpdateDatabaseRequest, UpdateOutcome,
};
use super::{database_from_dto, ProviderClient, ShardType, ShardTypePricing};
use crate::types::Subscription;

const DEFAULT_BASE_URL: &str = "https://api.redislabs.com/v1";

/// Wire envelope for `GET /v1/subscriptions`.
#[derive(Debug, Clone, serde::Deserialize)]
struct SubscriptionsResponse {
    subscriptions: Vec<SubscriptionDto>,
}

/// Wire envelope for `GET /v1/subscriptions/{id}/databases`:
/// `{subscription: [{databases: [...]}]}`.
#[derive(Debug, Clone, serde::Deserialize)]
struct DatabasesResponse {
    subscription: Vec<DatabasesInner>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct DatabasesInner {
    #[serde(default)]
    databases: Vec<DatabaseDto>,
}

pub struct ReqwestProviderClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl ReqwestProviderClient {
    pub fn new(secrets: Secrets) -> Self {
        Self::with_base_url(secrets, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(secrets: Secrets, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client builds with default config");

        ReqwestProviderClient {
            client,
            base_url,
            api_key: secrets.api_key,
            api_secret: secrets.api_secret,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("accept", "application/json")
            .header("x-api-key", &self.api_key)
            .header("x-api-secret-key", &self.api_secret)
    }
}

impl ProviderClient for ReqwestProviderClient {
    async fn list_subscriptions(&self) -> Result<Vec<Subscription>> {
        let wrapper: SubscriptionsResponse = self
            .request(reqwest::Method::GET, "/subscriptions")
            .send()
            .await?
            .json()
            .await?;

        Ok(wrapper.subscriptions.into_iter().map(subscription_from_dto).collect())
    }

    async fn list_databases(&self, subscription_id: &SubscriptionId) -> Result<Vec<Database>> {
        let path = format!("/subscriptions/{}/databases", subscription_id);
        let wrapper: DatabasesResponse = self
            .request(reqwest::Method::GET, &path)
            .query(&[("offset", "0"), ("limit", "100")])
            .send()
            .await?
            .json()
            .await?;
        Ok(wrapper
            .subscription
            .into_iter()
            .flat_map(|inner| inner.databases)
            .map(database_from_dto)
            .collect())
    }

    async fn get_database(&self, subscription_id: &SubscriptionId, database_id: &DatabaseId) -> Result<Option<Database>> {
        let path = format!("/subscriptions/{}/databases/{}", subscription_id, database_id);
        let response = self.request(reqwest::Method::GET, &path).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Ok(None);
        }
        let dto: DatabaseDto = response.json().await?;
        Ok(Some(database_from_dto(dto)))
    }

    async fn update_database(
        &self,
        subscription_id: &SubscriptionId,
        database_id: &DatabaseId,
        update: &PartialShape,
    ) -> Result<Option<UpdateOutcome>> {
        if update.is_empty() {
            return Ok(None);
        }

        let path = format!("/subscriptions/{}/databases/{}", subscription_id, database_id);
        let body = UpdateDatabaseRequest {
            dataset_size_in_gb: update.dataset_size_in_gb,
            throughput_measurement: update.throughput_measurement.as_ref().map(|t| ThroughputMeasurementRequest {
                by: t.by.clone(),
                value: t.value,
            }),
        };

        let response = self.request(reqwest::Method::PUT, &path).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() && status != reqwest::StatusCode::ACCEPTED {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::ProviderRejected(ProviderError {
                status: status.as_u16(),
                body: body_text,
            }));
        }

        if status == reqwest::StatusCode::ACCEPTED {
            let task: TaskResponseDto = response.json().await?;
            return Ok(task.task_id.map(|task_id| UpdateOutcome::Task { task_id }));
        }

        Ok(Some(UpdateOutcome::Immediate))
    }

    async fn task_status(&self, task_id: &TaskId) -> Result<TaskStatus> {
        let path = format!("/tasks/{}", task_id);
        let response = self.request(reqwest::Method::GET, &path).send().await?;
        if !response.status().is_success() {
            return Ok(TaskStatus::Other("unknown".to_string()));
        }
        let dto: TaskStatusDto = response.json().await?;
        Ok(TaskStatus::from_str(&dto.status.unwrap_or_else(|| "unknown".to_string())))
    }

    async fn shard_types(&self) -> Result<Vec<ShardType>> {
        let dtos: Vec<ShardTypeDto> = self
            .client
            .get("https://app.redislabs.com/api/v1/shardTypes")
            .send()
            .await?
            .json()
            .await?;
        Ok(dtos
            .into_iter()
            .map(|d| ShardType {
                id: d.id,
                name: d.name.unwrap_or_default(),
                memory_gb: d.memory_size_gb.unwrap_or(0.0),
                throughput_ops: d.throughput.unwrap_or(0),
            })
            .collect())
    }

    async fn shard_type_pricings(&self) -> Result<Vec<ShardTypePricing>> {
        let dtos: Vec<ShardTypePricingDto> = self
            .client
            .get("https://app.redislabs.com/api/v1/shardTypePricings")
            .send()
            .await?
            .json()
            .await?;
        Ok(dtos
            .into_iter()
            .filter_map(|d| {
                Some(ShardTypePricing {
                    shard_type_id: d.shard_type_id?,
                    region: d.region_name.unwrap_or_default(),
                    cloud: d.cloud_name.unwrap_or_default(),
                    price: d.price.unwrap_or(0.0),
                })
            })
            .collect())
    }
}

fn subscription_from_dto(dto: SubscriptionDto) -> Subscription {
    use crate::types::PriceLineItem;

    let cloud = dto
        .cloud_details
        .as_ref()
        .and_then(|details| details.first())
        .and_then(|d| d.provider.clone());

    let pricing = dto
        .pricing
        .unwrap_or_default()
        .into_iter()
        .map(|p| PriceLineItem {
            kind: p.kind.unwrap_or_default(),
            type_details: p.type_details,
            quantity: p.quantity,
            price_per_unit: p.price_per_unit,
        })
        .collect();

    Subscription {
        id: SubscriptionId::from(dto.id),
        name: dto.name.unwrap_or_default(),
        cloud,
        pricing,
    }
}
