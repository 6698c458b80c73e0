//! In-memory `ProviderClient` for tests: canned data plus a call log
//! guarded by a `parking_lot::Mutex` so assertions can inspect what was sent.

use parking_lot::Mutex;
use std::collections::HashMap;

use crate::error::Result;
use crate::types::{Database, DatabaseId, PartialShape, Subscription, SubscriptionId, TaskId, TaskStatus};

use super::models::UpdateOutcome;
use super::{ProviderClient, ShardType, ShardTypePricing};

#[derive(Debug, Clone)]
pub struct RecordedUpdate {
    pub subscription_id: SubscriptionId,
    pub database_id: DatabaseId,
    pub update: PartialShape,
}

pub struct MockProviderClient {
    subscriptions: Mutex<Vec<Subscription>>,
    databases: Mutex<HashMap<String, Vec<Database>>>,
    task_statuses: Mutex<HashMap<String, TaskStatus>>,
    shard_types: Mutex<Vec<ShardType>>,
    shard_pricings: Mutex<Vec<ShardTypePricing>>,
    recorded_updates: Mutex<Vec<RecordedUpdate>>,
    next_outcome: Mutex<Option<UpdateOutcome>>,
}

impl Default for MockProviderClient {
    fn default() -> Self {
        MockProviderClient {
            subscriptions: Mutex::new(Vec::new()),
            databases: Mutex::new(HashMap::new()),
            task_statuses: Mutex::new(HashMap::new()),
            shard_types: Mutex::new(Vec::new()),
            shard_pricings: Mutex::new(Vec::new()),
            recorded_updates: Mutex::new(Vec::new()),
            next_outcome: Mutex::new(Some(UpdateOutcome::Immediate)),
        }
    }
}

impl MockProviderClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscription(self, subscription: Subscription) -> Self {
        self.subscriptions.lock().push(subscription);
        self
    }

    pub fn with_databases(self, subscription_id: &SubscriptionId, databases: Vec<Database>) -> Self {
        self.databases.lock().insert(subscription_id.as_str().to_string(), databases);
        self
    }

    pub fn with_task_status(self, task_id: &str, status: TaskStatus) -> Self {
        self.task_statuses.lock().insert(task_id.to_string(), status);
        self
    }

    pub fn with_shard_types(self, types: Vec<ShardType>) -> Self {
        *self.shard_types.lock() = types;
        self
    }

    pub fn with_shard_pricings(self, pricings: Vec<ShardTypePricing>) -> Self {
        *self.shard_pricings.lock() = pricings;
        self
    }

    pub fn with_next_outcome(self, outcome: UpdateOutcome) -> Self {
        *self.next_outcome.lock() = Some(outcome);
        self
    }

    pub fn recorded_updates(&self) -> Vec<RecordedUpdate> {
        self.recorded_updates.lock().clone()
    }
}

impl ProviderClient for MockProviderClient {
    async fn list_subscriptions(&self) -> Result<Vec<Subscription>> {
        Ok(self.subscriptions.lock().clone())
    }

    async fn list_databases(&self, subscription_id: &SubscriptionId) -> Result<Vec<Database>> {
        Ok(self
            .databases
            .lock()
            .get(subscription_id.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn get_database(&self, subscription_id: &SubscriptionId, database_id: &DatabaseId) -> Result<Option<Database>> {
        Ok(self
            .databases
            .lock()
            .get(subscription_id.as_str())
            .and_then(|dbs| dbs.iter().find(|d| &d.id == database_id).cloned()))
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
        self.recorded_updates.lock().push(RecordedUpdate {
            subscription_id: subscription_id.clone(),
            database_id: database_id.clone(),
            update: update.clone(),
        });
        Ok(self.next_outcome.lock().clone())
    }

    async fn task_status(&self, task_id: &TaskId) -> Result<TaskStatus> {
        Ok(self
            .task_statuses
            .lock()
            .get(task_id.as_str())
            .cloned()
            .unwrap_or(TaskStatus::Other("unknown".to_string())))
    }

    async fn shard_types(&self) -> Result<Vec<ShardType>> {
        Ok(self.shard_types.lock().clone())
    }

    async fn shard_type_pricings(&self) -> Result<Vec<ShardTypePricing>> {
        Ok(self.shard_pricings.lock().clone())
    }
}
