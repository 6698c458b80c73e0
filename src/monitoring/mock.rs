//! In-memory `MetricsClient` for tests: a fixed `promql -> value` table.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::error::Result;

use super::{MetricQuery, MetricsClient};

#[derive(Default)]
pub struct MockMetricsClient {
    values: Mutex<HashMap<String, f64>>,
    queries_seen: Mutex<Vec<String>>,
}

impl MockMetricsClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, promql: impl Into<String>, value: f64) -> Self {
        self.values.lock().insert(promql.into(), value);
        self
    }

    pub fn queries_seen(&self) -> Vec<String> {
        self.queries_seen.lock().clone()
    }
}

#[async_trait]
impl MetricsClient for MockMetricsClient {
    async fn query(&self, query: &MetricQuery) -> Result<Option<f64>> {
        self.queries_seen.lock().push(query.promql.clone());
        Ok(self.values.lock().get(&query.promql).copied())
    }
}
