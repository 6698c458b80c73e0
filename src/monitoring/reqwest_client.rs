//! Production `MetricsClient` backed by `reqwest`, talking to a
//! Prometheus-compatible instant-query endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::error::Result;

use super::{MetricQuery, MetricsClient};

pub struct ReqwestMetricsClient {
    client: reqwest::Client,
    server_url: String,
}

impl ReqwestMetricsClient {
    pub fn new(server_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client builds with default config");
        ReqwestMetricsClient { client, server_url }
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    data: QueryData,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    result: Vec<ResultEntry>,
}

#[derive(Debug, Deserialize)]
struct ResultEntry {
    #[serde(default)]
    metric: std::collections::HashMap<String, String>,
    value: (f64, String),
}

#[async_trait]
impl MetricsClient for ReqwestMetricsClient {
    async fn query(&self, query: &MetricQuery) -> Result<Option<f64>> {
        let url = format!("{}/api/v1/query", self.server_url);
        let response = match self.client.get(&url).query(&[("query", &query.promql)]).send().await {
            Ok(r) => r,
            Err(_) => return Ok(None),
        };

        if !response.status().is_success() {
            return Ok(None);
        }

        let parsed: QueryResponse = match response.json().await {
            Ok(p) => p,
            Err(_) => return Ok(None),
        };

        if parsed.status != "success" {
            return Ok(None);
        }

        for entry in &parsed.data.result {
            let bdb_matches = query
                .bdb
                .as_ref()
                .map(|bdb| entry.metric.get("bdb") == Some(bdb))
                .unwrap_or(true);
            let cluster_matches = query
                .cluster
                .as_ref()
                .map(|cluster| entry.metric.get("cluster") == Some(cluster))
                .unwrap_or(true);

            if bdb_matches && cluster_matches {
                return Ok(entry.value.1.parse::<f64>().ok());
            }
        }

        Ok(None)
    }
}
