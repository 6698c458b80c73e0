//! Monitoring client (half of C1/C4): a Prometheus-compatible instant-query
//! API, abstracted the same way as the provider client so gather logic can
//! be tested without a real Prometheus.

pub mod mock;
pub mod reqwest_client;

use async_trait::async_trait;

use crate::error::Result;

pub use mock::MockMetricsClient;
pub use reqwest_client::ReqwestMetricsClient;

/// One instant-query request: a PromQL expression plus the `bdb`/`cluster`
/// label values a matching result series must carry.
#[derive(Debug, Clone)]
pub struct MetricQuery {
    pub promql: String,
    pub bdb: Option<String>,
    pub cluster: Option<String>,
}

/// A single-method trait, so (unlike the multi-method `ProviderClient`)
/// `#[async_trait]` boxes the one future rather than needing per-method
/// `impl Future<..> + Send` signatures — trivially `Send`, and matching
/// the teacher's `HttpClient` (also single-method).
#[async_trait]
pub trait MetricsClient: Send + Sync + 'static {
    /// Runs one instant query, returning the first result series whose
    /// `bdb`/`cluster` labels match (when given), or `None` on no match,
    /// empty result set, or any transport/parse failure — metrics gather
    /// never raises on a missing data point.
    async fn query(&self, query: &MetricQuery) -> Result<Option<f64>>;
}
