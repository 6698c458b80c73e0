//! HTTP API layer (C9): a thin `axum` router over [`ControlPlane`]. Handlers
//! never contain business logic — they deserialize, call into the core, and
//! serialize the result, converting core errors via [`crate::error::Error`]'s
//! `IntoResponse` impl.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::control_plane::{ControlPlane, DatabaseRecord};
use crate::error::Result;
use crate::monitoring::MetricsClient;
use crate::provider::ProviderClient;
use crate::types::{DatabaseId, ScalingStatus, SubscriptionId};

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    databases: Vec<DatabaseRecord>,
}

async fn get_metrics<P: ProviderClient, M: MetricsClient>(
    State(state): State<Arc<ControlPlane<P, M>>>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<MetricsResponse>> {
    let override_window = query
        .period
        .as_deref()
        .and_then(|p| humantime::parse_duration(p).ok());
    let databases = state.run_cycle(override_window).await?;
    Ok(Json(MetricsResponse { databases }))
}

#[derive(Debug, Deserialize)]
pub struct OptInBody {
    subscription_id: SubscriptionId,
    database_id: DatabaseId,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    success: bool,
}

async fn enable_autoscale<P: ProviderClient, M: MetricsClient>(
    State(state): State<Arc<ControlPlane<P, M>>>,
    Json(body): Json<OptInBody>,
) -> Json<SuccessResponse> {
    state.opt_in.enable(body.subscription_id, body.database_id);
    Json(SuccessResponse { success: true })
}

async fn disable_autoscale<P: ProviderClient, M: MetricsClient>(
    State(state): State<Arc<ControlPlane<P, M>>>,
    Json(body): Json<OptInBody>,
) -> Json<SuccessResponse> {
    state.opt_in.disable(&body.subscription_id, &body.database_id);
    Json(SuccessResponse { success: true })
}

async fn list_enabled<P: ProviderClient, M: MetricsClient>(
    State(state): State<Arc<ControlPlane<P, M>>>,
) -> Json<Vec<(SubscriptionId, DatabaseId)>> {
    Json(state.opt_in.list())
}

async fn autoscaling_status<P: ProviderClient, M: MetricsClient>(
    State(state): State<Arc<ControlPlane<P, M>>>,
) -> Json<HashMap<DatabaseId, ScalingStatus>> {
    Json(state.status.non_idle())
}

async fn refresh_cloud<P: ProviderClient, M: MetricsClient>(
    State(state): State<Arc<ControlPlane<P, M>>>,
) -> Json<SuccessResponse> {
    state.invalidate_inventory();
    Json(SuccessResponse { success: true })
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    prometheus_query_interval_seconds: u64,
}

async fn get_config<P: ProviderClient, M: MetricsClient>(
    State(state): State<Arc<ControlPlane<P, M>>>,
) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        prometheus_query_interval_seconds: state.config.cloud_api_query_interval_seconds,
    })
}

/// Builds the complete router for one [`ControlPlane`] instance. Generic
/// over the provider/metrics client types so tests can wire this up
/// against mocks without a real network.
pub fn build_router<P: ProviderClient, M: MetricsClient>(state: Arc<ControlPlane<P, M>>) -> Router {
    Router::new()
        .route("/api/metrics", get(get_metrics::<P, M>))
        .route("/api/autoscale/enable", post(enable_autoscale::<P, M>))
        .route("/api/autoscale/disable", post(disable_autoscale::<P, M>))
        .route("/api/autoscale/enabled", get(list_enabled::<P, M>))
        .route("/api/autoscaling-status", get(autoscaling_status::<P, M>))
        .route("/api/refresh-cloud", post(refresh_cloud::<P, M>))
        .route("/api/config", get(get_config::<P, M>))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::monitoring::mock::MockMetricsClient;
    use crate::provider::mock::MockProviderClient;

    fn test_state() -> Arc<ControlPlane<MockProviderClient, MockMetricsClient>> {
        Arc::new(ControlPlane::new(MockProviderClient::new(), MockMetricsClient::new(), Config::default()))
    }

    #[tokio::test]
    async fn enable_then_list_round_trips() {
        let state = test_state();
        let body = OptInBody {
            subscription_id: SubscriptionId::from("1"),
            database_id: DatabaseId::from("2"),
        };
        let _ = enable_autoscale(State(state.clone()), Json(body)).await;
        let Json(list) = list_enabled(State(state)).await;
        assert_eq!(list, vec![(SubscriptionId::from("1"), DatabaseId::from("2"))]);
    }

    #[tokio::test]
    async fn disable_removes_entry() {
        let state = test_state();
        state.opt_in.enable(SubscriptionId::from("1"), DatabaseId::from("2"));
        let body = OptInBody {
            subscription_id: SubscriptionId::from("1"),
            database_id: DatabaseId::from("2"),
        };
        let _ = disable_autoscale(State(state.clone()), Json(body)).await;
        assert!(state.opt_in.is_empty());
    }

    #[tokio::test]
    async fn config_reports_poll_interval() {
        let state = test_state();
        let Json(config) = get_config(State(state)).await;
        assert_eq!(config.prometheus_query_interval_seconds, 3600);
    }

    #[test]
    fn metrics_query_period_parses_as_human_duration() {
        let query = MetricsQuery {
            period: Some("5m".to_string()),
        };
        assert_eq!(humantime::parse_duration(&query.period.unwrap()).unwrap(), Duration::from_secs(300));
    }
}
