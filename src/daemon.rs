//! Poll-loop daemon (C12): a background ticker that drives the same
//! `run_cycle` the HTTP `/api/metrics` handler drives, so scaling reaction
//! time doesn't depend on an operator polling the API.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::control_plane::ControlPlane;
use crate::monitoring::MetricsClient;
use crate::provider::ProviderClient;

/// Wraps an `Arc<ControlPlane>` and loops on its configured autoscale poll
/// interval, calling `run_cycle` only while at least one database is opted
/// in, so an idle fleet with nothing opted in never wakes the provider or
/// metrics backends on a fixed schedule.
pub struct Daemon<P: ProviderClient, M: MetricsClient> {
    control_plane: Arc<ControlPlane<P, M>>,
}

impl<P: ProviderClient, M: MetricsClient> Daemon<P, M> {
    pub fn new(control_plane: Arc<ControlPlane<P, M>>) -> Self {
        Daemon { control_plane }
    }

    /// Spawn the daemon as a background task from an `Arc`, so the caller
    /// keeps a handle to the same control plane the HTTP router shares.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    #[instrument(skip(self))]
    async fn run(&self) {
        let interval = self.control_plane.autoscale_query_interval();
        info!(interval_secs = interval.as_secs(), "autoscale daemon started");

        loop {
            tokio::time::sleep(interval).await;

            if self.control_plane.opt_in.is_empty() {
                debug!("no databases opted in; skipping tick");
                continue;
            }

            let started = tokio::time::Instant::now();
            match self.control_plane.run_cycle(None).await {
                Ok(records) => {
                    info!(
                        databases = records.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "autoscale tick completed"
                    );
                }
                Err(e) => {
                    error!(error = %e, "autoscale tick failed");
                }
            }
        }
    }
}
