use std::sync::Arc;

use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use autoscaler::config::Args;
use autoscaler::{Config, ControlPlane, Daemon, Secrets};

use autoscaler::http::build_router;
use autoscaler::monitoring::ReqwestMetricsClient;
use autoscaler::provider::ReqwestProviderClient;

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("autoscaler=info,tower_http=info")))
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)?;
    let secrets = Secrets::from_env()?;

    let provider = ReqwestProviderClient::new(secrets);
    let metrics = ReqwestMetricsClient::new(config.prometheus_server_url.clone());
    let bind_address = config.bind_address.clone();

    let control_plane = Arc::new(ControlPlane::new(provider, metrics, config));

    let daemon_handle = Daemon::new(control_plane.clone()).spawn();

    let app = build_router(control_plane).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(%bind_address, "autoscaler listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    daemon_handle.abort();
    Ok(())
}
