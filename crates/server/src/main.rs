//! Order queue server
//!
//! Serves order placement and completion, wait-time estimates and the
//! debug views over HTTP.

use anyhow::Result;
use queue_server::{api, build_state, ServerConfig};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting queue-server");

    let config = ServerConfig::load()?;
    info!(
        node_name = %config.node_name,
        store_backend = ?config.store_backend,
        retrain_threshold = config.retrain_threshold,
        "Server configured"
    );

    let app_state = build_state(&config)?;
    let service = app_state.service.clone();

    let summary = service.start().await?;
    if summary.model_source.is_none() {
        warn!("Serving fallback estimates until a model is trained");
    }
    info!(
        active_orders = summary.active_orders,
        restored_samples = summary.restored_samples,
        "Order state restored"
    );

    let backend = format!("{:?}", config.store_backend).to_lowercase();
    service
        .logger()
        .log_startup(SERVICE_VERSION, &summary.model_version, &backend);

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Ok(())) => service.logger().log_shutdown("API server exited"),
                Ok(Err(e)) => {
                    service.logger().log_shutdown("API server failed");
                    return Err(e);
                }
                Err(e) => {
                    service.logger().log_shutdown("API server task panicked");
                    return Err(e.into());
                }
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            service.logger().log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
