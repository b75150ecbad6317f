//! Order queue HTTP service
//!
//! Wires configuration into a [`QueueService`] and exposes it over axum.

pub mod api;
pub mod config;

use anyhow::{Context, Result};
use queue_lib::{
    notify::NotificationDispatcher,
    observability::{EventLogger, QueueMetrics},
    predictor::WaitTimePredictor,
    store::{FileOrderStore, InMemoryOrderStore, OrderStore, StoreBackend},
    QueueService,
};
use std::sync::Arc;
use tracing::info;

pub use api::{create_router, serve, AppState};
pub use config::ServerConfig;

/// Build the order store selected by `config`
pub fn build_store(config: &ServerConfig) -> Result<Arc<dyn OrderStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            info!("Using in-memory order store");
            Ok(Arc::new(InMemoryOrderStore::new()))
        }
        StoreBackend::File => {
            info!(path = %config.store_path.display(), "Using file order store");
            let store = FileOrderStore::open(&config.store_path).with_context(|| {
                format!("Failed to open order store {:?}", config.store_path)
            })?;
            Ok(Arc::new(store))
        }
    }
}

/// Assemble the service graph. The service is not started.
pub fn build_state(config: &ServerConfig) -> Result<Arc<AppState>> {
    let store = build_store(config)?;
    let predictor = Arc::new(WaitTimePredictor::new(config.predictor_config()));
    let dispatcher =
        NotificationDispatcher::with_gateways(config.sms_gateway()?, config.email_gateway()?)
            .context("Failed to build notification channels")?;

    let service = QueueService::new(store, predictor, dispatcher)
        .with_logger(EventLogger::new(&config.node_name));

    Ok(Arc::new(AppState::new(Arc::new(service), QueueMetrics::new())))
}
