pub mod config;
pub mod error;
pub mod mock_data;
pub mod models;
pub mod render;
pub mod search;
pub mod server;
pub mod service;
pub mod session;
pub mod storage;
pub mod web_api;
pub mod wizard;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{PortalConfig, StorageKind};
use error::AppResult;
use server::AppState;
use service::{Latency, MockBackend, PaymentGateway};
use storage::{KeyValueStore, MemoryStore, SqliteStore};

/// Install the log subscriber. `RUST_LOG` wins over the configured filter.
pub fn init_logging(config: &PortalConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter));

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        eprintln!("Logging already initialised: {}", e);
    }
}

/// Open the configured session storage
pub fn open_storage(config: &PortalConfig) -> AppResult<Arc<dyn KeyValueStore>> {
    Ok(match config.storage {
        StorageKind::Memory => Arc::new(MemoryStore::new()),
        StorageKind::Sqlite => {
            config.ensure_data_dir()?;
            Arc::new(SqliteStore::open(&config.db_path)?)
        }
    })
}

/// Wire storage, mock backend and configuration into the server state
pub fn build_state(config: PortalConfig) -> AppResult<AppState> {
    let storage = open_storage(&config)?;
    let backend = MockBackend::new(
        Latency::new(config.latency_scale),
        PaymentGateway::new(config.payment_decline_rate),
    );
    log::info!(
        "Portal configured: storage {:?}, latency x{}, decline rate {}",
        config.storage,
        config.latency_scale,
        config.payment_decline_rate
    );
    Ok(AppState::new(config, backend, storage))
}

pub async fn run(config: PortalConfig) -> AppResult<()> {
    let state = build_state(config)?;
    server::start_server(state).await
}
