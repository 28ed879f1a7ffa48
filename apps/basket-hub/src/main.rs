//! # Basket Hub
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  hub.toml + BASKET_* ──► HubConfig                                     │
//! │                              │                                          │
//! │                              ▼                                          │
//! │  storage.backend ──► SqliteStore | JsonFileStore | MemoryStore          │
//! │                              │                                          │
//! │                              ▼                                          │
//! │  ListManager ──► preload("groceries") ──► seed import if empty          │
//! │                              │                                          │
//! │                              ▼                                          │
//! │  HubServer (ws://bind_addr:port/ws) ── until Ctrl+C / SIGTERM           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```bash
//! basket-hub                        # default config path
//! basket-hub --config ./hub.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use basket_core::DEFAULT_LIST_ID;
use basket_hub::{CommandContext, HubConfig, HubServer, StorageBackend};
use basket_lists::{seed, ListManager};
use basket_store::{BlobStore, JsonFileStore, MemoryStore, SqliteConfig, SqliteStore, StorageLayout};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config_path = parse_args()?;
    let config = HubConfig::load(config_path).context("loading configuration")?;
    info!(
        addr = %config.server.bind_address(),
        backend = %config.storage.backend,
        domain = %config.storage.domain,
        "Configuration loaded"
    );

    let backend = open_backend(&config).await?;
    let layout = StorageLayout::new(config.storage.domain.clone());
    let manager = Arc::new(ListManager::with_layout(backend, layout));

    manager.preload().await.context("loading default list")?;
    seed_if_empty(&config, &manager).await?;

    let context = CommandContext::new(manager, config.seed.data_dir.clone(), config.seed.country.clone());
    let handle = HubServer::new(config.server.bind_address(), context, config.access.clone())
        .start()
        .await?;

    info!(addr = %handle.local_addr(), "Basket hub listening on /ws");

    shutdown_signal().await;
    info!(clients = handle.client_count().await, "Stopping hub");
    handle.shutdown().await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,basket=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

fn parse_args() -> anyhow::Result<Option<PathBuf>> {
    let mut config_path = None;
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = args.next().context("--config needs a path")?;
                config_path = Some(PathBuf::from(path));
            }
            other => bail!("unknown option: {other}"),
        }
    }

    Ok(config_path)
}

async fn open_backend(config: &HubConfig) -> anyhow::Result<Arc<dyn BlobStore>> {
    let path = &config.storage.path;

    let backend: Arc<dyn BlobStore> = match config.storage.backend {
        StorageBackend::Sqlite => {
            let store = SqliteStore::new(SqliteConfig::new(path))
                .await
                .with_context(|| format!("opening database {}", path.display()))?;
            Arc::new(store)
        }
        StorageBackend::File => {
            tokio::fs::create_dir_all(path)
                .await
                .with_context(|| format!("creating storage directory {}", path.display()))?;
            Arc::new(JsonFileStore::new(path))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; nothing survives a restart");
            Arc::new(MemoryStore::new())
        }
    };

    Ok(backend)
}

/// Imports the country catalog into the default list when it has no
/// products yet.
async fn seed_if_empty(config: &HubConfig, manager: &ListManager) -> anyhow::Result<()> {
    let Some(country) = config.seed.country.as_deref().filter(|_| config.seed.import_on_empty) else {
        return Ok(());
    };

    if !manager.get_products(DEFAULT_LIST_ID).await?.is_empty() {
        return Ok(());
    }

    let products = seed::load_product_catalog(&config.seed.data_dir, country).await;
    if products.is_empty() {
        warn!(country = %country, "Seed catalog is empty, nothing imported");
        return Ok(());
    }

    let imported = manager.import_products(DEFAULT_LIST_ID, products).await?;
    info!(country = %country, imported, "Seeded default list");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
