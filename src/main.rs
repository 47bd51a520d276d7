//! Redis Hash Cache - demo host
//!
//! Serves the cache service over HTTP and sweeps the tables configured for
//! it in the background.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use redis_hash_cache::api::create_router;
use redis_hash_cache::{
    spawn_sweep_task, AppState, CacheService, Config, HashStore, MemoryHashStore,
    RecordCodec, RedisHashStore, TableResolver, TypeRegistry,
};

/// Connection string selecting the in-process store
const MEMORY_STORE: &str = "memory://";

/// Main entry point for the demo host.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from file and environment variables
/// 3. Connect the hash store and build the cache service
/// 4. Start the background sweep task
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "redis_hash_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Redis Hash Cache");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        "Configuration loaded: tables={}, port={}, sweep_interval={}s",
        config.hash_tables.len(),
        config.server_port,
        config.sweep_interval_secs
    );

    let store: Arc<dyn HashStore> = if config.connection_string.starts_with(MEMORY_STORE) {
        info!("Using in-memory hash store");
        Arc::new(MemoryHashStore::new())
    } else {
        Arc::new(
            RedisHashStore::connect(&config.connection_string)
                .await
                .context("Failed to connect to Redis")?,
        )
    };

    let registry = TypeRegistry::with_builtins();
    let resolver = TableResolver::from_config(&config);
    let sweep_tables = resolver.sweep_table_ids();
    let service = Arc::new(CacheService::new(
        store,
        RecordCodec::new(registry),
        resolver,
    ));

    let sweep_handle = spawn_sweep_task(
        service.clone(),
        sweep_tables,
        Duration::from_secs(config.sweep_interval_secs),
    );
    info!("Background sweep task started");

    let app = create_router(AppState::from_shared(service));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sweep_handle))
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the sweep task and allows graceful shutdown.
async fn shutdown_signal(sweep_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    sweep_handle.abort();
    warn!("Sweep task aborted");
}
