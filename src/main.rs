//! Rustscape sync server
//!
//! Hosts the game world tick loop that builds every player's per-tick update.
//! Connections are attached by the transport layer through
//! [`GameWorld::login`] and [`GameWorld::queue_packet`].

use std::env;
use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use rustscape_sync::config::ServerConfig;
use rustscape_sync::game::world::{GameWorld, WorldSettings};
use rustscape_sync::VERSION;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let log_filter = init_logging();

    info!(version = VERSION, "Starting Rustscape sync server");

    // Load configuration
    let config = ServerConfig::load().await?;
    info!(
        "Configuration loaded from: {}",
        config.config_path.display()
    );

    if config.debug && env::var("RUST_LOG").is_err() {
        match log_filter.reload(EnvFilter::new(DEBUG_FILTER)) {
            Ok(()) => info!(filter = DEBUG_FILTER, "Debug logging enabled"),
            Err(e) => error!(error = %e, "Failed to enable debug logging"),
        }
    }

    // Create shutdown channel
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let world = Arc::new(GameWorld::with_settings(WorldSettings::from(&config)));

    // Start the game world tick
    let world_handle = {
        let world = world.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            world.run(&mut shutdown_rx).await;
        })
    };

    info!("World {} is ready for connections", config.world_id);

    // Wait for shutdown signal
    wait_for_shutdown(shutdown_tx.clone()).await;

    info!("Shutting down server...");
    if let Err(e) = world_handle.await {
        error!(error = %e, "World task failed");
    }

    info!(world = %world.info(), "Server shutdown complete");
    Ok(())
}

/// Default log filter
const DEFAULT_FILTER: &str = "info,rustscape_sync=debug";

/// Log filter applied when the config enables debug mode
const DEBUG_FILTER: &str = "debug,rustscape_sync=trace";

/// Initialize the logging/tracing system
///
/// `RUST_LOG` overrides the default filter; `RUSTSCAPE_LOG_FORMAT=json`
/// switches to JSON lines. The returned handle swaps the filter once the
/// configuration is known.
fn init_logging() -> reload::Handle<EnvFilter, Registry> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let (filter, handle) = reload::Layer::new(filter);

    let layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_level(true);

    let registry = tracing_subscriber::registry().with(filter);
    if env::var("RUSTSCAPE_LOG_FORMAT").is_ok_and(|format| format == "json") {
        registry.with(layer.json()).init();
    } else {
        registry.with(layer).init();
    }

    handle
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn wait_for_shutdown(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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

    // Signal all tasks to shut down
    let _ = shutdown_tx.send(());
}
