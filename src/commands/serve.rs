//! The `serve` subcommand.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::error::AppError;
use crate::bridge::{CommandBridge, CommandInvocation, CommandRunner};
use crate::config::AppConfig;
use crate::server::{AppState, Server};
use crate::store::{LogLevel, Store};

/// Open the shared store, initialise the worker and serve until shutdown.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or the server fails.
/// A failed `init_db` is logged and does not stop startup.
pub async fn serve(config: AppConfig, port: Option<u16>, skip_init: bool) -> Result<(), AppError> {
    let store = Store::open(config.store_path()).await?;
    let bridge = CommandBridge::from_config(&config.worker);
    tracing::info!(bridge = ?bridge, "Worker bridge configured");
    let runner: Arc<dyn CommandRunner> = Arc::new(bridge);

    if !skip_init {
        initialise_worker(runner.as_ref(), &store).await;
    }

    let mut server_config = config.server;
    if let Some(port) = port {
        server_config.port = port;
    }

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    Server::new(AppState::new(runner, store))
        .with_config(server_config)
        .run(cancel)
        .await?;
    Ok(())
}

/// Run `init_db` once; the outcome goes to `tracing` and the log store.
///
/// Returns whether the worker reported success.
pub async fn initialise_worker(runner: &dyn CommandRunner, store: &Store) -> bool {
    match runner.invoke(CommandInvocation::init_db()).await {
        Ok(result) if result.success() == Some(true) => {
            store.record(LogLevel::Info, "Worker database initialised").await;
            true
        }
        Ok(result) => {
            let reason = result.error_message().unwrap_or("no error message");
            tracing::warn!(error = %reason, "Worker database initialisation reported failure");
            store
                .record(LogLevel::Warning, format!("Startup init_db failed: {reason}"))
                .await;
            false
        }
        Err(e) => {
            tracing::warn!(error = %e, kind = e.kind(), "Worker database initialisation failed");
            store
                .record(LogLevel::Warning, format!("Startup init_db failed: {e}"))
                .await;
            false
        }
    }
}

/// Cancel `cancel` on Ctrl-C or SIGTERM.
fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        tracing::info!("Shutdown signal received");
        cancel.cancel();
    });
}
