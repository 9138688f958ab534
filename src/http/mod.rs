mod error;
mod handlers;
mod router;
mod types;

pub use error::ApiError;
pub use router::build_router;
pub use types::AppState;

use std::sync::Arc;

use anyhow::{anyhow, Context};
use tokio::{net::TcpListener, signal};
use tracing::{error, info};

use crate::config::Config;
use crate::legacy;
use crate::store::CollectionStore;

/// Opens the data directory, runs the legacy migration and wires the
/// shared state. Must run inside a Tokio runtime.
pub fn bootstrap(config: &Config) -> anyhow::Result<AppState> {
    let store = Arc::new(CollectionStore::open(&config.data_dir)?);
    let summary = legacy::init_data_dir(&store, &config.legacy_db)?;
    if let Some(archived) = &summary.archived_to {
        info!(
            migrated = summary.migrated.len(),
            skipped = summary.skipped.len(),
            archived = %archived.display(),
            "legacy database split into collection files"
        );
    }
    Ok(AppState::new(store))
}

pub async fn serve(config: &Config) -> anyhow::Result<()> {
    info!("Initializing state...");
    let state = bootstrap(config)?;
    let app = build_router(state);

    let address = config.bind_address();
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::AddrInUse {
            anyhow!(
                "port {} is already in use; another server is probably running",
                config.port
            )
        } else {
            anyhow::Error::new(e).context(format!("failed to bind {address}"))
        }
    })?;
    info!(
        data_dir = %config.data_dir.display(),
        "Server running on {address}"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server stopped with an error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
