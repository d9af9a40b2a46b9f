use std::sync::Arc;

use anyhow::Context;
use common::storage::BlobStore;
use common::storage::filesystem::FilesystemBlobStore;
use common::storage::object::ObjectBlobStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use server::config::{AppConfig, StorageBackend, StorageConfig};
use server::database::init_db;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to initialize database")?;

    let blobs = open_blob_store(&config.storage).await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = server::build_router(AppState::new(config, db, blobs));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn open_blob_store(storage: &StorageConfig) -> anyhow::Result<Arc<dyn BlobStore>> {
    match storage.backend {
        StorageBackend::Filesystem => {
            let store = FilesystemBlobStore::new(storage.root.clone())
                .await
                .with_context(|| format!("Failed to open blob root {}", storage.root.display()))?;
            info!(root = %storage.root.display(), "using filesystem blob store");
            Ok(Arc::new(store))
        }
        StorageBackend::Object => {
            let object = storage
                .object
                .as_ref()
                .context("storage.backend = \"object\" requires a [storage.object] section")?;
            let store = ObjectBlobStore::new(object).context("Failed to configure object store")?;
            info!(bucket = %object.bucket, "using object blob store");
            Ok(Arc::new(store))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
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

    info!("Shutdown signal received");
}
