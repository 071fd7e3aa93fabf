use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdf_library::{
    api,
    config::{BlobBackend, Config},
    library::Library,
    object_store as obj,
    storage::Store,
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "pdf-library starting");

    // Load configuration
    let config = Config::load()?;

    // Open the store
    let store = Store::open_with(&config.node.data_dir, config.store_options())?;
    info!("Store opened at: {}", config.node.data_dir);

    // Initialize blob backend
    let blobs: Arc<dyn obj::BlobStore> = match config.storage.backend {
        BlobBackend::Embedded => {
            info!("Keeping file content in the embedded store");
            Arc::new(obj::EmbeddedStore::new(store.clone()))
        }
        BlobBackend::Directory => {
            let dir = obj::DirectoryStore::new(&config.storage.blob_dir)?;
            info!("Keeping file content under: {}", config.storage.blob_dir);
            Arc::new(dir)
        }
    };

    let shutdown = CancellationToken::new();
    let state = Arc::new(AppState {
        config: config.clone(),
        library: Library::new(store, blobs),
        shutdown: shutdown.clone(),
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.node.bind_address).await?;
    info!("Listening on: {}", config.node.bind_address);

    // Cancelling the token ends open event streams so draining can finish
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
