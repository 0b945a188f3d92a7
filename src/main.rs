use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use tally::api;
use tally::config::Config;
use tally::geo::{GeoResolver, MaxmindResolver, NoopResolver};
use tally::store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize geolocation
    let geo: Arc<dyn GeoResolver> = match config.store.geoip_db_path.as_deref() {
        Some(path) => {
            info!("Using GeoIP database: {}", path);
            Arc::new(MaxmindResolver::open(path)?)
        }
        None => {
            info!("No GeoIP database configured, recording bare IPs only");
            Arc::new(NoopResolver)
        }
    };

    // Open the store and start the cooldown sweeper
    info!("Opening store in {}", config.store.data_dir.display());
    let store = Arc::new(Store::open(
        &config.store.data_dir,
        geo,
        config.store.cooldown(),
    )?);
    let sweeper = store.start_sweeper(config.store.sweep_interval());

    // Serve badges
    let app = api::create_router(Arc::clone(&store))
        .into_make_service_with_connect_info::<SocketAddr>();
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Badge server listening on http://{}", addr);
    info!("   - Visitor badge at http://{}/v1/visit/:namespace/:key", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Flush snapshots before exit
    info!("Shutting down, flushing counter snapshots...");
    store.shutdown();
    store.flush().await;
    let _ = sweeper.await;
    info!("Snapshots flushed. Exiting");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
