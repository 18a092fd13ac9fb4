mod error;
mod ingest;
mod routes;
mod state;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use clipflow_broker::BrokerClient;
use clipflow_core::{telemetry, ChannelConfig};
use clipflow_db::VideoRepository;

/// How long in-flight consumers get to finish after the server stops.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = ChannelConfig::from_env()?;
    telemetry::init_telemetry(config.debug_mode);

    let pool = clipflow_db::connect_pool(&config.database).await?;
    clipflow_db::schema::create_video_tables(&pool).await?;
    let videos = VideoRepository::new(pool);

    let broker = Arc::new(BrokerClient::connect(&config.rabbit).await?);

    let shutdown = CancellationToken::new();
    let ingest_task = tokio::spawn(ingest::run_upload_consumer(
        broker.clone(),
        videos.clone(),
        shutdown.clone(),
    ));
    let confirm_task = tokio::spawn(ingest::run_confirm_consumer(
        broker.clone(),
        videos.clone(),
        shutdown.clone(),
    ));

    let state = Arc::new(state::AppState { videos });
    let app = routes::router(state);

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Channel service ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    if tokio::time::timeout(SHUTDOWN_GRACE, async {
        let _ = ingest_task.await;
        let _ = confirm_task.await;
    })
    .await
    .is_err()
    {
        tracing::warn!("Consumers did not drain within the grace period");
    }

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        _ = terminate => tracing::info!("Received terminate signal"),
    }

    tracing::info!("Shutting down gracefully...");
}
