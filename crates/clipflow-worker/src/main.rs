mod handler;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::{Json, Router};
use tokio_util::sync::CancellationToken;

use clipflow_broker::BrokerClient;
use clipflow_core::{telemetry, PostprocessConfig};
use clipflow_storage::S3Storage;
use clipflow_transcode::{HlsTranscoder, VideoPipeline};

// Use mimalloc as the global allocator for better performance and lower
// fragmentation, especially when running on musl-based systems inside
// containers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Transcode jobs are long; give the in-flight one a generous window to
/// finish before the process exits and the broker redelivers.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = PostprocessConfig::from_env()?;
    telemetry::init_telemetry(config.debug_mode);

    let storage = S3Storage::new(&config.s3)
        .await
        .map_err(|e| anyhow::anyhow!("storage init failed: {}", e))?;
    storage.bootstrap().await;

    let broker = Arc::new(BrokerClient::connect(&config.rabbit).await?);

    let pipeline = Arc::new(VideoPipeline::new(
        Arc::new(storage),
        HlsTranscoder::new(config.ffmpeg_path.clone(), config.hls_segment_seconds),
        config.ffprobe_path.clone(),
    ));

    let shutdown = CancellationToken::new();
    let consumer_task = tokio::spawn(handler::run_convert_consumer(
        broker.clone(),
        pipeline,
        shutdown.clone(),
    ));

    let app = Router::new().route(
        "/health",
        get(|| async { Json(serde_json::json!({ "msg": "healthy" })) }),
    );
    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %addr,
        ffmpeg_path = %config.ffmpeg_path,
        hls_segment_seconds = config.hls_segment_seconds,
        "Post-processing worker ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    if tokio::time::timeout(SHUTDOWN_GRACE, async {
        let _ = consumer_task.await;
    })
    .await
    .is_err()
    {
        tracing::warn!("In-flight job did not finish within the grace period; it will be redelivered");
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
