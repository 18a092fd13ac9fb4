mod blacklist;
mod error;
mod handlers;
mod password;
mod state;
mod tokens;

use std::sync::Arc;

use clipflow_core::{telemetry, AuthConfig};
use clipflow_db::UserRepository;

use crate::blacklist::TokenBlacklist;
use crate::tokens::TokenSigner;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = AuthConfig::from_env()?;
    telemetry::init_telemetry(config.debug_mode);

    let pool = clipflow_db::connect_pool(&config.database).await?;
    clipflow_db::schema::create_user_tables(&pool).await?;

    let state = Arc::new(state::AppState {
        users: UserRepository::new(pool),
        tokens: TokenSigner::from_pem(&config.rsa)?,
        blacklist: TokenBlacklist::connect(&config.redis.url()).await?,
    });

    let app = handlers::router(state);
    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Auth service ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

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
