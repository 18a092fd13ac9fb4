use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing with an env-filtered fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise the service logs at debug in debug
/// mode and info in production, with the chattier infrastructure crates
/// held at warn.
pub fn init_telemetry(debug_mode: bool) {
    let default_level = if debug_mode { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{},sqlx=warn,lapin=warn,hyper=warn", default_level))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
