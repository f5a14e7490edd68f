//! PropCalc account service - HTTP entry point.

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use propcalc_auth::PasswordHasher;
use propcalc_node::api::{create_router, AppState};
use propcalc_node::config::Config;
use propcalc_store::RedisStore;

/// PropCalc account service - token auth and role administration
#[derive(Parser, Debug)]
#[command(name = "propcalc-node")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// API listen address
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen_addr: SocketAddr,

    /// Store connection URL (falls back to PROPCALC_STORE_URL)
    #[arg(long, default_value = "")]
    store_url: String,

    /// Password hashing secret (falls back to PROPCALC_AUTH_SECRET)
    #[arg(long, default_value = "")]
    auth_secret: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("propcalc={}", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting PropCalc account service");

    let config = Config {
        listen_addr: args.listen_addr,
        store_url: args.store_url,
        auth_secret: args.auth_secret,
        log_level: args.log_level,
    }
    .with_env_fallbacks();

    let store = RedisStore::new(&config.store_url)?;
    let state = AppState::new(Arc::new(store), PasswordHasher::new(&config.auth_secret));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(listen_addr = %config.listen_addr, "Account service listening");

    axum::serve(listener, app).await?;
    Ok(())
}
