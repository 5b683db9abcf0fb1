//! minikart-api - order and catalog HTTP service
//!
//! Startup loads every coupon source before the listener opens; a source
//! that cannot be loaded aborts startup.

use anyhow::{Context, Result};
use clap::Parser;
use minikart_common::config::{resolve_config_path, LoggingConfig, TomlConfig};
use minikart_common::CouponValidator;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use minikart_api::{build_router, coupon_loader, db, AppState};

#[derive(Debug, Parser)]
#[command(name = "minikart-api", version, about = "Mini-Kart order and catalog service")]
struct Args {
    /// Path to the TOML config file (falls back to MINIKART_CONFIG, then ./minikart.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let config = TomlConfig::resolve(Some(&config_path)).context("Invalid configuration")?;

    init_tracing(&config.logging);

    info!("Starting Mini-Kart API v{}", env!("CARGO_PKG_VERSION"));
    if config_path.exists() {
        info!("Configuration: {}", config_path.display());
    } else {
        warn!(
            "Config file not found at {}, running on defaults and environment",
            config_path.display()
        );
    }

    let pool = db::init_database(&config.database.path, config.database.max_connections)
        .await
        .context("Failed to initialise database")?;
    info!("Database path: {}", config.database.path.display());

    let shutdown = CancellationToken::new();

    let loader = coupon_loader(&config).context("Failed to build coupon loader")?;
    let validator = match CouponValidator::new(
        &shutdown,
        config.coupons.validator_config(),
        loader,
    )
    .await
    {
        Ok(validator) => Arc::new(validator),
        Err(e) => {
            error!("Failed to load coupon sources: {}", e);
            return Err(e).context("Coupon validator initialisation failed");
        }
    };
    info!(
        sources = validator.source_count(),
        total_codes = validator.total_codes(),
        "Coupon validator ready"
    );

    let state = AppState::new(
        pool.clone(),
        Arc::clone(&validator),
        config.auth.api_key.as_str(),
        shutdown.clone(),
    );
    let app = build_router(state);

    let address = config.server.address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("minikart-api listening on http://{}", address);
    info!("Health check: http://{}/health", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("Server error")?;

    // Outstanding validations observe this and stop
    shutdown.cancel();

    match Arc::try_unwrap(validator) {
        Ok(validator) => validator.close(),
        Err(_) => warn!("Coupon validator still referenced at shutdown"),
    }
    pool.close().await;

    info!("minikart-api stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }

    // Abort in-flight promo lookups instead of letting them run to their deadline
    shutdown.cancel();
}
