//! Carrel server binary.

use anyhow::{Context, Result};
use carrel_core::config::AppConfig;
use carrel_server::{AppState, create_router, run_expiration_sweep};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use time::OffsetDateTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Carrel - circulation request queue storage
#[derive(Parser, Debug)]
#[command(name = "carreld")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "CARREL_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Startup banner
    tracing::info!("Carrel v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration (file is optional; every field has a default and
    // env vars can provide/override everything)
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}, using defaults", args.config);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("CARREL_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    // Register Prometheus metrics
    carrel_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    // Initialize the request store
    let store = carrel_requests::from_config(&config.store)
        .await
        .context("failed to initialize request store")?;
    store
        .health_check()
        .await
        .context("request store health check failed")?;
    tracing::info!("Request store initialized");

    // Create application state
    let state = AppState::new(config.clone(), store);

    // Spawn the built-in sweep scheduler if enabled. Deployments normally
    // drive the sweep from an external scheduler hitting the endpoint;
    // this loop covers single-node installs.
    if config.sweep.auto_schedule_enabled {
        let state_clone = state.clone();
        let interval = config.sweep.auto_schedule_interval();

        tokio::spawn(async move {
            tracing::info!(
                interval_secs = interval.as_secs(),
                "Automatic expiration sweep enabled"
            );
            loop {
                tokio::time::sleep(interval).await;
                match run_expiration_sweep(
                    state_clone.store.as_ref(),
                    &state_clone.config.sweep,
                    OffsetDateTime::now_utc(),
                )
                .await
                {
                    Ok(stats) => {
                        if stats.errors > 0 {
                            tracing::warn!(
                                errors = stats.errors,
                                "Automatic expiration sweep completed with errors"
                            );
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Automatic expiration sweep failed");
                    }
                }
            }
        });
    } else {
        tracing::info!("Automatic expiration sweep disabled");
    }

    // Create router
    let app = create_router(state);

    // Parse bind address
    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
