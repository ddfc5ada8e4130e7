//! IPIAL registry sync server.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ipial_registry::config::{Config, DEFAULT_RESET_PASSWORD};
use ipial_registry::db::Repository;
use ipial_registry::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting IPIAL registry server");
    tracing::info!("Data path: {:?}", config.data_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.reset_password == DEFAULT_RESET_PASSWORD {
        tracing::warn!("Using the default reset password (IPIAL_RESET_PASSWORD)");
    }

    // Open the data document
    let repo = Arc::new(Repository::open(&config.data_path).await?);
    let status = repo.status().await?;
    tracing::info!(
        "Loaded {} candidates and {} log entries",
        status.candidates,
        status.logs
    );

    // Create application state
    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
