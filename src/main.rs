mod config;
mod error;
mod models;
mod routes;
mod services;
mod shutdown;
mod state;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "order_relay=info,tower_http=info".into()),
        )
        .init();

    // Load config
    let config = Config::from_env()?;
    let port = config.port;

    tracing::info!(
        port,
        environment = config.environment(),
        intake_mode = ?config.intake_mode,
        "Starting order relay"
    );

    let notifiers = services::build_notifiers(&config)?;
    services::check_connections(&notifiers).await;

    let state = AppState::new(config, notifiers);
    routes::health::init_start_time();

    // Build router
    let app = routes::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Listening on 0.0.0.0:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::signal_handler())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
