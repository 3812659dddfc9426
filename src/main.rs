use anyhow::Context;
use std::net::SocketAddr;

use taboo_server::{config::Settings, routes, services::spawn_room_sweeper, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default filter
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taboo_server=info,tower_http=warn".into()),
        )
        .init();

    let settings = Settings::from_env().context("failed to load settings")?;
    let addr = settings.bind_addr()?;

    tracing::info!(
        environment = %settings.environment,
        team_size = settings.default_team_size,
        min_players = settings.min_players,
        "taboo server starting"
    );

    let sweep_interval = settings.sweep_interval;
    let state = AppState::new(settings);
    let sweeper = spawn_room_sweeper(state.store.clone(), sweep_interval);

    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!(%addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    sweeper.abort();
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
