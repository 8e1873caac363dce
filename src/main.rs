use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use unitsync::api::create_app;
use unitsync::config;
use unitsync::state::SyncCore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unitsync=info".into()),
        )
        .init();

    info!("unitsync starting...");

    let config = config::load_from_env().context("Failed to load configuration")?;
    info!(
        bind_addr = %config.server.bind_addr,
        room = %config.room.name,
        max_unit_id = config.room.max_unit_id,
        out_of_range = ?config.room.out_of_range,
        outbound_buffer = config.session.outbound_buffer,
        "Configuration loaded"
    );

    // Room state lives for the process lifetime and is lost on restart
    let core = Arc::new(SyncCore::new(config.room.clone()));
    let router = create_app(core, &config.session);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "Listening for WebSocket sessions");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("unitsync stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl_c signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
