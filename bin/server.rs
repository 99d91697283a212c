// Afiliados Dashboard - Web Server
// Loads every input once, then serves the dashboard until Ctrl+C

use afiliados_dashboard::{load_all, router, AppState, Dashboard, ServerConfig};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .init();

    info!("Afiliados por Régimen - dashboard server");

    // Fail before binding: never serve partial data
    let paths = config.data_paths();
    let data = load_all(&paths).context("failed to load input data")?;
    let dashboard = Dashboard::from_data(&data);
    for table in dashboard.tables() {
        info!(regime = %table.regime, departments = table.len(), "regime ready");
    }

    let app = router(AppState::new(dashboard));

    let addr = config.bind_addr().await?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("   API: http://{}/api/options", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl+C: {}", e);
    }
}
