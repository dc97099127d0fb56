#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod api;
mod auth;
mod config;

use api::state::AppState;
use config::ServerConfig;
use lara_core::{AppCore, config::LaraConfig};
use std::sync::Arc;
use std::time::Duration;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing logger
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lara_server=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting Lara server");

    let lara_config = LaraConfig::load()?;
    let server_config = ServerConfig::load()?;
    if server_config.jwt_secret.is_none() {
        tracing::warn!("LARA_JWT_SECRET is not set; conversation API is disabled");
    }

    let core = Arc::new(AppCore::new(&lara_config).await?);
    let sweeper = server_config.session_idle().map(|max_idle| {
        tracing::info!(idle_secs = max_idle.as_secs(), "Evicting idle conversation sessions");
        core.sessions
            .clone()
            .spawn_idle_sweeper(max_idle, SWEEP_INTERVAL.min(max_idle))
    });
    let state = AppState::new(core.clone(), server_config.jwt_secret.clone());
    let app = api::router(state);

    let addr = server_config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Lara running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    core.sessions.flush_all().await;
    tracing::info!("Lara server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
