mod api;
mod cli;
mod router;
mod startup;
mod state;

use clap::Parser;
use tracing::info;

use herald_core::settings::load_dotenv;
use herald_core::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut settings = Settings::from_env();
    cli::Cli::parse().apply(&mut settings);
    settings.log_summary();

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let reload_interval = settings.source.reload_interval;

    let state = startup::build_app_state(settings)?;
    startup::initial_reload(&state).await;
    if let Some(every) = reload_interval {
        startup::spawn_reload_timer(state.coordinator.clone(), every);
    }
    // Dropping the watcher stops it; keep it for the life of the server.
    let _watcher = startup::watch_config(&state)?;

    let app = router::build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Herald listening on {}", addr);
    info!("API docs available at http://{}/docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
