//! planning-server: shift planning backend for ambulance stations
//!
//! Serves the JSON API for the planning web client and runs the scheduled
//! jobs (deadline warnings, shift reminders, monthly report).

mod api;
mod auth;
mod config;
mod db;
mod email;
mod error;
mod notify;
mod report;
mod scheduling;
mod services;
mod state;
mod tasks;
mod util;

use std::net::SocketAddr;

use config::Config;
use state::AppState;
use tasks::BackgroundTasks;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "planning_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        "Starting planning-server (env: {}, tz: {})",
        config.environment,
        config.timezone
    );

    let state = AppState::new(&config).await?;

    let mut tasks = BackgroundTasks::new();
    tasks::register_all(&mut tasks, &state);
    tasks.log_summary();

    let app = api::create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("planning-server listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tasks.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
