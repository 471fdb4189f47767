//! Squad Quest API server entry point.
//!
//! Bootstraps tracing, configuration, the document store and the reward
//! engine, spawns the background jobs and serves the Axum router.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use squadquest_api::jobs::{
    daily_reminder_task, weekly_reset_task, DailyReminderConfig, WeeklyResetConfig,
};
use squadquest_api::{create_api_router, ApiConfig, ApiError, ApiResult, AppState, AuthConfig};
use squadquest_core::RewardRules;
use squadquest_engine::{RewardEngine, TracingDispatcher};
use squadquest_store::DocumentStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ApiResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let auth_config = Arc::new(AuthConfig::from_env());
    if is_production_environment() {
        auth_config.validate_for_production()?;
    }
    let api_config = ApiConfig::from_env();

    let store = Arc::new(DocumentStore::new());
    let engine = Arc::new(RewardEngine::new(
        store,
        RewardRules::default(),
        Arc::new(TracingDispatcher),
    ));

    let state = AppState::new(engine.clone(), auth_config, api_config.clone());
    let app: Router = create_api_router(state, &api_config);

    // Background schedulers, stopped through a shared shutdown signal.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let weekly = tokio::spawn(weekly_reset_task(
        engine.clone(),
        WeeklyResetConfig::from_env(),
        shutdown_rx.clone(),
    ));
    let reminders = tokio::spawn(daily_reminder_task(
        engine,
        DailyReminderConfig::from_env(),
        shutdown_rx,
    ));

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "starting Squad Quest API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = weekly.await;
    let _ = reminders.await;
    Ok(())
}

fn is_production_environment() -> bool {
    std::env::var("SQUADQUEST_ENVIRONMENT")
        .map(|e| matches!(e.to_lowercase().as_str(), "production" | "prod"))
        .unwrap_or(false)
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("SQUADQUEST_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("SQUADQUEST_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
