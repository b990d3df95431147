//! Application builder — wires router + middleware + state into an Axum app.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tracing::{error, info, warn};

use memberhub_core::config::AppConfig;
use memberhub_core::error::AppError;
use memberhub_core::traits::{Clock, SystemClock};
use memberhub_database::Stores;
use memberhub_realtime::{CredentialVerifier, JwtVerifier, RealtimeEngine};
use memberhub_worker::CronScheduler;

use crate::router::build_router;
use crate::state::AppState;

/// Builds the shared state over already-opened stores.
pub fn build_state(
    config: AppConfig,
    stores: Stores,
    clock: Arc<dyn Clock>,
    verifier: Arc<dyn CredentialVerifier>,
) -> Result<AppState, AppError> {
    let engine = RealtimeEngine::new(&config, &stores, clock, verifier.clone())?;
    Ok(AppState {
        config: Arc::new(config),
        stores,
        engine: Arc::new(engine),
        verifier,
        started_at: Instant::now(),
    })
}

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Runs the MemberHub server until a shutdown signal arrives.
pub async fn run_server(config: AppConfig) -> Result<(), AppError> {
    info!("Starting MemberHub server...");

    // ── Step 1: Open stores ──────────────────────────────────────
    info!(backend = ?config.database.backend, "Opening stores...");
    let stores = Stores::from_config(&config.database).await?;

    // ── Step 2: Credential verifier ──────────────────────────────
    if config.auth.jwt_secret == "CHANGE_ME_IN_PRODUCTION" {
        warn!("auth.jwt_secret is the built-in default; set MEMBERHUB__AUTH__JWT_SECRET");
    }
    let verifier: Arc<dyn CredentialVerifier> = Arc::new(JwtVerifier::from_config(&config.auth));

    // ── Step 3: Realtime engine and state ────────────────────────
    let state = build_state(config.clone(), stores.clone(), Arc::new(SystemClock), verifier)?;
    let engine = state.engine.clone();

    // ── Step 4: Scheduled maintenance ────────────────────────────
    let scheduler = if config.worker.enabled {
        let mut scheduler = CronScheduler::new().await?;
        scheduler.register_default_tasks(&engine, &config).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        info!("Scheduler disabled by configuration");
        None
    };

    // ── Step 5: Build and start HTTP server ──────────────────────
    let app = build_app(state);
    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    info!("MemberHub server listening on {}", addr);

    let shutdown_engine = engine.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_engine.shutdown();
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 6: Tear down ────────────────────────────────────────
    if let Some(scheduler) = scheduler {
        if let Err(e) = scheduler.shutdown().await {
            error!(error = %e, "Scheduler shutdown failed");
        }
    }
    stores.close().await;

    info!("MemberHub server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
