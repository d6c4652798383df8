//! Entry point for the `codegate-gateway` HTTP server.

use std::{net::SocketAddr, sync::Arc};

use codegate_gateway::{
    config::GatewayConfig,
    routes::{create_router, AppState},
    session::{spawn_sweeper, SessionStore},
};
use codegate_sandbox::{HttpSandbox, SandboxBackend};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("failed to load .env: {e}");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match GatewayConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let sandbox = match HttpSandbox::new(&config.sandbox_url) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(url = %config.sandbox_url, error = %e, "invalid sandbox URL");
            std::process::exit(1);
        }
    };
    if let Err(e) = sandbox.health_check().await {
        tracing::warn!(url = %config.sandbox_url, error = %e, "sandbox service not reachable yet");
    }

    if let Err(e) = tokio::fs::create_dir_all(&config.runs_dir).await {
        tracing::error!(dir = %config.runs_dir.display(), error = %e, "failed to create runs directory");
        std::process::exit(1);
    }

    let sessions = Arc::new(SessionStore::new());
    let sweeper = spawn_sweeper(Arc::clone(&sessions), config.sweep_interval);

    let state = AppState::from_config(&config, Arc::new(sandbox), sessions);
    let app = create_router(state);

    let listener = match tokio::net::TcpListener::bind(&config.listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %config.listen_addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };

    info!(
        addr = %config.listen_addr,
        runs_dir = %config.runs_dir.display(),
        sandbox = %config.sandbox_url,
        "codegate-gateway listening"
    );

    let served = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await;
    sweeper.abort();

    if let Err(e) = served {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
    info!("codegate-gateway stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
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
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
