//! Quiz Rush Back binary entrypoint wiring REST, SSE, and the state tree together.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod config;
mod dto;
mod error;
mod model;
mod routes;
mod services;
mod state;
mod store;

use config::AppConfig;
use state::AppState;
use store::{StateTree, memory::MemoryTree};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let admin_token = resolve_admin_token(&config);
    let tree: Arc<dyn StateTree> = Arc::new(MemoryTree::new());

    let app_state = AppState::new(config, tree, admin_token);

    services::question_service::install_bank(&app_state)
        .await
        .context("installing question bank")?;

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Resolve the admin token from the environment, then the config file,
/// minting a fresh one when neither is set.
fn resolve_admin_token(config: &AppConfig) -> String {
    if let Ok(token) = env::var("ADMIN_TOKEN") {
        if !token.trim().is_empty() {
            return token;
        }
    }

    if let Some(token) = config.admin_token() {
        return token.to_string();
    }

    let minted = Uuid::new_v4().to_string();
    info!(token = %minted, "no admin token configured; minted one for this run");
    minted
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: state::SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
