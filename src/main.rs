//! Voice agent - hands phone calls to an LLM and transfers them to a human
//!
//! Serves the control layer's per-call WebSocket: answers each call with an
//! LLM conversation script, then orchestrates the transfer tool when the
//! LLM invokes it.

mod api;
mod completion;
mod config;
mod policy;
mod protocol;
mod routes;
mod runtime;
mod script;
mod shutdown;
mod state_machine;
mod tools;
mod verbs;

use api::{create_router, AppState};
use config::ServiceConfig;
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_agent=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = ServiceConfig::from_env();
    if !config.call_defaults.is_empty() {
        tracing::info!(
            keys = ?config.call_defaults.keys().collect::<Vec<_>>(),
            "Per-call defaults loaded from environment"
        );
    }

    let state = AppState::new(config.call_defaults.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state, &config.ws_path)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(ws_path = %config.ws_path, "Voice agent listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
