// Framework bootstrap for the matchmaking runtime.

use std::io::Result;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::frameworks::config;
use crate::interface_adapters::routes;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{FifoQueueStrategy, MatchmakingEngine, MatchmakingStrategy, ShutdownSignal};

fn init_runtime() {
    // Load .env locally; safe to ignore when not present.
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

// The shipped pairing policy; swap here for rating or region based variants.
fn build_strategy() -> Box<dyn MatchmakingStrategy> {
    Box::new(FifoQueueStrategy::new())
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;

    // Construct the engine once; its handle lives as long as the process.
    let shutdown = Arc::new(ShutdownSignal::new());
    let engine = MatchmakingEngine::start(build_strategy(), Arc::clone(&shutdown));
    let state = Arc::new(AppState { engine });
    let app = routes::app(state);

    tracing::info!(%address, "listening");

    let serve_shutdown = Arc::clone(&shutdown);
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_termination().await;
            serve_shutdown.raise();
        })
        .await
        .inspect_err(|error| {
            tracing::error!(%error, "server error");
        });

    // Stop the engine loop even when serving ended on its own.
    shutdown.raise();
    result
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling.
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|error| {
            tracing::error!(%address, %error, "failed to bind");
        })?;

    run(listener).await
}

// Resolve when the process receives ctrl-c.
async fn wait_for_termination() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
    }
}
