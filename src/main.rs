//! Store assistant gateway
//!
//! Relays customer questions from a WebSocket chat or a phone call to an
//! LLM, answers store-hours, price, and stock lookups from a static catalog,
//! and sends the reply back over the same channel.

mod api;
mod catalog;
mod config;
mod dispatch;
mod llm;
mod session;
mod state_machine;
mod system_prompt;
mod tools;

use api::{create_router, AppState};
use catalog::Catalog;
use config::AppConfig;
use dispatch::Dispatcher;
use llm::{LlmService, LoggingService, OpenAIService};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tools::StoreTools;
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
                .unwrap_or_else(|_| "store_assistant=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env()?;

    let api_key = config.openai_api_key.clone().unwrap_or_else(|| {
        tracing::warn!("No LLM API key configured. Set OPENAI_API_KEY.");
        String::new()
    });
    let openai = OpenAIService::new(api_key, &config.model, &config.openai_base_url)?;
    let llm: Arc<dyn LlmService> = Arc::new(LoggingService::new(Arc::new(openai)));
    tracing::info!(
        model = %llm.model_id(),
        base_url = %config.openai_base_url,
        timeout_secs = config.llm_timeout.as_secs(),
        "Completion service configured"
    );

    let tools = StoreTools::new(Arc::new(Catalog::default()));
    let dispatcher = Dispatcher::new(llm, tools, config.llm_timeout);

    let shutdown = CancellationToken::new();
    let state = AppState::new(dispatcher, shutdown.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Store assistant listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("Store assistant stopped");
    Ok(())
}

/// Wait for Ctrl-C or SIGTERM, then cancel every open session
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown requested");
    shutdown.cancel();
}
