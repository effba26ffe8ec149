//! SolarTech AI - photovoltaic technical assistant
//!
//! Serves a chat page backed by a hosted Gemini model, with replies
//! streamed back to the browser as they are generated.

mod api;
mod config;
mod conversation;
mod llm;
mod session;
mod system_prompt;

use api::{create_router, AppState};
use config::AppConfig;
use llm::{GeminiOptions, GeminiService, LoggingService};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "solartech=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Nothing is served without a usable configuration
    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!(error = %e, "Configuration error");
        e
    })?;

    let gemini = GeminiService::new(GeminiOptions {
        api_key: config.api_key,
        model: config.model,
        base_url: config.base_url,
        generation: config.generation,
        system_instruction: system_prompt::SYSTEM_INSTRUCTION.to_string(),
        request_timeout: config.request_timeout,
    })
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize model client");
        e
    })?;

    let llm = Arc::new(LoggingService::new(Arc::new(gemini)));
    let state = AppState::new(llm, config.session_ttl);
    tracing::info!(model = %state.model_id, "Model client initialized");
    state.sessions.spawn_sweeper();

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("SolarTech AI server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
