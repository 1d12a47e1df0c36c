mod chat;
mod config;
mod errors;
mod estimation;
mod llm_client;
mod models;
mod pipeline;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::pipeline::store::{spawn_janitor, SessionStore};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting DevCost API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the model client
    let llm = LlmClient::new(config.gemini_api_key.clone(), config.gemini_api_base.clone())?;
    info!(
        "LLM client initialized (market data: {}, estimation: {}, chat: {})",
        llm_client::MARKET_DATA_MODEL,
        llm_client::ESTIMATION_MODEL,
        llm_client::CHAT_MODEL
    );
    info!(
        "Market data on failure: {:?}; deadlines {}s/{}s/{}s",
        config.market_data_policy,
        config.market_data_timeout_secs,
        config.estimation_timeout_secs,
        config.chat_timeout_secs
    );

    // Sessions live in memory; idle ones are evicted after the TTL
    let sessions = SessionStore::default();
    spawn_janitor(sessions.clone(), config.session_ttl());

    let state = AppState {
        model: Arc::new(llm),
        sessions,
        config: config.clone(),
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
