mod comic;
mod config;
mod errors;
mod genai_client;
mod models;
mod pdf;
mod routes;
mod session;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::genai_client::GeminiImageClient;
use crate::routes::build_router;
use crate::session::SessionRegistry;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Comicforge v{}", env!("CARGO_PKG_VERSION"));

    // Initialize image generation client (API key is read per call)
    let generator = GeminiImageClient::new(&config.gemini_model, &config.gemini_api_base)?;
    info!("Page generator initialized (model: {})", generator.model());
    if config::optional_env(genai_client::API_KEY_ENV).is_none() {
        info!(
            "{} is not set; sessions must supply their own API key",
            genai_client::API_KEY_ENV
        );
    }

    let sessions = SessionRegistry::new();
    if config.session_idle_secs > 0 {
        let max_idle = Duration::from_secs(config.session_idle_secs);
        info!("Sessions expire after {}s idle", config.session_idle_secs);
        tokio::spawn(sessions.clone().expire_idle(max_idle));
    }

    let state = AppState {
        config: config.clone(),
        sessions,
        generator: Arc::new(generator),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
