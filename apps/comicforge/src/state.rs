use std::sync::Arc;

use crate::config::Config;
use crate::genai_client::PageGenerator;
use crate::session::SessionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Live authoring sessions, one isolated store per user.
    pub sessions: SessionRegistry,
    /// Pluggable page generator. Default: GeminiImageClient.
    pub generator: Arc<dyn PageGenerator>,
}
