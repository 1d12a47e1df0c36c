use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::GenerativeModel;
use crate::pipeline::store::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Every model call goes through this. `LlmClient` in production.
    pub model: Arc<dyn GenerativeModel>,
    pub sessions: SessionStore,
    pub config: Config,
}
