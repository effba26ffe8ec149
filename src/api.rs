//! HTTP API and the embedded chat page

mod assets;
mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::llm::LlmService;
use crate::session::SessionRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub model_id: String,
}

impl AppState {
    pub fn new(llm: Arc<dyn LlmService>, session_ttl: Duration) -> Self {
        Self {
            model_id: llm.model_id().to_string(),
            sessions: Arc::new(SessionRegistry::new(llm, session_ttl)),
        }
    }
}
