//! Completion service abstraction
//!
//! The session only talks to `LlmService`; `GeminiService` is the one remote
//! implementation.

mod error;
mod gemini;
mod types;

#[cfg(test)]
pub mod testing;

pub use error::LlmError;
#[cfg(test)]
pub use error::LlmErrorKind;
pub use gemini::{GeminiOptions, GeminiService};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for completion services
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Send the history plus new input and wait for the whole reply
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;

    /// Send the history plus new input and receive the reply incrementally
    async fn stream(&self, request: &CompletionRequest) -> Result<ChunkStream, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Logging wrapper for completion services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }

    fn log_failure(&self, e: &LlmError, duration_ms: u128, what: &str) {
        tracing::error!(
            model = %self.model_id,
            duration_ms = %duration_ms,
            error = %e.message,
            kind = ?e.kind,
            retryable = e.kind.is_retryable(),
            "{what} failed"
        );
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(completion) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    history_turns = request.history.len(),
                    input_tokens = completion.usage.input_tokens,
                    output_tokens = completion.usage.output_tokens,
                    "LLM request completed"
                );
            }
            Err(e) => self.log_failure(e, duration.as_millis(), "LLM request"),
        }

        result
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<ChunkStream, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.stream(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    history_turns = request.history.len(),
                    "LLM stream opened"
                );
            }
            Err(e) => self.log_failure(e, duration.as_millis(), "LLM stream"),
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockLlmService;
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_logging_service_is_transparent() {
        let mock = Arc::new(MockLlmService::new("mock-model"));
        mock.queue_text("respuesta");
        mock.queue_chunks(&["a", "b"]);
        let service = LoggingService::new(mock.clone());

        assert_eq!(service.model_id(), "mock-model");

        let request = CompletionRequest {
            history: vec![],
            input: "hola".to_string(),
        };
        let completion = service.complete(&request).await.unwrap();
        assert_eq!(completion.text, "respuesta");

        let chunks: Vec<_> = service.stream(&request).await.unwrap().collect().await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_logging_service_passes_errors() {
        let mock = Arc::new(MockLlmService::new("mock-model"));
        mock.queue_error(LlmError::auth("bad key"));
        let service = LoggingService::new(mock);

        let request = CompletionRequest {
            history: vec![],
            input: "hola".to_string(),
        };
        let err = service.stream(&request).await.err().unwrap();
        assert_eq!(err.kind, LlmErrorKind::Auth);
    }
}
