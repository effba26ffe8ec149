//! Mock completion service for tests

use super::{ChunkStream, Completion, CompletionRequest, LlmError, LlmService, Usage};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;

enum Scripted {
    Text(String),
    Chunks(Vec<Result<String, LlmError>>),
    Stream(ChunkStream),
    Error(LlmError),
}

/// Mock service that replays queued replies in order
pub struct MockLlmService {
    replies: Mutex<VecDeque<Scripted>>,
    model_id: String,
    /// Record of all requests made
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmService {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a reply; streamed as a single chunk
    pub fn queue_text(&self, text: impl Into<String>) {
        self.push(Scripted::Text(text.into()));
    }

    /// Queue a streamed reply made of these chunks
    pub fn queue_chunks(&self, chunks: &[&str]) {
        self.push(Scripted::Chunks(
            chunks.iter().map(|c| Ok((*c).to_string())).collect(),
        ));
    }

    /// Queue a stream that may fail part way
    pub fn queue_stream(&self, items: Vec<Result<String, LlmError>>) {
        self.push(Scripted::Chunks(items));
    }

    /// Queue an arbitrary chunk stream, polled only as the caller pulls
    pub fn queue_chunk_stream(&self, stream: ChunkStream) {
        self.push(Scripted::Stream(stream));
    }

    /// Queue a failure of the request itself
    pub fn queue_error(&self, error: LlmError) {
        self.push(Scripted::Error(error));
    }

    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn push(&self, reply: Scripted) {
        self.replies.lock().unwrap().push_back(reply);
    }

    fn next(&self, request: &CompletionRequest) -> Scripted {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Scripted::Error(LlmError::network("No mock response queued")))
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let text = match self.next(request) {
            Scripted::Text(text) => text,
            Scripted::Chunks(items) => items.into_iter().collect::<Result<String, _>>()?,
            Scripted::Stream(stream) => stream
                .collect::<Vec<_>>()
                .await
                .into_iter()
                .collect::<Result<String, _>>()?,
            Scripted::Error(e) => return Err(e),
        };
        Ok(Completion {
            text,
            usage: Usage::default(),
        })
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<ChunkStream, LlmError> {
        match self.next(request) {
            Scripted::Text(text) => Ok(futures::stream::iter(vec![Ok(text)]).boxed()),
            Scripted::Chunks(items) => Ok(futures::stream::iter(items).boxed()),
            Scripted::Stream(stream) => Ok(stream),
            Scripted::Error(e) => Err(e),
        }
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
