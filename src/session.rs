//! Session controller
//!
//! A `ChatSession` owns one transcript and runs the turn protocol:
//! record the user turn, map the history before it, call the model, assemble
//! the reply and record exactly one assistant turn, even when the call fails.

mod registry;

pub use registry::{SessionRegistry, SharedSession};

use crate::conversation::{map_history, ConversationStore, Message, ResponseAssembler};
use crate::llm::{CompletionRequest, LlmError, LlmService};
use crate::system_prompt::connection_error_message;
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;

/// How the reply is requested from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyMode {
    /// Incremental chunks, each rendered as it arrives
    #[default]
    Stream,
    /// One blocking call returning the whole text
    Whole,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("La pregunta está vacía")]
    EmptyInput,
}

/// Result of one completed turn
#[derive(Debug)]
pub struct TurnOutcome {
    /// The assistant turn that was recorded
    pub reply: Message,
    /// Set when the reply is the fallback text
    pub error: Option<LlmError>,
}

/// Where a turn's progress is rendered
#[async_trait]
pub trait ResponseSink: Send {
    /// The user turn was recorded
    async fn user_turn(&mut self, message: &Message);

    /// The reply so far, with the typing indicator
    async fn partial(&mut self, view: &str);

    /// A user-visible error message
    async fn error(&mut self, message: &str);

    /// The assistant turn was recorded; this is the last call of a turn
    async fn finished(&mut self, message: &Message);
}

pub struct ChatSession {
    id: String,
    transcript: ConversationStore,
    llm: Arc<dyn LlmService>,
}

impl ChatSession {
    pub fn new(id: impl Into<String>, llm: Arc<dyn LlmService>) -> Self {
        Self {
            id: id.into(),
            transcript: ConversationStore::new(),
            llm,
        }
    }

    #[cfg(test)]
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.all()
    }

    /// Run one full turn for `input`.
    ///
    /// Remote failures do not surface as `Err`: they are reported to the sink
    /// and the fallback text is recorded as the reply.
    pub async fn ask(
        &mut self,
        input: &str,
        mode: ReplyMode,
        sink: &mut dyn ResponseSink,
    ) -> Result<TurnOutcome, SessionError> {
        if input.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }

        let question = Message::user(input);
        self.transcript.append(question.clone());
        sink.user_turn(&question).await;

        let request = CompletionRequest {
            history: map_history(self.transcript.history_before_last()),
            input: input.to_string(),
        };

        let mut assembler = ResponseAssembler::new();
        let result = match mode {
            ReplyMode::Stream => self.stream_reply(&request, &mut assembler, sink).await,
            ReplyMode::Whole => self.whole_reply(&request, &mut assembler).await,
        };

        let (finalized, error) = match result {
            Ok(()) => {
                let finalized = assembler.finish();
                let error = finalized
                    .is_fallback()
                    .then(|| LlmError::malformed("Empty completion"));
                (finalized, error)
            }
            Err(e) => (assembler.fail(), Some(e)),
        };

        if let Some(e) = &error {
            tracing::warn!(
                session_id = %self.id,
                error = %e,
                kind = ?e.kind,
                state = ?assembler.state(),
                chunks = assembler.chunk_count(),
                "Reply replaced by fallback"
            );
            sink.error(&connection_error_message(e)).await;
        }

        let reply = Message::assistant(finalized.text());
        self.transcript.append(reply.clone());
        sink.finished(&reply).await;

        tracing::info!(
            session_id = %self.id,
            ?mode,
            history_turns = request.history.len(),
            chunks = assembler.chunk_count(),
            transcript_len = self.transcript.len(),
            "Turn completed"
        );

        Ok(TurnOutcome { reply, error })
    }

    async fn stream_reply(
        &self,
        request: &CompletionRequest,
        assembler: &mut ResponseAssembler,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), LlmError> {
        let mut chunks = self.llm.stream(request).await?;
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            // Rendered before the next chunk is pulled
            if let Some(view) = assembler.push_chunk(&chunk) {
                sink.partial(&view).await;
            }
        }
        Ok(())
    }

    async fn whole_reply(
        &self,
        request: &CompletionRequest,
        assembler: &mut ResponseAssembler,
    ) -> Result<(), LlmError> {
        let completion = self.llm.complete(request).await?;
        assembler.push_chunk(&completion.text);
        Ok(())
    }
}
