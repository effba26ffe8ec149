//! Google Gemini provider implementation

use super::types::{ChunkStream, Completion, CompletionRequest, GenerationConfig, Usage};
use super::{LlmError, LlmService};
use crate::config::ConfigError;
use crate::conversation::MappedTurn;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything needed to construct a `GeminiService`
#[derive(Debug, Clone)]
pub struct GeminiOptions {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub generation: GenerationConfig,
    pub system_instruction: String,
    /// Covers the whole request, streamed body included
    pub request_timeout: Duration,
}

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    api_key: String,
    generate_url: String,
    stream_url: String,
    model_id: String,
    generation: GenerationConfig,
    system_instruction: String,
}

impl std::fmt::Debug for GeminiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiService")
            .field("model_id", &self.model_id)
            .field("generate_url", &self.generate_url)
            .finish_non_exhaustive()
    }
}

impl GeminiService {
    pub fn new(options: GeminiOptions) -> Result<Self, ConfigError> {
        if options.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("GEMINI_API_KEY"));
        }

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        let base = options.base_url.trim_end_matches('/');
        let model = options.model.as_str();
        let generate_url = format!("{base}/models/{model}:generateContent");
        let stream_url = format!("{base}/models/{model}:streamGenerateContent?alt=sse");

        Ok(Self {
            client,
            api_key: options.api_key,
            generate_url,
            stream_url,
            model_id: options.model,
            generation: options.generation,
            system_instruction: options.system_instruction,
        })
    }

    fn translate_request<'a>(&'a self, request: &'a CompletionRequest) -> GeminiRequest<'a> {
        // History first, then the new turn; the new turn is never part of history
        let mut contents: Vec<GeminiContent<'a>> =
            request.history.iter().map(GeminiContent::from).collect();
        contents.push(GeminiContent {
            role: "user",
            parts: vec![GeminiPart {
                text: &request.input,
            }],
        });

        let system_instruction = if self.system_instruction.trim().is_empty() {
            None
        } else {
            Some(GeminiSystemInstruction {
                parts: vec![GeminiPart {
                    text: &self.system_instruction,
                }],
            })
        };

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: GeminiGenerationConfig {
                temperature: self.generation.temperature,
                top_p: self.generation.top_p,
                top_k: self.generation.top_k,
                max_output_tokens: self.generation.max_output_tokens,
            },
        }
    }

    async fn post(
        &self,
        url: &str,
        body: &GeminiRequest<'_>,
    ) -> Result<reqwest::Response, LlmError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;
        let message = serde_json::from_str::<GeminiErrorResponse>(&body)
            .map_or(body, |resp| resp.error.message);
        Err(LlmError::from_status(status.as_u16(), &message))
    }
}

#[async_trait]
impl LlmService for GeminiService {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let gemini_request = self.translate_request(request);
        let response = self.post(&self.generate_url, &gemini_request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        completion_from_body(&body)
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<ChunkStream, LlmError> {
        let gemini_request = self.translate_request(request);
        let response = self.post(&self.stream_url, &gemini_request).await?;

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(LlmError::from));
        Ok(decode_event_stream(body))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Response handling
// ============================================================================

fn completion_from_body(body: &str) -> Result<Completion, LlmError> {
    let response: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::malformed(format!("Failed to parse response: {e}")))?;
    let usage = response.usage();
    let finish_reason = response
        .candidates
        .first()
        .and_then(|c| c.finish_reason.clone());
    let text = response.into_text()?;

    if text.is_empty() {
        return Err(LlmError::malformed(match finish_reason {
            Some(reason) => format!("Empty completion (finish reason {reason})"),
            None => "Empty completion".to_string(),
        }));
    }

    Ok(Completion { text, usage })
}

/// Text carried by one streamed event; may be empty
fn chunk_from_event(payload: &str) -> Result<String, LlmError> {
    let response: GeminiResponse = serde_json::from_str(payload)
        .map_err(|e| LlmError::malformed(format!("Failed to parse stream event: {e}")))?;
    let finish_reason = response
        .candidates
        .first()
        .and_then(|c| c.finish_reason.as_deref());
    if let Some(finish_reason) = finish_reason {
        let usage = response.usage();
        tracing::debug!(
            finish_reason,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "Gemini stream finished"
        );
    }
    response.into_text()
}

/// Turn a `text/event-stream` body into a stream of chunk texts.
///
/// Pulls from the body only when the consumer asks for the next chunk. The
/// stream ends after the first error.
fn decode_event_stream<S, B>(body: S) -> ChunkStream
where
    S: Stream<Item = Result<B, LlmError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    struct State<S> {
        body: Pin<Box<S>>,
        decoder: SseDecoder,
        pending: VecDeque<String>,
        done: bool,
    }

    let state = State {
        body: Box::pin(body),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(payload) = state.pending.pop_front() {
                let item = chunk_from_event(&payload);
                if item.is_err() {
                    state.done = true;
                    state.pending.clear();
                }
                return Some((item, state));
            }
            if state.done {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let events = state.decoder.feed(bytes.as_ref());
                    state.pending.extend(events);
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.done = true;
                    let events = state.decoder.finish();
                    state.pending.extend(events);
                }
            }
        }
    })
    .boxed()
}

/// Incremental server-sent-events parser yielding `data` payloads
///
/// Works on whole lines of bytes so a UTF-8 sequence split across network
/// chunks is decoded intact.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            self.process_line(line.trim_end_matches(['\n', '\r']), &mut events);
        }
        events
    }

    /// Flush whatever is left once the body ends
    fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&raw).into_owned();
            self.process_line(line.trim_end_matches('\r'), &mut events);
        }
        self.process_line("", &mut events);
        events
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            if !self.data.is_empty() {
                events.push(self.data.join("\n"));
                self.data.clear();
            }
            return;
        }
        // Comments, event names, ids and retry hints carry nothing we need
        if let Some(value) = line.strip_prefix("data:") {
            self.data
                .push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
    }
}

// ============================================================================
// Gemini API types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

impl<'a> From<&'a MappedTurn> for GeminiContent<'a> {
    fn from(turn: &'a MappedTurn) -> Self {
        Self {
            role: turn.role.as_str(),
            parts: vec![GeminiPart { text: &turn.parts }],
        }
    }
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    error: Option<GeminiError>,
}

impl GeminiResponse {
    fn usage(&self) -> Usage {
        self.usage_metadata.as_ref().map_or_else(Usage::default, |u| Usage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        })
    }

    /// Concatenated text parts of the first candidate
    fn into_text(self) -> Result<String, LlmError> {
        if let Some(error) = self.error {
            return Err(match error.code.and_then(|c| u16::try_from(c).ok()) {
                Some(code) => LlmError::from_status(code, &error.message),
                None => LlmError::malformed(format!("Service error: {}", error.message)),
            });
        }

        let Some(candidate) = self.candidates.into_iter().next() else {
            if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(LlmError::malformed(format!("Prompt blocked: {reason}")));
            }
            return Ok(String::new());
        };

        Ok(candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

/// Non-text parts deserialize with `text: None` and are dropped
#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
    code: Option<i64>,
}
