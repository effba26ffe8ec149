//! Request and configuration types shared by completion services

use crate::conversation::MappedTurn;
use futures::stream::BoxStream;

/// One turn's worth of work for the completion service
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Prior turns in the service's vocabulary, oldest first
    pub history: Vec<MappedTurn>,
    /// The new user turn
    pub input: String,
}

/// Sampling parameters, passed to the service untouched
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
        }
    }
}

/// Whole-response result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
}

/// Token accounting reported by the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Lazy, finite sequence of text chunks. Chunks may be empty.
pub type ChunkStream = BoxStream<'static, Result<String, super::LlmError>>;
