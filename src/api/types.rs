//! API request and response types

use crate::conversation::Message;
use crate::system_prompt::ExampleQuestion;
use serde::{Deserialize, Serialize};

/// Request to run one turn: typed text or one of the canned examples
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub example: Option<usize>,
}

/// Static page content
#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub title: &'static str,
    pub welcome: &'static str,
    pub placeholder: &'static str,
    pub examples: &'static [ExampleQuestion],
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub id: String,
}

/// Response with a session's transcript
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub messages: Vec<Message>,
}

/// Response for a whole-reply turn
#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub reply: Message,
    /// User-visible error when the reply is the fallback text
    pub error: Option<String>,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
