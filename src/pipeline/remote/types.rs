use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::RemoteServiceError;
use crate::models::MediaType;

/// Hosted vision model: image plus instruction in, free text out.
pub trait VisionClient {
    fn interpret(
        &self,
        prompt: &str,
        image_bytes: &[u8],
        media_type: MediaType,
    ) -> Result<String, RemoteServiceError>;
}

/// Hosted text model: single prompt in, free text out.
pub trait CompletionClient {
    fn complete(&self, prompt: &str) -> Result<String, RemoteServiceError>;
}

pub type SharedVisionClient = Arc<dyn VisionClient + Send + Sync>;
pub type SharedCompletionClient = Arc<dyn CompletionClient + Send + Sync>;

// ── Chat-completions wire format ─────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub temperature: f32,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
pub(crate) struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Error envelope returned by OpenAI-compatible APIs.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    pub message: String,
}
