use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use base64::Engine;

use super::types::{
    ApiErrorBody, ChatMessage, ChatRequest, ChatResponse, CompletionClient, ContentPart, ImageUrl,
    VisionClient,
};
use super::RemoteServiceError;
use crate::config::AppConfig;
use crate::models::MediaType;

/// Upper bound on generated tokens per call.
const MAX_RESPONSE_TOKENS: u32 = 2048;

/// Blocking client for an OpenAI-compatible `/chat/completions` endpoint.
/// Serves both the vision and the text model.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    vision_model: String,
    text_model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenAiClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        vision_model: &str,
        text_model: &str,
        timeout_secs: u64,
    ) -> Result<Self, RemoteServiceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RemoteServiceError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            vision_model: vision_model.to_string(),
            text_model: text_model.to_string(),
            client,
            timeout_secs,
        })
    }

    /// Build from configuration. Fails when no credential is set.
    pub fn from_config(config: &AppConfig) -> Result<Self, RemoteServiceError> {
        let api_key = config.require_api_key()?;
        Self::new(
            &config.api_base,
            api_key,
            &config.vision_model,
            &config.text_model,
            config.timeout_secs,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat(&self, request: &ChatRequest<'_>) -> Result<String, RemoteServiceError> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(model = request.model, url = %url, "Sending chat completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    RemoteServiceError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    RemoteServiceError::Timeout(self.timeout_secs)
                } else {
                    RemoteServiceError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(RemoteServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| RemoteServiceError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| {
                RemoteServiceError::MalformedResponse("response has no message content".into())
            })
    }
}

/// `data:` URL carrying the base64-encoded image.
pub fn image_data_url(image_bytes: &[u8], media_type: MediaType) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(image_bytes);
    format!("data:{};base64,{encoded}", media_type.mime())
}

impl VisionClient for OpenAiClient {
    fn interpret(
        &self,
        prompt: &str,
        image_bytes: &[u8],
        media_type: MediaType,
    ) -> Result<String, RemoteServiceError> {
        let request = ChatRequest {
            model: &self.vision_model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: prompt },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image_data_url(image_bytes, media_type),
                        },
                    },
                ],
            }],
            max_tokens: Some(MAX_RESPONSE_TOKENS),
            temperature: 0.2,
        };
        self.chat(&request)
    }
}

impl CompletionClient for OpenAiClient {
    fn complete(&self, prompt: &str) -> Result<String, RemoteServiceError> {
        let request = ChatRequest {
            model: &self.text_model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![ContentPart::Text { text: prompt }],
            }],
            max_tokens: Some(MAX_RESPONSE_TOKENS),
            temperature: 0.0,
        };
        self.chat(&request)
    }
}

/// Scripted stand-in for the hosted models, usable as either client.
///
/// Scripted replies are consumed in call order; once exhausted every call
/// returns the default reply. Prompts are recorded for inspection.
pub struct MockRemoteClient {
    default_reply: Result<String, RemoteServiceError>,
    script: Mutex<VecDeque<Result<String, RemoteServiceError>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockRemoteClient {
    pub fn new(reply: &str) -> Self {
        Self {
            default_reply: Ok(reply.to_string()),
            script: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: RemoteServiceError) -> Self {
        Self {
            default_reply: Err(error),
            script: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_script(self, replies: Vec<Result<String, RemoteServiceError>>) -> Self {
        Self {
            script: Mutex::new(replies.into()),
            ..self
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn respond(&self, prompt: &str) -> Result<String, RemoteServiceError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        scripted.unwrap_or_else(|| self.default_reply.clone())
    }
}

impl VisionClient for MockRemoteClient {
    fn interpret(
        &self,
        prompt: &str,
        _image_bytes: &[u8],
        _media_type: MediaType,
    ) -> Result<String, RemoteServiceError> {
        self.respond(prompt)
    }
}

impl CompletionClient for MockRemoteClient {
    fn complete(&self, prompt: &str) -> Result<String, RemoteServiceError> {
        self.respond(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn data_url_has_mime_prefix() {
        let url = image_data_url(&[0xff, 0xd8, 0xff], MediaType::Jpeg);
        assert_eq!(url, "data:image/jpeg;base64,/9j/");
    }

    #[test]
    fn from_config_requires_credential() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        let err = OpenAiClient::from_config(&config).err().unwrap();
        assert!(matches!(
            err,
            RemoteServiceError::NotConfigured(ConfigError::MissingCredential(_))
        ));
    }

    #[test]
    fn from_config_trims_base_url() {
        let config = AppConfig::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".into()),
            "GLYPHSCRIBE_API_BASE" => Some("http://localhost:9999/v1/".into()),
            _ => None,
        })
        .unwrap();
        let client = OpenAiClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9999/v1");
    }

    #[test]
    fn unreachable_endpoint_is_connection_error() {
        let client = OpenAiClient::new("http://127.0.0.1:9", "sk-test", "v", "t", 5).unwrap();
        let err = client.complete("hello").unwrap_err();
        assert!(
            matches!(err, RemoteServiceError::Connection(_) | RemoteServiceError::HttpClient(_)),
            "got {err:?}"
        );
    }

    #[test]
    fn mock_follows_script_then_default() {
        let mock = MockRemoteClient::new("default").with_script(vec![
            Ok("first".into()),
            Err(RemoteServiceError::Timeout(3)),
        ]);
        assert_eq!(mock.complete("a").unwrap(), "first");
        assert!(mock.interpret("b", &[], MediaType::Png).is_err());
        assert_eq!(mock.complete("c").unwrap(), "default");
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
    }

    #[test]
    fn failing_mock_always_fails() {
        let mock = MockRemoteClient::failing(RemoteServiceError::Connection("x".into()));
        assert!(mock.complete("a").is_err());
        assert!(mock.complete("b").is_err());
    }
}
