//! `OpenAI`-compatible chat-completions provider.
//!
//! Works with `OpenAI` itself and with local servers that speak the same
//! protocol (Ollama, vLLM, LM Studio) when `AI_BASE_URL` points at them.

use std::time::Duration;

use karlcam_fog_models::LabelerIdentity;
use serde::{Deserialize, Serialize};

use super::{MAX_OUTPUT_TOKENS, TEMPERATURE, VisionProvider, VisionRequest, http_client, preview};
use crate::AiError;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// `OpenAI` API provider.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a new `OpenAI` provider. An empty `api_key` omits the
    /// `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, AiError> {
        Ok(Self {
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: http_client(timeout)?,
        })
    }

    /// Points the provider at a different server. A trailing `/v1` is
    /// accepted and not duplicated.
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        let trimmed = base_url.trim_end_matches('/');
        self.base_url = trimmed.strip_suffix("/v1").unwrap_or(trimmed).to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: Vec<OpenAiContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAiContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: OpenAiImageUrl },
}

#[derive(Serialize)]
struct OpenAiImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

#[async_trait::async_trait]
impl VisionProvider for OpenAiProvider {
    async fn generate(&self, request: VisionRequest<'_>) -> Result<String, AiError> {
        let data_uri = format!(
            "data:{};base64,{}",
            request.mime_type,
            request.image_base64()
        );

        let body = OpenAiRequest {
            model: &self.model,
            messages: vec![OpenAiMessage {
                role: "user",
                content: vec![
                    OpenAiContentPart::Text {
                        text: request.prompt,
                    },
                    OpenAiContentPart::ImageUrl {
                        image_url: OpenAiImageUrl { url: data_uri },
                    },
                ],
            }],
            max_tokens: MAX_OUTPUT_TOKENS,
            temperature: TEMPERATURE,
        };

        let mut req = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json");
        if !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let resp = req.json(&body).send().await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let err: OpenAiError = serde_json::from_str(&body).unwrap_or_else(|_| OpenAiError {
                error: OpenAiErrorDetail {
                    message: format!("HTTP {status}: {}", preview(&body)),
                },
            });
            return Err(AiError::Provider {
                message: err.error.message,
            });
        }

        let response: OpenAiResponse = serde_json::from_str(&body)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| AiError::Provider {
                message: "No text content in OpenAI response".to_string(),
            })
    }

    fn identity(&self) -> LabelerIdentity {
        LabelerIdentity {
            name: "openai".to_string(),
            version: self.model.clone(),
        }
    }
}
