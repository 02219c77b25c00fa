#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Vision-model provider abstraction and the fog assessor.
//!
//! Supports Google Gemini and any `OpenAI`-compatible chat-completions
//! server that accepts image input (`OpenAI`, Ollama, vLLM, LM Studio) via
//! the `AI_BASE_URL` environment variable. The [`assessor`] builds the fog
//! prompt, sends it with the webcam image, and turns the model's free-text
//! reply into a validated [`karlcam_fog_models::Assessment`].

pub mod assessor;
pub mod providers;

use std::time::Duration;

use thiserror::Error;

use crate::providers::VisionProvider;

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Default `OpenAI` model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Errors that can occur while invoking a vision model.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to the provider failed (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider returned an error or an unusable response.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

/// Creates a vision provider based on environment variables.
///
/// If `VISION_PROVIDER` is explicitly set, uses that provider. Otherwise
/// auto-detects from available credentials:
///
/// 1. `GEMINI_API_KEY` set -> Gemini
/// 2. `OPENAI_API_KEY` or `AI_BASE_URL` set -> `OpenAI`-compatible
///
/// `timeout` bounds every model invocation.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// explicitly requested provider is not configured, and [`AiError::Http`]
/// if the HTTP client cannot be built.
pub fn create_provider_from_env(timeout: Duration) -> Result<Box<dyn VisionProvider>, AiError> {
    let provider = std::env::var("VISION_PROVIDER").unwrap_or_else(|_| detect_provider());

    match provider.to_lowercase().as_str() {
        "gemini" | "google" => {
            let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| AiError::Config {
                message: "GEMINI_API_KEY environment variable not set".to_string(),
            })?;
            let model =
                std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());
            let mut gemini = providers::gemini::GeminiProvider::new(api_key, model, timeout)?;
            if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
                gemini = gemini.with_base_url(base_url);
            }
            Ok(Box::new(gemini))
        }
        "openai" | "gpt" => {
            // Local OpenAI-compatible servers usually don't need a key.
            let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
            if api_key.is_empty() && std::env::var("AI_BASE_URL").is_err() {
                return Err(AiError::Config {
                    message: "OPENAI_API_KEY or AI_BASE_URL environment variable not set"
                        .to_string(),
                });
            }
            let model =
                std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string());
            let mut openai = providers::openai::OpenAiProvider::new(api_key, model, timeout)?;
            if let Ok(base_url) = std::env::var("AI_BASE_URL") {
                openai = openai.with_base_url(base_url);
            }
            Ok(Box::new(openai))
        }
        other => Err(AiError::Config {
            message: format!("Unknown vision provider: {other}. Use 'gemini' or 'openai'."),
        }),
    }
}

/// Auto-detects which provider to use based on available credentials.
///
/// Returns a provider name string that matches the arms in
/// [`create_provider_from_env`].
fn detect_provider() -> String {
    if std::env::var("GEMINI_API_KEY").is_ok() {
        log::info!("Auto-detected vision provider: Gemini (GEMINI_API_KEY found)");
        return "gemini".to_string();
    }

    if std::env::var("OPENAI_API_KEY").is_ok() || std::env::var("AI_BASE_URL").is_ok() {
        log::info!("Auto-detected vision provider: OpenAI-compatible");
        return "openai".to_string();
    }

    log::warn!(
        "No vision model credentials detected. Set GEMINI_API_KEY, OPENAI_API_KEY, \
         or AI_BASE_URL. You can also set VISION_PROVIDER explicitly."
    );

    // Fall back to gemini; the missing key produces a clear error
    "gemini".to_string()
}
