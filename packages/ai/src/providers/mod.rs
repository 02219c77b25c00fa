//! Vision-model provider abstraction and implementations.
//!
//! Supports Gemini and `OpenAI`-compatible servers via a common trait.

pub mod gemini;
pub mod openai;

use base64::Engine as _;
use karlcam_fog_models::LabelerIdentity;

use crate::AiError;

/// Maximum number of tokens requested from the model. The fog reply is a
/// small JSON object, so this is generous.
const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Sampling temperature. Kept low so repeated assessments of the same
/// scene are consistent.
const TEMPERATURE: f32 = 0.1;

/// A single image + instruction request.
#[derive(Debug, Clone, Copy)]
pub struct VisionRequest<'a> {
    /// Instruction text.
    pub prompt: &'a str,
    /// Raw image bytes.
    pub image: &'a [u8],
    /// MIME type of `image` (e.g. `"image/jpeg"`).
    pub mime_type: &'a str,
}

impl VisionRequest<'_> {
    /// Base64-encoded image, as the provider APIs expect.
    #[must_use]
    pub fn image_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.image)
    }
}

/// Trait for vision-model providers.
#[async_trait::async_trait]
pub trait VisionProvider: Send + Sync {
    /// Sends an image with an instruction and returns the model's raw
    /// text reply.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails, the provider returns a
    /// non-success status, or the reply contains no text.
    async fn generate(&self, request: VisionRequest<'_>) -> Result<String, AiError>;

    /// Which provider and model this is, recorded on every label.
    fn identity(&self) -> LabelerIdentity;
}

/// Builds a pooled HTTP client with a request timeout.
fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, AiError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Truncates a provider response body for inclusion in error messages.
fn preview(body: &str) -> String {
    const PREVIEW_LEN: usize = 300;
    if body.len() <= PREVIEW_LEN {
        return body.to_string();
    }
    let mut end = PREVIEW_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_image_as_standard_base64() {
        let request = VisionRequest {
            prompt: "p",
            image: b"hello",
            mime_type: "image/jpeg",
        };
        assert_eq!(request.image_base64(), "aGVsbG8=");
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let body = "é".repeat(400);
        let p = preview(&body);
        assert!(p.ends_with("..."));
        assert!(p.len() <= 303);
        assert_eq!(preview("short"), "short");
    }
}
