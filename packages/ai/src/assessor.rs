//! Fog assessment over a [`VisionProvider`].
//!
//! The model is asked for a JSON object but is free to wrap it in prose or
//! a Markdown fence, so the reply is scanned for the first well-formed
//! JSON object, which is then deserialized against a strict shape and
//! checked against the field domains. Nothing is clamped.

use std::fmt::Write as _;

use karlcam_camera_models::ImageFormat;
use karlcam_fog_models::{Assessment, DomainViolation, FogLevel, LabelerIdentity};
use serde::Deserialize;
use thiserror::Error;

use crate::AiError;
use crate::providers::{VisionProvider, VisionRequest};

/// Errors from [`FogAssessor::assess`].
#[derive(Debug, Error)]
pub enum AssessmentError {
    /// The model could not be reached or returned a non-success response.
    #[error("Vision model invocation failed: {0}")]
    Invocation(#[source] AiError),

    /// The reply contained no usable JSON assessment.
    #[error("Unparseable vision model response: {message}")]
    UnparseableResponse {
        /// What was wrong with the reply.
        message: String,
    },

    /// The reply parsed but one or more fields are outside their domain.
    #[error("Invalid assessment: {}", join_violations(.violations))]
    InvalidAssessment {
        /// Every out-of-domain field.
        violations: Vec<DomainViolation>,
    },
}

fn join_violations(violations: &[DomainViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Shape the model is asked to return.
#[derive(Deserialize)]
struct RawAssessment {
    fog_score: f64,
    fog_level: String,
    confidence: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    weather_conditions: Vec<String>,
}

/// Builds the instruction sent alongside a webcam image.
#[must_use]
pub fn build_prompt(camera_name: &str) -> String {
    let mut levels = String::new();
    for level in FogLevel::ASSESSED {
        if let Some((low, high)) = level.score_band() {
            let _ = writeln!(levels, "- \"{level}\" (score {low}-{high})");
        }
    }

    format!(
        "You are analyzing a webcam image from \"{camera_name}\" in the San Francisco \
         Bay Area to measure fog.\n\
         \n\
         Rate the fog on a scale from 0 (completely clear) to 100 (very heavy fog, \
         near-zero visibility) and pick exactly one fog level:\n\
         {levels}\
         \n\
         Respond with a single JSON object and nothing else:\n\
         {{\n  \
           \"fog_score\": <number 0-100>,\n  \
           \"fog_level\": \"<one of the levels above>\",\n  \
           \"confidence\": <number 0.0-1.0>,\n  \
           \"reasoning\": \"<one or two sentences on what you see>\",\n  \
           \"weather_conditions\": [\"<tag>\", ...]\n\
         }}"
    )
}

/// Returns the first well-formed JSON object embedded in `text`.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<serde_json::Value> {
    text.char_indices()
        .filter(|&(_, c)| c == '{')
        .find_map(|(start, _)| {
            serde_json::Deserializer::from_str(&text[start..])
                .into_iter::<serde_json::Value>()
                .next()
                .and_then(Result::ok)
                .filter(serde_json::Value::is_object)
        })
}

/// Parses and validates a raw model reply.
///
/// # Errors
///
/// Returns [`AssessmentError::UnparseableResponse`] if no JSON object is
/// found, a required field is missing or mistyped, or the fog level is not
/// in the vocabulary; [`AssessmentError::InvalidAssessment`] if any field
/// is out of domain.
pub fn parse_assessment(text: &str) -> Result<Assessment, AssessmentError> {
    let value = extract_json_object(text).ok_or_else(|| AssessmentError::UnparseableResponse {
        message: "no JSON object in response".to_string(),
    })?;

    let raw: RawAssessment =
        serde_json::from_value(value).map_err(|e| AssessmentError::UnparseableResponse {
            message: e.to_string(),
        })?;

    let fog_level = raw
        .fog_level
        .trim()
        .parse::<FogLevel>()
        .map_err(|_| AssessmentError::UnparseableResponse {
            message: format!("unknown fog_level '{}'", raw.fog_level),
        })?;

    let assessment = Assessment {
        fog_score: raw.fog_score,
        fog_level,
        confidence: raw.confidence,
        reasoning: raw.reasoning,
        weather_conditions: raw.weather_conditions,
    };

    let violations = assessment.validate();
    if !violations.is_empty() {
        return Err(AssessmentError::InvalidAssessment { violations });
    }

    Ok(assessment)
}

/// Turns webcam images into validated fog assessments.
pub struct FogAssessor {
    provider: Box<dyn VisionProvider>,
}

impl FogAssessor {
    /// Wraps a vision provider.
    #[must_use]
    pub fn new(provider: Box<dyn VisionProvider>) -> Self {
        Self { provider }
    }

    /// Which model labels produced by this assessor are attributed to.
    #[must_use]
    pub fn identity(&self) -> LabelerIdentity {
        self.provider.identity()
    }

    /// Assesses the fog in `image`.
    ///
    /// # Errors
    ///
    /// Returns [`AssessmentError::Invocation`] if the model call fails, or
    /// a parse/validation error as described in [`parse_assessment`].
    pub async fn assess(
        &self,
        image: &[u8],
        camera_name: &str,
    ) -> Result<Assessment, AssessmentError> {
        let prompt = build_prompt(camera_name);
        let format = ImageFormat::sniff(image);

        let text = self
            .provider
            .generate(VisionRequest {
                prompt: &prompt,
                image,
                mime_type: format.mime_type(),
            })
            .await
            .map_err(AssessmentError::Invocation)?;

        log::trace!("Vision model reply for {camera_name}: {text}");

        parse_assessment(&text)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    struct Scripted {
        reply: Result<String, String>,
        seen_mime: Arc<Mutex<Option<String>>>,
    }

    #[async_trait::async_trait]
    impl VisionProvider for Scripted {
        async fn generate(&self, request: VisionRequest<'_>) -> Result<String, AiError> {
            *self.seen_mime.lock().unwrap() = Some(request.mime_type.to_string());
            self.reply.clone().map_err(|message| AiError::Provider { message })
        }

        fn identity(&self) -> LabelerIdentity {
            LabelerIdentity {
                name: "scripted".to_string(),
                version: "1".to_string(),
            }
        }
    }

    fn assessor(reply: Result<&str, &str>) -> FogAssessor {
        FogAssessor::new(Box::new(Scripted {
            reply: reply.map(str::to_string).map_err(str::to_string),
            seen_mime: Arc::new(Mutex::new(None)),
        }))
    }

    const GOOD: &str = r#"{"fog_score": 72, "fog_level": "Heavy Fog", "confidence": 0.9,
        "reasoning": "Bridge towers hidden", "weather_conditions": ["fog", "overcast"]}"#;

    #[test]
    fn prompt_names_camera_and_every_level() {
        let prompt = build_prompt("Ocean Beach");
        assert!(prompt.contains("\"Ocean Beach\""));
        for level in FogLevel::ASSESSED {
            assert!(prompt.contains(&format!("\"{level}\"")));
        }
        assert!(!prompt.contains("Unknown"));
    }

    #[test]
    fn extracts_object_surrounded_by_prose() {
        let text = format!("Sure! Here is my analysis:\n```json\n{GOOD}\n```\nHope it helps.");
        let value = extract_json_object(&text).unwrap();
        assert_eq!(value["fog_level"], "Heavy Fog");
    }

    #[test]
    fn skips_malformed_braces_before_payload() {
        let text = format!("I see {{ some haze. {GOOD}");
        assert!(extract_json_object(&text).is_some());
    }

    #[test]
    fn parses_valid_assessment() {
        let a = parse_assessment(GOOD).unwrap();
        assert!((a.fog_score - 72.0).abs() < f64::EPSILON);
        assert_eq!(a.fog_level, FogLevel::HeavyFog);
        assert_eq!(a.weather_conditions, vec!["fog", "overcast"]);
    }

    #[test]
    fn fog_level_is_case_insensitive() {
        let a = parse_assessment(
            r#"{"fog_score": 5, "fog_level": "clear", "confidence": 0.5, "reasoning": "sunny"}"#,
        )
        .unwrap();
        assert_eq!(a.fog_level, FogLevel::Clear);
        assert!(a.weather_conditions.is_empty());
    }

    #[test]
    fn no_json_is_unparseable() {
        let err = parse_assessment("It is quite foggy today.").unwrap_err();
        assert!(matches!(err, AssessmentError::UnparseableResponse { .. }));
    }

    #[test]
    fn missing_field_is_unparseable() {
        let err = parse_assessment(r#"{"fog_level": "Clear", "confidence": 0.5}"#).unwrap_err();
        assert!(matches!(err, AssessmentError::UnparseableResponse { .. }));
    }

    #[test]
    fn unknown_vocabulary_is_unparseable() {
        let err = parse_assessment(
            r#"{"fog_score": 50, "fog_level": "Pea Soup", "confidence": 0.5, "reasoning": ""}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AssessmentError::UnparseableResponse { .. }));
    }

    #[test]
    fn out_of_range_values_are_rejected_not_clamped() {
        let err = parse_assessment(
            r#"{"fog_score": 140, "fog_level": "Very Heavy Fog", "confidence": 1.2, "reasoning": ""}"#,
        )
        .unwrap_err();
        let AssessmentError::InvalidAssessment { violations } = err else {
            panic!("expected invalid assessment");
        };
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn unknown_level_is_invalid() {
        let err = parse_assessment(
            r#"{"fog_score": 10, "fog_level": "Unknown", "confidence": 0.2, "reasoning": ""}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AssessmentError::InvalidAssessment { .. }));
    }

    #[tokio::test]
    async fn assess_sends_sniffed_mime_type() {
        let seen = Arc::new(Mutex::new(None));
        let assessor = FogAssessor::new(Box::new(Scripted {
            reply: Ok(GOOD.to_string()),
            seen_mime: Arc::clone(&seen),
        }));
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

        assessor.assess(&png, "Twin Peaks").await.unwrap();

        assert_eq!(seen.lock().unwrap().as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn invocation_failure_is_classified() {
        let err = assessor(Err("HTTP 500"))
            .assess(b"\xFF\xD8\xFF", "Fort Point")
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::Invocation(_)));
    }

    #[tokio::test]
    async fn assess_returns_validated_assessment() {
        let a = assessor(Ok(GOOD))
            .assess(b"\xFF\xD8\xFF", "Golden Gate")
            .await
            .unwrap();
        assert_eq!(a.fog_level, FogLevel::HeavyFog);
    }
}
