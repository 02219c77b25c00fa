#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Fog level vocabulary and vision-model assessment types.
//!
//! This crate defines the canonical fog scale shared by the assessor, the
//! label store, and the HTTP API. Every label persisted by KarlCam carries
//! a [`FogLevel`] from this vocabulary together with the numeric score and
//! confidence produced by the vision model.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Valid range for [`Assessment::fog_score`].
pub const FOG_SCORE_RANGE: RangeInclusive<f64> = 0.0..=100.0;

/// Valid range for [`Assessment::confidence`].
pub const CONFIDENCE_RANGE: RangeInclusive<f64> = 0.0..=1.0;

/// Fog density category, from clear skies to very heavy fog.
///
/// [`FogLevel::Unknown`] is a sentinel for data that could not be assessed.
/// It is never a valid output of the vision model.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum FogLevel {
    /// No visible fog.
    #[serde(rename = "Clear")]
    #[strum(serialize = "Clear")]
    Clear,
    /// Slight haze, distant objects softened.
    #[serde(rename = "Light Fog")]
    #[strum(serialize = "Light Fog")]
    LightFog,
    /// Noticeably reduced visibility.
    #[serde(rename = "Moderate Fog")]
    #[strum(serialize = "Moderate Fog")]
    ModerateFog,
    /// Most landmarks obscured.
    #[serde(rename = "Heavy Fog")]
    #[strum(serialize = "Heavy Fog")]
    HeavyFog,
    /// Near-zero visibility.
    #[serde(rename = "Very Heavy Fog")]
    #[strum(serialize = "Very Heavy Fog")]
    VeryHeavyFog,
    /// Not assessed.
    #[serde(rename = "Unknown")]
    #[strum(serialize = "Unknown")]
    Unknown,
}

impl FogLevel {
    /// The five levels a vision model may report, in increasing density.
    pub const ASSESSED: &'static [Self] = &[
        Self::Clear,
        Self::LightFog,
        Self::ModerateFog,
        Self::HeavyFog,
        Self::VeryHeavyFog,
    ];

    /// The band of fog scores this level nominally covers.
    #[must_use]
    pub const fn score_band(self) -> Option<(u8, u8)> {
        match self {
            Self::Clear => Some((0, 20)),
            Self::LightFog => Some((21, 40)),
            Self::ModerateFog => Some((41, 60)),
            Self::HeavyFog => Some((61, 80)),
            Self::VeryHeavyFog => Some((81, 100)),
            Self::Unknown => None,
        }
    }

    /// Returns `true` for every level except [`FogLevel::Unknown`].
    #[must_use]
    pub const fn is_assessed(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Structured fog assessment returned by the vision model, before it is
/// wrapped into a persisted label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Fog score, 0 (clear) to 100 (very heavy fog).
    pub fog_score: f64,
    /// Fog category.
    pub fog_level: FogLevel,
    /// Model confidence, 0.0 to 1.0.
    pub confidence: f64,
    /// Short free-text explanation.
    pub reasoning: String,
    /// Observed weather tags (e.g. `"fog"`, `"overcast"`).
    #[serde(default)]
    pub weather_conditions: Vec<String>,
}

impl Assessment {
    /// Checks the assessment against the field domains.
    ///
    /// Values are never clamped; every out-of-domain field is reported so
    /// the caller can decide what to do with it. An empty result means the
    /// assessment is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<DomainViolation> {
        let mut violations = Vec::new();

        if !FOG_SCORE_RANGE.contains(&self.fog_score) {
            violations.push(DomainViolation::FogScoreOutOfRange {
                value: self.fog_score,
            });
        }
        if !CONFIDENCE_RANGE.contains(&self.confidence) {
            violations.push(DomainViolation::ConfidenceOutOfRange {
                value: self.confidence,
            });
        }
        if !self.fog_level.is_assessed() {
            violations.push(DomainViolation::UnassessedFogLevel);
        }

        violations
    }

    /// Returns `true` if [`Assessment::validate`] reports nothing.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Which vision model produced an assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelerIdentity {
    /// Provider name (e.g. `"gemini"`).
    pub name: String,
    /// Model name or version (e.g. `"gemini-1.5-flash"`).
    pub version: String,
}

/// A single field of an [`Assessment`] that falls outside its domain.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DomainViolation {
    /// `fog_score` outside `[0, 100]` (or NaN).
    #[error("fog_score {value} outside 0-100")]
    FogScoreOutOfRange {
        /// The offending value.
        value: f64,
    },
    /// `confidence` outside `[0, 1]` (or NaN).
    #[error("confidence {value} outside 0.0-1.0")]
    ConfidenceOutOfRange {
        /// The offending value.
        value: f64,
    },
    /// `fog_level` is the [`FogLevel::Unknown`] sentinel.
    #[error("fog_level is Unknown")]
    UnassessedFogLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(fog_score: f64, confidence: f64, fog_level: FogLevel) -> Assessment {
        Assessment {
            fog_score,
            fog_level,
            confidence,
            reasoning: "test".to_string(),
            weather_conditions: vec!["fog".to_string()],
        }
    }

    #[test]
    fn parses_display_names_case_insensitively() {
        assert_eq!("Heavy Fog".parse::<FogLevel>().unwrap(), FogLevel::HeavyFog);
        assert_eq!("very heavy fog".parse::<FogLevel>().unwrap(), FogLevel::VeryHeavyFog);
        assert_eq!("CLEAR".parse::<FogLevel>().unwrap(), FogLevel::Clear);
        assert!("Drizzle".parse::<FogLevel>().is_err());
    }

    #[test]
    fn serializes_with_display_names() {
        let json = serde_json::to_string(&FogLevel::ModerateFog).unwrap();
        assert_eq!(json, "\"Moderate Fog\"");
        assert_eq!(FogLevel::LightFog.to_string(), "Light Fog");
    }

    #[test]
    fn score_bands_cover_full_range() {
        let bands: Vec<(u8, u8)> = FogLevel::ASSESSED
            .iter()
            .filter_map(|l| l.score_band())
            .collect();
        assert_eq!(bands.first().unwrap().0, 0);
        assert_eq!(bands.last().unwrap().1, 100);
        for pair in bands.windows(2) {
            assert_eq!(pair[0].1 + 1, pair[1].0);
        }
    }

    #[test]
    fn valid_assessment_has_no_violations() {
        assert!(assessment(72.0, 0.85, FogLevel::HeavyFog).is_valid());
        assert!(assessment(0.0, 0.0, FogLevel::Clear).is_valid());
        assert!(assessment(100.0, 1.0, FogLevel::VeryHeavyFog).is_valid());
    }

    #[test]
    fn reports_out_of_range_score_and_confidence() {
        let violations = assessment(120.0, 1.5, FogLevel::HeavyFog).validate();
        assert_eq!(
            violations,
            vec![
                DomainViolation::FogScoreOutOfRange { value: 120.0 },
                DomainViolation::ConfidenceOutOfRange { value: 1.5 },
            ]
        );

        let violations = assessment(-1.0, 0.5, FogLevel::Clear).validate();
        assert_eq!(
            violations,
            vec![DomainViolation::FogScoreOutOfRange { value: -1.0 }]
        );
    }

    #[test]
    fn nan_is_out_of_range() {
        let violations = assessment(f64::NAN, 0.5, FogLevel::Clear).validate();
        assert_eq!(violations.len(), 1);
        assert!(matches!(
            violations[0],
            DomainViolation::FogScoreOutOfRange { .. }
        ));
    }

    #[test]
    fn unknown_level_is_a_violation() {
        let violations = assessment(10.0, 0.5, FogLevel::Unknown).validate();
        assert_eq!(violations, vec![DomainViolation::UnassessedFogLevel]);
    }

    #[test]
    fn violations_describe_the_field() {
        assert_eq!(
            DomainViolation::FogScoreOutOfRange { value: 130.0 }.to_string(),
            "fog_score 130 outside 0-100"
        );
        assert_eq!(
            DomainViolation::UnassessedFogLevel.to_string(),
            "fog_level is Unknown"
        );
    }
}
