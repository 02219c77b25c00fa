#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Persisted label types.
//!
//! A [`Label`] is one timestamped fog assessment for one camera. Labels are
//! immutable once written: freshness is evaluated at read time and a new
//! assessment always produces a new row. These types are distinct from the
//! API response types in `karlcam_server_models`.

use chrono::{DateTime, SubsecRound as _, Utc};
use karlcam_camera_models::Camera;
use karlcam_fog_models::{Assessment, FogLevel, LabelerIdentity};
use serde::{Deserialize, Serialize};

/// A label as stored in the label store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    /// Store-assigned unique identifier (UUID v4).
    pub id: String,
    /// Camera this label belongs to.
    pub camera_id: String,
    /// Camera display name at the time of labeling.
    pub camera_name: String,
    /// When the underlying image was fetched.
    pub captured_at: DateTime<Utc>,
    /// Durable, publicly resolvable location of the stored image.
    pub image_url: String,
    /// Fog score, 0-100.
    pub fog_score: f64,
    /// Fog category.
    pub fog_level: FogLevel,
    /// Model confidence, 0.0-1.0.
    pub confidence: f64,
    /// Model explanation.
    pub reasoning: String,
    /// Observed weather tags.
    pub weather_conditions: Vec<String>,
    /// Camera latitude.
    pub latitude: f64,
    /// Camera longitude.
    pub longitude: f64,
    /// Vision provider that produced the label.
    pub labeler_name: String,
    /// Model name/version that produced the label.
    pub labeler_version: String,
    /// Deployment environment that wrote the label (e.g. `"cloud"`).
    pub source_environment: String,
}

/// A label that has not been written yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLabel {
    /// Camera this label belongs to.
    pub camera_id: String,
    /// Camera display name.
    pub camera_name: String,
    /// Capture timestamp, truncated to microseconds.
    pub captured_at: DateTime<Utc>,
    /// Location of the stored image.
    pub image_url: String,
    /// Fog score, 0-100.
    pub fog_score: f64,
    /// Fog category.
    pub fog_level: FogLevel,
    /// Model confidence, 0.0-1.0.
    pub confidence: f64,
    /// Model explanation.
    pub reasoning: String,
    /// Observed weather tags.
    pub weather_conditions: Vec<String>,
    /// Camera latitude.
    pub latitude: f64,
    /// Camera longitude.
    pub longitude: f64,
    /// Vision provider name.
    pub labeler_name: String,
    /// Model name/version.
    pub labeler_version: String,
    /// Deployment environment.
    pub source_environment: String,
}

impl NewLabel {
    /// Combines a camera's static fields with a fresh assessment.
    ///
    /// `captured_at` is truncated to microsecond precision, the precision
    /// the store keeps, so the label read back equals the one written.
    #[must_use]
    pub fn from_assessment(
        camera: &Camera,
        captured_at: DateTime<Utc>,
        image_url: String,
        assessment: Assessment,
        labeler: &LabelerIdentity,
        source_environment: &str,
    ) -> Self {
        Self {
            camera_id: camera.id.clone(),
            camera_name: camera.name.clone(),
            captured_at: captured_at.trunc_subsecs(6),
            image_url,
            fog_score: assessment.fog_score,
            fog_level: assessment.fog_level,
            confidence: assessment.confidence,
            reasoning: assessment.reasoning,
            weather_conditions: assessment.weather_conditions,
            latitude: camera.latitude,
            longitude: camera.longitude,
            labeler_name: labeler.name.clone(),
            labeler_version: labeler.version.clone(),
            source_environment: source_environment.to_string(),
        }
    }

    /// Attaches a store-assigned id.
    #[must_use]
    pub fn into_label(self, id: String) -> Label {
        Label {
            id,
            camera_id: self.camera_id,
            camera_name: self.camera_name,
            captured_at: self.captured_at,
            image_url: self.image_url,
            fog_score: self.fog_score,
            fog_level: self.fog_level,
            confidence: self.confidence,
            reasoning: self.reasoning,
            weather_conditions: self.weather_conditions,
            latitude: self.latitude,
            longitude: self.longitude,
            labeler_name: self.labeler_name,
            labeler_version: self.labeler_version,
            source_environment: self.source_environment,
        }
    }
}
