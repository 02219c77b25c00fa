#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the KarlCam server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the label store types so the wire contract consumed by the web
//! front end can stay fixed while storage evolves. Field names are
//! `snake_case` on the wire.

use chrono::{DateTime, Utc};
use karlcam_camera_models::Camera;
use karlcam_database_models::Label;
use karlcam_fog_models::FogLevel;
use serde::{Deserialize, Serialize};

/// Default window for the label history endpoint.
pub const DEFAULT_HISTORY_HOURS: u32 = 24;

/// Largest window the label history endpoint serves.
pub const MAX_HISTORY_HOURS: u32 = 168;

/// A fog label as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiLabel {
    /// Label id.
    pub id: String,
    /// Camera the label belongs to.
    pub camera_id: String,
    /// Camera display name.
    pub camera_name: String,
    /// When the assessed image was captured (ISO 8601).
    pub timestamp: DateTime<Utc>,
    /// Public URL of the assessed image.
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
    /// Vision provider.
    pub labeler_name: String,
    /// Vision model.
    pub labeler_version: String,
    /// Deployment environment that produced the label.
    pub source_environment: String,
}

impl From<Label> for ApiLabel {
    fn from(label: Label) -> Self {
        Self {
            id: label.id,
            camera_id: label.camera_id,
            camera_name: label.camera_name,
            timestamp: label.captured_at,
            image_url: label.image_url,
            fog_score: label.fog_score,
            fog_level: label.fog_level,
            confidence: label.confidence,
            reasoning: label.reasoning,
            weather_conditions: label.weather_conditions,
            latitude: label.latitude,
            longitude: label.longitude,
            labeler_name: label.labeler_name,
            labeler_version: label.labeler_version,
            source_environment: label.source_environment,
        }
    }
}

/// Where a label response came from.
///
/// The wire values are fixed by existing front-end consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiLabelSource {
    /// Served from the label store.
    #[serde(rename = "firestore")]
    Cache,
    /// Generated during the request.
    #[serde(rename = "on-demand")]
    Fresh,
    /// No label available right now.
    #[serde(rename = "unavailable")]
    Unavailable,
}

/// Response body of `GET /api/label/{camera_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiLabelResponse {
    /// Provenance of `label`.
    pub source: ApiLabelSource,
    /// The label, `null` when unavailable.
    pub label: Option<ApiLabel>,
}

/// A camera with its current label, if one is fresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCamera {
    /// Camera id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Optional description.
    pub description: Option<String>,
    /// Current label from the store; never generated by this listing.
    pub current_label: Option<ApiLabel>,
}

impl ApiCamera {
    /// Builds the listing entry for `camera`.
    #[must_use]
    pub fn new(camera: Camera, current_label: Option<Label>) -> Self {
        Self {
            id: camera.id,
            name: camera.name,
            latitude: camera.latitude,
            longitude: camera.longitude,
            description: camera.description,
            current_label: current_label.map(ApiLabel::from),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable description.
    pub error: String,
}

/// Query parameters for the label history endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryParams {
    /// Window in hours.
    pub hours: Option<u32>,
}

impl HistoryParams {
    /// Requested window, defaulting to [`DEFAULT_HISTORY_HOURS`] and
    /// capped to `1..=MAX_HISTORY_HOURS`.
    #[must_use]
    pub fn hours(&self) -> u32 {
        self.hours
            .unwrap_or(DEFAULT_HISTORY_HOURS)
            .clamp(1, MAX_HISTORY_HOURS)
    }
}
