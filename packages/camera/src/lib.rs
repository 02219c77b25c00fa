#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Camera registry and webcam image acquisition.
//!
//! The [`registry`] module loads the static camera configuration (an
//! embedded TOML file, or one supplied at runtime) behind the
//! [`registry::CameraDirectory`] trait. The [`image`] module fetches the
//! current image bytes for a camera, turning any credentials embedded in
//! the camera URL into an explicit `Authorization` header.

pub mod image;
pub mod registry;

pub use karlcam_camera_models::Camera;

use thiserror::Error;

/// Errors that can occur while loading the camera registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Reading the registry file failed.
    #[error("Failed to read camera registry {path}: {source}")]
    Io {
        /// Path of the registry file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The registry TOML is malformed.
    #[error("Failed to parse camera registry: {0}")]
    Parse(#[from] toml::de::Error),

    /// Two cameras share an identifier.
    #[error("Duplicate camera id: {id}")]
    DuplicateId {
        /// The repeated identifier.
        id: String,
    },

    /// A camera definition is missing a required value.
    #[error("Invalid camera {id}: {message}")]
    Invalid {
        /// Camera identifier (may be empty).
        id: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Errors that can occur while fetching a camera image.
///
/// Every message uses the credential-free form of the URL.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The camera URL could not be parsed or uses an unsupported scheme.
    #[error("Bad image URL {url}: {message}")]
    BadUrl {
        /// Redacted URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    /// Connection, TLS, timeout, or body read failure.
    #[error("Network failure fetching {url}: {source}")]
    NetworkFailure {
        /// Credential-free URL.
        url: String,
        /// Underlying HTTP client error.
        source: reqwest::Error,
    },

    /// The camera responded with a non-2xx status.
    #[error("Fetching {url} returned HTTP {status}")]
    NonSuccessStatus {
        /// Credential-free URL.
        url: String,
        /// Response status.
        status: reqwest::StatusCode,
    },
}

impl ImageError {
    /// Returns `true` if the failure was a request timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::NetworkFailure { source, .. } if source.is_timeout())
    }
}
