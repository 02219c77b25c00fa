#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! On-demand fog labeling.
//!
//! A request for a camera's label is served from the label store when a
//! recent enough label exists, and otherwise generated on the spot:
//!
//! ```text
//! lookup camera -> cache check -> fetch image -> assess fog -> upload image -> insert label
//! ```
//!
//! Upstream failures (camera image, vision model) degrade to an
//! [`Provenance::Unavailable`] result. Store and persistence failures are
//! errors.

pub mod cache;
pub mod config;
pub mod orchestrator;
pub mod setup;

use karlcam_database::StoreError;
use karlcam_database_models::Label;
use thiserror::Error;

pub use cache::LabelCache;
pub use config::LabelerConfig;
pub use orchestrator::Labeler;

/// Errors surfaced to callers of the labeler.
#[derive(Debug, Error)]
pub enum LabelError {
    /// No active camera has this id.
    #[error("Camera not found: {camera_id}")]
    CameraNotFound {
        /// The requested id.
        camera_id: String,
    },

    /// The label store could not be read, so freshness is unknown.
    #[error("Label store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// A fresh assessment could not be stored.
    #[error("Failed to persist label: {message}")]
    Persistence {
        /// What failed.
        message: String,
    },
}

/// Where a [`LabelResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// A stored label inside the freshness window.
    Cache,
    /// Generated and stored during this request.
    Fresh,
    /// No current label and none could be generated.
    Unavailable,
}

/// Outcome of [`Labeler::get_label`].
#[derive(Debug, Clone, PartialEq)]
pub struct LabelResult {
    /// How the label was obtained.
    pub provenance: Provenance,
    /// The label; `None` exactly when `provenance` is
    /// [`Provenance::Unavailable`].
    pub label: Option<Label>,
}

impl LabelResult {
    /// A cache hit.
    #[must_use]
    pub const fn cached(label: Label) -> Self {
        Self {
            provenance: Provenance::Cache,
            label: Some(label),
        }
    }

    /// A freshly generated label.
    #[must_use]
    pub const fn fresh(label: Label) -> Self {
        Self {
            provenance: Provenance::Fresh,
            label: Some(label),
        }
    }

    /// No label available.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self {
            provenance: Provenance::Unavailable,
            label: None,
        }
    }
}
