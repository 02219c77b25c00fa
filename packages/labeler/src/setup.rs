//! Builds a [`Labeler`] from environment variables.
//!
//! | Variable | Used for |
//! |---|---|
//! | `KARLCAM_CAMERAS_FILE` | Camera registry TOML; embedded registry when unset |
//! | `DATABASE_URL` / `KARLCAM_DB_PATH` | Label store (see [`karlcam_database::db`]) |
//! | `IMAGE_BUCKET` and friends | Image store (see [`karlcam_storage`]) |
//! | `VISION_PROVIDER` and API keys | Vision model (see [`karlcam_ai`]) |
//!
//! plus the settings read by [`LabelerConfig::from_env`].

use std::path::Path;
use std::sync::Arc;

use karlcam_ai::AiError;
use karlcam_ai::assessor::FogAssessor;
use karlcam_camera::RegistryError;
use karlcam_camera::image::HttpImageSource;
use karlcam_camera::registry::load_directory;
use karlcam_database::StoreError;
use karlcam_database::queries::DbLabelStore;
use karlcam_storage::StorageError;
use thiserror::Error;

use crate::{Labeler, LabelerConfig};

/// A collaborator could not be configured.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Camera registry could not be loaded.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Label database could not be opened.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Image store is misconfigured.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Vision provider is misconfigured.
    #[error(transparent)]
    Ai(#[from] AiError),

    /// Camera HTTP client could not be built.
    #[error("Failed to build image HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Camera registry path from `KARLCAM_CAMERAS_FILE`, if set.
#[must_use]
pub fn cameras_file_from_env() -> Option<String> {
    std::env::var("KARLCAM_CAMERAS_FILE")
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Connects every collaborator and returns a ready [`Labeler`].
///
/// # Errors
///
/// Returns [`SetupError`] naming the first collaborator that could not be
/// configured.
pub async fn labeler_from_env() -> Result<Labeler, SetupError> {
    let config = LabelerConfig::from_env();

    let cameras_file = cameras_file_from_env();
    let cameras = load_directory(cameras_file.as_deref().map(Path::new))?;

    let db = karlcam_database::db::connect_from_env().await?;
    let store = DbLabelStore::new(Arc::from(db));

    let images = karlcam_storage::image_store_from_env()?;
    let source = HttpImageSource::new(config.image_timeout)?;
    let assessor = FogAssessor::new(karlcam_ai::create_provider_from_env(config.vision_timeout)?);

    let identity = assessor.identity();
    log::info!(
        "Labeler ready: model {}/{}, max age {} min, environment {}",
        identity.name,
        identity.version,
        config.max_age.num_minutes(),
        config.source_environment
    );

    Ok(Labeler::new(
        Arc::new(cameras),
        Arc::new(store),
        Arc::from(images),
        Arc::new(source),
        assessor,
        config,
    ))
}
