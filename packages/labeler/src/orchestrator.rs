//! Per-request label orchestration.
//!
//! Each call runs to completion on its own: there is no request
//! coalescing or per-camera locking, so concurrent misses for the same
//! camera each fetch, assess, and store independently.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound as _, Utc};
use karlcam_ai::assessor::FogAssessor;
use karlcam_camera::image::{ImageSource, redact_url};
use karlcam_camera::registry::CameraDirectory;
use karlcam_camera_models::{Camera, ImageFormat};
use karlcam_database::LabelStore;
use karlcam_database_models::{Label, NewLabel};
use karlcam_fog_models::Assessment;
use karlcam_storage::{ImageStore, image_key};
use tokio::time::timeout;

use crate::cache::window_start;
use crate::{LabelCache, LabelError, LabelResult, LabelerConfig};

/// Serves the current label for a camera, generating one on a cache miss.
pub struct Labeler {
    cache: LabelCache,
    store: Arc<dyn LabelStore>,
    images: Arc<dyn ImageStore>,
    source: Arc<dyn ImageSource>,
    assessor: FogAssessor,
    config: LabelerConfig,
}

impl Labeler {
    /// Wires the labeler to its collaborators.
    #[must_use]
    pub fn new(
        cameras: Arc<dyn CameraDirectory>,
        store: Arc<dyn LabelStore>,
        images: Arc<dyn ImageStore>,
        source: Arc<dyn ImageSource>,
        assessor: FogAssessor,
        config: LabelerConfig,
    ) -> Self {
        Self {
            cache: LabelCache::new(cameras, Arc::clone(&store)),
            store,
            images,
            source,
            assessor,
            config,
        }
    }

    /// All active cameras.
    #[must_use]
    pub fn cameras(&self) -> Vec<Camera> {
        self.cache.cameras()
    }

    /// The current label for a camera without generating one.
    ///
    /// # Errors
    ///
    /// See [`LabelCache::get_current`].
    pub async fn current_label(&self, camera_id: &str) -> Result<Option<Label>, LabelError> {
        self.cache.get_current(camera_id, self.config.max_age).await
    }

    /// Labels for a camera over the last `hours` hours, newest first.
    ///
    /// # Errors
    ///
    /// See [`LabelCache::history`].
    pub async fn history(&self, camera_id: &str, hours: u32) -> Result<Vec<Label>, LabelError> {
        let window =
            chrono::Duration::try_hours(i64::from(hours)).unwrap_or(chrono::Duration::MAX);
        let since = window_start(Utc::now(), window);
        self.cache.history(camera_id, since).await
    }

    /// Returns the current label for `camera_id`, generating and storing a
    /// new one if none is fresh.
    ///
    /// # Errors
    ///
    /// * [`LabelError::CameraNotFound`] for an unknown or inactive camera
    /// * [`LabelError::StoreUnavailable`] if the cache check fails
    /// * [`LabelError::Persistence`] if a fresh assessment cannot be
    ///   stored
    ///
    /// Image and vision model failures are not errors; they yield
    /// [`LabelResult::unavailable`].
    pub async fn get_label(&self, camera_id: &str) -> Result<LabelResult, LabelError> {
        let camera = self.cache.camera(camera_id)?;

        if let Some(label) = self
            .cache
            .lookup(camera_id, self.config.max_age, Utc::now())
            .await?
        {
            log::debug!(
                "Cache hit for {camera_id}: label {} captured {}",
                label.id,
                label.captured_at
            );
            return Ok(LabelResult::cached(label));
        }

        log::debug!("Cache miss for {camera_id}");

        let Some(image) = self.acquire(&camera).await else {
            return Ok(LabelResult::unavailable());
        };
        let captured_at = Utc::now().trunc_subsecs(6);

        let Some(assessment) = self.assess(&camera, &image).await else {
            return Ok(LabelResult::unavailable());
        };

        let label = self.persist(&camera, captured_at, image, assessment).await?;

        log::info!(
            "Generated label {} for {camera_id}: {} (score {:.0}, confidence {:.2})",
            label.id,
            label.fog_level,
            label.fog_score,
            label.confidence
        );

        Ok(LabelResult::fresh(label))
    }

    async fn acquire(&self, camera: &Camera) -> Option<Vec<u8>> {
        match timeout(self.config.image_timeout, self.source.fetch(camera)).await {
            Ok(Ok(bytes)) => Some(bytes),
            Ok(Err(e)) if e.is_timeout() => {
                log::warn!("Image fetch for {} timed out: {e}", camera.id);
                None
            }
            Ok(Err(e)) => {
                log::warn!("Image unavailable for {}: {e}", camera.id);
                None
            }
            Err(_) => {
                log::warn!(
                    "Image fetch for {} timed out after {:?} ({})",
                    camera.id,
                    self.config.image_timeout,
                    redact_url(&camera.url)
                );
                None
            }
        }
    }

    async fn assess(&self, camera: &Camera, image: &[u8]) -> Option<Assessment> {
        match timeout(
            self.config.vision_timeout,
            self.assessor.assess(image, &camera.name),
        )
        .await
        {
            Ok(Ok(assessment)) => Some(assessment),
            Ok(Err(e)) => {
                log::warn!("Fog assessment failed for {}: {e}", camera.id);
                None
            }
            Err(_) => {
                log::warn!(
                    "Fog assessment for {} timed out after {:?}",
                    camera.id,
                    self.config.vision_timeout
                );
                None
            }
        }
    }

    async fn persist(
        &self,
        camera: &Camera,
        captured_at: DateTime<Utc>,
        image: Vec<u8>,
        assessment: Assessment,
    ) -> Result<Label, LabelError> {
        let format = ImageFormat::sniff(&image);
        let key = image_key(&camera.id, captured_at, format.extension());

        let image_url = match timeout(
            self.config.persist_timeout,
            self.images.put(image, &key, format.mime_type()),
        )
        .await
        {
            Ok(Ok(url)) => url,
            Ok(Err(e)) => return Err(persistence_error(&camera.id, e.to_string())),
            Err(_) => return Err(persistence_error(&camera.id, "image upload timed out")),
        };

        let new_label = NewLabel::from_assessment(
            camera,
            captured_at,
            image_url,
            assessment,
            &self.assessor.identity(),
            &self.config.source_environment,
        );

        match timeout(self.config.persist_timeout, self.store.insert(new_label)).await {
            Ok(Ok(label)) => Ok(label),
            Ok(Err(e)) => Err(persistence_error(&camera.id, e.to_string())),
            Err(_) => Err(persistence_error(&camera.id, "label insert timed out")),
        }
    }
}

fn persistence_error(camera_id: &str, message: impl Into<String>) -> LabelError {
    let message = message.into();
    log::error!("Failed to persist label for {camera_id}: {message}");
    LabelError::Persistence { message }
}
