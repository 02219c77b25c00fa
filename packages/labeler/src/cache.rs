//! Label cache policy.
//!
//! There is no separate cache: the label store is queried on every read
//! and freshness is evaluated against the current time, so a label
//! expires without anything being written. A label is fresh when
//! `captured_at >= now - max_age`; the boundary itself is a hit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use karlcam_camera::registry::CameraDirectory;
use karlcam_camera_models::Camera;
use karlcam_database::LabelStore;
use karlcam_database_models::Label;

use crate::LabelError;

/// Start of the window of length `age` ending at `now`. A window reaching
/// past the earliest representable instant starts there.
#[must_use]
pub fn window_start(now: DateTime<Utc>, age: chrono::Duration) -> DateTime<Utc> {
    now.checked_sub_signed(age).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Returns `true` if `label` is inside the freshness window at `now`.
#[must_use]
pub fn is_fresh(label: &Label, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
    label.captured_at >= window_start(now, max_age)
}

/// Read-only view of the current label per camera.
#[derive(Clone)]
pub struct LabelCache {
    cameras: Arc<dyn CameraDirectory>,
    store: Arc<dyn LabelStore>,
}

impl LabelCache {
    /// Creates a cache over a camera directory and a label store.
    #[must_use]
    pub fn new(cameras: Arc<dyn CameraDirectory>, store: Arc<dyn LabelStore>) -> Self {
        Self { cameras, store }
    }

    /// Looks up an active camera.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::CameraNotFound`] if the id is unknown or the
    /// camera is inactive.
    pub fn camera(&self, camera_id: &str) -> Result<Camera, LabelError> {
        self.cameras
            .get(camera_id)
            .filter(|camera| camera.active)
            .ok_or_else(|| LabelError::CameraNotFound {
                camera_id: camera_id.to_string(),
            })
    }

    /// All active cameras.
    #[must_use]
    pub fn cameras(&self) -> Vec<Camera> {
        self.cameras.list()
    }

    /// The newest label for `camera_id` no older than `max_age`.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::CameraNotFound`] for an unknown camera and
    /// [`LabelError::StoreUnavailable`] if the store cannot be read.
    pub async fn get_current(
        &self,
        camera_id: &str,
        max_age: chrono::Duration,
    ) -> Result<Option<Label>, LabelError> {
        self.get_current_at(camera_id, max_age, Utc::now()).await
    }

    /// [`Self::get_current`] evaluated at a given instant.
    ///
    /// # Errors
    ///
    /// See [`Self::get_current`].
    pub async fn get_current_at(
        &self,
        camera_id: &str,
        max_age: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<Label>, LabelError> {
        self.camera(camera_id)?;
        self.lookup(camera_id, max_age, now).await
    }

    /// Cache lookup for a camera already known to exist.
    pub(crate) async fn lookup(
        &self,
        camera_id: &str,
        max_age: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<Label>, LabelError> {
        let labels = self
            .store
            .query(camera_id, window_start(now, max_age))
            .await
            .map_err(LabelError::StoreUnavailable)?;

        Ok(labels
            .into_iter()
            .filter(|label| is_fresh(label, now, max_age))
            .max_by_key(|label| label.captured_at))
    }

    /// Every stored label for `camera_id` captured at or after `since`,
    /// newest first.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::CameraNotFound`] for an unknown camera and
    /// [`LabelError::StoreUnavailable`] if the store cannot be read.
    pub async fn history(
        &self,
        camera_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Label>, LabelError> {
        self.camera(camera_id)?;
        self.store
            .query(camera_id, since)
            .await
            .map_err(LabelError::StoreUnavailable)
    }
}
