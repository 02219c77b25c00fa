//! In-memory [`LabelStore`] for local runs without a database and for
//! tests.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use karlcam_database_models::{Label, NewLabel};

use crate::{LabelStore, StoreError};

/// A [`LabelStore`] that keeps labels in process memory.
#[derive(Debug, Default)]
pub struct MemoryLabelStore {
    labels: Mutex<Vec<Label>>,
}

impl MemoryLabelStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an already-identified label, bypassing id assignment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the lock is poisoned.
    pub fn seed(&self, label: Label) -> Result<(), StoreError> {
        self.lock()?.push(label);
        Ok(())
    }

    /// All stored labels in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the lock is poisoned.
    pub fn all(&self) -> Result<Vec<Label>, StoreError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Label>>, StoreError> {
        self.labels
            .lock()
            .map_err(|_| StoreError::Database("label store mutex poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl LabelStore for MemoryLabelStore {
    async fn query(
        &self,
        camera_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Label>, StoreError> {
        let mut found: Vec<Label> = self
            .lock()?
            .iter()
            .filter(|l| l.camera_id == camera_id && l.captured_at >= since)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.captured_at.cmp(&a.captured_at));
        Ok(found)
    }

    async fn insert(&self, label: NewLabel) -> Result<Label, StoreError> {
        let label = label.into_label(uuid::Uuid::new_v4().to_string());
        self.lock()?.push(label.clone());
        Ok(label)
    }
}
