#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Label store for KarlCam.
//!
//! Uses `switchy_database` for all database operations: `SQLite` for local
//! development and `PostgreSQL` in the cloud, selected by `DATABASE_URL`.
//! The [`LabelStore`] trait is the seam the labeler depends on; the SQL
//! implementation lives in [`queries`] and an in-memory one in [`memory`].

pub mod db;
pub mod memory;
pub mod queries;

use chrono::{DateTime, Utc};
use karlcam_database_models::{Label, NewLabel};
use thiserror::Error;

/// Errors from label store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database query or command failed.
    #[error("Database error: {0}")]
    Database(String),

    /// JSON serialization/deserialization of a column failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored value could not be converted back into a label.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// An I/O operation failed (creating the database directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable storage for labels.
///
/// Labels are append-only: there is no update or delete.
#[async_trait::async_trait]
pub trait LabelStore: Send + Sync {
    /// Returns labels for `camera_id` captured at or after `since`,
    /// newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be queried.
    async fn query(&self, camera_id: &str, since: DateTime<Utc>)
    -> Result<Vec<Label>, StoreError>;

    /// Writes a new label and returns it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn insert(&self, label: NewLabel) -> Result<Label, StoreError>;
}
