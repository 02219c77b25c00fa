#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Durable storage for webcam images.
//!
//! Every fresh label references the image it was assessed from by URL, so
//! the image is uploaded before the label row is written. Two backends
//! implement [`ImageStore`]:
//!
//! - [`S3ImageStore`]: any S3-compatible bucket (AWS S3, Cloudflare R2,
//!   GCS interop)
//! - [`LocalImageStore`]: a directory on disk, served by the API server
//!   under `/images`
//!
//! # Environment Variables
//!
//! | Variable | Required | Description |
//! |---|---|---|
//! | `IMAGE_BUCKET` | For S3 | Bucket name; selects the S3 backend when set |
//! | `S3_ENDPOINT_URL` | No | Custom endpoint (R2, `MinIO`, GCS interop) |
//! | `S3_ACCESS_KEY_ID` | For S3 | Access key |
//! | `S3_SECRET_ACCESS_KEY` | For S3 | Secret key |
//! | `S3_REGION` | No | Region, default `auto` |
//! | `IMAGE_PUBLIC_BASE_URL` | No | Public URL prefix for stored objects |
//! | `IMAGE_DIR` | No | Local backend root, default `data/images` |

use std::path::PathBuf;

use aws_config::Region;
use aws_sdk_s3::config::{Credentials, StalledStreamProtectionConfig};
use chrono::{DateTime, Utc};

/// Default root directory for the local backend.
pub const DEFAULT_IMAGE_DIR: &str = "data/images";

/// URL prefix the API server mounts the local image directory on.
pub const LOCAL_IMAGE_ROUTE: &str = "/images";

/// Errors that can occur while storing an image.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Missing required environment variable.
    #[error("Missing environment variable: {name}")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: String,
    },

    /// S3 `PutObject` failed.
    #[error("Failed to upload s3://{bucket}/{key}: {source}")]
    Upload {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// I/O error writing a local file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable, publicly resolvable image storage.
#[async_trait::async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores `bytes` under `key` and returns the public URL.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the write fails.
    async fn put(&self, bytes: Vec<u8>, key: &str, content_type: &str)
    -> Result<String, StorageError>;
}

/// Builds the object key for a camera image:
/// `images/{camera_id}/{YYYYmmdd_HHMMSS_ffffff}.{extension}`.
///
/// Characters outside `[A-Za-z0-9_-]` in the camera id are replaced with
/// `_` so the key can never escape its prefix.
#[must_use]
pub fn image_key(camera_id: &str, captured_at: DateTime<Utc>, extension: &str) -> String {
    let safe_id: String = camera_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "images/{safe_id}/{}.{extension}",
        captured_at.format("%Y%m%d_%H%M%S_%6f")
    )
}

/// Joins a base URL and a key with exactly one `/`.
fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'))
}

/// Client for storing images in an S3-compatible bucket.
pub struct S3ImageStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3ImageStore {
    /// Creates a new store from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MissingEnv`] if the bucket or credentials
    /// are unset.
    pub fn from_env() -> Result<Self, StorageError> {
        let bucket = require_env("IMAGE_BUCKET")?;
        let access_key = require_env("S3_ACCESS_KEY_ID")?;
        let secret_key = require_env("S3_SECRET_ACCESS_KEY")?;
        let region = std::env::var("S3_REGION").unwrap_or_else(|_| "auto".to_string());
        let endpoint = std::env::var("S3_ENDPOINT_URL").ok();

        let creds = Credentials::new(&access_key, &secret_key, None, None, "karlcam-env");

        let mut builder = aws_sdk_s3::Config::builder()
            .region(Region::new(region.clone()))
            .credentials_provider(creds)
            .stalled_stream_protection(StalledStreamProtectionConfig::disabled());
        if let Some(endpoint) = &endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let public_base_url = std::env::var("IMAGE_PUBLIC_BASE_URL").unwrap_or_else(|_| {
            endpoint.as_ref().map_or_else(
                || format!("https://{bucket}.s3.{region}.amazonaws.com"),
                |e| join_url(e, &bucket),
            )
        });

        log::info!("Storing images in s3://{bucket} (public base {public_base_url})");

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket,
            public_base_url,
        })
    }
}

#[async_trait::async_trait]
impl ImageStore for S3ImageStore {
    async fn put(
        &self,
        bytes: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let size = bytes.len();
        let body = aws_sdk_s3::primitives::ByteStream::from(bytes);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                bucket: self.bucket.clone(),
                key: key.to_string(),
                source: Box::new(e),
            })?;

        log::debug!("Uploaded s3://{}/{key} ({size} bytes)", self.bucket);

        Ok(join_url(&self.public_base_url, key))
    }
}

/// Stores images in a local directory.
pub struct LocalImageStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalImageStore {
    /// Creates a store rooted at `root` whose URLs start with
    /// `public_base_url`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Creates a store from `IMAGE_DIR` and `IMAGE_PUBLIC_BASE_URL`,
    /// defaulting to [`DEFAULT_IMAGE_DIR`] served at [`LOCAL_IMAGE_ROUTE`].
    #[must_use]
    pub fn from_env() -> Self {
        let root = std::env::var("IMAGE_DIR").unwrap_or_else(|_| DEFAULT_IMAGE_DIR.to_string());
        let base = std::env::var("IMAGE_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| LOCAL_IMAGE_ROUTE.to_string());
        log::info!("Storing images in local directory {root}");
        Self::new(root, base)
    }
}

#[async_trait::async_trait]
impl ImageStore for LocalImageStore {
    async fn put(
        &self,
        bytes: Vec<u8>,
        key: &str,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        let relative = key.strip_prefix("images/").unwrap_or(key);
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;

        log::debug!("Wrote {} ({} bytes)", path.display(), bytes.len());

        Ok(join_url(&self.public_base_url, relative))
    }
}

/// Picks the backend from the environment: S3 when `IMAGE_BUCKET` is set,
/// local filesystem otherwise.
///
/// # Errors
///
/// Returns [`StorageError::MissingEnv`] if `IMAGE_BUCKET` is set but the
/// S3 credentials are not.
pub fn image_store_from_env() -> Result<Box<dyn ImageStore>, StorageError> {
    if std::env::var("IMAGE_BUCKET").is_ok() {
        Ok(Box::new(S3ImageStore::from_env()?))
    } else {
        Ok(Box::new(LocalImageStore::from_env()))
    }
}

/// Directory the local backend writes to, or `None` when images go to a
/// bucket.
#[must_use]
pub fn local_image_dir_from_env() -> Option<PathBuf> {
    if std::env::var("IMAGE_BUCKET").is_ok() {
        return None;
    }
    Some(PathBuf::from(
        std::env::var("IMAGE_DIR").unwrap_or_else(|_| DEFAULT_IMAGE_DIR.to_string()),
    ))
}

/// Reads a required environment variable.
fn require_env(name: &str) -> Result<String, StorageError> {
    std::env::var(name).map_err(|_| StorageError::MissingEnv {
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    #[test]
    fn image_key_is_timestamped_per_camera() {
        let ts = Utc.with_ymd_and_hms(2025, 8, 14, 7, 5, 9).unwrap();
        assert_eq!(
            image_key("ocean-beach", ts, "jpg"),
            "images/ocean-beach/20250814_070509_000000.jpg"
        );
    }

    #[test]
    fn image_key_sanitizes_camera_id() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let key = image_key("../etc/passwd", ts, "png");
        assert!(key.starts_with("images/___etc_passwd/"));
        assert!(!key.contains(".."));
    }

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(join_url("https://cdn/", "/a/b.jpg"), "https://cdn/a/b.jpg");
        assert_eq!(join_url("/images", "a.jpg"), "/images/a.jpg");
    }

    #[tokio::test]
    async fn local_store_writes_file_and_returns_public_url() {
        let root = std::env::temp_dir().join("karlcam_local_store_test");
        let _ = std::fs::remove_dir_all(&root);
        let store = LocalImageStore::new(&root, "http://localhost:8080/images");

        let url = store
            .put(vec![1, 2, 3], "images/cam/20250101_000000_000000.jpg", "image/jpeg")
            .await
            .unwrap();

        assert_eq!(
            url,
            "http://localhost:8080/images/cam/20250101_000000_000000.jpg"
        );
        let written = std::fs::read(root.join("cam/20250101_000000_000000.jpg")).unwrap();
        assert_eq!(written, vec![1, 2, 3]);

        let _ = std::fs::remove_dir_all(&root);
    }
}
