//! Database connection utilities.

use std::path::Path;

use switchy_database::Database;
use switchy_database_connection::{Credentials, init_sqlite_rusqlite};

use crate::StoreError;

/// Default path for the local `SQLite` label database.
pub const DEFAULT_DB_PATH: &str = "data/karlcam.db";

/// Opens the label database and ensures the schema exists.
///
/// If `DATABASE_URL` is set to a `postgres://` URL, connects to
/// `PostgreSQL`. Otherwise opens (or creates) the `SQLite` file at
/// `KARLCAM_DB_PATH`, defaulting to [`DEFAULT_DB_PATH`].
///
/// # Errors
///
/// Returns [`StoreError`] if the connection or schema creation fails.
pub async fn connect_from_env() -> Result<Box<dyn Database>, StoreError> {
    let db = match std::env::var("DATABASE_URL") {
        Ok(url) if url.starts_with("postgres") => connect_postgres(&url).await?,
        _ => {
            let path = std::env::var("KARLCAM_DB_PATH")
                .unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
            open_sqlite(Path::new(&path))?
        }
    };

    ensure_schema(db.as_ref()).await?;

    Ok(db)
}

/// Connects to `PostgreSQL`.
///
/// Configures a 30-second `statement_timeout` so a stalled query fails
/// instead of holding a request open indefinitely.
async fn connect_postgres(url: &str) -> Result<Box<dyn Database>, StoreError> {
    // Strip query parameters (e.g., ?sslmode=require) that the Credentials
    // parser doesn't understand. TLS is handled by the native-tls connector.
    let url_base = url.split('?').next().unwrap_or(url);

    let creds =
        Credentials::from_url(url_base).map_err(|e| StoreError::Database(e.to_string()))?;
    let db = switchy_database_connection::init_postgres_raw_native_tls(creds)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

    db.exec_raw("SET statement_timeout = '30s'")
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

    log::info!("Connected to PostgreSQL label store");

    Ok(db)
}

/// Opens (or creates) a `SQLite` database file.
///
/// # Errors
///
/// Returns [`StoreError`] if the parent directory cannot be created or
/// the database cannot be opened.
pub fn open_sqlite(path: &Path) -> Result<Box<dyn Database>, StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db =
        init_sqlite_rusqlite(Some(path)).map_err(|e| StoreError::Database(e.to_string()))?;

    log::info!("Opened SQLite label store at {}", path.display());

    Ok(db)
}

/// Creates the `labels` table and its index if they don't already exist.
///
/// The DDL is portable between `SQLite` and `PostgreSQL`.
///
/// # Errors
///
/// Returns [`StoreError`] if a statement fails.
pub async fn ensure_schema(db: &dyn Database) -> Result<(), StoreError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS labels (
            id                  TEXT PRIMARY KEY,
            camera_id           TEXT NOT NULL,
            camera_name         TEXT NOT NULL,
            captured_at         TEXT NOT NULL,
            image_url           TEXT NOT NULL,
            fog_score           DOUBLE PRECISION NOT NULL,
            fog_level           TEXT NOT NULL,
            confidence          DOUBLE PRECISION NOT NULL,
            reasoning           TEXT NOT NULL,
            weather_conditions  TEXT NOT NULL,
            latitude            DOUBLE PRECISION NOT NULL,
            longitude           DOUBLE PRECISION NOT NULL,
            labeler_name        TEXT NOT NULL,
            labeler_version     TEXT NOT NULL,
            source_environment  TEXT NOT NULL
        )",
    )
    .await
    .map_err(|e| StoreError::Database(e.to_string()))?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_labels_camera_captured
         ON labels (camera_id, captured_at)",
    )
    .await
    .map_err(|e| StoreError::Database(e.to_string()))?;

    Ok(())
}
