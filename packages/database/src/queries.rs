//! SQL-backed [`LabelStore`].
//!
//! Timestamps are stored as RFC 3339 UTC strings with fixed microsecond
//! precision, so lexical order in the `captured_at` column equals
//! chronological order on both `SQLite` and `PostgreSQL`.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use karlcam_database_models::{Label, NewLabel};
use karlcam_fog_models::FogLevel;
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue, Row};

use crate::{LabelStore, StoreError};

/// [`LabelStore`] over a `switchy_database` connection.
pub struct DbLabelStore {
    db: Arc<dyn Database>,
}

impl DbLabelStore {
    /// Wraps an open connection. The schema must already exist (see
    /// [`crate::db::ensure_schema`]).
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

/// Formats a timestamp the way the `captured_at` column stores it.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Conversion {
            message: format!("Invalid captured_at '{value}': {e}"),
        })
}

/// Reads a typed column, mapping failures to [`StoreError::Conversion`].
macro_rules! column {
    ($row:expr, $name:literal) => {
        $row.to_value($name).map_err(|e| StoreError::Conversion {
            message: format!("Failed to read column {}: {e}", $name),
        })?
    };
}

fn row_to_label(row: &Row) -> Result<Label, StoreError> {
    let captured_at: String = column!(row, "captured_at");
    let fog_level: String = column!(row, "fog_level");
    let weather_conditions: String = column!(row, "weather_conditions");

    Ok(Label {
        id: column!(row, "id"),
        camera_id: column!(row, "camera_id"),
        camera_name: column!(row, "camera_name"),
        captured_at: parse_timestamp(&captured_at)?,
        image_url: column!(row, "image_url"),
        fog_score: column!(row, "fog_score"),
        fog_level: fog_level
            .parse::<FogLevel>()
            .map_err(|_| StoreError::Conversion {
                message: format!("Unknown fog_level '{fog_level}'"),
            })?,
        confidence: column!(row, "confidence"),
        reasoning: column!(row, "reasoning"),
        weather_conditions: serde_json::from_str(&weather_conditions)?,
        latitude: column!(row, "latitude"),
        longitude: column!(row, "longitude"),
        labeler_name: column!(row, "labeler_name"),
        labeler_version: column!(row, "labeler_version"),
        source_environment: column!(row, "source_environment"),
    })
}

#[async_trait::async_trait]
impl LabelStore for DbLabelStore {
    async fn query(
        &self,
        camera_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Label>, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT * FROM labels
                 WHERE camera_id = $1 AND captured_at >= $2
                 ORDER BY captured_at DESC",
                &[
                    DatabaseValue::String(camera_id.to_string()),
                    DatabaseValue::String(format_timestamp(since)),
                ],
            )
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.iter().map(row_to_label).collect()
    }

    async fn insert(&self, label: NewLabel) -> Result<Label, StoreError> {
        let label = label.into_label(uuid::Uuid::new_v4().to_string());
        let weather_conditions = serde_json::to_string(&label.weather_conditions)?;

        self.db
            .exec_raw_params(
                "INSERT INTO labels (
                    id, camera_id, camera_name, captured_at, image_url,
                    fog_score, fog_level, confidence, reasoning, weather_conditions,
                    latitude, longitude, labeler_name, labeler_version, source_environment
                ) VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15
                )",
                &[
                    DatabaseValue::String(label.id.clone()),
                    DatabaseValue::String(label.camera_id.clone()),
                    DatabaseValue::String(label.camera_name.clone()),
                    DatabaseValue::String(format_timestamp(label.captured_at)),
                    DatabaseValue::String(label.image_url.clone()),
                    DatabaseValue::Real64(label.fog_score),
                    DatabaseValue::String(label.fog_level.to_string()),
                    DatabaseValue::Real64(label.confidence),
                    DatabaseValue::String(label.reasoning.clone()),
                    DatabaseValue::String(weather_conditions),
                    DatabaseValue::Real64(label.latitude),
                    DatabaseValue::Real64(label.longitude),
                    DatabaseValue::String(label.labeler_name.clone()),
                    DatabaseValue::String(label.labeler_version.clone()),
                    DatabaseValue::String(label.source_environment.clone()),
                ],
            )
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        log::debug!(
            "Inserted label {} for {} ({})",
            label.id,
            label.camera_id,
            label.fog_level
        );

        Ok(label)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, SubsecRound as _};
    use karlcam_camera_models::Camera;
    use karlcam_fog_models::{Assessment, LabelerIdentity};

    use super::*;
    use crate::db::{ensure_schema, open_sqlite};

    async fn open_store(name: &str) -> DbLabelStore {
        let path = std::env::temp_dir().join(format!("karlcam_{name}.db"));
        let _ = std::fs::remove_file(&path);
        let db = open_sqlite(&path).unwrap();
        ensure_schema(db.as_ref()).await.unwrap();
        DbLabelStore::new(Arc::from(db))
    }

    fn new_label(camera_id: &str, captured_at: DateTime<Utc>, fog_score: f64) -> NewLabel {
        let camera = Camera {
            id: camera_id.to_string(),
            name: format!("Camera {camera_id}"),
            url: "https://example.com/cam.jpg".to_string(),
            latitude: 37.77,
            longitude: -122.45,
            description: None,
            active: true,
        };
        NewLabel::from_assessment(
            &camera,
            captured_at,
            format!("https://img.example/{camera_id}.jpg"),
            Assessment {
                fog_score,
                fog_level: FogLevel::ModerateFog,
                confidence: 0.85,
                reasoning: "Towers partly obscured".to_string(),
                weather_conditions: vec!["fog".to_string(), "overcast".to_string()],
            },
            &LabelerIdentity {
                name: "gemini".to_string(),
                version: "gemini-1.5-flash".to_string(),
            },
            "test",
        )
    }

    #[test]
    fn timestamps_sort_lexically() {
        let a = Utc::now().trunc_subsecs(6);
        let b = a + Duration::milliseconds(1);
        assert!(format_timestamp(a) < format_timestamp(b));
        assert!(format_timestamp(a).ends_with('Z'));
    }

    #[tokio::test]
    async fn insert_then_query_round_trips_exactly() {
        let store = open_store("round_trip").await;
        let now = Utc::now();

        let inserted = store.insert(new_label("camA", now, 42.5)).await.unwrap();
        let found = store
            .query("camA", now - Duration::minutes(30))
            .await
            .unwrap();

        assert_eq!(found, vec![inserted]);
    }

    #[tokio::test]
    async fn query_filters_by_camera_and_window_newest_first() {
        let store = open_store("window").await;
        let now = Utc::now();

        store
            .insert(new_label("camA", now - Duration::minutes(45), 10.0))
            .await
            .unwrap();
        let older = store
            .insert(new_label("camA", now - Duration::minutes(20), 20.0))
            .await
            .unwrap();
        let newer = store
            .insert(new_label("camA", now - Duration::minutes(5), 30.0))
            .await
            .unwrap();
        store
            .insert(new_label("camB", now - Duration::minutes(1), 90.0))
            .await
            .unwrap();

        let found = store
            .query("camA", now - Duration::minutes(30))
            .await
            .unwrap();

        assert_eq!(found, vec![newer, older]);
    }

    #[tokio::test]
    async fn each_insert_gets_a_new_id() {
        let store = open_store("ids").await;
        let now = Utc::now();

        let a = store.insert(new_label("camA", now, 1.0)).await.unwrap();
        let b = store.insert(new_label("camA", now, 1.0)).await.unwrap();

        assert_ne!(a.id, b.id);
    }
}
