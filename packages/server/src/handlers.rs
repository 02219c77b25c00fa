//! HTTP handler functions for the KarlCam API.

use actix_web::{HttpResponse, web};
use karlcam_labeler::LabelError;
use karlcam_server_models::{
    ApiCamera, ApiError, ApiHealth, ApiLabel, ApiLabelResponse, HistoryParams,
};

use crate::{AppState, label_source};

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/cameras`
///
/// Lists active cameras with their current label. Labels are read from
/// the store only; a stale camera is listed with `current_label: null`.
pub async fn cameras(state: web::Data<AppState>) -> HttpResponse {
    let mut listing = Vec::new();

    for camera in state.labeler.cameras() {
        match state.labeler.current_label(&camera.id).await {
            Ok(label) => listing.push(ApiCamera::new(camera, label)),
            Err(e) => return error_response(&e),
        }
    }

    HttpResponse::Ok().json(listing)
}

/// `GET /api/label/{camera_id}`
///
/// Returns the current label, generating one if the stored label is
/// stale. An unavailable label is a `200` with `label: null`.
pub async fn label(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let camera_id = path.into_inner();

    match state.labeler.get_label(&camera_id).await {
        Ok(result) => HttpResponse::Ok().json(ApiLabelResponse {
            source: label_source(result.provenance),
            label: result.label.map(ApiLabel::from),
        }),
        Err(e) => error_response(&e),
    }
}

/// `GET /api/cameras/{camera_id}/labels?hours=N`
///
/// Label history for one camera, newest first.
pub async fn label_history(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<HistoryParams>,
) -> HttpResponse {
    let camera_id = path.into_inner();

    match state.labeler.history(&camera_id, params.hours()).await {
        Ok(labels) => {
            let labels: Vec<ApiLabel> = labels.into_iter().map(ApiLabel::from).collect();
            HttpResponse::Ok().json(labels)
        }
        Err(e) => error_response(&e),
    }
}

/// Maps a labeler error to `404` for unknown cameras and `500` otherwise.
fn error_response(e: &LabelError) -> HttpResponse {
    match e {
        LabelError::CameraNotFound { .. } => HttpResponse::NotFound().json(ApiError {
            error: e.to_string(),
        }),
        LabelError::StoreUnavailable(_) | LabelError::Persistence { .. } => {
            log::error!("Request failed: {e}");
            HttpResponse::InternalServerError().json(ApiError {
                error: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use chrono::{DateTime, Duration, SubsecRound as _, Utc};
    use karlcam_ai::AiError;
    use karlcam_ai::assessor::FogAssessor;
    use karlcam_ai::providers::{VisionProvider, VisionRequest};
    use karlcam_camera::ImageError;
    use karlcam_camera::image::ImageSource;
    use karlcam_camera::registry::StaticCameraDirectory;
    use karlcam_camera_models::Camera;
    use karlcam_database::memory::MemoryLabelStore;
    use karlcam_database::{LabelStore, StoreError};
    use karlcam_database_models::{Label, NewLabel};
    use karlcam_fog_models::{FogLevel, LabelerIdentity};
    use karlcam_labeler::{Labeler, LabelerConfig};
    use karlcam_storage::{ImageStore, StorageError};

    use crate::{AppState, configure};

    struct StaticImage {
        up: bool,
    }

    #[async_trait::async_trait]
    impl ImageSource for StaticImage {
        async fn fetch(&self, camera: &Camera) -> Result<Vec<u8>, ImageError> {
            if self.up {
                Ok(vec![0xFF, 0xD8, 0xFF, 0xE0])
            } else {
                Err(ImageError::BadUrl {
                    url: camera.url.clone(),
                    message: "unsupported scheme".to_string(),
                })
            }
        }
    }

    struct FoggyModel;

    #[async_trait::async_trait]
    impl VisionProvider for FoggyModel {
        async fn generate(&self, _request: VisionRequest<'_>) -> Result<String, AiError> {
            Ok(r#"{"fog_score": 72, "fog_level": "Heavy Fog", "confidence": 0.85,
                   "reasoning": "Towers hidden", "weather_conditions": ["fog"]}"#
                .to_string())
        }

        fn identity(&self) -> LabelerIdentity {
            LabelerIdentity {
                name: "gemini".to_string(),
                version: "gemini-2.5-flash".to_string(),
            }
        }
    }

    struct UrlImageStore {
        up: bool,
    }

    #[async_trait::async_trait]
    impl ImageStore for UrlImageStore {
        async fn put(&self, _: Vec<u8>, key: &str, _: &str) -> Result<String, StorageError> {
            if self.up {
                Ok(format!("https://img.test/{key}"))
            } else {
                Err(StorageError::MissingEnv {
                    name: "IMAGE_BUCKET".to_string(),
                })
            }
        }
    }

    struct DownStore;

    #[async_trait::async_trait]
    impl LabelStore for DownStore {
        async fn query(&self, _: &str, _: DateTime<Utc>) -> Result<Vec<Label>, StoreError> {
            Err(StoreError::Database("connection refused".to_string()))
        }

        async fn insert(&self, _: NewLabel) -> Result<Label, StoreError> {
            Err(StoreError::Database("connection refused".to_string()))
        }
    }

    fn camera(id: &str) -> Camera {
        Camera {
            id: id.to_string(),
            name: format!("Camera {id}"),
            url: format!("https://cams.test/{id}.jpg"),
            latitude: 37.8,
            longitude: -122.47,
            description: Some("test camera".to_string()),
            active: true,
        }
    }

    fn stored_label(camera_id: &str, captured_at: DateTime<Utc>) -> Label {
        Label {
            id: format!("{camera_id}-label"),
            camera_id: camera_id.to_string(),
            camera_name: format!("Camera {camera_id}"),
            captured_at,
            image_url: "https://img.test/cached.jpg".to_string(),
            fog_score: 10.0,
            fog_level: FogLevel::Clear,
            confidence: 0.95,
            reasoning: "Clear view of the bridge".to_string(),
            weather_conditions: vec!["sunny".to_string()],
            latitude: 37.8,
            longitude: -122.47,
            labeler_name: "gemini".to_string(),
            labeler_version: "gemini-2.5-flash".to_string(),
            source_environment: "test".to_string(),
        }
    }

    fn state(
        store: Arc<dyn LabelStore>,
        image_up: bool,
        upload_up: bool,
    ) -> actix_web::web::Data<AppState> {
        let labeler = Labeler::new(
            Arc::new(StaticCameraDirectory::new(vec![camera("camA"), camera("camB")]).unwrap()),
            store,
            Arc::new(UrlImageStore { up: upload_up }),
            Arc::new(StaticImage { up: image_up }),
            FogAssessor::new(Box::new(FoggyModel)),
            LabelerConfig::default(),
        );
        actix_web::web::Data::new(AppState {
            labeler: Arc::new(labeler),
        })
    }

    fn seeded_store() -> Arc<MemoryLabelStore> {
        let store = Arc::new(MemoryLabelStore::new());
        store
            .seed(stored_label(
                "camA",
                Utc::now().trunc_subsecs(6) - Duration::minutes(10),
            ))
            .unwrap();
        store
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();

        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["healthy"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn cached_label_is_served_as_firestore() {
        let app = test::init_service(
            App::new()
                .app_data(state(seeded_store(), true, true))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get().uri("/api/label/camA").to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;

        assert_eq!(body["source"], "firestore");
        assert_eq!(body["label"]["camera_id"], "camA");
        assert_eq!(body["label"]["fog_level"], "Clear");
    }

    #[actix_web::test]
    async fn stale_camera_gets_on_demand_label() {
        let app = test::init_service(
            App::new()
                .app_data(state(seeded_store(), true, true))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get().uri("/api/label/camB").to_request();

        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["source"], "on-demand");
        assert_eq!(body["label"]["camera_id"], "camB");
        assert_eq!(body["label"]["fog_level"], "Heavy Fog");
        assert_eq!(body["label"]["fog_score"], 72.0);
        assert_eq!(body["label"]["labeler_name"], "gemini");
    }

    #[actix_web::test]
    async fn unreachable_camera_is_200_unavailable() {
        let app = test::init_service(
            App::new()
                .app_data(state(seeded_store(), false, true))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get().uri("/api/label/camB").to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;

        assert_eq!(
            body,
            serde_json::json!({"source": "unavailable", "label": null})
        );
    }

    #[actix_web::test]
    async fn unknown_camera_is_404() {
        let app = test::init_service(
            App::new()
                .app_data(state(seeded_store(), true, true))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/label/unknown-id")
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = test::read_body_json(resp).await;

        assert!(body["error"].as_str().unwrap().contains("unknown-id"));
    }

    #[actix_web::test]
    async fn persistence_failure_is_500() {
        let app = test::init_service(
            App::new()
                .app_data(state(seeded_store(), true, false))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get().uri("/api/label/camB").to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = test::read_body_json(resp).await;

        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn store_outage_is_500() {
        let app = test::init_service(
            App::new()
                .app_data(state(Arc::new(DownStore), true, true))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get().uri("/api/label/camA").to_request();

        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn camera_listing_includes_only_cached_labels() {
        let app = test::init_service(
            App::new()
                .app_data(state(seeded_store(), true, true))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get().uri("/api/cameras").to_request();

        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let cameras = body.as_array().unwrap();
        assert_eq!(cameras.len(), 2);
        assert_eq!(cameras[0]["id"], "camA");
        assert_eq!(cameras[0]["current_label"]["fog_level"], "Clear");
        assert_eq!(cameras[1]["id"], "camB");
        assert!(cameras[1]["current_label"].is_null());
    }

    #[actix_web::test]
    async fn history_respects_hours() {
        let store = seeded_store();
        store
            .seed(stored_label("camA", Utc::now() - Duration::hours(30)))
            .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state(store, true, true))
                .configure(configure),
        )
        .await;

        let day: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/api/cameras/camA/labels")
                .to_request(),
        )
        .await;
        let two_days: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/api/cameras/camA/labels?hours=48")
                .to_request(),
        )
        .await;

        assert_eq!(day.as_array().unwrap().len(), 1);
        assert_eq!(two_days.as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn history_for_unknown_camera_is_404() {
        let app = test::init_service(
            App::new()
                .app_data(state(seeded_store(), true, true))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/cameras/nope/labels")
            .to_request();

        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
