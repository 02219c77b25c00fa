#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for KarlCam.
//!
//! Serves the current fog label per camera, generating one on demand when
//! the stored label is stale, plus the camera listing and label history
//! used by the map front end. When images are stored on local disk they
//! are served under `/images`.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use karlcam_labeler::{Labeler, Provenance};
use karlcam_labeler::setup::labeler_from_env;
use karlcam_server_models::ApiLabelSource;
use karlcam_storage::{LOCAL_IMAGE_ROUTE, local_image_dir_from_env};

/// Shared application state.
pub struct AppState {
    /// Label cache and on-demand generation.
    pub labeler: Arc<Labeler>,
}

/// Wire value for a label's provenance.
#[must_use]
pub const fn label_source(provenance: Provenance) -> ApiLabelSource {
    match provenance {
        Provenance::Cache => ApiLabelSource::Cache,
        Provenance::Fresh => ApiLabelSource::Fresh,
        Provenance::Unavailable => ApiLabelSource::Unavailable,
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/cameras", web::get().to(handlers::cameras))
            .route(
                "/cameras/{camera_id}/labels",
                web::get().to(handlers::label_history),
            )
            .route("/label/{camera_id}", web::get().to(handlers::label)),
    );
}

/// Starts the KarlCam API server.
///
/// Builds the labeler from the environment and starts the Actix-Web HTTP
/// server on `BIND_ADDR:PORT` (default `127.0.0.1:8080`). This is a
/// regular async function; the caller provides the runtime (e.g. via
/// `#[actix_web::main]`) and initializes logging.
///
/// # Errors
///
/// Returns an `std::io::Result` error if a collaborator cannot be
/// configured, or if the HTTP server fails to bind or encounters a runtime
/// error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    log::info!("Configuring labeler...");
    let labeler = labeler_from_env().await.map_err(std::io::Error::other)?;

    let image_dir = local_image_dir_from_env();
    if let Some(dir) = &image_dir {
        std::fs::create_dir_all(dir)?;
        log::info!("Serving {} at {LOCAL_IMAGE_ROUTE}", dir.display());
    }

    let state = web::Data::new(AppState {
        labeler: Arc::new(labeler),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        let mut app = App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure);

        if let Some(dir) = &image_dir {
            app = app.service(Files::new(LOCAL_IMAGE_ROUTE, dir));
        }

        app
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
