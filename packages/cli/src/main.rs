#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for KarlCam.
//!
//! ```text
//! karlcam serve
//! karlcam label <camera_id>
//! karlcam cameras
//! karlcam history <camera_id> [--hours 24]
//! ```
//!
//! Running `karlcam` with no subcommand starts the server.

use std::path::Path;

use clap::{Parser, Subcommand};
use karlcam_camera::registry::{CameraDirectory as _, load_directory};
use karlcam_labeler::LabelError;
use karlcam_labeler::setup::{cameras_file_from_env, labeler_from_env};
use karlcam_server_models::{ApiLabel, ApiLabelResponse, DEFAULT_HISTORY_HOURS, HistoryParams};

#[derive(Parser)]
#[command(name = "karlcam", about = "On-demand fog labels for Bay Area webcams")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve,
    /// Print the current label for a camera, generating one if stale
    Label {
        /// Camera ID
        camera_id: String,
    },
    /// List configured cameras
    Cameras,
    /// Print stored labels for a camera, newest first
    History {
        /// Camera ID
        camera_id: String,
        /// How many hours back to look
        #[arg(long, default_value_t = DEFAULT_HISTORY_HOURS)]
        hours: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(karlcam_server::run_server())
            })
            .await??;
        }
        Commands::Label { camera_id } => {
            let labeler = labeler_from_env().await?;
            let result = labeler.get_label(&camera_id).await.map_err(not_found_hint)?;

            let response = ApiLabelResponse {
                source: karlcam_server::label_source(result.provenance),
                label: result.label.map(ApiLabel::from),
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Cameras => {
            let cameras_file = cameras_file_from_env();
            let directory = load_directory(cameras_file.as_deref().map(Path::new))?;
            let cameras = directory.list();

            if cameras.is_empty() {
                println!("No active cameras configured.");
                return Ok(());
            }

            println!("{:<20} {:<28} {:>10} {:>11}", "ID", "NAME", "LAT", "LON");
            for camera in cameras {
                println!(
                    "{:<20} {:<28} {:>10.4} {:>11.4}",
                    camera.id, camera.name, camera.latitude, camera.longitude
                );
            }
        }
        Commands::History { camera_id, hours } => {
            let hours = HistoryParams { hours: Some(hours) }.hours();
            let labeler = labeler_from_env().await?;
            let labels = labeler
                .history(&camera_id, hours)
                .await
                .map_err(not_found_hint)?;

            if labels.is_empty() {
                println!("No labels for {camera_id} in the last {hours}h.");
                return Ok(());
            }

            for label in labels {
                let level: &str = label.fog_level.as_ref();
                println!(
                    "{}  {:>5.1}  {:<15} {:.2}  {}",
                    label.captured_at.format("%Y-%m-%d %H:%M:%S"),
                    label.fog_score,
                    level,
                    label.confidence,
                    label.reasoning
                );
            }
        }
    }

    Ok(())
}

/// Adds the list command to a not-found message.
fn not_found_hint(e: LabelError) -> Box<dyn std::error::Error> {
    match e {
        LabelError::CameraNotFound { camera_id } => {
            format!("Camera not found: {camera_id} (run `karlcam cameras` to list ids)").into()
        }
        other => Box::new(other),
    }
}
