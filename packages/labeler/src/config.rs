//! Labeler settings read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `LABEL_MAX_AGE_MINUTES` | `30` |
//! | `IMAGE_FETCH_TIMEOUT_SECS` | `20` |
//! | `VISION_TIMEOUT_SECS` | `60` |
//! | `PERSIST_TIMEOUT_SECS` | `30` |
//! | `KARLCAM_ENVIRONMENT` | `local` |

use std::str::FromStr;
use std::time::Duration;

/// Default freshness window.
pub const DEFAULT_MAX_AGE_MINUTES: i64 = 30;

/// Default image fetch timeout.
pub const DEFAULT_IMAGE_TIMEOUT_SECS: u64 = 20;

/// Default vision model timeout.
pub const DEFAULT_VISION_TIMEOUT_SECS: u64 = 60;

/// Default timeout for each persistence write.
pub const DEFAULT_PERSIST_TIMEOUT_SECS: u64 = 30;

/// Default deployment environment tag.
pub const DEFAULT_ENVIRONMENT: &str = "local";

/// Runtime settings for the labeler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelerConfig {
    /// How old a stored label may be and still be served.
    pub max_age: chrono::Duration,
    /// Bound on fetching a camera image.
    pub image_timeout: Duration,
    /// Bound on the vision model call.
    pub vision_timeout: Duration,
    /// Bound on each of the image upload and the label insert.
    pub persist_timeout: Duration,
    /// Written to every label's `source_environment`.
    pub source_environment: String,
}

impl Default for LabelerConfig {
    fn default() -> Self {
        Self {
            max_age: default_max_age(),
            image_timeout: Duration::from_secs(DEFAULT_IMAGE_TIMEOUT_SECS),
            vision_timeout: Duration::from_secs(DEFAULT_VISION_TIMEOUT_SECS),
            persist_timeout: Duration::from_secs(DEFAULT_PERSIST_TIMEOUT_SECS),
            source_environment: DEFAULT_ENVIRONMENT.to_string(),
        }
    }
}

impl LabelerConfig {
    /// Reads settings from the environment. Unset or unparseable values
    /// fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let max_age_minutes =
            parse_var(&lookup, "LABEL_MAX_AGE_MINUTES", DEFAULT_MAX_AGE_MINUTES).max(0);
        let max_age = chrono::Duration::try_minutes(max_age_minutes).unwrap_or_else(|| {
            log::warn!(
                "Ignoring out-of-range LABEL_MAX_AGE_MINUTES={max_age_minutes}, \
                 using {DEFAULT_MAX_AGE_MINUTES}"
            );
            default_max_age()
        });

        Self {
            max_age,
            image_timeout: Duration::from_secs(parse_var(
                &lookup,
                "IMAGE_FETCH_TIMEOUT_SECS",
                DEFAULT_IMAGE_TIMEOUT_SECS,
            )),
            vision_timeout: Duration::from_secs(parse_var(
                &lookup,
                "VISION_TIMEOUT_SECS",
                DEFAULT_VISION_TIMEOUT_SECS,
            )),
            persist_timeout: Duration::from_secs(parse_var(
                &lookup,
                "PERSIST_TIMEOUT_SECS",
                DEFAULT_PERSIST_TIMEOUT_SECS,
            )),
            source_environment: lookup("KARLCAM_ENVIRONMENT")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
        }
    }
}

fn default_max_age() -> chrono::Duration {
    chrono::Duration::minutes(DEFAULT_MAX_AGE_MINUTES)
}

fn parse_var<T: FromStr + std::fmt::Display + Copy>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    let Some(raw) = lookup(name) else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        log::warn!("Ignoring invalid {name}={raw:?}, using {default}");
        default
    })
}
