//! Planner configuration.
//!
//! Values come from the environment, optionally seeded from a `.env` file.

use std::path::PathBuf;

use tracing::warn;

use crate::error::ConfigError;
use crate::haversine::DEFAULT_SPEED_KMH;

/// How the Route Optimization API authenticates.
#[derive(Debug, Clone, PartialEq)]
pub enum Credentials {
    /// Path to a service-account JSON key.
    ServiceAccountFile(PathBuf),
    /// A pre-issued OAuth bearer token.
    AccessToken(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    /// Key for the Geocoding and Routes APIs.
    pub maps_api_key: String,
    /// Project hosting the Route Optimization API.
    pub cloud_project_id: Option<String>,
    pub credentials: Option<Credentials>,
    pub http_timeout_secs: u64,
    /// Speed assumed by the greedy fallback.
    pub average_speed_kmh: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            maps_api_key: String::new(),
            cloud_project_id: None,
            credentials: None,
            http_timeout_secs: 30,
            average_speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl PlannerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let maps_api_key = var("GOOGLE_MAPS_API_KEY").ok_or(ConfigError::Missing("GOOGLE_MAPS_API_KEY"))?;
        let cloud_project_id = var("GOOGLE_CLOUD_PROJECT_ID");

        let credentials = match (
            var("GOOGLE_APPLICATION_CREDENTIALS"),
            var("GOOGLE_OAUTH_ACCESS_TOKEN"),
        ) {
            (Some(path), _) => Some(Credentials::ServiceAccountFile(PathBuf::from(path))),
            (None, Some(token)) => Some(Credentials::AccessToken(token)),
            (None, None) => None,
        };
        if cloud_project_id.is_none() || credentials.is_none() {
            warn!("Route Optimization API is not fully configured, time windows will only be validated");
        }

        let http_timeout_secs = match var("PLANNER_HTTP_TIMEOUT_SECS") {
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Invalid {
                    name: "PLANNER_HTTP_TIMEOUT_SECS",
                    value,
                })?,
            None => defaults.http_timeout_secs,
        };

        let average_speed_kmh = match var("PLANNER_AVERAGE_SPEED_KMH") {
            Some(value) => match value.parse::<f64>() {
                Ok(speed) if speed.is_finite() && speed > 0.0 => speed,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "PLANNER_AVERAGE_SPEED_KMH",
                        value,
                    });
                }
            },
            None => defaults.average_speed_kmh,
        };

        Ok(Self {
            maps_api_key,
            cloud_project_id,
            credentials,
            http_timeout_secs,
            average_speed_kmh,
        })
    }
}
