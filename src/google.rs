//! Wire helpers shared by the Google Maps Platform adapters.

use chrono::{DateTime, SecondsFormat};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StrategyError;
use crate::model::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<Coordinate> for LatLng {
    fn from(coordinate: Coordinate) -> Self {
        Self {
            latitude: coordinate.lat,
            longitude: coordinate.lng,
        }
    }
}

/// Unix seconds as an RFC 3339 UTC string, e.g. `2025-06-01T09:00:00Z`.
pub(crate) fn format_timestamp(secs: i64) -> Result<String, StrategyError> {
    DateTime::from_timestamp(secs, 0)
        .map(|time| time.to_rfc3339_opts(SecondsFormat::Secs, true))
        .ok_or_else(|| StrategyError::InvalidInput(format!("timestamp {secs} is out of range")))
}

pub(crate) fn parse_timestamp(value: &str) -> Result<i64, StrategyError> {
    DateTime::parse_from_rfc3339(value)
        .map(|time| time.timestamp())
        .map_err(|err| StrategyError::Malformed(format!("bad timestamp {value:?}: {err}")))
}

/// Longest duration accepted from a backend, about 68 years.
const MAX_DURATION_SECS: f64 = i32::MAX as f64;

/// Protobuf JSON duration (`"754s"`, `"12.5s"`) to whole seconds.
pub(crate) fn parse_duration_secs(value: &str) -> Result<i64, StrategyError> {
    value
        .strip_suffix('s')
        .and_then(|number| number.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && (0.0..=MAX_DURATION_SECS).contains(secs))
        .map(|secs| secs.round() as i64)
        .ok_or_else(|| StrategyError::Malformed(format!("bad duration {value:?}")))
}

pub(crate) fn duration_string(secs: i64) -> String {
    format!("{secs}s")
}

/// POST a JSON body and decode a JSON reply, mapping failures per service.
pub(crate) fn post_json<B, R>(
    service: &'static str,
    request: reqwest::blocking::RequestBuilder,
    body: &B,
) -> Result<R, StrategyError>
where
    B: Serialize,
    R: DeserializeOwned,
{
    if let Ok(payload) = serde_json::to_string_pretty(body) {
        debug!(service, %payload, "request payload");
    }

    let response = request
        .json(body)
        .send()
        .map_err(|source| StrategyError::Transport { service, source })?;

    let status = response.status();
    if !status.is_success() {
        let details = response.text().unwrap_or_default();
        return Err(StrategyError::Api {
            service,
            message: format!("{status}: {details}"),
        });
    }

    let text = response
        .text()
        .map_err(|source| StrategyError::Transport { service, source })?;
    debug!(service, response = %text, "response body");
    serde_json::from_str(&text).map_err(|err| StrategyError::Malformed(err.to_string()))
}
