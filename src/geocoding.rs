//! Google Geocoding API adapter.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::GeocodingError;
use crate::model::Coordinate;
use crate::traits::Geocoder;

#[derive(Debug, Clone)]
pub struct GeocodingConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    config: GeocodingConfig,
    client: reqwest::blocking::Client,
}

impl GoogleGeocoder {
    pub fn new(config: GeocodingConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl Geocoder for GoogleGeocoder {
    fn geocode(&self, address: &str) -> Result<Coordinate, GeocodingError> {
        info!(address, "geocoding address");
        let body = self
            .client
            .get(&self.config.base_url)
            .query(&[("address", address), ("key", self.config.api_key.as_str())])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<GeocodeResponse>())
            .map_err(|source| GeocodingError::Transport {
                address: address.to_string(),
                source,
            })?;

        let coordinate = read_response(body, address)?;
        debug!(address, lat = coordinate.lat, lng = coordinate.lng, "geocoded");
        Ok(coordinate)
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Coordinate,
}

fn read_response(response: GeocodeResponse, address: &str) -> Result<Coordinate, GeocodingError> {
    if response.status != "OK" {
        return Err(GeocodingError::Status {
            address: address.to_string(),
            status: response.status,
        });
    }
    response
        .results
        .into_iter()
        .next()
        .map(|result| result.geometry.location)
        .ok_or_else(|| GeocodingError::NoResult {
            address: address.to_string(),
        })
}
