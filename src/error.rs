//! Error types for the planning pipeline.
//!
//! Only [`PlanError`] leaves a planning run. Strategy errors are absorbed by
//! the chain and reported back in aggregate once every strategy has failed.

use std::fmt;

use thiserror::Error;

/// Failure to resolve an address into coordinates. Aborts the whole plan.
#[derive(Debug, Error)]
pub enum GeocodingError {
    #[error("geocoding request for {address:?} failed")]
    Transport {
        address: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("geocoding {address:?} failed with status {status}")]
    Status { address: String, status: String },
    #[error("geocoder returned no result for {address:?}")]
    NoResult { address: String },
}

/// Failure to obtain an OAuth access token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to read service account key {path}")]
    ReadKey {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("service account key is not valid JSON")]
    ParseKey(#[source] serde_json::Error),
    #[error("failed to sign token assertion")]
    Sign(#[source] jsonwebtoken::errors::Error),
    #[error("token exchange failed")]
    Exchange(#[source] reqwest::Error),
}

/// Invalid or unusable planner configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("failed to build HTTP client")]
    Http(#[source] reqwest::Error),
    #[error(transparent)]
    Credentials(#[from] AuthError),
}

/// Why a single optimization strategy did not produce a schedule.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("request to {service} failed")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} rejected the request: {message}")]
    Api {
        service: &'static str,
        message: String,
    },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("strategy returned an empty route")]
    EmptyResult,
    #[error("route covers {covered} of {expected} visits")]
    Incomplete { covered: usize, expected: usize },
    #[error("local optimizer failed: {0}")]
    Optimizer(String),
    #[error("cannot encode request: {0}")]
    InvalidInput(String),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("could not authenticate")]
    Auth(#[from] AuthError),
}

/// A strategy failure as recorded by the chain.
#[derive(Debug)]
pub struct StrategyFailure {
    pub strategy: &'static str,
    pub reason: StrategyError,
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.reason)
    }
}

/// Errors surfaced to the caller of the planner.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("no visits to plan")]
    NoVisits,
    #[error("visit {address:?} has invalid duration of {minutes} minutes")]
    InvalidDuration { address: String, minutes: i64 },
    #[error(transparent)]
    Geocoding(#[from] GeocodingError),
    #[error("all route optimization strategies failed: {}", summarize(.0))]
    Exhausted(Vec<StrategyFailure>),
}

impl PlanError {
    /// Per-strategy reasons when the chain was exhausted.
    pub fn failures(&self) -> &[StrategyFailure] {
        match self {
            Self::Exhausted(failures) => failures,
            _ => &[],
        }
    }
}

fn summarize(failures: &[StrategyFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
