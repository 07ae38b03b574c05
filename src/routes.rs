//! Routes API adapter (the waypoint router).
//!
//! Asks for a driving route from the start through every visit with
//! waypoint reordering enabled. The router knows nothing about time
//! windows; it yields an order plus per-leg durations that the validator
//! turns into a schedule.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::StrategyError;
use crate::google::{LatLng, format_timestamp, parse_duration_secs, post_json};
use crate::model::{Coordinate, PlanContext, RouteCandidate, RouteLeg, Visit};
use crate::route_optimization::RouteModifiers;
use crate::traits::{RouteStrategy, StrategyOutcome};

pub const ROUTES_LABEL: &str = "routes_api";

const SERVICE: &str = "Routes API";

const FIELD_MASK: &str = "routes.duration,routes.distanceMeters,routes.legs.duration,\
routes.legs.distanceMeters,routes.optimizedIntermediateWaypointIndex";

#[derive(Debug, Clone)]
pub struct RoutesConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://routes.googleapis.com".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoutesClient {
    config: RoutesConfig,
    client: reqwest::blocking::Client,
}

impl RoutesClient {
    pub fn new(config: RoutesConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Reorder the visits as waypoints and return the travel time of each leg.
    pub fn optimize_waypoints(
        &self,
        visits: &[Visit],
        ctx: &PlanContext,
    ) -> Result<RouteCandidate, StrategyError> {
        if self.config.api_key.is_empty() {
            return Err(StrategyError::NotConfigured("Google Maps API key"));
        }

        let payload = build_request(visits, ctx)?;
        let url = format!("{}/directions/v2:computeRoutes", self.config.base_url);

        info!(waypoints = visits.len(), "calling Routes API with waypoint optimization");
        let request = self
            .client
            .post(url)
            .header("X-Goog-Api-Key", &self.config.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK);
        let response: ComputeRoutesResponse = post_json(SERVICE, request, &payload)?;
        read_response(response, visits)
    }
}

impl RouteStrategy for RoutesClient {
    fn label(&self) -> &'static str {
        ROUTES_LABEL
    }

    fn attempt(&self, visits: &[Visit], ctx: &PlanContext) -> Result<StrategyOutcome, StrategyError> {
        warn!("Routes API does not support time windows, validating afterwards");
        self.optimize_waypoints(visits, ctx)
            .map(StrategyOutcome::Candidate)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ComputeRoutesRequest {
    origin: Waypoint,
    destination: Waypoint,
    intermediates: Vec<Waypoint>,
    travel_mode: &'static str,
    routing_preference: &'static str,
    departure_time: String,
    compute_alternative_routes: bool,
    route_modifiers: RouteModifiers,
    language_code: &'static str,
    units: &'static str,
    optimize_waypoint_order: bool,
}

#[derive(Debug, Serialize)]
struct Waypoint {
    location: WaypointLocation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WaypointLocation {
    lat_lng: LatLng,
}

impl From<Coordinate> for Waypoint {
    fn from(coordinate: Coordinate) -> Self {
        Self {
            location: WaypointLocation {
                lat_lng: coordinate.into(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ComputeRoutesResponse {
    #[serde(default)]
    routes: Vec<ComputedRoute>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComputedRoute {
    #[serde(default)]
    legs: Vec<RouteLegPayload>,
    #[serde(default)]
    optimized_intermediate_waypoint_index: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
struct RouteLegPayload {
    #[serde(default)]
    duration: Option<String>,
}

fn build_request(visits: &[Visit], ctx: &PlanContext) -> Result<ComputeRoutesRequest, StrategyError> {
    Ok(ComputeRoutesRequest {
        origin: ctx.start.into(),
        destination: ctx.end_point().into(),
        intermediates: visits.iter().map(|visit| Waypoint::from(visit.location())).collect(),
        travel_mode: "DRIVE",
        routing_preference: "TRAFFIC_AWARE",
        departure_time: format_timestamp(ctx.start_time)?,
        compute_alternative_routes: false,
        route_modifiers: RouteModifiers {
            avoid_tolls: false,
            avoid_highways: false,
        },
        language_code: "en-US",
        units: "METRIC",
        optimize_waypoint_order: true,
    })
}

/// Leg i runs from the previous point to the i-th reordered waypoint; the
/// final leg to the destination is ignored.
fn read_response(response: ComputeRoutesResponse, visits: &[Visit]) -> Result<RouteCandidate, StrategyError> {
    let Some(route) = response.routes.into_iter().next() else {
        return Err(StrategyError::EmptyResult);
    };

    let order = match route.optimized_intermediate_waypoint_index {
        Some(order) => checked_order(&order, visits.len())?,
        None => (0..visits.len()).collect(),
    };
    info!(?order, "optimized waypoint order");

    if route.legs.len() < visits.len() {
        return Err(StrategyError::Malformed(format!(
            "expected at least {} legs, got {}",
            visits.len(),
            route.legs.len()
        )));
    }

    let mut legs = Vec::with_capacity(visits.len());
    for (index, leg) in order.into_iter().zip(route.legs) {
        let travel_secs = match leg.duration.as_deref() {
            Some(duration) => parse_duration_secs(duration)?,
            // Proto3 JSON drops zero durations.
            None => 0,
        };
        let visit = visits
            .get(index)
            .ok_or_else(|| StrategyError::Malformed(format!("waypoint index {index} out of range")))?;
        legs.push(RouteLeg {
            visit: visit.clone(),
            travel_secs,
        });
    }

    Ok(RouteCandidate::new(legs))
}

/// The router's order must name every waypoint exactly once.
fn checked_order(order: &[i64], len: usize) -> Result<Vec<usize>, StrategyError> {
    if order.len() != len {
        return Err(StrategyError::Malformed(format!(
            "waypoint order has {} entries for {} visits",
            order.len(),
            len
        )));
    }

    let mut seen = vec![false; len];
    order
        .iter()
        .map(|&raw| {
            let slot = usize::try_from(raw).ok().and_then(|index| {
                seen.get_mut(index).filter(|seen| !**seen).map(|seen| {
                    *seen = true;
                    index
                })
            });
            slot.ok_or_else(|| {
                StrategyError::Malformed(format!("waypoint order {order:?} is not a permutation"))
            })
        })
        .collect()
}
