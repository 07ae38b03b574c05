//! Route Optimization API adapter (the constraint solver).
//!
//! The first and only window-aware strategy: each visit becomes a mandatory
//! shipment with its time window and service duration, served by a single
//! driving vehicle. The solver's start times are handed back as a timed
//! schedule for the validator to confirm.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::StrategyError;
use crate::google::{LatLng, duration_string, format_timestamp, parse_timestamp, post_json};
use crate::model::{PlanContext, ScheduledStop, Visit, WindowStatus};
use crate::traits::{AccessTokenSource, RouteStrategy, StrategyOutcome};

pub const ROUTE_OPTIMIZATION_LABEL: &str = "route_optimization_api";

const SERVICE: &str = "Route Optimization API";

/// `SearchMode.RETURN_FAST`: stop at the first good solution.
const SEARCH_MODE_RETURN_FAST: i32 = 1;

/// `TravelMode.DRIVING`.
const TRAVEL_MODE_DRIVING: i32 = 1;

#[derive(Debug, Clone)]
pub struct RouteOptimizationConfig {
    pub base_url: String,
    pub project_id: Option<String>,
    /// HTTP timeout; must exceed the solver's own search timeout.
    pub timeout_secs: u64,
    /// How long the solver may search.
    pub search_timeout_secs: u64,
}

impl Default for RouteOptimizationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://routeoptimization.googleapis.com".to_string(),
            project_id: None,
            timeout_secs: 90,
            search_timeout_secs: 60,
        }
    }
}

pub struct RouteOptimizationClient {
    config: RouteOptimizationConfig,
    client: reqwest::blocking::Client,
    tokens: Option<Box<dyn AccessTokenSource>>,
}

impl RouteOptimizationClient {
    pub fn new(
        config: RouteOptimizationConfig,
        tokens: Option<Box<dyn AccessTokenSource>>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            client,
            tokens,
        })
    }

    /// Solve the visits as a single-vehicle tour with time windows.
    pub fn solve(&self, visits: &[Visit], ctx: &PlanContext) -> Result<Vec<ScheduledStop>, StrategyError> {
        let project_id = self
            .config
            .project_id
            .as_deref()
            .ok_or(StrategyError::NotConfigured("Google Cloud project id"))?;
        let tokens = self
            .tokens
            .as_ref()
            .ok_or(StrategyError::NotConfigured("Route Optimization credentials"))?;

        let payload = build_request(visits, ctx, project_id, self.config.search_timeout_secs)?;
        let token = tokens.access_token()?;
        let url = format!(
            "{}/v1/projects/{}:optimizeTours",
            self.config.base_url, project_id
        );

        info!(visits = visits.len(), "calling Route Optimization API");
        let response: OptimizeToursResponse =
            post_json(SERVICE, self.client.post(url).bearer_auth(token), &payload)?;
        let stops = read_response(response, visits)?;
        info!(stops = stops.len(), "received optimized tour");
        Ok(stops)
    }
}

impl RouteStrategy for RouteOptimizationClient {
    fn label(&self) -> &'static str {
        ROUTE_OPTIMIZATION_LABEL
    }

    fn attempt(&self, visits: &[Visit], ctx: &PlanContext) -> Result<StrategyOutcome, StrategyError> {
        self.solve(visits, ctx).map(StrategyOutcome::Scheduled)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OptimizeToursRequest {
    parent: String,
    model: ShipmentModel,
    search_mode: i32,
    timeout: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShipmentModel {
    global_start_time: String,
    global_end_time: String,
    shipments: Vec<Shipment>,
    vehicles: Vec<Vehicle>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Shipment {
    deliveries: Vec<Delivery>,
    label: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Delivery {
    arrival_location: LatLng,
    time_windows: Vec<TimeWindowPayload>,
    duration: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TimeWindowPayload {
    start_time: String,
    end_time: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Vehicle {
    start_location: LatLng,
    end_location: LatLng,
    travel_mode: i32,
    route_modifiers: RouteModifiers,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RouteModifiers {
    pub avoid_tolls: bool,
    pub avoid_highways: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptimizeToursResponse {
    #[serde(default)]
    routes: Vec<ShipmentRoute>,
    #[serde(default)]
    skipped_shipments: Vec<SkippedShipment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShipmentRoute {
    #[serde(default)]
    visits: Vec<RouteVisit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteVisit {
    // Proto3 JSON omits zero values, so a missing index means shipment 0.
    #[serde(default)]
    shipment_index: usize,
    start_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkippedShipment {
    #[serde(default)]
    index: usize,
}

fn build_request(
    visits: &[Visit],
    ctx: &PlanContext,
    project_id: &str,
    search_timeout_secs: u64,
) -> Result<OptimizeToursRequest, StrategyError> {
    let earliest = visits.iter().map(|visit| visit.window().start).min();
    let latest = visits.iter().map(|visit| visit.window().end).max();
    let (Some(earliest), Some(latest)) = (earliest, latest) else {
        return Err(StrategyError::InvalidInput("no visits to solve".to_string()));
    };

    let shipments = visits
        .iter()
        .enumerate()
        .map(|(i, visit)| -> Result<Shipment, StrategyError> {
            Ok(Shipment {
                deliveries: vec![Delivery {
                    arrival_location: visit.location().into(),
                    time_windows: vec![TimeWindowPayload {
                        start_time: format_timestamp(visit.window().start)?,
                        end_time: format_timestamp(visit.window().end)?,
                    }],
                    duration: duration_string(visit.duration_secs()),
                }],
                label: format!("House {}", i + 1),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let vehicle = Vehicle {
        start_location: ctx.start.into(),
        end_location: ctx.end_point().into(),
        travel_mode: TRAVEL_MODE_DRIVING,
        route_modifiers: RouteModifiers {
            avoid_tolls: false,
            avoid_highways: false,
        },
    };

    Ok(OptimizeToursRequest {
        parent: format!("projects/{project_id}"),
        model: ShipmentModel {
            global_start_time: format_timestamp(earliest.min(ctx.start_time))?,
            global_end_time: format_timestamp(latest)?,
            shipments,
            vehicles: vec![vehicle],
        },
        search_mode: SEARCH_MODE_RETURN_FAST,
        timeout: duration_string(search_timeout_secs as i64),
    })
}

/// Map solver visits back onto our visits. Every visit must be served once.
fn read_response(
    response: OptimizeToursResponse,
    visits: &[Visit],
) -> Result<Vec<ScheduledStop>, StrategyError> {
    if !response.skipped_shipments.is_empty() {
        let skipped: Vec<usize> = response.skipped_shipments.iter().map(|s| s.index).collect();
        warn!(?skipped, "solver skipped shipments");
        return Err(StrategyError::Incomplete {
            covered: visits.len().saturating_sub(skipped.len()),
            expected: visits.len(),
        });
    }

    let Some(route) = response.routes.into_iter().next() else {
        return Err(StrategyError::EmptyResult);
    };

    let mut served = vec![false; visits.len()];
    let mut stops = Vec::with_capacity(route.visits.len());
    for (optimized_index, route_visit) in route.visits.into_iter().enumerate() {
        let index = route_visit.shipment_index;
        let (Some(visit), Some(seen)) = (visits.get(index), served.get_mut(index)) else {
            return Err(StrategyError::Malformed(format!(
                "shipment index {index} out of range"
            )));
        };
        if *seen {
            return Err(StrategyError::Malformed(format!(
                "shipment {index} visited twice"
            )));
        }
        *seen = true;

        let arrival = parse_timestamp(&route_visit.start_time)?;
        stops.push(ScheduledStop {
            address: visit.address().to_string(),
            arrival,
            departure: arrival + visit.duration_secs(),
            original_index: visit.original_index(),
            optimized_index,
            window: WindowStatus::Unknown,
            method: ROUTE_OPTIMIZATION_LABEL.to_string(),
        });
    }

    if stops.len() != visits.len() {
        return Err(StrategyError::Incomplete {
            covered: stops.len(),
            expected: visits.len(),
        });
    }
    Ok(stops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinate, TimeWindow};

    // 2025-06-01T09:00:00Z
    const NINE: i64 = 1_748_768_400;

    fn visits() -> Vec<Visit> {
        vec![
            Visit::new(
                "1 Pike St",
                Coordinate::new(47.6097, -122.3422),
                TimeWindow::new(NINE, NINE + 3600),
                1800,
                0,
            ),
            Visit::new(
                "2 Pine St",
                Coordinate::new(47.6154, -122.3200),
                TimeWindow::new(NINE + 1800, NINE + 7200),
                1200,
                1,
            ),
        ]
    }

    fn ctx() -> PlanContext {
        PlanContext::new(Coordinate::new(47.6062, -122.3321), None, NINE)
    }

    fn response(json: &str) -> OptimizeToursResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_request_shape() {
        let request = build_request(&visits(), &ctx(), "demo-project", 60).unwrap();
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["parent"], "projects/demo-project");
        assert_eq!(json["searchMode"], 1);
        assert_eq!(json["timeout"], "60s");
        assert_eq!(json["model"]["globalStartTime"], "2025-06-01T09:00:00Z");
        assert_eq!(json["model"]["globalEndTime"], "2025-06-01T11:00:00Z");

        let shipment = &json["model"]["shipments"][1];
        assert_eq!(shipment["label"], "House 2");
        let delivery = &shipment["deliveries"][0];
        assert_eq!(delivery["arrivalLocation"]["latitude"], 47.6154);
        assert_eq!(delivery["duration"], "1200s");
        assert_eq!(delivery["timeWindows"][0]["startTime"], "2025-06-01T09:30:00Z");
    }

    #[test]
    fn test_vehicle_returns_to_start_without_destination() {
        let request = build_request(&visits(), &ctx(), "p", 60).unwrap();
        let json = serde_json::to_value(&request).unwrap();
        let vehicle = &json["model"]["vehicles"][0];
        assert_eq!(vehicle["startLocation"], vehicle["endLocation"]);
        assert_eq!(vehicle["travelMode"], 1);

        let dest = Coordinate::new(47.62, -122.35);
        let with_dest = PlanContext::new(ctx().start, Some(dest), NINE);
        let request = build_request(&visits(), &with_dest, "p", 60).unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"]["vehicles"][0]["endLocation"]["latitude"], 47.62);
    }

    #[test]
    fn test_unbounded_window_cannot_be_encoded() {
        let visits = vec![Visit::new(
            "Anywhere",
            Coordinate::new(0.0, 0.0),
            TimeWindow::unbounded(),
            60,
            0,
        )];
        let result = build_request(&visits, &ctx(), "p", 60);
        assert!(matches!(result, Err(StrategyError::InvalidInput(_))));
    }

    #[test]
    fn test_reads_solver_order() {
        // shipmentIndex 0 is omitted by proto3 JSON.
        let raw = response(
            r#"{"routes": [{"visits": [
                {"shipmentIndex": 1, "startTime": "2025-06-01T09:40:00Z"},
                {"startTime": "2025-06-01T10:20:00Z"}
            ]}]}"#,
        );

        let stops = read_response(raw, &visits()).unwrap();

        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].original_index, 1);
        assert_eq!(stops[0].arrival, NINE + 2400);
        assert_eq!(stops[0].departure, NINE + 3600);
        assert_eq!(stops[1].original_index, 0);
        assert_eq!(stops[1].address, "1 Pike St");
        assert_eq!(stops[1].optimized_index, 1);
    }

    #[test]
    fn test_no_routes_is_empty() {
        let result = read_response(response("{}"), &visits());
        assert!(matches!(result, Err(StrategyError::EmptyResult)));
    }

    #[test]
    fn test_skipped_shipments_fail() {
        let raw = response(
            r#"{"routes": [{"visits": [{"startTime": "2025-06-01T09:10:00Z"}]}],
                "skippedShipments": [{"index": 1, "label": "House 2"}]}"#,
        );
        let result = read_response(raw, &visits());
        assert!(matches!(
            result,
            Err(StrategyError::Incomplete { covered: 1, expected: 2 })
        ));
    }

    #[test]
    fn test_out_of_range_and_duplicates_fail() {
        let raw = response(r#"{"routes": [{"visits": [{"shipmentIndex": 5, "startTime": "2025-06-01T09:10:00Z"}]}]}"#);
        assert!(matches!(read_response(raw, &visits()), Err(StrategyError::Malformed(_))));

        let raw = response(
            r#"{"routes": [{"visits": [
                {"startTime": "2025-06-01T09:10:00Z"},
                {"startTime": "2025-06-01T09:50:00Z"}
            ]}]}"#,
        );
        assert!(matches!(read_response(raw, &visits()), Err(StrategyError::Malformed(_))));
    }

    #[test]
    fn test_missing_configuration_fails_without_network() {
        let client = RouteOptimizationClient::new(RouteOptimizationConfig::default(), None).unwrap();
        let result = client.attempt(&visits(), &ctx());
        assert!(matches!(result, Err(StrategyError::NotConfigured(_))));
    }
}
