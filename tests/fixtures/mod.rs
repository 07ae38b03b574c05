//! Test fixtures for visit-planner.
//!
//! Provides realistic test data including:
//! - Seattle listing addresses with known coordinates
//! - A stub geocoder and scripted strategies that never touch the network
//! - Builders for visit requests

#![allow(dead_code)]

pub mod seattle_listings;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use visit_planner::error::{GeocodingError, StrategyError};
use visit_planner::model::{
    Coordinate, PlanContext, RouteCandidate, RouteLeg, ScheduledStop, Visit, VisitRequest, WindowStatus,
};
use visit_planner::traits::{Geocoder, RouteStrategy, StrategyOutcome};

pub use seattle_listings::*;

/// 2025-06-01 09:00 UTC.
pub fn nine_am() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
}

// ============================================================================
// Visit request builder
// ============================================================================

/// Builder for visit requests with sensible defaults (open all day, 20 min).
#[derive(Clone, Debug)]
pub struct TestVisit {
    request: VisitRequest,
}

impl TestVisit {
    pub fn new(address: &str) -> Self {
        Self {
            request: VisitRequest {
                address: address.to_string(),
                start_time: nine_am(),
                end_time: nine_am() + Duration::hours(8),
                duration_minutes: 20,
            },
        }
    }

    /// Window relative to 09:00, in minutes.
    pub fn window(mut self, start_min: i64, end_min: i64) -> Self {
        self.request.start_time = nine_am() + Duration::minutes(start_min);
        self.request.end_time = nine_am() + Duration::minutes(end_min);
        self
    }

    pub fn duration(mut self, minutes: i64) -> Self {
        self.request.duration_minutes = minutes;
        self
    }

    pub fn build(self) -> VisitRequest {
        self.request
    }
}

pub fn listing_requests(count: usize) -> Vec<VisitRequest> {
    sample_listings(count)
        .iter()
        .map(|listing| TestVisit::new(listing.address).build())
        .collect()
}

// ============================================================================
// Stub geocoder
// ============================================================================

/// Resolves only the addresses it was given.
pub struct StubGeocoder {
    known: HashMap<String, Coordinate>,
    calls: Rc<Cell<usize>>,
}

impl StubGeocoder {
    pub fn seattle() -> Self {
        let known = all_listings()
            .into_iter()
            .map(|listing| (listing.address.to_string(), Coordinate::new(listing.lat, listing.lng)))
            .collect();
        Self {
            known,
            calls: Rc::new(Cell::new(0)),
        }
    }

    pub fn with(mut self, address: &str, coordinate: Coordinate) -> Self {
        self.known.insert(address.to_string(), coordinate);
        self
    }

    pub fn calls(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.calls)
    }
}

impl Geocoder for StubGeocoder {
    fn geocode(&self, address: &str) -> Result<Coordinate, GeocodingError> {
        self.calls.set(self.calls.get() + 1);
        self.known
            .get(address)
            .copied()
            .ok_or_else(|| GeocodingError::Status {
                address: address.to_string(),
                status: "ZERO_RESULTS".to_string(),
            })
    }
}

// ============================================================================
// Scripted strategies
// ============================================================================

#[derive(Clone, Copy, Debug)]
pub enum Behavior {
    /// Fail with an API error.
    Fail,
    /// Succeed with nothing.
    Empty,
    /// Input order, every leg taking `travel_secs`.
    InputOrder { travel_secs: i64 },
    /// Reverse input order, every leg taking `travel_secs`.
    Reversed { travel_secs: i64 },
    /// Timed schedule arriving at each window start, input order.
    ArriveAtWindowStart,
    /// Input order but the last visit is missing.
    DropLast,
    /// Timed schedule whose last stop names a visit that does not exist.
    UnknownStop,
}

/// A strategy that follows a fixed script and counts its invocations.
pub struct StubStrategy {
    label: &'static str,
    behavior: Behavior,
    calls: Rc<Cell<usize>>,
    last_context: Rc<RefCell<Option<PlanContext>>>,
}

impl StubStrategy {
    pub fn new(label: &'static str, behavior: Behavior) -> Self {
        Self {
            label,
            behavior,
            calls: Rc::new(Cell::new(0)),
            last_context: Rc::new(RefCell::new(None)),
        }
    }

    pub fn calls(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.calls)
    }

    pub fn last_context(&self) -> Rc<RefCell<Option<PlanContext>>> {
        Rc::clone(&self.last_context)
    }
}

impl StubStrategy {
    fn at_window_start(&self, visits: &[Visit]) -> Vec<ScheduledStop> {
        visits
            .iter()
            .enumerate()
            .map(|(position, visit)| ScheduledStop {
                address: visit.address().to_string(),
                arrival: visit.window().start,
                departure: visit.window().start + visit.duration_secs(),
                original_index: visit.original_index(),
                optimized_index: position,
                window: WindowStatus::Unknown,
                method: self.label.to_string(),
            })
            .collect()
    }
}

fn legs<'a>(visits: impl Iterator<Item = &'a Visit>, travel_secs: i64) -> RouteCandidate {
    RouteCandidate::new(
        visits
            .map(|visit| RouteLeg {
                visit: visit.clone(),
                travel_secs,
            })
            .collect(),
    )
}

impl RouteStrategy for StubStrategy {
    fn label(&self) -> &'static str {
        self.label
    }

    fn attempt(&self, visits: &[Visit], ctx: &PlanContext) -> Result<StrategyOutcome, StrategyError> {
        self.calls.set(self.calls.get() + 1);
        *self.last_context.borrow_mut() = Some(*ctx);

        match self.behavior {
            Behavior::Fail => Err(StrategyError::Api {
                service: self.label,
                message: "503 Service Unavailable".to_string(),
            }),
            Behavior::Empty => Ok(StrategyOutcome::Candidate(RouteCandidate::default())),
            Behavior::InputOrder { travel_secs } => {
                Ok(StrategyOutcome::Candidate(legs(visits.iter(), travel_secs)))
            }
            Behavior::Reversed { travel_secs } => {
                Ok(StrategyOutcome::Candidate(legs(visits.iter().rev(), travel_secs)))
            }
            Behavior::ArriveAtWindowStart => Ok(StrategyOutcome::Scheduled(self.at_window_start(visits))),
            Behavior::UnknownStop => {
                let mut stops = self.at_window_start(visits);
                if let Some(last) = stops.last_mut() {
                    last.original_index = visits.len() + 10;
                }
                Ok(StrategyOutcome::Scheduled(stops))
            }
            Behavior::DropLast => {
                let keep = visits.len().saturating_sub(1);
                Ok(StrategyOutcome::Candidate(legs(visits.iter().take(keep), 60)))
            }
        }
    }
}
