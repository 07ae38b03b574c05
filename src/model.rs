//! Planner data model.
//!
//! Everything here is created per planning request and dropped once the
//! schedule is returned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Permitted arrival interval, in unix seconds.
///
/// `start <= end` is assumed, not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// A window no arrival can fall outside of.
    pub const fn unbounded() -> Self {
        Self {
            start: i64::MIN,
            end: i64::MAX,
        }
    }

    /// Classify an arrival timestamp against this window.
    pub fn check(&self, arrival: i64) -> WindowStatus {
        if arrival < self.start {
            WindowStatus::Early
        } else if arrival > self.end {
            WindowStatus::Late
        } else {
            WindowStatus::Within
        }
    }
}

/// A resolved visit. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    address: String,
    location: Coordinate,
    window: TimeWindow,
    duration_secs: i64,
    original_index: usize,
}

impl Visit {
    pub fn new(
        address: impl Into<String>,
        location: Coordinate,
        window: TimeWindow,
        duration_secs: i64,
        original_index: usize,
    ) -> Self {
        Self {
            address: address.into(),
            location,
            window,
            duration_secs,
            original_index,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn location(&self) -> Coordinate {
        self.location
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Time spent on site, in seconds.
    pub fn duration_secs(&self) -> i64 {
        self.duration_secs
    }

    /// Position of this visit in the caller's input.
    pub fn original_index(&self) -> usize {
        self.original_index
    }
}

fn default_duration_minutes() -> i64 {
    20
}

/// A visit as submitted by the caller, before geocoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRequest {
    pub address: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: i64,
}

impl VisitRequest {
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_time.timestamp(), self.end_time.timestamp())
    }

    /// Time on site in seconds; `None` unless positive and representable.
    pub fn duration_secs(&self) -> Option<i64> {
        self.duration_minutes
            .checked_mul(60)
            .filter(|secs| *secs > 0)
    }
}

/// A full planning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub start_address: String,
    #[serde(default)]
    pub destination_address: Option<String>,
    pub visits: Vec<VisitRequest>,
    /// Schedule start. Defaults to the first visit's window start.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

/// Immutable per-request context handed to every strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanContext {
    pub start: Coordinate,
    pub destination: Option<Coordinate>,
    /// Global schedule start, in unix seconds.
    pub start_time: i64,
}

impl PlanContext {
    pub const fn new(start: Coordinate, destination: Option<Coordinate>, start_time: i64) -> Self {
        Self {
            start,
            destination,
            start_time,
        }
    }

    /// Where the route ends: the destination, or back at the start.
    pub fn end_point(&self) -> Coordinate {
        self.destination.unwrap_or(self.start)
    }
}

/// One stop of an untimed route, with the travel time from the previous
/// stop (or from the start point for the first leg).
#[derive(Debug, Clone, PartialEq)]
pub struct RouteLeg {
    pub visit: Visit,
    pub travel_secs: i64,
}

/// An ordered route whose arrival times have not been computed yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteCandidate {
    pub legs: Vec<RouteLeg>,
}

impl RouteCandidate {
    pub fn new(legs: Vec<RouteLeg>) -> Self {
        Self { legs }
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }
}

/// Outcome of comparing an arrival to its time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStatus {
    Within,
    Early,
    Late,
    /// Not enough information to check the window.
    Unknown,
}

impl WindowStatus {
    /// `Some(true)` for early or late arrivals, `None` when unknown.
    pub fn violation(&self) -> Option<bool> {
        match self {
            Self::Within => Some(false),
            Self::Early | Self::Late => Some(true),
            Self::Unknown => None,
        }
    }
}

/// A timed stop of the final schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledStop {
    pub address: String,
    pub arrival: i64,
    pub departure: i64,
    pub original_index: usize,
    pub optimized_index: usize,
    pub window: WindowStatus,
    /// Label of the strategy that produced the ordering.
    pub method: String,
}

/// Final annotated schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub stops: Vec<ScheduledStop>,
}

impl Schedule {
    pub fn new(stops: Vec<ScheduledStop>) -> Self {
        Self { stops }
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// Label of the producing strategy, if any stop exists.
    pub fn method(&self) -> Option<&str> {
        self.stops.first().map(|stop| stop.method.as_str())
    }

    /// Stops whose arrival falls outside their window.
    pub fn violations(&self) -> impl Iterator<Item = &ScheduledStop> {
        self.stops
            .iter()
            .filter(|stop| stop.window.violation() == Some(true))
    }

    /// True when both optimized and original indices cover `0..n` exactly once.
    pub fn is_permutation_of(&self, n: usize) -> bool {
        if self.stops.len() != n {
            return false;
        }
        let mut seen_original = vec![false; n];
        let mut seen_optimized = vec![false; n];
        for stop in &self.stops {
            for (index, seen) in [
                (stop.original_index, &mut seen_original),
                (stop.optimized_index, &mut seen_optimized),
            ] {
                match seen.get_mut(index) {
                    Some(slot) if !*slot => *slot = true,
                    _ => return false,
                }
            }
        }
        true
    }
}
