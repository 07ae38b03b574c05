//! Seams between the planner core and its collaborators.
//!
//! Strategies, geocoders and token sources are all swappable so the chain
//! can run against stubs in tests and against the hosted services in
//! production.

use crate::error::{AuthError, GeocodingError, StrategyError};
use crate::model::{Coordinate, PlanContext, RouteCandidate, ScheduledStop, Visit};

/// What a strategy hands back on success.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOutcome {
    /// Already timed and window-aware; the validator only confirms it.
    Scheduled(Vec<ScheduledStop>),
    /// An ordering with travel times that still needs timing and checks.
    Candidate(RouteCandidate),
}

impl StrategyOutcome {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Scheduled(stops) => stops.is_empty(),
            Self::Candidate(candidate) => candidate.is_empty(),
        }
    }
}

/// One link of the strategy chain.
pub trait RouteStrategy {
    /// Method tag stamped on every stop this strategy produces.
    fn label(&self) -> &'static str;

    fn attempt(&self, visits: &[Visit], ctx: &PlanContext) -> Result<StrategyOutcome, StrategyError>;
}

impl<S: RouteStrategy + ?Sized> RouteStrategy for Box<S> {
    fn label(&self) -> &'static str {
        (**self).label()
    }

    fn attempt(&self, visits: &[Visit], ctx: &PlanContext) -> Result<StrategyOutcome, StrategyError> {
        (**self).attempt(visits, ctx)
    }
}

/// Resolves a free-form address to coordinates.
pub trait Geocoder {
    fn geocode(&self, address: &str) -> Result<Coordinate, GeocodingError>;
}

/// Supplies OAuth bearer tokens for authenticated backends.
pub trait AccessTokenSource {
    fn access_token(&self) -> Result<String, AuthError>;
}
