//! Strategy chain and end-to-end planning.
//!
//! Strategies are tried in priority order until one yields a schedule that
//! covers every visit. Failures are logged and recorded, never retried, and
//! results from different strategies are never merged.

use tracing::{error, info, warn};

use crate::auth::{ServiceAccountKey, ServiceAccountTokenSource, StaticToken};
use crate::config::{Credentials, PlannerConfig};
use crate::error::{ConfigError, PlanError, StrategyError, StrategyFailure};
use crate::geocoding::{GeocodingConfig, GoogleGeocoder};
use crate::greedy::GreedyOptimizer;
use crate::haversine::TravelTimeEstimator;
use crate::model::{PlanContext, PlanRequest, Schedule, Visit};
use crate::route_optimization::{RouteOptimizationClient, RouteOptimizationConfig};
use crate::routes::{RoutesClient, RoutesConfig};
use crate::traits::{AccessTokenSource, Geocoder, RouteStrategy, StrategyOutcome};
use crate::validator;

/// Where a planning run currently stands.
#[derive(Debug)]
pub enum ChainState {
    /// Strategy `index` is next; `failures` holds every earlier one's reason.
    Pending {
        index: usize,
        failures: Vec<StrategyFailure>,
    },
    Succeeded(Schedule),
    Exhausted(Vec<StrategyFailure>),
}

impl ChainState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending { .. })
    }
}

/// Strategies in priority order.
pub struct StrategyChain {
    strategies: Vec<Box<dyn RouteStrategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn RouteStrategy>>) -> Self {
        Self { strategies }
    }

    /// Constraint solver, then waypoint router, then the local greedy fallback.
    pub fn standard<S, R>(solver: S, router: R, greedy: GreedyOptimizer) -> Self
    where
        S: RouteStrategy + 'static,
        R: RouteStrategy + 'static,
    {
        Self::new(vec![Box::new(solver), Box::new(router), Box::new(greedy)])
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|strategy| strategy.label()).collect()
    }

    /// Drive the chain from `Pending(0)` to a terminal state.
    pub fn run(&self, visits: &[Visit], ctx: &PlanContext) -> Result<Schedule, PlanError> {
        if visits.is_empty() {
            return Err(PlanError::NoVisits);
        }

        let mut state = ChainState::Pending {
            index: 0,
            failures: Vec::new(),
        };
        loop {
            state = match state {
                ChainState::Pending { index, failures } => self.step(index, failures, visits, ctx),
                ChainState::Succeeded(schedule) => return Ok(schedule),
                ChainState::Exhausted(failures) => {
                    error!(attempts = failures.len(), "all route optimization methods failed");
                    return Err(PlanError::Exhausted(failures));
                }
            };
        }
    }

    /// Run strategy `index` once and decide the next state.
    pub fn step(
        &self,
        index: usize,
        mut failures: Vec<StrategyFailure>,
        visits: &[Visit],
        ctx: &PlanContext,
    ) -> ChainState {
        let Some(strategy) = self.strategies.get(index) else {
            return ChainState::Exhausted(failures);
        };
        let label = strategy.label();

        info!(strategy = label, "attempting route optimization");
        match attempt(&**strategy, visits, ctx) {
            Ok(schedule) => {
                info!(
                    strategy = label,
                    stops = schedule.len(),
                    violations = schedule.violations().count(),
                    "created route plan"
                );
                ChainState::Succeeded(schedule)
            }
            Err(reason) => {
                warn!(strategy = label, error = %reason, "strategy failed, falling through");
                failures.push(StrategyFailure {
                    strategy: label,
                    reason,
                });
                ChainState::Pending {
                    index: index + 1,
                    failures,
                }
            }
        }
    }
}

fn attempt(strategy: &dyn RouteStrategy, visits: &[Visit], ctx: &PlanContext) -> Result<Schedule, StrategyError> {
    let outcome = strategy.attempt(visits, ctx)?;
    if outcome.is_empty() {
        return Err(StrategyError::EmptyResult);
    }

    let label = strategy.label();
    let schedule = match outcome {
        StrategyOutcome::Scheduled(stops) => validator::confirm(stops, visits, label)?,
        StrategyOutcome::Candidate(candidate) => validator::validate(&candidate, ctx, label)?,
    };

    if !covers_every_visit(&schedule, visits) {
        return Err(StrategyError::Incomplete {
            covered: schedule.len(),
            expected: visits.len(),
        });
    }
    Ok(schedule)
}

/// Each input visit appears exactly once, and nothing else does.
fn covers_every_visit(schedule: &Schedule, visits: &[Visit]) -> bool {
    let mut expected: Vec<usize> = visits.iter().map(Visit::original_index).collect();
    let mut actual: Vec<usize> = schedule.stops.iter().map(|stop| stop.original_index).collect();
    expected.sort_unstable();
    actual.sort_unstable();
    expected == actual
}

/// Geocodes a request and runs the strategy chain over it.
pub struct Planner<G> {
    geocoder: G,
    chain: StrategyChain,
}

impl<G: Geocoder> Planner<G> {
    pub fn new(geocoder: G, chain: StrategyChain) -> Self {
        Self { geocoder, chain }
    }

    pub fn chain(&self) -> &StrategyChain {
        &self.chain
    }

    /// Resolve every address, then plan. An invalid duration or a geocoding
    /// failure aborts before any strategy runs.
    pub fn plan(&self, request: &PlanRequest) -> Result<Schedule, PlanError> {
        let Some(first) = request.visits.first() else {
            return Err(PlanError::NoVisits);
        };
        info!(visits = request.visits.len(), "starting route optimization");

        let durations = request
            .visits
            .iter()
            .map(|visit| {
                visit.duration_secs().ok_or_else(|| PlanError::InvalidDuration {
                    address: visit.address.clone(),
                    minutes: visit.duration_minutes,
                })
            })
            .collect::<Result<Vec<i64>, PlanError>>()?;

        let start = self.geocoder.geocode(&request.start_address)?;
        let destination = request
            .destination_address
            .as_deref()
            .map(|address| self.geocoder.geocode(address))
            .transpose()?;

        let visits = request
            .visits
            .iter()
            .zip(durations)
            .enumerate()
            .map(|(index, (visit, duration_secs))| -> Result<Visit, PlanError> {
                let location = self.geocoder.geocode(&visit.address)?;
                Ok(Visit::new(
                    visit.address.clone(),
                    location,
                    visit.window(),
                    duration_secs,
                    index,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let start_time = request
            .start_time
            .unwrap_or(first.start_time)
            .timestamp();
        let ctx = PlanContext::new(start, destination, start_time);

        self.chain.run(&visits, &ctx)
    }
}

impl Planner<GoogleGeocoder> {
    /// Wire the hosted Google services and the greedy fallback.
    pub fn from_config(config: &PlannerConfig) -> Result<Self, ConfigError> {
        let geocoder = GoogleGeocoder::new(GeocodingConfig {
            api_key: config.maps_api_key.clone(),
            timeout_secs: config.http_timeout_secs,
            ..GeocodingConfig::default()
        })
        .map_err(ConfigError::Http)?;

        let tokens: Option<Box<dyn AccessTokenSource>> = match &config.credentials {
            Some(Credentials::ServiceAccountFile(path)) => {
                let key = ServiceAccountKey::from_file(path)?;
                Some(Box::new(ServiceAccountTokenSource::new(key, config.http_timeout_secs)?))
            }
            Some(Credentials::AccessToken(token)) => Some(Box::new(StaticToken(token.clone()))),
            None => None,
        };

        let solver = RouteOptimizationClient::new(
            RouteOptimizationConfig {
                project_id: config.cloud_project_id.clone(),
                ..RouteOptimizationConfig::default()
            },
            tokens,
        )
        .map_err(ConfigError::Http)?;

        let router = RoutesClient::new(RoutesConfig {
            api_key: config.maps_api_key.clone(),
            timeout_secs: config.http_timeout_secs,
            ..RoutesConfig::default()
        })
        .map_err(ConfigError::Http)?;

        let greedy = GreedyOptimizer::new(TravelTimeEstimator::new(config.average_speed_kmh));

        Ok(Self::new(geocoder, StrategyChain::standard(solver, router, greedy)))
    }
}
