//! Greedy nearest-neighbour ordering.
//!
//! The last link of the chain. Needs no network and never looks at time
//! windows, so its output always goes through the validator.

use tracing::{debug, info, warn};

use crate::error::StrategyError;
use crate::haversine::{TravelTimeEstimator, haversine_km};
use crate::model::{Coordinate, PlanContext, RouteCandidate, RouteLeg, Visit};
use crate::traits::{RouteStrategy, StrategyOutcome};

pub const GREEDY_LABEL: &str = "greedy_algorithm";

#[derive(Debug, Clone, Default)]
pub struct GreedyOptimizer {
    estimator: TravelTimeEstimator,
}

impl GreedyOptimizer {
    pub fn new(estimator: TravelTimeEstimator) -> Self {
        Self { estimator }
    }

    /// Order `visits` by repeatedly jumping to the closest unvisited one.
    ///
    /// Equidistant candidates resolve to whichever comes first in the
    /// remaining working set, which preserves input order.
    pub fn optimize(&self, visits: &[Visit], ctx: &PlanContext) -> Result<RouteCandidate, StrategyError> {
        if !ctx.start.is_finite() {
            return Err(StrategyError::Optimizer(format!(
                "start point has a non-finite coordinate: {:?}",
                ctx.start
            )));
        }
        if let Some(visit) = visits.iter().find(|visit| !visit.location().is_finite()) {
            return Err(StrategyError::Optimizer(format!(
                "visit {} ({}) has a non-finite coordinate",
                visit.original_index(),
                visit.address()
            )));
        }

        let mut unvisited: Vec<&Visit> = visits.iter().collect();
        let mut legs = Vec::with_capacity(visits.len());
        let mut current = ctx.start;
        let mut clock = ctx.start_time;

        while let Some(position) = nearest(current, &unvisited) {
            let next = unvisited.remove(position);
            let travel_secs = self.estimator.travel_secs(current, next.location());

            debug!(
                address = next.address(),
                travel_secs,
                arrival = clock + travel_secs,
                "greedy picked next stop"
            );

            clock += travel_secs + next.duration_secs();
            current = next.location();
            legs.push(RouteLeg {
                visit: next.clone(),
                travel_secs,
            });
        }

        info!(stops = legs.len(), finish = clock, "greedy route built");
        Ok(RouteCandidate::new(legs))
    }
}

/// Index of the closest visit to `from`; first one wins on ties.
fn nearest(from: Coordinate, candidates: &[&Visit]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, visit) in candidates.iter().enumerate() {
        let distance = haversine_km(from, visit.location());
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((index, distance)),
        }
    }
    best.map(|(index, _)| index)
}

impl RouteStrategy for GreedyOptimizer {
    fn label(&self) -> &'static str {
        GREEDY_LABEL
    }

    fn attempt(&self, visits: &[Visit], ctx: &PlanContext) -> Result<StrategyOutcome, StrategyError> {
        warn!("greedy ordering does not respect time windows");
        self.optimize(visits, ctx).map(StrategyOutcome::Candidate)
    }
}
