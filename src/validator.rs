//! Schedule timing and time-window checks.
//!
//! Every strategy's output passes through here, so arrival and departure
//! times are computed the same way whichever backend chose the order.
//! Violations are annotated on the stop; they never fail a schedule.

use std::collections::HashMap;

use tracing::{error, info, warn};

use crate::error::StrategyError;
use crate::model::{PlanContext, RouteCandidate, Schedule, ScheduledStop, Visit, WindowStatus};

/// Label of the only strategy that enforces windows itself.
pub const WINDOW_AWARE_METHOD: &str = crate::route_optimization::ROUTE_OPTIMIZATION_LABEL;

/// Time an untimed route starting at `ctx.start_time`.
///
/// For stop i: arrival = clock + travel, departure = arrival + duration,
/// and the clock moves to the departure. Fails if the clock overflows.
pub fn validate(candidate: &RouteCandidate, ctx: &PlanContext, method: &str) -> Result<Schedule, StrategyError> {
    info!(method, stops = candidate.len(), "validating time windows");

    let mut clock = ctx.start_time;
    let mut stops = Vec::with_capacity(candidate.len());

    for (optimized_index, leg) in candidate.legs.iter().enumerate() {
        let visit = &leg.visit;
        let arrival = advance(clock, leg.travel_secs, visit)?;
        let departure = advance(arrival, visit.duration_secs(), visit)?;
        let window = visit.window().check(arrival);
        log_violation(visit, arrival, window);

        stops.push(ScheduledStop {
            address: visit.address().to_string(),
            arrival,
            departure,
            original_index: visit.original_index(),
            optimized_index,
            window,
            method: method.to_string(),
        });
        clock = departure;
    }

    let schedule = Schedule::new(stops);
    summarize(&schedule, method);
    Ok(schedule)
}

/// Re-check a schedule that a backend already timed.
///
/// Departures are recomputed from the visit durations. A stop whose
/// original index matches no visit is passed through unchanged apart from
/// its method tag and position, with an unknown window status.
pub fn confirm(stops: Vec<ScheduledStop>, visits: &[Visit], method: &str) -> Result<Schedule, StrategyError> {
    info!(method, stops = stops.len(), "confirming timed schedule");

    let by_index: HashMap<usize, &Visit> = visits
        .iter()
        .map(|visit| (visit.original_index(), visit))
        .collect();

    let mut confirmed = Vec::with_capacity(stops.len());
    for (optimized_index, stop) in stops.into_iter().enumerate() {
        let stop = match by_index.get(&stop.original_index) {
            Some(visit) => {
                let window = visit.window().check(stop.arrival);
                log_violation(visit, stop.arrival, window);
                ScheduledStop {
                    address: visit.address().to_string(),
                    departure: advance(stop.arrival, visit.duration_secs(), visit)?,
                    optimized_index,
                    window,
                    method: method.to_string(),
                    ..stop
                }
            }
            None => {
                warn!(
                    original_index = stop.original_index,
                    address = %stop.address,
                    "no visit data for stop, window not checked"
                );
                ScheduledStop {
                    optimized_index,
                    window: WindowStatus::Unknown,
                    method: method.to_string(),
                    ..stop
                }
            }
        };
        confirmed.push(stop);
    }

    let schedule = Schedule::new(confirmed);
    summarize(&schedule, method);
    Ok(schedule)
}

fn advance(clock: i64, secs: i64, visit: &Visit) -> Result<i64, StrategyError> {
    clock.checked_add(secs).ok_or_else(|| {
        StrategyError::Malformed(format!(
            "schedule time overflows at visit {} ({})",
            visit.original_index(),
            visit.address()
        ))
    })
}

fn log_violation(visit: &Visit, arrival: i64, window: WindowStatus) {
    match window {
        WindowStatus::Early => warn!(
            address = visit.address(),
            arrival,
            window_start = visit.window().start,
            "arrival before window opens"
        ),
        WindowStatus::Late => error!(
            address = visit.address(),
            arrival,
            window_end = visit.window().end,
            "arrival after window closes"
        ),
        WindowStatus::Within | WindowStatus::Unknown => {}
    }
}

fn summarize(schedule: &Schedule, method: &str) {
    let violations: Vec<String> = schedule
        .violations()
        .map(|stop| match stop.window {
            WindowStatus::Early => format!("early arrival at {}", stop.address),
            _ => format!("late arrival at {}", stop.address),
        })
        .collect();

    if violations.is_empty() {
        return;
    }
    warn!(method, "time window violations detected: {}", violations.join(", "));
    if method != WINDOW_AWARE_METHOD {
        warn!(method, "method does not respect time windows");
    }
}
