//! visit-planner core
//!
//! Orders timed visits through a chain of route-optimization strategies and
//! checks the resulting schedule against each visit's time window.

pub mod auth;
pub mod config;
pub mod error;
pub mod geocoding;
mod google;
pub mod greedy;
pub mod haversine;
pub mod model;
pub mod planner;
pub mod route_optimization;
pub mod routes;
pub mod traits;
pub mod validator;
