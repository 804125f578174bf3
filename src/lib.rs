//! Vehicle route chain model for SolverForge quickstarts.
//!
//! Keeps stop sequences, neighbour links and arrival times consistent while
//! an external solver inserts, removes and reorders stops, backed by a
//! great-circle travel time provider with an optional precomputed matrix.
//!
//! # Domain Model
//!
//! - [`GeoPoint`](geo::GeoPoint): Latitude/longitude pair
//! - [`Stop`](domain::Stop): Customer to visit with time window and demand
//! - [`Route`](domain::Route): Vehicle route from and back to a depot
//! - [`RoutingPlan`](plan::RoutingPlan): Stop arena, routes and solution metadata
//!
//! # Travel times
//!
//! - [`Haversine`](distance::Haversine): On-demand great-circle travel time
//! - [`TravelTimes`](distance::TravelTimes): Per-run provider with an
//!   all-pairs matrix that can be built and cleared
//!
//! # Mutation
//!
//! Stops move through [`RouteMut`](chain::RouteMut),
//! [`RoutingPlan::move_stop`](plan::RoutingPlan::move_stop) and
//! [`RoutingPlan::assign`](plan::RoutingPlan::assign). Each call recomputes
//! the affected suffix of every touched route before it returns.

pub mod chain;
pub mod config;
pub mod console;
pub mod distance;
pub mod domain;
pub mod error;
pub mod geo;
pub mod plan;
pub mod score;

pub use chain::{ListVariable, RouteMut};
pub use config::{DistanceMode, RoutingConfig};
pub use distance::{DistanceProvider, Haversine, TravelTimeMatrix, TravelTimes};
pub use domain::{Route, RouteView, Stop, TimeWindow};
pub use error::{ChainError, ConfigError, InvariantViolation};
pub use geo::{BoundingBox, GeoPoint};
pub use plan::RoutingPlan;
pub use score::{HardSoftScore, SolverStatus};
