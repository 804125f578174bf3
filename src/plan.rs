//! The routing plan: stop arena, routes and solution metadata.
//!
//! Stops live in one arena (`stops`), routes hold indices into it. A stop is
//! either in exactly one route's sequence or in `unassigned`. Structural
//! mutators live in [`chain`](crate::chain).

use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

use crate::chain::{self, RouteMut};
use crate::config::DistanceMode;
use crate::distance::{DistanceProvider, TravelTimes};
use crate::domain::{Route, RouteView, Stop};
use crate::error::{ConfigError, InvariantViolation};
use crate::geo::{BoundingBox, GeoPoint};
use crate::score::{HardSoftScore, SolverStatus};

/// The complete routing solution handed to and from the solver.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use route_chain::domain::{Route, Stop};
/// use route_chain::geo::GeoPoint;
/// use route_chain::plan::RoutingPlan;
///
/// let departure = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let depot = GeoPoint::new(0.0, 0.0);
/// let stops = vec![
///     Stop::new(0, "John", GeoPoint::new(3.0, 4.0)).with_demand(80),
///     Stop::new(1, "Paul", GeoPoint::new(-1.0, 1.0)).with_demand(40),
/// ];
/// let routes = vec![Route::new(0, "Alpha", 100, depot, departure)];
///
/// let mut plan = RoutingPlan::new("test", stops, routes).unwrap();
/// assert_eq!(plan.unassigned(), &[0, 1]);
///
/// let mut route = plan.route_mut(0).unwrap();
/// route.insert(0, 0).unwrap();
/// route.insert(1, 1).unwrap();
///
/// let view = plan.route(0).unwrap();
/// assert_eq!(view.total_demand(), 120);
/// assert_eq!(view.excess_demand(), 20);
/// assert_eq!(view.total_travel_seconds(), 40018 + 40025 + 11322);
/// assert!(plan.check_invariants().is_ok());
/// ```
#[derive(Debug)]
pub struct RoutingPlan<D = TravelTimes> {
    /// Problem name.
    pub name: String,
    pub(crate) bounds: Option<BoundingBox>,
    pub(crate) stops: Vec<Stop>,
    pub(crate) routes: Vec<Route>,
    pub(crate) unassigned: Vec<usize>,
    /// Current score, set by the solver.
    pub score: Option<HardSoftScore>,
    pub solver_status: SolverStatus,
    pub(crate) distances: Arc<D>,
}

impl RoutingPlan<TravelTimes> {
    /// Creates a plan with its own travel time provider in on-demand mode.
    pub fn new(
        name: impl Into<String>,
        stops: Vec<Stop>,
        routes: Vec<Route>,
    ) -> Result<Self, ConfigError> {
        Self::with_distances(name, stops, routes, Arc::new(TravelTimes::new()))
    }

    /// Switches the provider to `mode` before a solving run.
    ///
    /// `Precomputed` builds the matrix from every depot and stop location.
    /// Travel times are identical in both modes, so derived state stays valid.
    pub fn prepare_distances(&self, mode: DistanceMode) {
        match mode {
            DistanceMode::OnDemand => self.distances.clear_matrix(),
            DistanceMode::Precomputed => self.distances.init_matrix(&self.locations()),
        }
    }
}

impl<D: DistanceProvider> RoutingPlan<D> {
    /// Creates a plan around an injected distance provider.
    ///
    /// Every stop starts unassigned. Fails if a stop or route is invalid, or
    /// if a route cannot carry the largest single demand.
    pub fn with_distances(
        name: impl Into<String>,
        mut stops: Vec<Stop>,
        mut routes: Vec<Route>,
        distances: Arc<D>,
    ) -> Result<Self, ConfigError> {
        validate(&stops, &routes)?;

        for stop in &mut stops {
            stop.detach();
        }
        for route in &mut routes {
            route.stops.clear();
        }

        let name = name.into();
        let bounds = BoundingBox::enclosing(
            routes
                .iter()
                .map(|r| &r.depot)
                .chain(stops.iter().map(|s| &s.location)),
        );

        info!(
            plan = %name,
            stops = stops.len(),
            routes = routes.len(),
            "Routing plan created"
        );

        Ok(Self {
            name,
            bounds,
            unassigned: (0..stops.len()).collect(),
            stops,
            routes,
            score: None,
            solver_status: SolverStatus::NotSolving,
            distances,
        })
    }

    /// Replaces the derived bounding box (e.g. with a configured map area).
    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Map area; `None` when the locations span no area.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn stop(&self, idx: usize) -> Option<&Stop> {
        self.stops.get(idx)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Aggregate view of one route.
    pub fn route(&self, idx: usize) -> Option<RouteView<'_, D>> {
        self.routes.get(idx).map(|route| self.view(route))
    }

    /// Aggregate views of all routes, in index order.
    pub fn route_views(&self) -> impl Iterator<Item = RouteView<'_, D>> + '_ {
        self.routes.iter().map(move |route| self.view(route))
    }

    /// Mutator handle for one route.
    pub fn route_mut(&mut self, idx: usize) -> Option<RouteMut<'_, D>> {
        if idx < self.routes.len() {
            Some(RouteMut::new(self, idx))
        } else {
            None
        }
    }

    /// Stops not in any route.
    pub fn unassigned(&self) -> &[usize] {
        &self.unassigned
    }

    pub fn distances(&self) -> &Arc<D> {
        &self.distances
    }

    /// Every depot and stop location, depots first.
    pub fn locations(&self) -> Vec<GeoPoint> {
        self.routes
            .iter()
            .map(|r| r.depot)
            .chain(self.stops.iter().map(|s| s.location))
            .collect()
    }

    #[inline]
    pub fn travel_seconds(&self, from: &GeoPoint, to: &GeoPoint) -> i64 {
        self.distances.travel_seconds(from, to)
    }

    /// Driving time to a stop from its predecessor, or from the depot for
    /// the first stop. `None` while unassigned.
    pub fn travel_seconds_from_previous(&self, stop_idx: usize) -> Option<i64> {
        let stop = self.stops.get(stop_idx)?;
        let route = self.routes.get(stop.route_idx?)?;
        let from = match stop.previous_idx {
            Some(prev) => self.stops[prev].location,
            None => route.depot,
        };
        Some(self.travel_seconds(&from, &stop.location))
    }

    /// Driving time summed over all routes.
    pub fn total_travel_seconds(&self) -> i64 {
        self.route_views().map(|r| r.total_travel_seconds()).sum()
    }

    /// Demand of all assigned stops.
    pub fn total_demand(&self) -> i32 {
        self.route_views().map(|r| r.total_demand()).sum()
    }

    /// Late minutes summed over all assigned stops.
    pub fn total_late_minutes(&self) -> i64 {
        self.route_views().map(|r| r.total_late_minutes()).sum()
    }

    /// Assigned stops whose service finishes after their window closes.
    pub fn late_stops(&self) -> impl Iterator<Item = &Stop> + '_ {
        self.stops.iter().filter(|s| s.is_late())
    }

    /// Earliest route departure, `None` without routes.
    pub fn start_date_time(&self) -> Option<NaiveDateTime> {
        self.routes.iter().map(|r| r.departure).min()
    }

    /// Latest return to a depot, `None` without routes.
    pub fn end_date_time(&self) -> Option<NaiveDateTime> {
        self.route_views().filter_map(|r| r.finish_time()).max()
    }

    /// Verifies placement and derived state against the route sequences.
    ///
    /// Every stop must be in exactly one place, and for routed stops the
    /// owner, neighbour links and arrival must follow from the sequence.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut seen = vec![0u32; self.stops.len()];
        for &idx in self
            .routes
            .iter()
            .flat_map(|r| r.stops.iter())
            .chain(self.unassigned.iter())
        {
            seen[idx] += 1;
        }
        for (idx, &count) in seen.iter().enumerate() {
            match count {
                0 => return Err(InvariantViolation::Missing(idx)),
                1 => {}
                _ => return Err(InvariantViolation::Duplicated(idx)),
            }
        }

        for route in &self.routes {
            let seq = &route.stops;
            for (pos, &idx) in seq.iter().enumerate() {
                let stop = &self.stops[idx];
                let previous = pos.checked_sub(1).map(|p| seq[p]);
                let next = seq.get(pos + 1).copied();

                check_link(idx, Some(route.index), stop.route_idx, Link::Owner)?;
                check_link(idx, previous, stop.previous_idx, Link::Previous)?;
                check_link(idx, next, stop.next_idx, Link::Next)?;

                let expected = chain::expected_arrival(
                    route,
                    previous.map(|p| &self.stops[p]),
                    stop,
                    self.distances.as_ref(),
                );
                if stop.arrival != expected {
                    return Err(InvariantViolation::WrongArrival { stop: idx });
                }
            }
        }

        for &idx in &self.unassigned {
            let stop = &self.stops[idx];
            check_link(idx, None, stop.route_idx, Link::Owner)?;
            check_link(idx, None, stop.previous_idx, Link::Previous)?;
            check_link(idx, None, stop.next_idx, Link::Next)?;
            if stop.arrival.is_some() {
                return Err(InvariantViolation::WrongArrival { stop: idx });
            }
        }

        Ok(())
    }

    fn view<'a>(&'a self, route: &'a Route) -> RouteView<'a, D> {
        RouteView {
            route,
            stops: &self.stops,
            distances: self.distances.as_ref(),
        }
    }
}

impl<D> Clone for RoutingPlan<D> {
    /// Clones the solution; the distance provider is shared.
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            bounds: self.bounds,
            stops: self.stops.clone(),
            routes: self.routes.clone(),
            unassigned: self.unassigned.clone(),
            score: self.score,
            solver_status: self.solver_status,
            distances: Arc::clone(&self.distances),
        }
    }
}

enum Link {
    Owner,
    Previous,
    Next,
}

fn check_link(
    stop: usize,
    expected: Option<usize>,
    found: Option<usize>,
    link: Link,
) -> Result<(), InvariantViolation> {
    if expected == found {
        return Ok(());
    }
    Err(match link {
        Link::Owner => InvariantViolation::WrongOwner {
            stop,
            expected,
            found,
        },
        Link::Previous => InvariantViolation::WrongPrevious {
            stop,
            expected,
            found,
        },
        Link::Next => InvariantViolation::WrongNext {
            stop,
            expected,
            found,
        },
    })
}

fn validate(stops: &[Stop], routes: &[Route]) -> Result<(), ConfigError> {
    let mut max_demand = 0;
    for (pos, stop) in stops.iter().enumerate() {
        if stop.index != pos {
            return Err(ConfigError::IndexMismatch {
                kind: "stop",
                expected: pos,
                found: stop.index,
            });
        }
        if stop.demand < 0 {
            return Err(ConfigError::NegativeDemand {
                stop: pos,
                demand: stop.demand,
            });
        }
        if stop.service_duration < chrono::TimeDelta::zero() {
            return Err(ConfigError::NegativeServiceDuration { stop: pos });
        }
        max_demand = max_demand.max(stop.demand);
    }

    let required = max_demand.max(1);
    let mut ids = HashSet::with_capacity(routes.len());
    for (pos, route) in routes.iter().enumerate() {
        if route.index != pos || !ids.insert(route.index) {
            return Err(ConfigError::IndexMismatch {
                kind: "route",
                expected: pos,
                found: route.index,
            });
        }
        if route.capacity < required {
            return Err(ConfigError::InsufficientCapacity {
                route: pos,
                capacity: route.capacity,
                required,
            });
        }
    }
    Ok(())
}
