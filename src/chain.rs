//! Chain mutation and arrival propagation.
//!
//! Every structural change to a route sequence ends with [`propagate`] from
//! the earliest position it touched. Propagation rewrites owner, neighbour
//! links and arrival time for that suffix, in order, so each stop reads an
//! already-updated predecessor.
//!
//! Mutators validate first and only then mutate: a rejected call leaves the
//! plan exactly as it was.

use chrono::{NaiveDateTime, TimeDelta};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::distance::DistanceProvider;
use crate::domain::{Route, RouteView, Stop};
use crate::error::ChainError;
use crate::plan::RoutingPlan;

/// Arrival at `stop` given its predecessor in `route`.
///
/// The first stop is reached straight from the depot at departure. Later
/// stops are reached after the predecessor's service completes; if the
/// predecessor has no arrival, neither does this stop.
pub(crate) fn expected_arrival<D: DistanceProvider + ?Sized>(
    route: &Route,
    previous: Option<&Stop>,
    stop: &Stop,
    distances: &D,
) -> Option<NaiveDateTime> {
    let (leave_at, from) = match previous {
        Some(prev) => (prev.departure_time()?, prev.location),
        None => (route.departure, route.depot),
    };
    let travel = distances.travel_seconds(&from, &stop.location);
    leave_at.checked_add_signed(TimeDelta::seconds(travel))
}

/// Recomputes derived state for `route.stops[from..]`.
///
/// Also relinks the stop at `from - 1`, whose successor may have changed.
pub(crate) fn propagate<D: DistanceProvider + ?Sized>(
    route: &Route,
    stops: &mut [Stop],
    distances: &D,
    from: usize,
) {
    let seq = &route.stops;
    if let Some(prev) = from.checked_sub(1).and_then(|p| seq.get(p)) {
        stops[*prev].next_idx = seq.get(from).copied();
    }

    for pos in from..seq.len() {
        let idx = seq[pos];
        let previous = pos.checked_sub(1).map(|p| seq[p]);
        let arrival = expected_arrival(route, previous.map(|p| &stops[p]), &stops[idx], distances);

        let stop = &mut stops[idx];
        stop.route_idx = Some(route.index);
        stop.previous_idx = previous;
        stop.next_idx = seq.get(pos + 1).copied();
        stop.arrival = arrival;
    }
}

/// Mutable handle on one route of a plan.
///
/// Obtained from [`RoutingPlan::route_mut`].
pub struct RouteMut<'a, D> {
    plan: &'a mut RoutingPlan<D>,
    route: usize,
}

impl<'a, D: DistanceProvider> RouteMut<'a, D> {
    pub(crate) fn new(plan: &'a mut RoutingPlan<D>, route: usize) -> Self {
        Self { plan, route }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.route
    }

    /// Read-only view of the route in its current state.
    pub fn view(&self) -> RouteView<'_, D> {
        RouteView {
            route: &self.plan.routes[self.route],
            stops: &self.plan.stops,
            distances: self.plan.distances.as_ref(),
        }
    }

    /// Takes an unassigned stop into the route at `position`.
    ///
    /// `position == len` appends.
    pub fn insert(&mut self, stop: usize, position: usize) -> Result<(), ChainError> {
        let plan = &mut *self.plan;
        let target = plan
            .stops
            .get(stop)
            .ok_or_else(|| rejected(ChainError::UnknownStop(stop)))?;
        if let Some(route) = target.route_idx {
            return Err(rejected(ChainError::AlreadyAssigned { stop, route }));
        }
        let len = plan.routes[self.route].len();
        if position > len {
            return Err(rejected(ChainError::PositionOutOfRange { position, len }));
        }

        plan.take_unassigned(stop);
        plan.routes[self.route].stops.insert(position, stop);
        plan.propagate(self.route, position);

        debug!(stop, route = self.route, position, "Stop inserted");
        Ok(())
    }

    /// Returns a stop of this route to the unassigned pool.
    ///
    /// Returns the position the stop held.
    pub fn remove(&mut self, stop: usize) -> Result<usize, ChainError> {
        let plan = &mut *self.plan;
        if stop >= plan.stops.len() {
            return Err(rejected(ChainError::UnknownStop(stop)));
        }
        let position = plan.routes[self.route]
            .position_of(stop)
            .ok_or_else(|| rejected(ChainError::NotInRoute { stop, route: self.route }))?;

        plan.routes[self.route].stops.remove(position);
        plan.stops[stop].detach();
        plan.unassigned.push(stop);
        plan.propagate(self.route, position);

        debug!(stop, route = self.route, position, "Stop removed");
        Ok(position)
    }

    /// Moves a stop of this route so that it ends up at `new_position`.
    pub fn move_within(&mut self, stop: usize, new_position: usize) -> Result<(), ChainError> {
        let plan = &mut *self.plan;
        if stop >= plan.stops.len() {
            return Err(rejected(ChainError::UnknownStop(stop)));
        }
        let route = &mut plan.routes[self.route];
        let old_position = route
            .position_of(stop)
            .ok_or_else(|| rejected(ChainError::NotInRoute { stop, route: self.route }))?;
        let len = route.len();
        if new_position >= len {
            return Err(rejected(ChainError::PositionOutOfRange {
                position: new_position,
                len,
            }));
        }
        if old_position == new_position {
            return Ok(());
        }

        route.stops.remove(old_position);
        route.stops.insert(new_position, stop);
        plan.propagate(self.route, old_position.min(new_position));

        debug!(
            stop,
            route = self.route,
            from = old_position,
            to = new_position,
            "Stop moved within route"
        );
        Ok(())
    }
}

impl<D: DistanceProvider> RoutingPlan<D> {
    /// Places `stop` at `position` in `to_route`.
    ///
    /// An unassigned stop is inserted. A routed stop leaves its current
    /// route first; both affected suffixes are recomputed. `position` is the
    /// final position in the target route.
    pub fn move_stop(
        &mut self,
        stop: usize,
        to_route: usize,
        position: usize,
    ) -> Result<(), ChainError> {
        let current = self
            .stops
            .get(stop)
            .ok_or_else(|| rejected(ChainError::UnknownStop(stop)))?
            .route_idx;
        if to_route >= self.routes.len() {
            return Err(rejected(ChainError::UnknownRoute(to_route)));
        }

        let from_route = match current {
            None => return RouteMut::new(self, to_route).insert(stop, position),
            Some(r) if r == to_route => {
                return RouteMut::new(self, to_route).move_within(stop, position)
            }
            Some(r) => r,
        };

        let len = self.routes[to_route].len();
        if position > len {
            return Err(rejected(ChainError::PositionOutOfRange { position, len }));
        }
        let old_position = self.routes[from_route]
            .position_of(stop)
            .ok_or_else(|| {
                rejected(ChainError::NotInRoute {
                    stop,
                    route: from_route,
                })
            })?;

        self.routes[from_route].stops.remove(old_position);
        self.propagate(from_route, old_position);
        self.routes[to_route].stops.insert(position, stop);
        self.propagate(to_route, position);

        debug!(stop, from_route, to_route, position, "Stop moved between routes");
        Ok(())
    }

    /// Removes a stop from whatever route holds it. No-op when unassigned.
    pub fn unassign(&mut self, stop: usize) -> Result<(), ChainError> {
        let current = self
            .stops
            .get(stop)
            .ok_or_else(|| rejected(ChainError::UnknownStop(stop)))?
            .route_idx;
        match current {
            Some(route) => RouteMut::new(self, route).remove(stop).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Replaces the whole sequence of `route`.
    ///
    /// Every listed stop must be unassigned or already in `route`. Stops the
    /// route held that are not listed become unassigned.
    pub fn assign(&mut self, route: usize, sequence: Vec<usize>) -> Result<(), ChainError> {
        if route >= self.routes.len() {
            return Err(rejected(ChainError::UnknownRoute(route)));
        }
        let mut listed = HashSet::with_capacity(sequence.len());
        for &stop in &sequence {
            let target = self
                .stops
                .get(stop)
                .ok_or_else(|| rejected(ChainError::UnknownStop(stop)))?;
            if !listed.insert(stop) {
                return Err(rejected(ChainError::DuplicateStop(stop)));
            }
            match target.route_idx {
                Some(owner) if owner != route => {
                    return Err(rejected(ChainError::AlreadyAssigned { stop, route: owner }));
                }
                _ => {}
            }
        }

        let previous = std::mem::replace(&mut self.routes[route].stops, sequence);
        for stop in previous {
            if !listed.contains(&stop) {
                self.stops[stop].detach();
                self.unassigned.push(stop);
            }
        }
        self.unassigned.retain(|idx| !listed.contains(idx));
        self.propagate(route, 0);

        debug!(route, stops = listed.len(), "Route sequence assigned");
        Ok(())
    }

    /// Recomputes every stop's derived state and the unassigned pool from
    /// the route sequences.
    pub fn update_all(&mut self) {
        for stop in &mut self.stops {
            stop.detach();
        }
        for route in 0..self.routes.len() {
            self.propagate(route, 0);
        }
        self.unassigned = self
            .stops
            .iter()
            .filter(|s| !s.is_assigned())
            .map(|s| s.index)
            .collect();
    }

    pub(crate) fn propagate(&mut self, route: usize, from: usize) {
        propagate(
            &self.routes[route],
            &mut self.stops,
            self.distances.as_ref(),
            from,
        );
    }

    pub(crate) fn take_unassigned(&mut self, stop: usize) {
        if let Some(pos) = self.unassigned.iter().position(|&idx| idx == stop) {
            self.unassigned.remove(pos);
        }
    }
}

fn rejected(err: ChainError) -> ChainError {
    warn!(error = %err, "Chain mutation rejected");
    err
}

/// Position-based list operations over route sequences.
///
/// The shape a list-change move works with: an entity (route) owns a list
/// of values (stops) and moves are remove-at plus insert-at. Every operation
/// keeps derived state consistent.
pub trait ListVariable {
    /// Number of values in the entity's list.
    fn list_len(&self, entity: usize) -> usize;

    /// Value at `position`.
    fn list_get(&self, entity: usize, position: usize) -> Option<usize>;

    /// Removes and returns the value at `position`.
    fn list_remove(&mut self, entity: usize, position: usize) -> Option<usize>;

    /// Inserts an unassigned value at `position`.
    fn list_insert(&mut self, entity: usize, position: usize, value: usize)
        -> Result<(), ChainError>;
}

impl<D: DistanceProvider> ListVariable for RoutingPlan<D> {
    fn list_len(&self, entity: usize) -> usize {
        self.routes.get(entity).map_or(0, Route::len)
    }

    fn list_get(&self, entity: usize, position: usize) -> Option<usize> {
        self.routes.get(entity)?.stops.get(position).copied()
    }

    fn list_remove(&mut self, entity: usize, position: usize) -> Option<usize> {
        let stop = self.list_get(entity, position)?;
        self.route_mut(entity)?.remove(stop).ok()?;
        Some(stop)
    }

    fn list_insert(
        &mut self,
        entity: usize,
        position: usize,
        value: usize,
    ) -> Result<(), ChainError> {
        self.route_mut(entity)
            .ok_or(ChainError::UnknownRoute(entity))?
            .insert(value, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use chrono::NaiveDate;

    fn departure() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn plan() -> RoutingPlan {
        let stops = vec![
            Stop::new(0, "A", GeoPoint::new(0.0, 1.0)),
            Stop::new(1, "B", GeoPoint::new(1.0, 0.0)),
            Stop::new(2, "C", GeoPoint::new(3.0, 4.0)),
            Stop::new(3, "D", GeoPoint::new(-1.0, 1.0)),
        ];
        let routes = vec![
            Route::new(0, "Alpha", 10, GeoPoint::new(0.0, 0.0), departure()),
            Route::new(1, "Bravo", 10, GeoPoint::new(0.0, 0.0), departure()),
        ];
        RoutingPlan::new("chain", stops, routes).unwrap()
    }

    fn sequence(plan: &RoutingPlan, route: usize) -> Vec<usize> {
        plan.routes()[route].stops().to_vec()
    }

    #[test]
    fn test_insert_links_neighbours() {
        let mut plan = plan();
        let mut route = plan.route_mut(0).unwrap();
        route.insert(0, 0).unwrap();
        route.insert(1, 1).unwrap();
        route.insert(2, 1).unwrap();

        assert_eq!(sequence(&plan, 0), vec![0, 2, 1]);
        assert_eq!(plan.stop(2).unwrap().previous_idx(), Some(0));
        assert_eq!(plan.stop(2).unwrap().next_idx(), Some(1));
        assert_eq!(plan.stop(0).unwrap().next_idx(), Some(2));
        assert_eq!(plan.unassigned(), &[3]);
        assert!(plan.check_invariants().is_ok());
    }

    #[test]
    fn test_route_handle_view_tracks_mutations() {
        let mut plan = plan();
        let mut route = plan.route_mut(1).unwrap();
        assert_eq!(route.index(), 1);
        route.insert(3, 0).unwrap();
        route.insert(0, 1).unwrap();

        let view = route.view();
        assert_eq!(view.total_demand(), 2);
        assert_eq!(view.stops().map(|s| s.index).collect::<Vec<_>>(), vec![3, 0]);
        assert_eq!(view.route().index, 1);
    }

    #[test]
    fn test_first_stop_arrival() {
        let mut plan = plan();
        plan.route_mut(0).unwrap().insert(0, 0).unwrap();
        let arrival = plan.stop(0).unwrap().arrival().unwrap();
        assert_eq!(arrival, departure() + TimeDelta::seconds(8006));
    }

    #[test]
    fn test_remove_last_clears_predecessor_next() {
        let mut plan = plan();
        plan.assign(0, vec![0, 1]).unwrap();
        let position = plan.route_mut(0).unwrap().remove(1).unwrap();

        assert_eq!(position, 1);
        assert_eq!(plan.stop(0).unwrap().next_idx(), None);
        assert!(!plan.stop(1).unwrap().is_assigned());
        assert_eq!(plan.stop(1).unwrap().arrival(), None);
        assert!(plan.check_invariants().is_ok());
    }

    #[test]
    fn test_remove_first_repropagates_suffix() {
        let mut plan = plan();
        plan.assign(0, vec![2, 3]).unwrap();
        plan.route_mut(0).unwrap().remove(2).unwrap();

        let stop = plan.stop(3).unwrap();
        assert_eq!(stop.previous_idx(), None);
        assert_eq!(stop.arrival(), Some(departure() + TimeDelta::seconds(11322)));
    }

    #[test]
    fn test_rejected_mutations_change_nothing() {
        let mut plan = plan();
        plan.assign(0, vec![0, 1]).unwrap();
        let before = sequence(&plan, 0);

        let mut route = plan.route_mut(0).unwrap();
        assert_eq!(
            route.insert(0, 0),
            Err(ChainError::AlreadyAssigned { stop: 0, route: 0 })
        );
        assert_eq!(
            route.insert(2, 5),
            Err(ChainError::PositionOutOfRange { position: 5, len: 2 })
        );
        assert_eq!(route.insert(9, 0), Err(ChainError::UnknownStop(9)));
        assert_eq!(
            route.remove(3),
            Err(ChainError::NotInRoute { stop: 3, route: 0 })
        );
        assert_eq!(
            route.move_within(0, 2),
            Err(ChainError::PositionOutOfRange { position: 2, len: 2 })
        );

        assert_eq!(sequence(&plan, 0), before);
        assert_eq!(plan.unassigned(), &[2, 3]);
        assert!(plan.check_invariants().is_ok());
    }

    #[test]
    fn test_move_within() {
        let mut plan = plan();
        plan.assign(0, vec![0, 1, 2]).unwrap();
        plan.route_mut(0).unwrap().move_within(0, 2).unwrap();
        assert_eq!(sequence(&plan, 0), vec![1, 2, 0]);
        assert_eq!(plan.stop(0).unwrap().next_idx(), None);
        assert!(plan.check_invariants().is_ok());

        plan.route_mut(0).unwrap().move_within(0, 0).unwrap();
        assert_eq!(sequence(&plan, 0), vec![0, 1, 2]);
        assert!(plan.check_invariants().is_ok());
    }

    #[test]
    fn test_move_between_routes() {
        let mut plan = plan();
        plan.assign(0, vec![0, 1, 2]).unwrap();
        plan.assign(1, vec![3]).unwrap();

        plan.move_stop(1, 1, 0).unwrap();
        assert_eq!(sequence(&plan, 0), vec![0, 2]);
        assert_eq!(sequence(&plan, 1), vec![1, 3]);
        assert_eq!(plan.stop(1).unwrap().route_idx(), Some(1));
        assert_eq!(plan.stop(0).unwrap().next_idx(), Some(2));
        assert!(plan.check_invariants().is_ok());

        assert_eq!(plan.move_stop(1, 7, 0), Err(ChainError::UnknownRoute(7)));
        assert_eq!(
            plan.move_stop(0, 1, 3),
            Err(ChainError::PositionOutOfRange { position: 3, len: 2 })
        );
        assert!(plan.check_invariants().is_ok());
    }

    #[test]
    fn test_move_stop_with_stale_owner_is_rejected() {
        let mut plan = plan();
        plan.assign(0, vec![0, 1]).unwrap();
        plan.stops[0].route_idx = Some(1);

        assert_eq!(
            plan.move_stop(0, 0, 0),
            Err(ChainError::NotInRoute { stop: 0, route: 1 })
        );
        assert_eq!(sequence(&plan, 0), vec![0, 1]);
        assert!(sequence(&plan, 1).is_empty());
    }

    #[test]
    fn test_move_stop_inserts_unassigned() {
        let mut plan = plan();
        plan.move_stop(3, 1, 0).unwrap();
        assert_eq!(sequence(&plan, 1), vec![3]);
        assert_eq!(plan.unassigned(), &[0, 1, 2]);
    }

    #[test]
    fn test_assign_rejects_foreign_and_duplicate_stops() {
        let mut plan = plan();
        plan.assign(0, vec![0]).unwrap();

        assert_eq!(
            plan.assign(1, vec![0, 1]),
            Err(ChainError::AlreadyAssigned { stop: 0, route: 0 })
        );
        assert_eq!(plan.assign(1, vec![1, 1]), Err(ChainError::DuplicateStop(1)));
        assert_eq!(plan.assign(2, vec![]), Err(ChainError::UnknownRoute(2)));
        assert!(sequence(&plan, 1).is_empty());
    }

    #[test]
    fn test_assign_releases_dropped_stops() {
        let mut plan = plan();
        plan.assign(0, vec![0, 1, 2]).unwrap();
        plan.assign(0, vec![2, 0]).unwrap();

        assert_eq!(sequence(&plan, 0), vec![2, 0]);
        assert!(!plan.stop(1).unwrap().is_assigned());
        assert!(plan.unassigned().contains(&1));
        assert!(plan.check_invariants().is_ok());
    }

    #[test]
    fn test_unassign() {
        let mut plan = plan();
        plan.assign(1, vec![2, 3]).unwrap();
        plan.unassign(2).unwrap();
        plan.unassign(2).unwrap();
        assert_eq!(sequence(&plan, 1), vec![3]);
        assert_eq!(plan.unassign(42), Err(ChainError::UnknownStop(42)));
        assert!(plan.check_invariants().is_ok());
    }

    #[test]
    fn test_update_all_repairs_derived_state() {
        let mut plan = plan();
        plan.routes[0].stops = vec![3, 1];
        assert!(plan.check_invariants().is_err());

        plan.update_all();
        assert_eq!(plan.unassigned(), &[0, 2]);
        assert!(plan.check_invariants().is_ok());
    }

    #[test]
    fn test_undefined_predecessor_arrival_propagates() {
        let mut plan = plan();
        plan.stops[0].service_duration = TimeDelta::MAX;
        plan.assign(0, vec![0, 1]).unwrap();

        assert!(plan.stop(0).unwrap().arrival().is_some());
        assert_eq!(plan.stop(0).unwrap().departure_time(), None);
        assert_eq!(plan.stop(1).unwrap().arrival(), None);
        assert!(plan.check_invariants().is_ok());
    }

    #[test]
    fn test_list_variable() {
        let mut plan = plan();
        plan.list_insert(0, 0, 2).unwrap();
        plan.list_insert(0, 1, 3).unwrap();
        assert_eq!(plan.list_len(0), 2);
        assert_eq!(plan.list_get(0, 1), Some(3));

        assert_eq!(plan.list_remove(0, 0), Some(2));
        assert_eq!(plan.list_remove(0, 5), None);
        assert_eq!(plan.list_len(0), 1);
        assert_eq!(plan.list_len(9), 0);
        assert_eq!(plan.list_insert(9, 0, 0), Err(ChainError::UnknownRoute(9)));
        assert!(plan.check_invariants().is_ok());
    }
}
