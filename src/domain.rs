//! Domain model for the route chain.
//!
//! # Overview
//!
//! - [`Stop`]s with time windows, demand and service duration
//! - [`Route`]s anchored at a depot and a departure time
//! - [`RouteView`] for aggregate queries over a route's stops
//!
//! # Derived state
//!
//! A stop's owning route, its neighbours and its arrival time are derived
//! from the route sequences. Only chain propagation writes them; everything
//! else reads them through accessors.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::distance::DistanceProvider;
use crate::error::ConfigError;
use crate::geo::GeoPoint;

/// Service time window: service may start at `min_start` and must finish
/// by `max_end`.
///
/// Deserialization goes through [`TimeWindow::new`], so a reversed window
/// is rejected there too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawTimeWindow")]
pub struct TimeWindow {
    min_start: NaiveDateTime,
    max_end: NaiveDateTime,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTimeWindow {
    min_start: NaiveDateTime,
    max_end: NaiveDateTime,
}

impl TryFrom<RawTimeWindow> for TimeWindow {
    type Error = ConfigError;

    fn try_from(raw: RawTimeWindow) -> Result<Self, Self::Error> {
        TimeWindow::new(raw.min_start, raw.max_end)
    }
}

impl TimeWindow {
    /// Creates a window, rejecting one that closes before it opens.
    pub fn new(min_start: NaiveDateTime, max_end: NaiveDateTime) -> Result<Self, ConfigError> {
        if max_end < min_start {
            return Err(ConfigError::InvalidTimeWindow { min_start, max_end });
        }
        Ok(Self { min_start, max_end })
    }

    /// A window that never constrains service.
    pub fn unbounded() -> Self {
        Self {
            min_start: NaiveDateTime::MIN,
            max_end: NaiveDateTime::MAX,
        }
    }

    #[inline]
    pub fn min_start(&self) -> NaiveDateTime {
        self.min_start
    }

    #[inline]
    pub fn max_end(&self) -> NaiveDateTime {
        self.max_end
    }
}

/// A point to visit with demand, time window and service duration.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, TimeDelta};
/// use route_chain::domain::{Stop, TimeWindow};
/// use route_chain::geo::GeoPoint;
///
/// let day = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
/// let window = TimeWindow::new(
///     day.and_hms_opt(6, 0, 0).unwrap(),
///     day.and_hms_opt(10, 0, 0).unwrap(),
/// )
/// .unwrap();
///
/// // A restaurant delivery: 6am-10am window, 5-minute service
/// let stop = Stop::new(0, "Restaurant A", GeoPoint::new(39.95, -75.17))
///     .with_demand(8)
///     .with_time_window(window)
///     .with_service_duration(TimeDelta::minutes(5));
///
/// assert_eq!(stop.demand, 8);
/// assert!(stop.arrival().is_none()); // not routed yet
/// ```
#[derive(Debug, Clone)]
pub struct Stop {
    /// Index in `RoutingPlan::stops`.
    pub index: usize,
    /// Customer name.
    pub name: String,
    pub location: GeoPoint,
    /// Quantity delivered (counts against route capacity).
    pub demand: i32,
    pub window: TimeWindow,
    pub service_duration: TimeDelta,

    // Derived chain state, written only by chain propagation.
    pub(crate) route_idx: Option<usize>,
    pub(crate) previous_idx: Option<usize>,
    pub(crate) next_idx: Option<usize>,
    pub(crate) arrival: Option<NaiveDateTime>,
}

impl Stop {
    /// Creates an unrouted stop with demand 1, no service time and an
    /// unbounded window.
    pub fn new(index: usize, name: impl Into<String>, location: GeoPoint) -> Self {
        Self {
            index,
            name: name.into(),
            location,
            demand: 1,
            window: TimeWindow::unbounded(),
            service_duration: TimeDelta::zero(),
            route_idx: None,
            previous_idx: None,
            next_idx: None,
            arrival: None,
        }
    }

    pub fn with_demand(mut self, demand: i32) -> Self {
        self.demand = demand;
        self
    }

    pub fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_service_duration(mut self, duration: TimeDelta) -> Self {
        self.service_duration = duration;
        self
    }

    /// Route this stop belongs to.
    #[inline]
    pub fn route_idx(&self) -> Option<usize> {
        self.route_idx
    }

    /// Stop visited right before this one in the same route.
    #[inline]
    pub fn previous_idx(&self) -> Option<usize> {
        self.previous_idx
    }

    /// Stop visited right after this one in the same route.
    #[inline]
    pub fn next_idx(&self) -> Option<usize> {
        self.next_idx
    }

    /// Arrival time, `None` while unassigned.
    #[inline]
    pub fn arrival(&self) -> Option<NaiveDateTime> {
        self.arrival
    }

    #[inline]
    pub fn is_assigned(&self) -> bool {
        self.route_idx.is_some()
    }

    /// Service starts at the later of arrival and window opening.
    #[inline]
    pub fn start_service_time(&self) -> Option<NaiveDateTime> {
        self.arrival.map(|arrival| arrival.max(self.window.min_start))
    }

    /// Time service completes and the vehicle leaves.
    #[inline]
    pub fn departure_time(&self) -> Option<NaiveDateTime> {
        self.start_service_time()
            .and_then(|start| start.checked_add_signed(self.service_duration))
    }

    /// True if service completes after the window closes.
    #[inline]
    pub fn is_late(&self) -> bool {
        self.departure_time()
            .is_some_and(|departure| departure > self.window.max_end)
    }

    /// Minutes service completes after the window closes, 0 if on time.
    ///
    /// Any partial minute counts as a whole one: 30 seconds late is 1.
    pub fn service_completion_delay_minutes(&self) -> i64 {
        let Some(departure) = self.departure_time() else {
            return 0;
        };
        let delay = departure.signed_duration_since(self.window.max_end);
        if delay <= TimeDelta::zero() {
            return 0;
        }
        let mut seconds = delay.num_seconds();
        if delay.subsec_nanos() > 0 {
            seconds += 1;
        }
        (seconds + 59) / 60
    }

    /// Resets derived state to the unassigned shape.
    pub(crate) fn detach(&mut self) {
        self.route_idx = None;
        self.previous_idx = None;
        self.next_idx = None;
        self.arrival = None;
    }
}

/// A vehicle route: depot, departure time, capacity and an ordered chain of
/// stop indices.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use route_chain::domain::Route;
/// use route_chain::geo::GeoPoint;
///
/// let departure = NaiveDate::from_ymd_opt(2025, 1, 5)
///     .unwrap()
///     .and_hms_opt(8, 0, 0)
///     .unwrap();
/// let route = Route::new(0, "Alpha", 100, GeoPoint::new(39.95, -75.17), departure);
///
/// assert_eq!(route.capacity, 100);
/// assert!(route.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Route {
    /// Index in `RoutingPlan::routes`.
    pub index: usize,
    /// Vehicle name for display.
    pub name: String,
    /// Maximum total demand the vehicle carries.
    pub capacity: i32,
    /// Where the route starts and ends.
    pub depot: GeoPoint,
    /// When the vehicle leaves the depot.
    pub departure: NaiveDateTime,
    pub(crate) stops: Vec<usize>,
}

impl Route {
    /// Creates a route with no stops.
    pub fn new(
        index: usize,
        name: impl Into<String>,
        capacity: i32,
        depot: GeoPoint,
        departure: NaiveDateTime,
    ) -> Self {
        Self {
            index,
            name: name.into(),
            capacity,
            depot,
            departure,
            stops: Vec::new(),
        }
    }

    /// Stop indices in visiting order.
    #[inline]
    pub fn stops(&self) -> &[usize] {
        &self.stops
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stops.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Position of a stop in this route.
    pub fn position_of(&self, stop_idx: usize) -> Option<usize> {
        self.stops.iter().position(|&idx| idx == stop_idx)
    }
}

/// Read-only view of a route together with the stop arena and distances.
///
/// Obtained from [`RoutingPlan::route`](crate::plan::RoutingPlan::route).
pub struct RouteView<'a, D: ?Sized> {
    pub(crate) route: &'a Route,
    pub(crate) stops: &'a [Stop],
    pub(crate) distances: &'a D,
}

impl<'a, D: DistanceProvider + ?Sized> RouteView<'a, D> {
    #[inline]
    pub fn route(&self) -> &'a Route {
        self.route
    }

    /// Stops in visiting order.
    pub fn stops(&self) -> impl Iterator<Item = &'a Stop> + 'a {
        let (route, arena) = (self.route, self.stops);
        route.stops.iter().map(move |&idx| &arena[idx])
    }

    /// Sum of stop demands, 0 for an empty route.
    pub fn total_demand(&self) -> i32 {
        self.stops().map(|stop| stop.demand).sum()
    }

    /// Demand above capacity, 0 when within capacity.
    pub fn excess_demand(&self) -> i32 {
        (self.total_demand() - self.route.capacity).max(0)
    }

    /// Driving time from depot through every stop and back, 0 when empty.
    pub fn total_travel_seconds(&self) -> i64 {
        let mut stops = self.stops().peekable();
        if stops.peek().is_none() {
            return 0;
        }

        let mut total = 0i64;
        let mut current = self.route.depot;
        for stop in stops {
            total += self.distances.travel_seconds(&current, &stop.location);
            current = stop.location;
        }
        total + self.distances.travel_seconds(&current, &self.route.depot)
    }

    /// Total driving time in whole minutes.
    pub fn driving_time_minutes(&self) -> i64 {
        self.total_travel_seconds() / 60
    }

    /// Time the vehicle is back at the depot.
    ///
    /// The departure time for an empty route. `None` only when the last
    /// stop's arrival is undefined.
    pub fn finish_time(&self) -> Option<NaiveDateTime> {
        let Some(last) = self.stops().last() else {
            return Some(self.route.departure);
        };
        let back = self.distances.travel_seconds(&last.location, &self.route.depot);
        last.departure_time()
            .and_then(|departure| departure.checked_add_signed(TimeDelta::seconds(back)))
    }

    /// Sum of late minutes over the route's stops.
    pub fn total_late_minutes(&self) -> i64 {
        self.stops().map(Stop::service_completion_delay_minutes).sum()
    }
}
