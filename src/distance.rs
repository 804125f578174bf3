//! Travel time between geographic points.
//!
//! Two strategies answer the same question:
//!
//! - [`Haversine`] computes the great-circle travel time on demand. A query
//!   costs a handful of trigonometric calls.
//! - [`TravelTimeMatrix`] holds every pairwise travel time of a fixed point
//!   set, trading O(n²) memory for O(1) lookups in the solver's hot loop.
//!
//! [`TravelTimes`] is the provider a solving run owns. It answers on demand
//! until [`TravelTimes::init_matrix`] publishes a matrix, and goes back to
//! on-demand after [`TravelTimes::clear_matrix`].

use parking_lot::RwLock;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::geo::GeoPoint;

/// Average driving speed in km/h for travel time estimation.
pub const AVERAGE_SPEED_KMPH: f64 = 50.0;

/// Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

const TWICE_EARTH_RADIUS_M: f64 = 2.0 * EARTH_RADIUS_M;

/// Answers "how many seconds does it take to drive from `from` to `to`".
///
/// Implementations never fail: any pair of coordinates yields a
/// non-negative number of seconds.
pub trait DistanceProvider {
    /// Travel time in whole seconds.
    fn travel_seconds(&self, from: &GeoPoint, to: &GeoPoint) -> i64;
}

impl<T: DistanceProvider + ?Sized> DistanceProvider for &T {
    #[inline]
    fn travel_seconds(&self, from: &GeoPoint, to: &GeoPoint) -> i64 {
        (**self).travel_seconds(from, to)
    }
}

impl<T: DistanceProvider + ?Sized> DistanceProvider for Arc<T> {
    #[inline]
    fn travel_seconds(&self, from: &GeoPoint, to: &GeoPoint) -> i64 {
        (**self).travel_seconds(from, to)
    }
}

/// On-demand great-circle travel time.
///
/// Points are projected onto a sphere of diameter 1.0, the chord between
/// them gives the central angle through `asin`, and the arc length is
/// converted to driving seconds at [`AVERAGE_SPEED_KMPH`].
///
/// # Examples
///
/// ```
/// use route_chain::distance::{DistanceProvider, Haversine};
/// use route_chain::geo::GeoPoint;
///
/// let philadelphia = GeoPoint::new(39.95, -75.17);
/// let new_york = GeoPoint::new(40.71, -74.01);
///
/// // About 130 km, so roughly 2.6 hours at 50 km/h
/// let secs = Haversine.travel_seconds(&philadelphia, &new_york);
/// assert!(secs > 8500 && secs < 10500);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Haversine;

impl Haversine {
    /// Great-circle distance in whole meters (ties round to even).
    pub fn distance_meters(from: &GeoPoint, to: &GeoPoint) -> i64 {
        if from.same_coordinates(to) {
            return 0;
        }

        let [x1, y1, z1] = to_cartesian(from);
        let [x2, y2, z2] = to_cartesian(to);
        let (dx, dy, dz) = (x1 - x2, y1 - y2, z1 - z2);
        // Rounding can push the chord of near-antipodal points past 1.0
        let r = (dx * dx + dy * dy + dz * dz).sqrt().min(1.0);

        (TWICE_EARTH_RADIUS_M * r.asin()).round_ties_even() as i64
    }

    /// Converts meters to driving seconds at [`AVERAGE_SPEED_KMPH`].
    ///
    /// ```
    /// use route_chain::distance::Haversine;
    ///
    /// assert_eq!(Haversine::meters_to_seconds(50_000), 3600);
    /// assert_eq!(Haversine::meters_to_seconds(1_000), 72);
    /// ```
    #[inline]
    pub fn meters_to_seconds(meters: i64) -> i64 {
        // seconds = meters / (km/h) * 3.6
        (meters as f64 / AVERAGE_SPEED_KMPH * 3.6).round_ties_even() as i64
    }
}

impl DistanceProvider for Haversine {
    #[inline]
    fn travel_seconds(&self, from: &GeoPoint, to: &GeoPoint) -> i64 {
        if from.same_coordinates(to) {
            return 0;
        }
        Self::meters_to_seconds(Self::distance_meters(from, to))
    }
}

/// Cartesian coordinates on a sphere of diameter 1.0.
fn to_cartesian(point: &GeoPoint) -> [f64; 3] {
    let lat = point.latitude.to_radians();
    let lon = point.longitude.to_radians();
    [
        0.5 * lat.cos() * lon.sin(),
        0.5 * lat.cos() * lon.cos(),
        0.5 * lat.sin(),
    ]
}

/// Precomputed travel times for every ordered pair of a point set.
///
/// Immutable once built. Pairs outside the set fall back to [`Haversine`].
#[derive(Debug, Clone, Default)]
pub struct TravelTimeMatrix {
    times: HashMap<(GeoPoint, GeoPoint), i64>,
}

impl TravelTimeMatrix {
    /// Computes all pairwise travel times, including each point to itself.
    ///
    /// Duplicate points are computed once. Rows are evaluated in parallel.
    ///
    /// # Examples
    ///
    /// ```
    /// use route_chain::distance::TravelTimeMatrix;
    /// use route_chain::geo::GeoPoint;
    ///
    /// let points = [
    ///     GeoPoint::new(0.0, 0.0),
    ///     GeoPoint::new(1.0, 1.0),
    ///     GeoPoint::new(2.0, 2.0),
    /// ];
    /// let matrix = TravelTimeMatrix::build(&points);
    /// assert_eq!(matrix.len(), 9);
    /// assert_eq!(matrix.get(&points[1], &points[1]), Some(0));
    /// ```
    pub fn build(points: &[GeoPoint]) -> Self {
        let mut seen = HashSet::with_capacity(points.len());
        let unique: Vec<GeoPoint> = points.iter().copied().filter(|p| seen.insert(*p)).collect();

        let times = unique
            .par_iter()
            .flat_map_iter(|from| {
                unique
                    .iter()
                    .map(move |to| ((*from, *to), Haversine.travel_seconds(from, to)))
            })
            .collect();

        Self { times }
    }

    /// Looks up a precomputed pair.
    #[inline]
    pub fn get(&self, from: &GeoPoint, to: &GeoPoint) -> Option<i64> {
        self.times.get(&(*from, *to)).copied()
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

impl DistanceProvider for TravelTimeMatrix {
    #[inline]
    fn travel_seconds(&self, from: &GeoPoint, to: &GeoPoint) -> i64 {
        self.get(from, to)
            .unwrap_or_else(|| Haversine.travel_seconds(from, to))
    }
}

/// Travel time provider with an explicit precomputed-matrix lifecycle.
///
/// The matrix is built outside the lock and swapped in whole, so readers see
/// either the previous state or the complete new matrix. Clearing waits for
/// in-flight lookups. Share it between solver threads with an `Arc`.
///
/// # Examples
///
/// ```
/// use route_chain::distance::{DistanceProvider, TravelTimes};
/// use route_chain::geo::GeoPoint;
///
/// let a = GeoPoint::new(39.95, -75.17);
/// let b = GeoPoint::new(40.71, -74.01);
///
/// let times = TravelTimes::new();
/// let on_demand = times.travel_seconds(&a, &b);
///
/// times.init_matrix(&[a, b]);
/// assert!(times.is_matrix_initialized());
/// assert_eq!(times.travel_seconds(&a, &b), on_demand);
///
/// times.clear_matrix();
/// assert!(!times.is_matrix_initialized());
/// ```
#[derive(Debug, Default)]
pub struct TravelTimes {
    matrix: RwLock<Option<Arc<TravelTimeMatrix>>>,
}

impl TravelTimes {
    /// Creates a provider in on-demand mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider with a matrix already built for `points`.
    pub fn with_matrix(points: &[GeoPoint]) -> Self {
        let times = Self::new();
        times.init_matrix(points);
        times
    }

    /// Builds the matrix for `points`, replacing any existing one.
    ///
    /// Calling it again rebuilds from scratch.
    pub fn init_matrix(&self, points: &[GeoPoint]) {
        let start = Instant::now();
        let matrix = TravelTimeMatrix::build(points);
        let entries = matrix.len();

        *self.matrix.write() = Some(Arc::new(matrix));

        info!(
            points = points.len(),
            entries,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Travel time matrix initialized"
        );
    }

    /// Drops the matrix and reverts to on-demand computation.
    pub fn clear_matrix(&self) {
        if self.matrix.write().take().is_some() {
            info!("Travel time matrix cleared");
        } else {
            debug!("Travel time matrix already empty");
        }
    }

    /// True if a non-empty matrix is published.
    pub fn is_matrix_initialized(&self) -> bool {
        self.matrix.read().as_ref().is_some_and(|m| !m.is_empty())
    }

    /// Number of precomputed pairs (0 in on-demand mode).
    pub fn matrix_len(&self) -> usize {
        self.matrix.read().as_ref().map_or(0, |m| m.len())
    }

    /// Current matrix, if any.
    ///
    /// Holding the snapshot keeps it alive across a concurrent clear.
    pub fn snapshot(&self) -> Option<Arc<TravelTimeMatrix>> {
        self.matrix.read().clone()
    }
}

impl DistanceProvider for TravelTimes {
    fn travel_seconds(&self, from: &GeoPoint, to: &GeoPoint) -> i64 {
        if let Some(seconds) = self.matrix.read().as_ref().and_then(|m| m.get(from, to)) {
            return seconds;
        }
        Haversine.travel_seconds(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCATION_1: GeoPoint = GeoPoint::new(0.0, 0.0);
    const LOCATION_2: GeoPoint = GeoPoint::new(3.0, 4.0);
    const LOCATION_3: GeoPoint = GeoPoint::new(-1.0, 1.0);

    fn secs(a: GeoPoint, b: GeoPoint) -> i64 {
        Haversine.travel_seconds(&a, &b)
    }

    #[test]
    fn test_known_values() {
        assert_eq!(secs(LOCATION_1, LOCATION_2), 40018);
        assert_eq!(secs(LOCATION_2, LOCATION_3), 40025);
        assert_eq!(secs(LOCATION_1, LOCATION_3), 11322);
    }

    #[test]
    fn test_known_distances() {
        assert_eq!(Haversine::distance_meters(&LOCATION_1, &LOCATION_2), 555_812);
        assert_eq!(Haversine::distance_meters(&LOCATION_1, &LOCATION_3), 157_249);
    }

    #[test]
    fn test_same_location_is_zero() {
        let loc = GeoPoint::new(40.0, -75.0);
        assert_eq!(secs(loc, loc), 0);
        assert_eq!(secs(loc, GeoPoint::new(40.0, -75.0)), 0);
    }

    #[test]
    fn test_symmetric() {
        assert_eq!(secs(LOCATION_1, LOCATION_2), secs(LOCATION_2, LOCATION_1));
        assert_eq!(secs(LOCATION_2, LOCATION_3), secs(LOCATION_3, LOCATION_2));
    }

    #[test]
    fn test_one_degree_at_equator() {
        let lon = secs(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0));
        let lat = secs(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        assert!((lon - 7920).abs() <= 500, "got {}", lon);
        assert!((lat - 7920).abs() <= 500, "got {}", lat);
        assert_eq!(lon, lat);
    }

    #[test]
    fn test_one_degree_latitude_anywhere() {
        let north = secs(GeoPoint::new(60.0, 20.0), GeoPoint::new(61.0, 20.0));
        let south = secs(GeoPoint::new(-45.0, -120.0), GeoPoint::new(-44.0, -120.0));
        assert!((north - 7920).abs() <= 500);
        assert!((south - 7920).abs() <= 500);
    }

    #[test]
    fn test_cross_antimeridian() {
        assert_eq!(secs(GeoPoint::new(0.0, 179.0), GeoPoint::new(0.0, -179.0)), 16012);
        assert_eq!(secs(GeoPoint::new(0.0, 170.0), GeoPoint::new(0.0, -170.0)), 160121);
        assert_eq!(secs(GeoPoint::new(10.0, 179.5), GeoPoint::new(-10.0, -179.5)), 160319);
    }

    #[test]
    fn test_antipodes() {
        // Half the circumference: 20 015 087 m
        assert_eq!(secs(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 180.0)), 1_441_086);
        assert_eq!(secs(GeoPoint::new(90.0, 0.0), GeoPoint::new(-90.0, 0.0)), 1_441_086);

        // Chord rounds to just above 1.0 for this pair
        let a = GeoPoint::new(4.254132675388121, -129.71544414917534);
        let b = GeoPoint::new(-4.254132675388121, 50.28455585082466);
        assert_eq!(Haversine::distance_meters(&a, &b), 20_015_087);
        assert_eq!(secs(a, b), 1_441_086);
        assert_eq!(secs(b, a), 1_441_086);
    }

    #[test]
    fn test_near_antipodes() {
        let t = secs(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 179.999));
        assert_eq!(t, 1_441_078);
    }

    #[test]
    fn test_cross_hemisphere() {
        let t = secs(GeoPoint::new(10.0, 0.0), GeoPoint::new(-10.0, 0.0));
        assert!(t > 155_000 && t < 165_000, "got {}", t);
    }

    #[test]
    fn test_southern_hemisphere() {
        let sydney = GeoPoint::new(-33.87, 151.21);
        let melbourne = GeoPoint::new(-37.81, 144.96);
        let t = secs(sydney, melbourne);
        assert!(t > 48000 && t < 55000, "got {}", t);
    }

    #[test]
    fn test_to_cartesian() {
        let [x, y, z] = to_cartesian(&GeoPoint::new(0.0, 0.0));
        assert!(x.abs() < 1e-9 && (y - 0.5).abs() < 1e-9 && z.abs() < 1e-9);

        let [x, y, z] = to_cartesian(&GeoPoint::new(90.0, 0.0));
        assert!(x.abs() < 1e-9 && y.abs() < 1e-9 && (z - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_meters_to_seconds() {
        assert_eq!(Haversine::meters_to_seconds(0), 0);
        assert_eq!(Haversine::meters_to_seconds(1000), 72);
        assert_eq!(Haversine::meters_to_seconds(50_000), 3600);
    }

    #[test]
    fn test_matrix_size_is_n_squared() {
        let points = [
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(2.0, 2.0),
        ];
        assert_eq!(TravelTimeMatrix::build(&points).len(), 9);
    }

    #[test]
    fn test_matrix_dedups_points() {
        let points = [LOCATION_1, LOCATION_2, LOCATION_1];
        assert_eq!(TravelTimeMatrix::build(&points).len(), 4);
    }

    #[test]
    fn test_matrix_matches_on_demand() {
        let points = [
            GeoPoint::new(39.95, -75.17),
            GeoPoint::new(40.71, -74.01),
            GeoPoint::new(41.76, -72.68),
        ];
        let matrix = TravelTimeMatrix::build(&points);
        for a in &points {
            for b in &points {
                assert_eq!(matrix.get(a, b), Some(Haversine.travel_seconds(a, b)));
            }
        }
    }

    #[test]
    fn test_matrix_miss_falls_back() {
        let matrix = TravelTimeMatrix::build(&[LOCATION_1, LOCATION_3]);
        assert_eq!(matrix.get(&LOCATION_1, &LOCATION_2), None);
        assert_eq!(matrix.travel_seconds(&LOCATION_1, &LOCATION_2), 40018);
    }

    #[test]
    fn test_lifecycle() {
        let times = TravelTimes::new();
        assert!(!times.is_matrix_initialized());
        assert_eq!(times.matrix_len(), 0);

        times.init_matrix(&[LOCATION_1, LOCATION_2]);
        assert!(times.is_matrix_initialized());
        assert_eq!(times.matrix_len(), 4);

        times.clear_matrix();
        assert!(!times.is_matrix_initialized());
        assert_eq!(times.travel_seconds(&LOCATION_1, &LOCATION_2), 40018);
    }

    #[test]
    fn test_init_with_no_points_is_not_initialized() {
        let times = TravelTimes::new();
        times.init_matrix(&[]);
        assert!(!times.is_matrix_initialized());
    }

    #[test]
    fn test_rebuild_replaces_matrix() {
        let times = TravelTimes::with_matrix(&[LOCATION_1, LOCATION_2, LOCATION_3]);
        assert_eq!(times.matrix_len(), 9);

        times.init_matrix(&[LOCATION_1, LOCATION_2]);
        assert_eq!(times.matrix_len(), 4);
        let snapshot = times.snapshot().unwrap();
        assert_eq!(snapshot.get(&LOCATION_2, &LOCATION_3), None);
        assert_eq!(times.travel_seconds(&LOCATION_2, &LOCATION_3), 40025);
    }

    #[test]
    fn test_snapshot_survives_clear() {
        let times = TravelTimes::with_matrix(&[LOCATION_1, LOCATION_2]);
        let snapshot = times.snapshot().unwrap();
        times.clear_matrix();
        assert_eq!(snapshot.get(&LOCATION_1, &LOCATION_2), Some(40018));
    }

    #[test]
    fn test_concurrent_reads_during_rebuild() {
        let points: Vec<GeoPoint> = (0..20)
            .map(|i| GeoPoint::new(39.9 + i as f64 * 0.01, -75.2 + i as f64 * 0.005))
            .collect();
        let expected: Vec<i64> = points
            .windows(2)
            .map(|w| Haversine.travel_seconds(&w[0], &w[1]))
            .collect();
        let times = TravelTimes::new();

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..200 {
                        for (w, &want) in points.windows(2).zip(&expected) {
                            assert_eq!(times.travel_seconds(&w[0], &w[1]), want);
                        }
                    }
                });
            }
            for _ in 0..10 {
                times.init_matrix(&points);
                times.clear_matrix();
            }
        });
    }
}
