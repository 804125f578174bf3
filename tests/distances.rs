use route_chain::distance::{DistanceProvider, Haversine, TravelTimes};
use route_chain::geo::GeoPoint;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

const ORIGIN: GeoPoint = GeoPoint::new(0.0, 0.0);
const NORTH_EAST: GeoPoint = GeoPoint::new(3.0, 4.0);
const SOUTH_WEST: GeoPoint = GeoPoint::new(-1.0, 1.0);

#[test]
fn test_known_travel_times() {
    assert_eq!(Haversine.travel_seconds(&ORIGIN, &NORTH_EAST), 40018);
    assert_eq!(Haversine.travel_seconds(&NORTH_EAST, &SOUTH_WEST), 40025);
    assert_eq!(Haversine.travel_seconds(&ORIGIN, &SOUTH_WEST), 11322);
}

#[test]
fn test_known_distances() {
    assert_eq!(Haversine::distance_meters(&ORIGIN, &NORTH_EAST), 555812);
    assert_eq!(Haversine::distance_meters(&ORIGIN, &GeoPoint::new(0.0, 1.0)), 111195);
    assert_eq!(Haversine::meters_to_seconds(111195), 8006);
}

#[test]
fn test_symmetric_with_zero_diagonal() {
    let points = [ORIGIN, NORTH_EAST, SOUTH_WEST, GeoPoint::new(0.0, 179.0)];
    for a in &points {
        assert_eq!(Haversine.travel_seconds(a, a), 0);
        for b in &points {
            assert_eq!(Haversine.travel_seconds(a, b), Haversine.travel_seconds(b, a));
        }
    }
}

#[test]
fn test_matrix_matches_on_demand() {
    let points = vec![
        ORIGIN,
        NORTH_EAST,
        SOUTH_WEST,
        GeoPoint::new(39.9526, -75.1652),
        GeoPoint::new(40.7128, -74.0060),
        GeoPoint::new(-33.8688, 151.2093),
    ];
    let times = TravelTimes::new();
    times.init_matrix(&points);
    assert_eq!(times.matrix_len(), points.len() * points.len());

    for a in &points {
        for b in &points {
            assert_eq!(times.travel_seconds(a, b), Haversine.travel_seconds(a, b));
        }
    }

    // Rebuilding is idempotent
    times.init_matrix(&points);
    assert_eq!(times.matrix_len(), points.len() * points.len());
    assert_eq!(
        times.travel_seconds(&points[3], &points[4]),
        Haversine.travel_seconds(&points[3], &points[4])
    );
}

#[test]
fn test_miss_falls_back_to_on_demand() {
    let times = TravelTimes::with_matrix(&[ORIGIN, NORTH_EAST]);
    assert_eq!(times.travel_seconds(&ORIGIN, &SOUTH_WEST), 11322);
}

#[test]
fn test_shared_provider_across_threads() {
    let times = Arc::new(TravelTimes::with_matrix(&[ORIGIN, NORTH_EAST, SOUTH_WEST]));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let times = Arc::clone(&times);
            std::thread::spawn(move || times.travel_seconds(&ORIGIN, &NORTH_EAST))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 40018);
    }
}

#[test]
fn test_antipodes_are_half_the_globe_apart() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..20_000 {
        let lat = rng.gen_range(-90.0..90.0);
        let lon = rng.gen_range(-180.0..0.0);
        let a = GeoPoint::new(lat, lon);
        let b = GeoPoint::new(-lat, lon + 180.0);
        assert_eq!(Haversine.travel_seconds(&a, &b), 1_441_086, "{} -> {}", a, b);
    }
}

#[test]
fn test_antimeridian_matches_same_side_distance() {
    // Same 2 degrees of longitude, once across 180 and once across 0
    let across = Haversine.travel_seconds(&GeoPoint::new(0.0, 179.0), &GeoPoint::new(0.0, -179.0));
    let local = Haversine.travel_seconds(&GeoPoint::new(0.0, -1.0), &GeoPoint::new(0.0, 1.0));
    assert_eq!(across, 16012);
    assert_eq!(across, local);
}
